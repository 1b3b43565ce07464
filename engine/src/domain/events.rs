// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Domain events for the team lifecycle bounded context.
//!
//! Events are immutable facts describing a past aggregate transition. They
//! accumulate on the aggregate until the dispatch boundary drains them with
//! `Team::take_events`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::team::{MemberId, TeamId};

/// Team domain events, published to registered handlers after the mutated
/// aggregate has been durably committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TeamEvent {
    /// A team was created through the aggregate factory.
    TeamCreated {
        team_id: TeamId,
        name: String,
        occurred_at: DateTime<Utc>,
    },

    /// A member joined the team.
    MemberAdded {
        team_id: TeamId,
        member_id: MemberId,
        occurred_at: DateTime<Utc>,
    },

    /// A member left the team.
    MemberRemoved {
        team_id: TeamId,
        member_id: MemberId,
        occurred_at: DateTime<Utc>,
    },

    /// Team management was handed to another member.
    ManagerChanged {
        team_id: TeamId,
        manager_id: MemberId,
        occurred_at: DateTime<Utc>,
    },

    /// The team crossed its maturity threshold while Active.
    TeamMatured {
        team_id: TeamId,
        occurred_at: DateTime<Utc>,
    },

    /// The team expired and was archived.
    TeamArchived {
        team_id: TeamId,
        name: String,
        expired_on: DateTime<Utc>,
        occurred_at: DateTime<Utc>,
    },

    /// The attached project's details or dates changed, possibly moving the
    /// team's expiration.
    ProjectDatesChanged {
        team_id: TeamId,
        occurred_at: DateTime<Utc>,
    },
}

impl TeamEvent {
    /// Get the timestamp of the event
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            TeamEvent::TeamCreated { occurred_at, .. } => *occurred_at,
            TeamEvent::MemberAdded { occurred_at, .. } => *occurred_at,
            TeamEvent::MemberRemoved { occurred_at, .. } => *occurred_at,
            TeamEvent::ManagerChanged { occurred_at, .. } => *occurred_at,
            TeamEvent::TeamMatured { occurred_at, .. } => *occurred_at,
            TeamEvent::TeamArchived { occurred_at, .. } => *occurred_at,
            TeamEvent::ProjectDatesChanged { occurred_at, .. } => *occurred_at,
        }
    }

    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            TeamEvent::TeamCreated { .. } => "team_created",
            TeamEvent::MemberAdded { .. } => "member_added",
            TeamEvent::MemberRemoved { .. } => "member_removed",
            TeamEvent::ManagerChanged { .. } => "manager_changed",
            TeamEvent::TeamMatured { .. } => "team_matured",
            TeamEvent::TeamArchived { .. } => "team_archived",
            TeamEvent::ProjectDatesChanged { .. } => "project_dates_changed",
        }
    }

    /// Identifier of the team the event belongs to.
    pub fn team_id(&self) -> TeamId {
        match self {
            TeamEvent::TeamCreated { team_id, .. } => *team_id,
            TeamEvent::MemberAdded { team_id, .. } => *team_id,
            TeamEvent::MemberRemoved { team_id, .. } => *team_id,
            TeamEvent::ManagerChanged { team_id, .. } => *team_id,
            TeamEvent::TeamMatured { team_id, .. } => *team_id,
            TeamEvent::TeamArchived { team_id, .. } => *team_id,
            TeamEvent::ProjectDatesChanged { team_id, .. } => *team_id,
        }
    }
}
