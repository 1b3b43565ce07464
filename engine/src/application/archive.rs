// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Export port for archived teams.
//!
//! After a team is archived and the batch committed, the scheduler hands a
//! snapshot to this collaborator for external durable storage (cache, export
//! feed). The engine's only obligation is the call itself.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Team, TeamId};

/// Snapshot of an archived team handed to the export collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedTeamRecord {
    pub team_id: TeamId,
    pub name: String,
    pub expired_on: DateTime<Utc>,
}

impl ArchivedTeamRecord {
    pub fn from_team(team: &Team) -> Self {
        Self {
            team_id: team.id(),
            name: team.name().as_str().to_string(),
            expired_on: team.expiration_date(),
        }
    }
}

#[async_trait]
pub trait ArchivedTeamStore: Send + Sync {
    async fn store(&self, record: ArchivedTeamRecord) -> Result<()>;
}
