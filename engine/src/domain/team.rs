// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Team aggregate root.
//!
//! The aggregate derives its own state from time and membership, enforces
//! invariants on every mutation (validate-then-apply, no partial mutation is
//! observable), and buffers domain events until the dispatch boundary drains
//! them. Time always enters as an explicit instant; callers read it from an
//! injected [`Clock`](super::clock::Clock).

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::DomainError;
use super::events::TeamEvent;
use super::policy::LifecyclePolicy;
use super::project::{ProjectAssignmentState, ProjectAssociation, MAX_PROJECT_DETAILS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamId(pub Uuid);

impl TeamId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TeamId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberId(pub Uuid);

impl MemberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for MemberId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\s\-']+$").expect("valid team name pattern"));

/// Validated team name: letters, spaces, hyphens and apostrophes only,
/// stored trimmed. Construction is the single validation point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamName(String);

impl TeamName {
    pub fn new(value: &str) -> Result<Self, DomainError> {
        let trimmed = value.trim();
        if trimmed.is_empty() || !NAME_PATTERN.is_match(trimmed) {
            return Err(DomainError::invariant(format!(
                "Team name [[{value}]] contains invalid characters."
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn eq_ignore_case(&self, other: &str) -> bool {
        self.0.to_lowercase() == other.trim().to_lowercase()
    }
}

impl std::fmt::Display for TeamName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Team state definitions:
/// Draft    : membership invariant unmet (fewer than 3 members or manager missing)
/// Active   : valid team (3..=10 members including the manager)
/// Archived : past expiration, explicitly archived; irreversible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamState {
    Draft,
    Active,
    Archived,
}

pub const MIN_MEMBERS: usize = 3;
pub const MAX_MEMBERS: usize = 10;

/// Project start dates must fall within this window after team creation.
const PROJECT_START_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    id: TeamId,
    name: TeamName,
    manager_id: MemberId,
    members: HashSet<MemberId>,
    state: TeamState,
    project_state: ProjectAssignmentState,
    project: Option<ProjectAssociation>,
    creation_date: DateTime<Utc>,
    expiration_date: DateTime<Utc>,
    last_activity_date: DateTime<Utc>,
    matured_on: Option<DateTime<Utc>>,
    #[serde(skip)]
    events: Vec<TeamEvent>,
}

impl Team {
    /// Factory enforcing the membership and name invariants. Collection-level
    /// uniqueness checks (name collision, manager capacity, member overlap)
    /// belong to the lifecycle domain service and run before this.
    pub fn create(
        name: &str,
        manager_id: MemberId,
        member_ids: impl IntoIterator<Item = MemberId>,
        now: DateTime<Utc>,
        policy: &LifecyclePolicy,
    ) -> Result<Self, DomainError> {
        let name = TeamName::new(name)?;
        let members: HashSet<MemberId> = member_ids.into_iter().collect();
        Self::validate_membership(&members, manager_id)?;

        let mut team = Self {
            id: TeamId::new(),
            name,
            manager_id,
            members,
            state: TeamState::Draft,
            project_state: ProjectAssignmentState::Unassigned,
            project: None,
            creation_date: now,
            expiration_date: now + policy.validity_period,
            last_activity_date: now,
            matured_on: None,
            events: Vec::new(),
        };
        team.recalculate_states(now);
        team.events.push(TeamEvent::TeamCreated {
            team_id: team.id,
            name: team.name.as_str().to_string(),
            occurred_at: now,
        });
        Ok(team)
    }

    pub fn id(&self) -> TeamId {
        self.id
    }

    pub fn name(&self) -> &TeamName {
        &self.name
    }

    pub fn manager_id(&self) -> MemberId {
        self.manager_id
    }

    pub fn members(&self) -> &HashSet<MemberId> {
        &self.members
    }

    pub fn state(&self) -> TeamState {
        self.state
    }

    pub fn project_state(&self) -> ProjectAssignmentState {
        self.project_state
    }

    pub fn project(&self) -> Option<&ProjectAssociation> {
        self.project.as_ref()
    }

    pub fn creation_date(&self) -> DateTime<Utc> {
        self.creation_date
    }

    pub fn expiration_date(&self) -> DateTime<Utc> {
        self.expiration_date
    }

    pub fn last_activity_date(&self) -> DateTime<Utc> {
        self.last_activity_date
    }

    pub fn matured_on(&self) -> Option<DateTime<Utc>> {
        self.matured_on
    }

    pub fn events(&self) -> &[TeamEvent] {
        &self.events
    }

    /// Drain the buffered events. The caller owns the returned list; the
    /// aggregate never clears its buffer on its own.
    pub fn take_events(&mut self) -> Vec<TeamEvent> {
        std::mem::take(&mut self.events)
    }

    /// Past the expiration date and not yet archived. Archived teams are
    /// excluded so the archive transition runs at most once.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration_date && self.state != TeamState::Archived
    }

    /// Only Active teams can be evaluated for maturity.
    pub fn is_mature(
        &self,
        now: DateTime<Utc>,
        policy: &LifecyclePolicy,
    ) -> Result<bool, DomainError> {
        if self.state != TeamState::Active {
            return Err(DomainError::invariant(
                "Only active teams can be evaluated for maturity.",
            ));
        }
        Ok(now - self.creation_date >= policy.maturity_threshold)
    }

    /// Record that the team crossed its maturity threshold. Emits the
    /// maturity event exactly once; later calls are no-ops returning false.
    pub fn record_maturity(
        &mut self,
        now: DateTime<Utc>,
        policy: &LifecyclePolicy,
    ) -> Result<bool, DomainError> {
        if !self.is_mature(now, policy)? {
            return Ok(false);
        }
        if self.matured_on.is_some() {
            return Ok(false);
        }
        self.matured_on = Some(now);
        self.last_activity_date = now;
        self.events.push(TeamEvent::TeamMatured {
            team_id: self.id,
            occurred_at: now,
        });
        Ok(true)
    }

    /// Archive a team that exceeded its validity period. Irreversible.
    pub fn archive(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.is_expired(now) {
            return Err(DomainError::invariant(
                "Team has not yet exceeded the validity period.",
            ));
        }
        self.state = TeamState::Archived;
        self.last_activity_date = now;
        self.events.push(TeamEvent::TeamArchived {
            team_id: self.id,
            name: self.name.as_str().to_string(),
            expired_on: self.expiration_date,
            occurred_at: now,
        });
        Ok(())
    }

    /// Replace name, manager and members in one step. Rejected on expired
    /// teams and when nothing actually changes.
    pub fn update_team(
        &mut self,
        new_name: &str,
        new_manager_id: MemberId,
        new_member_ids: impl IntoIterator<Item = MemberId>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.is_expired(now) {
            return Err(DomainError::invariant("Cannot update an expired team."));
        }
        let name = TeamName::new(new_name)?;
        let members: HashSet<MemberId> = new_member_ids.into_iter().collect();

        let same_name = self.name == name;
        let same_members = self.members == members;
        let same_manager = self.manager_id == new_manager_id;
        if same_name && same_members && same_manager {
            return Err(DomainError::invariant(
                "No changes detected in the team details.",
            ));
        }

        Self::validate_membership(&members, new_manager_id)?;
        self.name = name;
        self.manager_id = new_manager_id;
        self.members = members;
        self.last_activity_date = now;
        self.recalculate_states(now);
        Ok(())
    }

    pub fn add_member(&mut self, member_id: MemberId, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.members.contains(&member_id) {
            return Err(DomainError::invariant("Member already exists in the team."));
        }
        if self.members.len() >= MAX_MEMBERS {
            return Err(DomainError::invariant(
                "A team cannot have more than 10 members.",
            ));
        }
        self.members.insert(member_id);
        self.last_activity_date = now;
        self.events.push(TeamEvent::MemberAdded {
            team_id: self.id,
            member_id,
            occurred_at: now,
        });
        self.recalculate_states(now);
        Ok(())
    }

    pub fn remove_member(
        &mut self,
        member_id: MemberId,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if member_id == self.manager_id {
            return Err(DomainError::invariant(
                "Cannot remove the team manager from the team.",
            ));
        }
        if !self.members.contains(&member_id) {
            return Err(DomainError::invariant("Member not found in the team."));
        }
        if self.members.len() <= MIN_MEMBERS {
            return Err(DomainError::invariant(
                "A team cannot have fewer than 3 members.",
            ));
        }
        self.members.remove(&member_id);
        self.last_activity_date = now;
        self.events.push(TeamEvent::MemberRemoved {
            team_id: self.id,
            member_id,
            occurred_at: now,
        });
        self.recalculate_states(now);
        Ok(())
    }

    /// Hand management to another existing member. No invariant re-check is
    /// needed since the new manager is already a member.
    pub fn change_manager(
        &mut self,
        new_manager_id: MemberId,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if new_manager_id.is_nil() {
            return Err(DomainError::invariant(
                "New team manager ID cannot be empty.",
            ));
        }
        if !self.members.contains(&new_manager_id) {
            return Err(DomainError::invariant(
                "New team manager must be a member of the team.",
            ));
        }
        self.manager_id = new_manager_id;
        self.last_activity_date = now;
        self.events.push(TeamEvent::ManagerChanged {
            team_id: self.id,
            manager_id: new_manager_id,
            occurred_at: now,
        });
        self.recalculate_states(now);
        Ok(())
    }

    /// Attach a project association, extending the team's expiration by the
    /// configured grace amount.
    ///
    /// The grace accumulates on every attachment and is never reset, even
    /// when the incoming project is already near or past its own end. A
    /// re-attachment after a prior expiry therefore moves the recorded
    /// expiration further out; that is the current contract.
    pub fn assign_project(
        &mut self,
        project: ProjectAssociation,
        now: DateTime<Utc>,
        policy: &LifecyclePolicy,
    ) -> Result<(), DomainError> {
        if project.is_empty() {
            return Err(DomainError::invariant(
                "Project association data cannot be null",
            ));
        }
        if !project.has_active_project() {
            return Err(DomainError::invariant(
                "Project must be active to be associated with a team.",
            ));
        }
        if !self.name.eq_ignore_case(&project.team_name) {
            return Err(DomainError::invariant(format!(
                "Project associated with team {} does not match current team {}.",
                project.team_name, self.name
            )));
        }
        if project.manager_id != self.manager_id {
            return Err(DomainError::invariant(format!(
                "Project manager {:?} does not match current team manager {:?}.",
                project.manager_id, self.manager_id
            )));
        }
        let Some(start_date) = project.start_date() else {
            return Err(DomainError::invariant(
                "Project association data cannot be null",
            ));
        };
        if start_date < self.creation_date {
            return Err(DomainError::invariant(format!(
                "Project start date {} cannot be earlier than team creation date {}",
                start_date, self.creation_date
            )));
        }
        if project.details().len() > MAX_PROJECT_DETAILS {
            return Err(DomainError::invariant(
                "A team cannot be associated with more than 3 projects.",
            ));
        }
        if start_date - self.creation_date > Duration::days(PROJECT_START_WINDOW_DAYS) {
            return Err(DomainError::invariant(format!(
                "Project start date {} must be within 7 days of team creation date {}.",
                start_date, self.creation_date
            )));
        }

        self.project = Some(project);
        self.expiration_date += policy.project_grace;
        self.last_activity_date = now;
        self.recalculate_states(now);
        self.events.push(TeamEvent::ProjectDatesChanged {
            team_id: self.id,
            occurred_at: now,
        });
        Ok(())
    }

    /// Purge attached project details whose end date has passed.
    pub fn remove_expired_projects(&mut self, now: DateTime<Utc>) {
        let Some(project) = self.project.as_mut() else {
            return;
        };
        project.remove_expired(now);
        self.last_activity_date = now;
        self.events.push(TeamEvent::ProjectDatesChanged {
            team_id: self.id,
            occurred_at: now,
        });
        self.recalculate_states(now);
    }

    /// Suspend the named project detail and purge processed suspensions.
    pub fn remove_suspended_projects(&mut self, project_name: &str, now: DateTime<Utc>) {
        let Some(project) = self.project.as_mut() else {
            return;
        };
        project.suspend(project_name);
        self.last_activity_date = now;
        self.events.push(TeamEvent::ProjectDatesChanged {
            team_id: self.id,
            occurred_at: now,
        });
        self.recalculate_states(now);
    }

    /// True while the attached project still has active or suspended details.
    pub fn has_dependencies(&self) -> bool {
        self.project.as_ref().is_some_and(|p| {
            !p.is_empty() && (p.has_active_project() || p.has_suspended_project())
        })
    }

    /// Guard invoked before any delete / mark-deleted operation.
    pub fn ensure_deletable(&self) -> Result<(), DomainError> {
        if self.has_dependencies() {
            return Err(DomainError::conflict(
                "Team has active or suspended project dependencies and cannot be deleted.",
            ));
        }
        Ok(())
    }

    /// Recompute the derived team and project states. Called after every
    /// successful mutation. Archived is terminal.
    pub fn recalculate_states(&mut self, now: DateTime<Utc>) {
        self.state = self.computed_state(now);
        self.project_state = match &self.project {
            Some(project) => project.assignment_state(now),
            None => ProjectAssignmentState::Unassigned,
        };
    }

    fn computed_state(&self, now: DateTime<Utc>) -> TeamState {
        if self.state == TeamState::Archived {
            return TeamState::Archived;
        }
        if self.members.len() < MIN_MEMBERS || !self.members.contains(&self.manager_id) {
            return TeamState::Draft;
        }
        if self.is_expired(now) {
            return TeamState::Archived;
        }
        TeamState::Active
    }

    fn validate_membership(
        members: &HashSet<MemberId>,
        manager_id: MemberId,
    ) -> Result<(), DomainError> {
        if members.len() < MIN_MEMBERS {
            return Err(DomainError::invariant(
                "A team must have at least 3 members including team manager.",
            ));
        }
        if members.len() > MAX_MEMBERS {
            return Err(DomainError::invariant(
                "A team cannot have more than 10 members.",
            ));
        }
        if !members.contains(&manager_id) {
            return Err(DomainError::invariant(
                "The manager must be one of the team members.",
            ));
        }
        Ok(())
    }
}
