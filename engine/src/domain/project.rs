// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Project association nested under the team aggregate.
//!
//! A team carries at most one association holding up to three project
//! details, each with its own Active/Suspended state and date range. The
//! association derives an assignment state for the owning team and can move
//! the team's expiration when attached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::DomainError;
use super::team::MemberId;

/// State of a single project detail as reported by the projects service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailState {
    Active,
    Suspended,
}

/// Assignment state the owning team derives from its association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectAssignmentState {
    /// No project association at all.
    Unassigned,
    /// At least one detail, none suspended, not under review, not expired.
    Assigned,
    /// One or more details are suspended.
    Suspended,
    /// The association is being evaluated for reassignment.
    UnderReview,
    /// Every detail's end date has passed; the team came out of review
    /// without a project.
    UnassignedAfterReview,
}

/// One project attached to the team, with its own lifetime window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDetail {
    pub detail_id: Uuid,
    pub project_name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub state: DetailState,
}

impl ProjectDetail {
    pub fn new(
        project_name: impl Into<String>,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        state: DetailState,
    ) -> Self {
        Self {
            detail_id: Uuid::new_v4(),
            project_name: project_name.into(),
            start_date,
            end_date,
            state,
        }
    }
}

/// Maximum number of project details a team may be associated with.
pub const MAX_PROJECT_DETAILS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectAssociation {
    pub project_id: Uuid,
    pub manager_id: MemberId,
    pub team_name: String,
    details: Vec<ProjectDetail>,
    under_review: bool,
}

impl ProjectAssociation {
    pub fn new(
        manager_id: MemberId,
        team_name: impl Into<String>,
        details: Vec<ProjectDetail>,
    ) -> Self {
        Self {
            project_id: Uuid::new_v4(),
            manager_id,
            team_name: team_name.into(),
            details,
            under_review: false,
        }
    }

    pub fn details(&self) -> &[ProjectDetail] {
        &self.details
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    pub fn has_active_project(&self) -> bool {
        self.details.iter().any(|d| d.state == DetailState::Active)
    }

    pub fn has_suspended_project(&self) -> bool {
        self.details
            .iter()
            .any(|d| d.state == DetailState::Suspended)
    }

    /// True when every detail's end date has passed. Vacuously true for an
    /// association whose details were all purged.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.details.iter().all(|d| d.end_date <= now)
    }

    /// True when at least one detail's end date has passed. The project
    /// sweep uses this to pick teams due for a purge.
    pub fn has_expired_detail(&self, now: DateTime<Utc>) -> bool {
        self.details.iter().any(|d| d.end_date <= now)
    }

    pub fn is_under_review(&self) -> bool {
        self.under_review
    }

    pub fn set_under_review(&mut self, under_review: bool) {
        self.under_review = under_review;
    }

    /// Start date of the leading detail.
    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.details.first().map(|d| d.start_date)
    }

    /// Derivation rule for the team's project assignment state.
    pub fn assignment_state(&self, now: DateTime<Utc>) -> ProjectAssignmentState {
        if self.has_suspended_project() {
            return ProjectAssignmentState::Suspended;
        }
        if self.under_review {
            return ProjectAssignmentState::UnderReview;
        }
        if self.is_expired(now) {
            return ProjectAssignmentState::UnassignedAfterReview;
        }
        ProjectAssignmentState::Assigned
    }

    pub fn add_detail(&mut self, detail: ProjectDetail) -> Result<(), DomainError> {
        if self.details.len() >= MAX_PROJECT_DETAILS {
            return Err(DomainError::invariant(
                "A team cannot be associated with more than 3 projects.",
            ));
        }
        self.details.push(detail);
        Ok(())
    }

    pub fn remove_detail(&mut self, detail_id: Uuid) -> Result<(), DomainError> {
        let position = self
            .details
            .iter()
            .position(|d| d.detail_id == detail_id)
            .ok_or_else(|| DomainError::NotFound("project detail".to_string()))?;
        self.details.remove(position);
        Ok(())
    }

    /// Move the named Active detail to Suspended, then purge every suspended
    /// detail (including the one just suspended). Aggressive on purpose: a
    /// suspension request is treated as the detail leaving the association
    /// once processed.
    pub fn suspend(&mut self, project_name: &str) {
        if let Some(detail) = self
            .details
            .iter_mut()
            .find(|d| d.state == DetailState::Active && d.project_name == project_name)
        {
            detail.state = DetailState::Suspended;
        }
        self.details.retain(|d| d.state != DetailState::Suspended);
    }

    /// Purge all details whose end date has passed, regardless of state.
    pub fn remove_expired(&mut self, now: DateTime<Utc>) {
        self.details.retain(|d| d.end_date > now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn detail(name: &str, offset_secs: i64, length_secs: i64, state: DetailState) -> ProjectDetail {
        let start = Utc::now() + Duration::seconds(offset_secs);
        ProjectDetail::new(name, start, start + Duration::seconds(length_secs), state)
    }

    fn association(details: Vec<ProjectDetail>) -> ProjectAssociation {
        ProjectAssociation::new(MemberId::new(), "Platform Crew", details)
    }

    #[test]
    fn predicates_reflect_detail_states() {
        let assoc = association(vec![
            detail("alpha", 0, 400, DetailState::Active),
            detail("beta", 0, 400, DetailState::Suspended),
        ]);

        assert!(assoc.has_active_project());
        assert!(assoc.has_suspended_project());
        assert!(!assoc.is_empty());
        assert!(!assoc.is_expired(Utc::now()));
        assert!(!assoc.has_expired_detail(Utc::now()));
    }

    #[test]
    fn expired_when_every_end_date_has_passed() {
        let now = Utc::now();
        let assoc = association(vec![
            detail("alpha", -500, 100, DetailState::Active),
            detail("beta", -500, 200, DetailState::Active),
        ]);

        assert!(assoc.is_expired(now));
    }

    #[test]
    fn not_expired_while_one_detail_is_current() {
        let now = Utc::now();
        let assoc = association(vec![
            detail("alpha", -500, 100, DetailState::Active),
            detail("beta", 0, 400, DetailState::Active),
        ]);

        assert!(!assoc.is_expired(now));
        assert!(assoc.has_expired_detail(now));
    }

    #[test]
    fn suspend_removes_named_and_already_suspended_details() {
        let mut assoc = association(vec![
            detail("alpha", 0, 400, DetailState::Active),
            detail("beta", 0, 400, DetailState::Suspended),
            detail("gamma", 0, 400, DetailState::Active),
        ]);

        assoc.suspend("alpha");

        let remaining: Vec<_> = assoc
            .details()
            .iter()
            .map(|d| d.project_name.as_str())
            .collect();
        assert_eq!(remaining, vec!["gamma"]);
    }

    #[test]
    fn suspend_with_unknown_name_still_purges_suspended() {
        let mut assoc = association(vec![
            detail("alpha", 0, 400, DetailState::Active),
            detail("beta", 0, 400, DetailState::Suspended),
        ]);

        assoc.suspend("nope");

        assert_eq!(assoc.details().len(), 1);
        assert_eq!(assoc.details()[0].project_name, "alpha");
    }

    #[test]
    fn remove_expired_purges_past_details_regardless_of_state() {
        let now = Utc::now();
        let mut assoc = association(vec![
            detail("alpha", -500, 100, DetailState::Suspended),
            detail("beta", -500, 100, DetailState::Active),
            detail("gamma", 0, 400, DetailState::Active),
        ]);

        assoc.remove_expired(now);

        assert_eq!(assoc.details().len(), 1);
        assert_eq!(assoc.details()[0].project_name, "gamma");
    }

    #[test]
    fn add_detail_enforces_cap() {
        let mut assoc = association(vec![
            detail("a", 0, 400, DetailState::Active),
            detail("b", 0, 400, DetailState::Active),
            detail("c", 0, 400, DetailState::Active),
        ]);

        let err = assoc
            .add_detail(detail("d", 0, 400, DetailState::Active))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn assignment_state_precedence() {
        let now = Utc::now();

        let suspended = association(vec![
            detail("alpha", 0, 400, DetailState::Active),
            detail("beta", 0, 400, DetailState::Suspended),
        ]);
        assert_eq!(
            suspended.assignment_state(now),
            ProjectAssignmentState::Suspended
        );

        let mut reviewed = association(vec![detail("alpha", 0, 400, DetailState::Active)]);
        reviewed.set_under_review(true);
        assert_eq!(
            reviewed.assignment_state(now),
            ProjectAssignmentState::UnderReview
        );

        let expired = association(vec![detail("alpha", -500, 100, DetailState::Active)]);
        assert_eq!(
            expired.assignment_state(now),
            ProjectAssignmentState::UnassignedAfterReview
        );

        let assigned = association(vec![detail("alpha", 0, 400, DetailState::Active)]);
        assert_eq!(
            assigned.assignment_state(now),
            ProjectAssignmentState::Assigned
        );
    }
}
