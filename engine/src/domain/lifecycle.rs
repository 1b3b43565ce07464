// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Stateless lifecycle domain service.
//!
//! Operates over snapshot collections of teams: partitions them by time,
//! computes the next future maturity/expiration instants the scheduler arms
//! itself with, applies archiving, and runs the collection-level guards that
//! must pass before the aggregate factory.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::clock::Clock;
use super::error::DomainError;
use super::policy::LifecyclePolicy;
use super::team::{MemberId, Team, TeamState};

/// Window (seconds) used by the nearing-expiration / nearing-maturity census
/// queries.
const NEARING_WINDOW_SECS: i64 = 15;

/// A manager may run at most this many teams concurrently.
const MAX_TEAMS_PER_MANAGER: usize = 3;

/// Maximum tolerated member overlap (percent) with any existing team.
const MAX_COMMON_MEMBERS_PERCENT: f64 = 50.0;

pub struct LifecycleService {
    clock: Arc<dyn Clock>,
    policy: LifecyclePolicy,
}

impl LifecycleService {
    pub fn new(clock: Arc<dyn Clock>, policy: LifecyclePolicy) -> Self {
        Self { clock, policy }
    }

    pub fn policy(&self) -> &LifecyclePolicy {
        &self.policy
    }

    /// Teams past their expiration date and not yet archived.
    pub fn expired_teams(&self, teams: &[Team]) -> Vec<Team> {
        let now = self.clock.now();
        teams
            .iter()
            .filter(|t| t.is_expired(now))
            .cloned()
            .collect()
    }

    /// Teams whose elapsed age crossed the maturity threshold. Filters on
    /// elapsed time only; callers narrow by state as needed.
    pub fn mature_teams(&self, teams: &[Team]) -> Vec<Team> {
        let now = self.clock.now();
        teams
            .iter()
            .filter(|t| now - t.creation_date() >= self.policy.maturity_threshold)
            .cloned()
            .collect()
    }

    /// Future maturity instants across the snapshot.
    pub fn future_maturities(&self, teams: &[Team]) -> Vec<DateTime<Utc>> {
        let now = self.clock.now();
        teams
            .iter()
            .map(|t| t.creation_date() + self.policy.maturity_threshold)
            .filter(|instant| *instant > now)
            .collect()
    }

    /// Future expiration instants across the snapshot.
    pub fn future_expirations(&self, teams: &[Team]) -> Vec<DateTime<Utc>> {
        let now = self.clock.now();
        teams
            .iter()
            .map(|t| t.expiration_date())
            .filter(|instant| *instant > now)
            .collect()
    }

    /// Future project-detail end instants across the snapshot.
    pub fn future_project_expirations(&self, teams: &[Team]) -> Vec<DateTime<Utc>> {
        let now = self.clock.now();
        teams
            .iter()
            .filter_map(|t| t.project())
            .flat_map(|p| p.details().iter().map(|d| d.end_date))
            .filter(|instant| *instant > now)
            .collect()
    }

    /// Teams whose attached project carries at least one detail past its end
    /// date, due for a purge.
    pub fn teams_with_expired_projects(&self, teams: &[Team]) -> Vec<Team> {
        let now = self.clock.now();
        teams
            .iter()
            .filter(|t| t.project().is_some_and(|p| p.has_expired_detail(now)))
            .cloned()
            .collect()
    }

    /// Earliest upcoming maturity, expiration, or project-detail end
    /// instant, if any. This is the single wake instant a combined scheduler
    /// arms itself with.
    pub fn next_lifecycle_instant(&self, teams: &[Team]) -> Option<DateTime<Utc>> {
        self.future_maturities(teams)
            .into_iter()
            .chain(self.future_expirations(teams))
            .chain(self.future_project_expirations(teams))
            .min()
    }

    /// Archive every team in the slice. Callers filter to expired teams
    /// first; a non-expired team here is a programming error and fails
    /// loudly instead of being skipped.
    pub fn archive_teams(&self, teams: &mut [Team]) -> Result<(), DomainError> {
        let now = self.clock.now();
        for team in teams.iter_mut() {
            team.archive(now)?;
            debug!(team = %team.name(), "team archived");
        }
        Ok(())
    }

    /// Record maturity on every Active team in the slice. Returns how many
    /// teams newly crossed the threshold.
    pub fn mark_mature_teams(&self, teams: &mut [Team]) -> Result<usize, DomainError> {
        let now = self.clock.now();
        let mut marked = 0;
        for team in teams
            .iter_mut()
            .filter(|t| t.state() == TeamState::Active)
        {
            if team.record_maturity(now, &self.policy)? {
                marked += 1;
            }
        }
        Ok(marked)
    }

    pub fn count_mature_teams(&self, teams: &[Team]) -> usize {
        let now = self.clock.now();
        teams
            .iter()
            .filter(|t| now - t.creation_date() >= self.policy.maturity_threshold)
            .count()
    }

    pub fn count_expired_teams(&self, teams: &[Team]) -> usize {
        let now = self.clock.now();
        teams.iter().filter(|t| t.is_expired(now)).count()
    }

    pub fn count_active_teams(&self, teams: &[Team]) -> usize {
        let now = self.clock.now();
        teams.iter().filter(|t| !t.is_expired(now)).count()
    }

    pub fn count_archived_teams(&self, teams: &[Team]) -> usize {
        teams
            .iter()
            .filter(|t| t.state() == TeamState::Archived)
            .count()
    }

    /// Teams whose expiration falls inside the warning window.
    pub fn teams_nearing_expiration(&self, teams: &[Team]) -> usize {
        let now = self.clock.now();
        teams
            .iter()
            .filter(|t| {
                let remaining = t.expiration_date() - now;
                remaining > Duration::zero() && remaining <= Duration::seconds(NEARING_WINDOW_SECS)
            })
            .count()
    }

    /// Teams whose maturity instant falls inside the warning window.
    pub fn teams_nearing_maturity(&self, teams: &[Team]) -> usize {
        let now = self.clock.now();
        teams
            .iter()
            .filter(|t| {
                let remaining = (t.creation_date() + self.policy.maturity_threshold) - now;
                remaining > Duration::zero() && remaining <= Duration::seconds(NEARING_WINDOW_SECS)
            })
            .count()
    }

    /// Collection-level guards that must pass before the aggregate factory:
    /// unique name, manager capacity, no identical team, bounded member
    /// overlap.
    pub fn ensure_can_create(
        &self,
        name: &str,
        manager_id: MemberId,
        member_ids: &[MemberId],
        existing: &[Team],
    ) -> Result<(), DomainError> {
        if member_ids.is_empty() {
            return Err(DomainError::invariant(
                "A team must have at least 3 members including team manager.",
            ));
        }
        if existing.iter().any(|t| t.name().eq_ignore_case(name)) {
            return Err(DomainError::conflict(format!(
                "A team with the name '{}' already exists.",
                name.trim()
            )));
        }
        if existing
            .iter()
            .filter(|t| t.manager_id() == manager_id)
            .count()
            > MAX_TEAMS_PER_MANAGER
        {
            return Err(DomainError::conflict(
                "A manager cannot manage more than 3 teams.",
            ));
        }

        let new_members: HashSet<MemberId> = member_ids.iter().copied().collect();
        if existing
            .iter()
            .any(|t| t.manager_id() == manager_id && *t.members() == new_members)
        {
            return Err(DomainError::conflict(
                "A team with exactly the same members and manager already exists.",
            ));
        }
        if Self::max_common_members_percent(&new_members, existing) >= MAX_COMMON_MEMBERS_PERCENT {
            return Err(DomainError::conflict(
                "Cannot create a team with more than 50% common members with existing team.",
            ));
        }
        Ok(())
    }

    /// Front door for team creation: collection guards, then the aggregate
    /// factory.
    pub fn create_team(
        &self,
        name: &str,
        manager_id: MemberId,
        member_ids: &[MemberId],
        existing: &[Team],
    ) -> Result<Team, DomainError> {
        self.ensure_can_create(name, manager_id, member_ids, existing)?;
        Team::create(
            name,
            manager_id,
            member_ids.iter().copied(),
            self.clock.now(),
            &self.policy,
        )
    }

    /// Highest member-overlap percentage (Jaccard) between the new member
    /// set and any existing team.
    fn max_common_members_percent(new_members: &HashSet<MemberId>, existing: &[Team]) -> f64 {
        existing
            .iter()
            .map(|team| {
                let common = team.members().intersection(new_members).count();
                let universe = team.members().union(new_members).count();
                if universe == 0 {
                    0.0
                } else {
                    common as f64 / universe as f64 * 100.0
                }
            })
            .fold(0.0, f64::max)
    }
}
