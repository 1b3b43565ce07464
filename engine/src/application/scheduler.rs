// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Lifecycle scheduler - background task driving maturity and expiration.
//!
//! There is no polling tick: a single owner task computes the exact instant
//! of the next maturity, expiration, or project-detail end across the whole
//! snapshot, sleeps until it, processes the due teams transactionally, and
//! re-arms itself.
//! With no upcoming instant the task sits idle until an external
//! [`reschedule`](LifecycleScheduler::reschedule) preempts the wait.
//!
//! All scheduling state lives inside the loop, so there is no shared timer
//! handle and no lock; "reschedule now" is a channel send. A failed check is
//! logged and the loop re-arms regardless, so a single bad cycle never
//! permanently stalls the engine.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::archive::{ArchivedTeamRecord, ArchivedTeamStore};
use crate::application::dispatcher::EventDispatcher;
use crate::domain::{Clock, LifecyclePolicy, LifecycleService, Team, TeamRepository, TeamState};

/// Which lifecycle passes a scheduler instance runs and which instants feed
/// its wake computation. `Combined` is the production default; the split
/// variants exist for deployments that separate the concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleConcern {
    Maturity,
    Expiration,
    /// Purging of project details past their end date.
    ProjectExpiry,
    Combined,
}

impl LifecycleConcern {
    pub fn handles_maturity(&self) -> bool {
        matches!(self, Self::Maturity | Self::Combined)
    }

    pub fn handles_expiration(&self) -> bool {
        matches!(self, Self::Expiration | Self::Combined)
    }

    pub fn handles_projects(&self) -> bool {
        matches!(self, Self::ProjectExpiry | Self::Combined)
    }

    /// Earliest upcoming instant relevant to this concern, if any.
    pub fn next_wake(&self, service: &LifecycleService, teams: &[Team]) -> Option<DateTime<Utc>> {
        let maturities = || service.future_maturities(teams).into_iter().min();
        let expirations = || service.future_expirations(teams).into_iter().min();
        let projects = || service.future_project_expirations(teams).into_iter().min();
        match self {
            Self::Maturity => maturities(),
            Self::Expiration => expirations(),
            Self::ProjectExpiry => projects(),
            Self::Combined => [maturities(), expirations(), projects()]
                .into_iter()
                .flatten()
                .min(),
        }
    }
}

pub struct LifecycleScheduler {
    repository: Arc<dyn TeamRepository>,
    dispatcher: Arc<dyn EventDispatcher>,
    archive_store: Arc<dyn ArchivedTeamStore>,
    clock: Arc<dyn Clock>,
    service: LifecycleService,
    concern: LifecycleConcern,
    reschedule_tx: mpsc::Sender<()>,
    reschedule_rx: Mutex<Option<mpsc::Receiver<()>>>,
    shutdown: CancellationToken,
}

impl LifecycleScheduler {
    pub fn new(
        repository: Arc<dyn TeamRepository>,
        dispatcher: Arc<dyn EventDispatcher>,
        archive_store: Arc<dyn ArchivedTeamStore>,
        clock: Arc<dyn Clock>,
        policy: LifecyclePolicy,
        concern: LifecycleConcern,
    ) -> Self {
        // Capacity 1: a pending trigger already guarantees a re-arm.
        let (reschedule_tx, reschedule_rx) = mpsc::channel(1);
        Self {
            repository,
            dispatcher,
            archive_store,
            service: LifecycleService::new(clock.clone(), policy),
            clock,
            concern,
            reschedule_tx,
            reschedule_rx: Mutex::new(Some(reschedule_rx)),
            shutdown: CancellationToken::new(),
        }
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancel the pending wait and recompute the next wake instant now.
    /// Safe to call from any task, including concurrently with a running
    /// check; an in-flight check is never interrupted.
    pub fn reschedule(&self) {
        if self.reschedule_tx.try_send(()).is_err() {
            // Either a trigger is already pending or the loop has stopped.
            debug!("reschedule trigger already pending");
        }
    }

    /// Disable the scheduler. The pending wait is cancelled; an in-flight
    /// check runs to completion.
    pub fn stop(&self) {
        info!("lifecycle scheduler stopping");
        self.shutdown.cancel();
    }

    /// Start the scheduling loop. Returns the task handle.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let scheduler = self;
        tokio::spawn(async move {
            let receiver = scheduler.reschedule_rx.lock().await.take();
            match receiver {
                Some(rx) => scheduler.run(rx).await,
                None => warn!("lifecycle scheduler already started"),
            }
        })
    }

    async fn run(&self, mut reschedule_rx: mpsc::Receiver<()>) {
        info!(concern = ?self.concern, "lifecycle scheduler started");

        loop {
            let wake_at = match self.repository.get_all().await {
                Ok(teams) => self.concern.next_wake(&self.service, &teams),
                Err(e) => {
                    warn!(error = %e, "failed to load teams while scheduling; idle until reschedule");
                    None
                }
            };
            match wake_at {
                Some(at) => debug!(wake_at = %at, "next lifecycle check scheduled"),
                None => debug!("no upcoming maturities or expirations; scheduler idle"),
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                trigger = reschedule_rx.recv() => {
                    if trigger.is_none() {
                        break;
                    }
                    debug!("reschedule requested");
                }
                _ = Self::sleep_until(self.clock.now(), wake_at), if wake_at.is_some() => {
                    // Re-arming happens on the next loop iteration whether or
                    // not the check succeeded.
                    if let Err(e) = self.check().await {
                        warn!(error = %e, "lifecycle check failed; re-arming");
                    }
                }
            }
        }

        info!("lifecycle scheduler stopped");
    }

    async fn sleep_until(now: DateTime<Utc>, wake_at: Option<DateTime<Utc>>) {
        let Some(at) = wake_at else {
            return;
        };
        // Instants already in the past fire immediately.
        let delay = (at - now).to_std().unwrap_or(std::time::Duration::ZERO);
        tokio::time::sleep(delay).await;
    }

    /// Execute one check cycle: maturity pass, project-expiry pass, then
    /// expiration pass, each persisting and committing mutated aggregates
    /// before dispatching their events. Each pass reloads the snapshot so a
    /// later pass never overwrites what an earlier one persisted.
    pub async fn check(&self) -> Result<()> {
        debug!("running lifecycle check");

        if self.concern.handles_maturity() {
            let teams = self.repository.get_all().await?;
            self.maturity_pass(&teams).await?;
        }
        if self.concern.handles_projects() {
            let teams = self.repository.get_all().await?;
            self.project_pass(&teams).await?;
        }
        if self.concern.handles_expiration() {
            let teams = self.repository.get_all().await?;
            self.expiration_pass(&teams).await?;
        }
        Ok(())
    }

    async fn maturity_pass(&self, teams: &[Team]) -> Result<()> {
        let mut mature = self.service.mature_teams(teams);
        mature.retain(|t| t.state() == TeamState::Active);
        let marked = self.service.mark_mature_teams(&mut mature)?;
        if marked == 0 {
            return Ok(());
        }

        let mut touched: Vec<Team> = mature
            .into_iter()
            .filter(|t| !t.events().is_empty())
            .collect();
        for team in &touched {
            self.repository.update(team).await?;
        }
        self.repository.commit().await?;
        for team in &mut touched {
            let events = team.take_events();
            self.dispatcher.dispatch(&events).await?;
        }
        info!(count = marked, "teams crossed the maturity threshold");
        Ok(())
    }

    async fn project_pass(&self, teams: &[Team]) -> Result<()> {
        let mut due = self.service.teams_with_expired_projects(teams);
        if due.is_empty() {
            return Ok(());
        }

        let now = self.clock.now();
        for team in due.iter_mut() {
            team.remove_expired_projects(now);
        }
        for team in &due {
            self.repository.update(team).await?;
        }
        self.repository.commit().await?;
        for team in &mut due {
            let events = team.take_events();
            self.dispatcher.dispatch(&events).await?;
        }
        info!(count = due.len(), "expired project details purged");
        Ok(())
    }

    async fn expiration_pass(&self, teams: &[Team]) -> Result<()> {
        let mut expired = self.service.expired_teams(teams);
        if expired.is_empty() {
            return Ok(());
        }

        self.service.archive_teams(&mut expired)?;
        for team in &expired {
            self.repository.update(team).await?;
        }
        self.repository.commit().await?;
        for team in &mut expired {
            info!(team = %team.name(), "exporting archived team snapshot");
            self.archive_store
                .store(ArchivedTeamRecord::from_team(team))
                .await?;
            let events = team.take_events();
            self.dispatcher.dispatch(&events).await?;
        }
        info!(count = expired.len(), "expired teams archived");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        DetailState, MemberId, MockClock, ProjectAssociation, ProjectDetail, TeamEvent,
    };
    use crate::infrastructure::{InMemoryArchivedTeamStore, InMemoryTeamRepository};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::Mutex as StdMutex;

    struct RecordingDispatcher {
        events: StdMutex<Vec<TeamEvent>>,
        fail: bool,
    }

    impl RecordingDispatcher {
        fn new() -> Self {
            Self {
                events: StdMutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                events: StdMutex::new(Vec::new()),
                fail: true,
            }
        }

        fn event_types(&self) -> Vec<&'static str> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|e| e.event_type())
                .collect()
        }
    }

    #[async_trait]
    impl EventDispatcher for RecordingDispatcher {
        async fn dispatch(&self, events: &[TeamEvent]) -> Result<()> {
            if self.fail {
                return Err(anyhow::anyhow!("dispatch failed"));
            }
            self.events.lock().unwrap().extend_from_slice(events);
            Ok(())
        }
    }

    struct Fixture {
        scheduler: Arc<LifecycleScheduler>,
        repository: Arc<InMemoryTeamRepository>,
        dispatcher: Arc<RecordingDispatcher>,
        archive_store: Arc<InMemoryArchivedTeamStore>,
        clock: Arc<MockClock>,
        service: LifecycleService,
    }

    fn fixture_with(concern: LifecycleConcern, dispatcher: RecordingDispatcher) -> Fixture {
        let clock = Arc::new(MockClock::new(Utc::now()));
        let repository = Arc::new(InMemoryTeamRepository::new());
        let dispatcher = Arc::new(dispatcher);
        let archive_store = Arc::new(InMemoryArchivedTeamStore::new());
        let policy = LifecyclePolicy::default();
        let scheduler = Arc::new(LifecycleScheduler::new(
            repository.clone(),
            dispatcher.clone(),
            archive_store.clone(),
            clock.clone(),
            policy.clone(),
            concern,
        ));
        let service = LifecycleService::new(clock.clone(), policy);
        Fixture {
            scheduler,
            repository,
            dispatcher,
            archive_store,
            clock,
            service,
        }
    }

    fn fixture(concern: LifecycleConcern) -> Fixture {
        fixture_with(concern, RecordingDispatcher::new())
    }

    async fn seed_team(fixture: &Fixture, name: &str) -> Team {
        let manager = MemberId::new();
        let members = vec![manager, MemberId::new(), MemberId::new()];
        let existing = fixture.repository.get_all().await.unwrap();
        let mut team = fixture
            .service
            .create_team(name, manager, &members, &existing)
            .unwrap();
        team.take_events();
        fixture.repository.save(&team).await.unwrap();
        team
    }

    #[tokio::test]
    async fn next_wake_is_minimum_of_future_instants() {
        let f = fixture(LifecycleConcern::Combined);
        let team = seed_team(&f, "Platform Crew").await;
        let teams = vec![team.clone()];
        let t0 = team.creation_date();

        // Maturity (T0+30) before expiration (T0+250).
        assert_eq!(
            LifecycleConcern::Combined.next_wake(&f.service, &teams),
            Some(t0 + Duration::seconds(30))
        );
        assert_eq!(
            LifecycleConcern::Expiration.next_wake(&f.service, &teams),
            Some(t0 + Duration::seconds(250))
        );

        // After the maturity cycle the expiration is next.
        f.clock.set(t0 + Duration::seconds(31));
        assert_eq!(
            LifecycleConcern::Combined.next_wake(&f.service, &teams),
            Some(t0 + Duration::seconds(250))
        );

        // Nothing upcoming: the scheduler has no instant to arm for.
        f.clock.set(t0 + Duration::seconds(300));
        assert_eq!(LifecycleConcern::Combined.next_wake(&f.service, &teams), None);
    }

    #[tokio::test]
    async fn check_records_maturity_once_and_dispatches_after_commit() {
        let f = fixture(LifecycleConcern::Combined);
        let team = seed_team(&f, "Platform Crew").await;

        f.clock.set(team.creation_date() + Duration::seconds(31));
        f.scheduler.check().await.unwrap();

        assert_eq!(f.dispatcher.event_types(), vec!["team_matured"]);
        assert!(f.repository.commit_count() >= 1);

        // The persisted maturity marker prevents a duplicate on re-check.
        f.scheduler.check().await.unwrap();
        assert_eq!(f.dispatcher.event_types(), vec!["team_matured"]);
    }

    #[tokio::test]
    async fn check_archives_expired_teams_and_exports_snapshots() {
        let f = fixture(LifecycleConcern::Combined);
        let team = seed_team(&f, "Platform Crew").await;

        f.clock.set(team.creation_date() + Duration::seconds(251));
        f.scheduler.check().await.unwrap();

        let stored = f.repository.find_by_id(team.id()).await.unwrap().unwrap();
        assert_eq!(stored.state(), TeamState::Archived);

        let exported = f.archive_store.records().await;
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].team_id, team.id());
        assert_eq!(exported[0].expired_on, team.expiration_date());

        assert!(f
            .dispatcher
            .event_types()
            .contains(&"team_archived"));

        // Archived teams drop out of the expired partition; nothing new.
        f.scheduler.check().await.unwrap();
        assert_eq!(f.archive_store.records().await.len(), 1);
    }

    #[tokio::test]
    async fn combined_check_keeps_maturity_marker_when_archiving() {
        let f = fixture(LifecycleConcern::Combined);
        let team = seed_team(&f, "Platform Crew").await;

        // Both transitions due in the same cycle, as after downtime.
        f.clock.set(team.creation_date() + Duration::seconds(251));
        f.scheduler.check().await.unwrap();

        let types = f.dispatcher.event_types();
        assert!(types.contains(&"team_matured"));
        assert!(types.contains(&"team_archived"));

        // The archived aggregate must still carry the maturity marker the
        // earlier pass persisted.
        let stored = f.repository.find_by_id(team.id()).await.unwrap().unwrap();
        assert_eq!(stored.state(), TeamState::Archived);
        assert!(stored.matured_on().is_some());
    }

    #[tokio::test]
    async fn check_purges_expired_project_details() {
        let f = fixture(LifecycleConcern::ProjectExpiry);
        let mut team = seed_team(&f, "Platform Crew").await;
        let t0 = team.creation_date();

        let project = ProjectAssociation::new(
            team.manager_id(),
            team.name().as_str(),
            vec![
                ProjectDetail::new(
                    "atlas",
                    t0,
                    t0 + Duration::seconds(40),
                    DetailState::Active,
                ),
                ProjectDetail::new(
                    "borealis",
                    t0,
                    t0 + Duration::seconds(400),
                    DetailState::Active,
                ),
            ],
        );
        team.assign_project(project, t0, &LifecyclePolicy::default())
            .unwrap();
        team.take_events();
        f.repository.update(&team).await.unwrap();

        // Arms on the earliest detail end date.
        let teams = f.repository.get_all().await.unwrap();
        assert_eq!(
            LifecycleConcern::ProjectExpiry.next_wake(&f.service, &teams),
            Some(t0 + Duration::seconds(40))
        );

        f.clock.set(t0 + Duration::seconds(41));
        f.scheduler.check().await.unwrap();

        let stored = f.repository.find_by_id(team.id()).await.unwrap().unwrap();
        let details = stored.project().unwrap().details();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].project_name, "borealis");
        assert_eq!(f.dispatcher.event_types(), vec!["project_dates_changed"]);
        assert!(f.repository.commit_count() >= 1);

        // Nothing further due; a re-check leaves the association alone.
        f.scheduler.check().await.unwrap();
        assert_eq!(f.dispatcher.event_types(), vec!["project_dates_changed"]);
    }

    #[tokio::test]
    async fn maturity_concern_skips_expiration_pass() {
        let f = fixture(LifecycleConcern::Maturity);
        let team = seed_team(&f, "Platform Crew").await;

        f.clock.set(team.creation_date() + Duration::seconds(251));
        f.scheduler.check().await.unwrap();

        let stored = f.repository.find_by_id(team.id()).await.unwrap().unwrap();
        assert_ne!(stored.state(), TeamState::Archived);
        assert!(f.archive_store.records().await.is_empty());
    }

    #[tokio::test]
    async fn dispatch_failure_aborts_the_check_cycle() {
        let f = fixture_with(LifecycleConcern::Combined, RecordingDispatcher::failing());
        let team = seed_team(&f, "Platform Crew").await;

        f.clock.set(team.creation_date() + Duration::seconds(31));
        let err = f.scheduler.check().await.unwrap_err();
        assert!(err.to_string().contains("dispatch failed"));
    }

    #[tokio::test]
    async fn starts_idle_stops_cleanly_and_survives_reschedule() {
        let f = fixture(LifecycleConcern::Combined);

        let handle = f.scheduler.clone().start();
        tokio::task::yield_now().await;

        // No teams: the loop is idle. A reschedule just re-arms it.
        f.scheduler.reschedule();
        tokio::task::yield_now().await;

        f.scheduler.stop();
        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("scheduler loop should stop promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let f = fixture(LifecycleConcern::Combined);
        let first = f.scheduler.clone().start();
        tokio::task::yield_now().await;

        let second = f.scheduler.clone().start();
        tokio::time::timeout(std::time::Duration::from_secs(1), second)
            .await
            .expect("second start should return immediately")
            .unwrap();

        f.scheduler.stop();
        let _ = tokio::time::timeout(std::time::Duration::from_secs(1), first).await;
    }
}
