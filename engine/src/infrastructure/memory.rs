// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory adapters for the repository and archive ports. The default
//! backing for tests and single-process deployments.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::application::{ArchivedTeamRecord, ArchivedTeamStore};
use crate::domain::{RepositoryError, Team, TeamId, TeamRepository};

/// In-memory implementation of TeamRepository
#[derive(Default)]
pub struct InMemoryTeamRepository {
    teams: Arc<RwLock<HashMap<TeamId, Team>>>,
    commits: AtomicU64,
}

impl InMemoryTeamRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of commits observed. Test hook for asserting the
    /// commit-before-dispatch ordering.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Persisted state never carries undispatched events, matching what a
    /// serializing store would keep.
    fn snapshot(team: &Team) -> Team {
        let mut stored = team.clone();
        stored.take_events();
        stored
    }
}

#[async_trait]
impl TeamRepository for InMemoryTeamRepository {
    async fn get_all(&self) -> Result<Vec<Team>, RepositoryError> {
        let teams = self.teams.read().await;
        Ok(teams.values().cloned().collect())
    }

    async fn find_by_id(&self, id: TeamId) -> Result<Option<Team>, RepositoryError> {
        let teams = self.teams.read().await;
        Ok(teams.get(&id).cloned())
    }

    async fn save(&self, team: &Team) -> Result<(), RepositoryError> {
        let mut teams = self.teams.write().await;
        teams.insert(team.id(), Self::snapshot(team));
        Ok(())
    }

    async fn update(&self, team: &Team) -> Result<(), RepositoryError> {
        let mut teams = self.teams.write().await;
        teams.insert(team.id(), Self::snapshot(team));
        Ok(())
    }

    async fn delete(&self, id: TeamId) -> Result<(), RepositoryError> {
        let mut teams = self.teams.write().await;
        teams
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(format!("team {}", id)))
    }

    async fn commit(&self) -> Result<(), RepositoryError> {
        // Writes are already visible; only the ordering matters here.
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory implementation of the archived-team export port.
#[derive(Default)]
pub struct InMemoryArchivedTeamStore {
    records: Arc<RwLock<Vec<ArchivedTeamRecord>>>,
}

impl InMemoryArchivedTeamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<ArchivedTeamRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl ArchivedTeamStore for InMemoryArchivedTeamStore {
    async fn store(&self, record: ArchivedTeamRecord) -> Result<()> {
        debug!(team_id = %record.team_id, "storing archived team record");
        let mut records = self.records.write().await;
        records.push(record);
        Ok(())
    }
}
