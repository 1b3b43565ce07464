// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Persistence contract for the Team aggregate, following the DDD Repository
//! pattern: one repository per aggregate root, interface defined in the
//! domain layer, implemented in `crate::infrastructure`.
//!
//! `commit` is the durability boundary: the scheduler calls it after a batch
//! of `update`s and before any event dispatch.

use async_trait::async_trait;

use super::team::{Team, TeamId};

/// Repository interface for Team aggregates
#[async_trait]
pub trait TeamRepository: Send + Sync {
    /// Load a snapshot of every team.
    async fn get_all(&self) -> Result<Vec<Team>, RepositoryError>;

    /// Find a team by ID
    async fn find_by_id(&self, id: TeamId) -> Result<Option<Team>, RepositoryError>;

    /// Save a newly created team.
    async fn save(&self, team: &Team) -> Result<(), RepositoryError>;

    /// Idempotent upsert of mutated state.
    async fn update(&self, team: &Team) -> Result<(), RepositoryError>;

    /// Delete a team by ID. Callers must run `Team::ensure_deletable` first.
    async fn delete(&self, id: TeamId) -> Result<(), RepositoryError>;

    /// Durably commit all pending updates.
    async fn commit(&self) -> Result<(), RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}
