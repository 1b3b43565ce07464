// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Typed failures raised by the domain and domain-service layers. All are
//! synchronous and surfaced to the caller of the mutating operation; none are
//! retried internally.

/// Domain errors
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// An aggregate construction or mutation rule was broken.
    #[error("{0}")]
    InvariantViolation(String),

    /// Creation-time collision with existing teams (duplicate name, manager
    /// over capacity, excessive member overlap).
    #[error("{0}")]
    Conflict(String),

    /// A referenced team, manager, or project is absent.
    #[error("{0} not found")]
    NotFound(String),
}

impl DomainError {
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}
