// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Tenure engine
//!
//! Time-bounded team lifecycle management: the Team aggregate and its
//! project association, the lifecycle domain service, and the
//! exact-instant scheduler that drives maturity and expiration.
//!
//! # Architecture
//!
//! - **Layer:** Lifecycle Engine
//! - **Purpose:** Implements team tenure tracking and archival

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
pub use application::*;
pub use infrastructure::*;
