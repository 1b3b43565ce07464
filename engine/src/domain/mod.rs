// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain layer: the Team aggregate, its nested project association, domain
//! events, the lifecycle domain service, and the ports the layer owns
//! (clock, repository).

pub mod clock;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod policy;
pub mod project;
pub mod repository;
pub mod team;

pub use clock::*;
pub use error::*;
pub use events::*;
pub use lifecycle::*;
pub use policy::*;
pub use project::*;
pub use repository::*;
pub use team::*;
