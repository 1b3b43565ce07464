// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application layer: the lifecycle scheduler, event dispatch, and the
//! archived-team export port.

pub mod archive;
pub mod dispatcher;
pub mod scheduler;

pub use archive::*;
pub use dispatcher::*;
pub use scheduler::*;
