// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure layer: adapters implementing the domain and application
//! ports.

pub mod memory;

pub use memory::*;
