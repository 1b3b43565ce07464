// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Domain-configured durations governing the team lifecycle.
//!
//! Defaults carry the shortened test-profile values; production deployments
//! override them from host configuration. All three are whole seconds on the
//! wire so they round-trip through JSON/YAML config files.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Time rules applied uniformly to every team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LifecyclePolicy {
    /// Duration after creation during which a team is automatically
    /// considered non-expired, absent any grace extension.
    #[serde(with = "seconds")]
    pub validity_period: Duration,

    /// Minimum elapsed time since creation, while Active, after which a team
    /// is considered mature.
    #[serde(with = "seconds")]
    pub maturity_threshold: Duration,

    /// Extension added to a team's expiration date each time a project is
    /// attached. Accumulates across attachments.
    #[serde(with = "seconds")]
    pub project_grace: Duration,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            validity_period: Duration::seconds(250),
            maturity_threshold: Duration::seconds(30),
            project_grace: Duration::seconds(150),
        }
    }
}

mod seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(deserializer)?;
        Ok(Duration::seconds(secs))
    }
}
