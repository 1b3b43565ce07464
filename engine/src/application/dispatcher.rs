// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Domain event dispatch: fan-out of buffered events to registered handlers.
//!
//! Delivery is at-least-once: each event is delivered to every interested
//! handler, awaiting each delivery in turn. A handler error propagates to the
//! caller, aborting the current check cycle; the events remain on the
//! aggregate side of the durability boundary and are re-delivered next cycle.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::domain::TeamEvent;

/// Port consumed by the scheduler to publish drained aggregate events.
#[async_trait]
pub trait EventDispatcher: Send + Sync {
    async fn dispatch(&self, events: &[TeamEvent]) -> Result<()>;
}

/// A registered consumer of team events.
#[async_trait]
pub trait DomainEventHandler: Send + Sync {
    /// Filter deciding which events this handler receives. Defaults to all.
    fn wants(&self, _event: &TeamEvent) -> bool {
        true
    }

    async fn handle(&self, event: &TeamEvent) -> Result<()>;
}

/// Default dispatcher implementation over an in-process handler registry.
#[derive(Default)]
pub struct DomainEventDispatcher {
    handlers: Vec<Arc<dyn DomainEventHandler>>,
}

impl DomainEventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn DomainEventHandler>) {
        self.handlers.push(handler);
    }
}

#[async_trait]
impl EventDispatcher for DomainEventDispatcher {
    async fn dispatch(&self, events: &[TeamEvent]) -> Result<()> {
        for event in events {
            debug!(event_type = event.event_type(), "dispatching domain event");
            for handler in self.handlers.iter().filter(|h| h.wants(event)) {
                handler.handle(event).await?;
            }
        }
        Ok(())
    }
}
