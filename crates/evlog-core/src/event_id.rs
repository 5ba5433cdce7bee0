//! Event identifier generation.

use uuid::Uuid;

use crate::clock::{Clock, SystemClock, uuid_timestamp};

/// Produces identifiers for messages persisted without one.
pub trait EventIdGenerator: Send + Sync {
    /// Returns a new, previously unused event id.
    fn next_event_id(&self) -> String;
}

/// Generates time-ordered UUIDv7 ids from the injected clock. The low bits
/// are random, so two ids minted at the same instant still differ.
#[derive(Debug, Clone, Default)]
pub struct UuidV7Generator<C = SystemClock> {
    clock: C,
}

impl<C: Clock> UuidV7Generator<C> {
    /// Creates a generator reading time from `clock`.
    #[must_use]
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> EventIdGenerator for UuidV7Generator<C> {
    fn next_event_id(&self) -> String {
        Uuid::new_v7(uuid_timestamp(self.clock.now()))
            .hyphenated()
            .to_string()
    }
}
