//! Predictable event ids.

use std::sync::atomic::{AtomicU64, Ordering};

use evlog_core::event_id::EventIdGenerator;

/// Hands out `00000000-0000-7000-8000-000000000001`, `...0002`, and so on.
/// The ids are valid UUIDs, so they pass through the binary id encoder.
#[derive(Debug, Default)]
pub struct SequenceEventIdGenerator {
    issued: AtomicU64,
}

impl SequenceEventIdGenerator {
    /// Creates a generator whose first id ends in `1`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }
}

impl EventIdGenerator for SequenceEventIdGenerator {
    fn next_event_id(&self) -> String {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        format!("00000000-0000-7000-8000-{n:012x}")
    }
}
