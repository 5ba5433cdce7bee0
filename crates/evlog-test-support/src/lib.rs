//! Shared test doubles for the evlog message store.

mod clock;
mod event_id;
mod repository;

pub use clock::FixedClock;
pub use event_id::SequenceEventIdGenerator;
pub use repository::{FailingMessageRepository, InMemoryMessageRepository};
