//! Domain message abstractions.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Header map attached to every message.
pub type Headers = Map<String, Value>;

/// Well-known header names.
pub mod header {
    /// Unique event identifier.
    pub const EVENT_ID: &str = "__event_id";
    /// Aggregate this message belongs to.
    pub const AGGREGATE_ROOT_ID: &str = "__aggregate_root_id";
    /// Version of the aggregate after this message was recorded.
    pub const AGGREGATE_ROOT_VERSION: &str = "__aggregate_root_version";
    /// Type name for deserialization routing.
    pub const EVENT_TYPE: &str = "__event_type";
    /// Timestamp at which the message was recorded.
    pub const TIME_OF_RECORDING: &str = "__time_of_recording";
}

/// Identity of the aggregate a message belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateRootId(String);

impl AggregateRootId {
    /// Creates an id from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string form of the id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Uuid> for AggregateRootId {
    fn from(id: Uuid) -> Self {
        Self(id.hyphenated().to_string())
    }
}

impl fmt::Display for AggregateRootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable event plus the headers describing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Message<E> {
    aggregate_root_id: AggregateRootId,
    headers: Headers,
    event: E,
}

impl<E> Message<E> {
    /// Creates a message with no headers.
    pub fn new(aggregate_root_id: impl Into<AggregateRootId>, event: E) -> Self {
        Self::with_headers(aggregate_root_id, Headers::new(), event)
    }

    /// Creates a message with the given headers.
    pub fn with_headers(
        aggregate_root_id: impl Into<AggregateRootId>,
        headers: Headers,
        event: E,
    ) -> Self {
        Self {
            aggregate_root_id: aggregate_root_id.into(),
            headers,
            event,
        }
    }

    /// Returns a copy of this message with `key` set to `value`.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Returns the aggregate identifier.
    pub fn aggregate_root_id(&self) -> &AggregateRootId {
        &self.aggregate_root_id
    }

    /// Returns all headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns a single header, if set.
    pub fn header(&self, key: &str) -> Option<&Value> {
        self.headers.get(key)
    }

    /// Returns the aggregate version header, or 0 when absent.
    pub fn aggregate_version(&self) -> i64 {
        self.header(header::AGGREGATE_ROOT_VERSION)
            .and_then(Value::as_i64)
            .unwrap_or(0)
    }

    /// Returns the event id header, if one has been assigned.
    pub fn event_id(&self) -> Option<&str> {
        self.header(header::EVENT_ID).and_then(Value::as_str)
    }

    /// Returns the event.
    pub fn event(&self) -> &E {
        &self.event
    }

    /// Splits the message into its parts.
    pub fn into_parts(self) -> (AggregateRootId, Headers, E) {
        (self.aggregate_root_id, self.headers, self.event)
    }
}

/// Serialized form of a message, stored as the JSON document
/// `{"headers": {...}, "body": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Message headers.
    pub headers: Headers,
    /// Serialized event.
    pub body: Value,
}
