//! Message store error types.

use std::error::Error as StdError;

use thiserror::Error;

/// Boxed cause carried by wrapped store failures.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Top-level error type surfaced by every message store operation.
///
/// Driver errors never escape a repository raw: they are wrapped into one of
/// these kinds with the original error kept as the `source`.
#[derive(Debug, Error)]
pub enum MessageStoreError {
    /// A database connection could not be established.
    #[error("unable to connect to the message store")]
    Connectivity(#[source] BoxError),

    /// The insert for a batch of messages failed. Nothing from the batch was
    /// written.
    #[error("unable to persist messages: {reason}")]
    UnableToPersist {
        /// Short description of the failing step.
        reason: String,
        /// The underlying failure.
        #[source]
        source: BoxError,
    },

    /// A select failed, or a fetched row could not be decoded.
    #[error("unable to retrieve messages: {reason}")]
    UnableToRetrieve {
        /// Short description of the failing step.
        reason: String,
        /// The underlying failure.
        #[source]
        source: BoxError,
    },

    /// The caller passed a cursor variant the operation does not support.
    #[error("wrong cursor type used, expected {expected}, received {received}")]
    ContractViolation {
        /// The supported cursor type.
        expected: &'static str,
        /// The cursor type that was passed.
        received: &'static str,
    },

    /// A page was requested with a limit below 1.
    #[error("page limit must be at least 1, received {0}")]
    InvalidPageLimit(i64),

    /// A header backing an additional column was absent at persist time.
    #[error("unable to persist messages: header `{header}` for column `{column}` is missing")]
    MissingHeader {
        /// The additional column being populated.
        column: String,
        /// The header it is sourced from.
        header: String,
    },
}

impl MessageStoreError {
    /// Wraps a connection-establishment failure.
    pub fn connectivity(source: impl Into<BoxError>) -> Self {
        Self::Connectivity(source.into())
    }

    /// Wraps a failure that happened while persisting.
    pub fn unable_to_persist(reason: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::UnableToPersist {
            reason: reason.into(),
            source: source.into(),
        }
    }

    /// Wraps a failure that happened while retrieving.
    pub fn unable_to_retrieve(reason: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::UnableToRetrieve {
            reason: reason.into(),
            source: source.into(),
        }
    }

    /// Returns `true` if the error aborted a persist call.
    #[must_use]
    pub fn is_persist_failure(&self) -> bool {
        matches!(self, Self::UnableToPersist { .. } | Self::MissingHeader { .. })
    }
}
