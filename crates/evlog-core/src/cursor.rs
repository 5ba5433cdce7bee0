//! Pagination cursors.

use std::any::Any;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A position in the global message log.
///
/// Repositories accept cursors as trait objects and downcast to the variant
/// they support; passing any other variant is a contract violation.
pub trait PaginationCursor: Any + fmt::Debug + Send + Sync {
    /// Returns `self` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Name of the concrete cursor type, for error reporting.
    fn cursor_type(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Cursor over the incremental id column.
///
/// `offset` is the last incremental id already seen; the next page starts
/// strictly after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetCursor {
    offset: i64,
    limit: i64,
}

impl OffsetCursor {
    /// Page size used when none is given.
    pub const DEFAULT_LIMIT: i64 = 100;

    /// Creates a cursor at `offset` returning at most `limit` messages.
    #[must_use]
    pub fn new(offset: i64, limit: i64) -> Self {
        Self { offset, limit }
    }

    /// Creates a cursor at the start of the log.
    #[must_use]
    pub fn from_start(limit: i64) -> Self {
        Self::new(0, limit)
    }

    /// Returns the last incremental id already seen.
    #[must_use]
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Returns the maximum page size.
    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// Returns a new cursor at `offset` with the same limit.
    #[must_use]
    pub fn with_offset(&self, offset: i64) -> Self {
        Self::new(offset, self.limit)
    }

    /// Returns a new cursor with a different page size.
    #[must_use]
    pub fn with_limit(&self, limit: i64) -> Self {
        Self::new(self.offset, limit)
    }
}

impl Default for OffsetCursor {
    fn default() -> Self {
        Self::from_start(Self::DEFAULT_LIMIT)
    }
}

impl PaginationCursor for OffsetCursor {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for OffsetCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offset={}&limit={}", self.offset, self.limit)
    }
}

/// Failure parsing a cursor token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CursorParseError {
    /// A `key=value` pair was malformed or had a non-integer value.
    #[error("invalid cursor field `{0}`")]
    InvalidField(String),

    /// A required field was absent.
    #[error("cursor token is missing `{0}`")]
    MissingField(&'static str),
}

impl FromStr for OffsetCursor {
    type Err = CursorParseError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let mut offset = None;
        let mut limit = None;

        for pair in token.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| CursorParseError::InvalidField(pair.to_owned()))?;
            let value: i64 = value
                .parse()
                .map_err(|_| CursorParseError::InvalidField(pair.to_owned()))?;
            match key {
                "offset" => offset = Some(value),
                "limit" if value < 1 => {
                    return Err(CursorParseError::InvalidField(pair.to_owned()));
                }
                "limit" => limit = Some(value),
                _ => return Err(CursorParseError::InvalidField(pair.to_owned())),
            }
        }

        Ok(Self::new(
            offset.ok_or(CursorParseError::MissingField("offset"))?,
            limit.unwrap_or(Self::DEFAULT_LIMIT),
        ))
    }
}
