//! Message repository abstraction.

use async_trait::async_trait;

use crate::cursor::{OffsetCursor, PaginationCursor};
use crate::error::MessageStoreError;
use crate::message::{AggregateRootId, Message};

type MessageResult<E> = Result<Message<E>, MessageStoreError>;

/// Lazy, single-pass sequence of retrieved messages.
///
/// Each call to `next` decodes one row, so decoding failures surface as the
/// item that failed rather than failing the whole retrieval up front.
pub struct Messages<E> {
    inner: Box<dyn Iterator<Item = MessageResult<E>> + Send>,
}

impl<E> Messages<E> {
    /// Wraps a row-decoding iterator.
    pub fn new(inner: impl Iterator<Item = MessageResult<E>> + Send + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl<E: 'static> Messages<E> {
    /// An empty sequence.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }
}

impl<E> Iterator for Messages<E> {
    type Item = MessageResult<E>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl<E> std::fmt::Debug for Messages<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Messages").finish_non_exhaustive()
    }
}

/// One page of the global log.
///
/// Rows arrive as `(incremental id, decoded message)`. The cursor advances
/// to a row's incremental id as soon as the row is pulled, whether or not it
/// decodes, so a drained page always hands back the position after the last
/// row it read. If no rows were read the cursor is the one passed in.
pub struct Page<E> {
    cursor: OffsetCursor,
    rows: Box<dyn Iterator<Item = (i64, MessageResult<E>)> + Send>,
}

impl<E> Page<E> {
    /// Wraps a row iterator that started at `cursor`.
    pub fn new(
        cursor: OffsetCursor,
        rows: impl Iterator<Item = (i64, MessageResult<E>)> + Send + 'static,
    ) -> Self {
        Self {
            cursor,
            rows: Box::new(rows),
        }
    }

    /// Returns the cursor positioned after the rows consumed so far.
    #[must_use]
    pub fn cursor(&self) -> OffsetCursor {
        self.cursor
    }

    /// Consumes the rest of the page, returning its messages and the cursor
    /// for the next page.
    ///
    /// # Errors
    ///
    /// Returns the first decoding failure encountered.
    pub fn drain(mut self) -> Result<(Vec<Message<E>>, OffsetCursor), MessageStoreError> {
        let messages = self.by_ref().collect::<Result<Vec<_>, _>>()?;
        Ok((messages, self.cursor))
    }
}

impl<E> Iterator for Page<E> {
    type Item = MessageResult<E>;

    fn next(&mut self) -> Option<Self::Item> {
        let (incremental_id, message) = self.rows.next()?;
        self.cursor = self.cursor.with_offset(incremental_id);
        Some(message)
    }
}

impl<E> std::fmt::Debug for Page<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

/// Append-only store of messages keyed by aggregate.
///
/// Implementations never update or delete messages.
#[async_trait]
pub trait MessageRepository<E>: Send + Sync
where
    E: Send + Sync + 'static,
{
    /// Appends a batch of messages atomically. An empty batch is a no-op.
    ///
    /// Messages without an event id are assigned a fresh one before they are
    /// stored.
    async fn persist(&self, messages: &[Message<E>]) -> Result<(), MessageStoreError>;

    /// Returns every message of an aggregate in ascending version order.
    async fn retrieve_all(&self, id: &AggregateRootId) -> Result<Messages<E>, MessageStoreError>;

    /// Returns the messages of an aggregate whose version is greater than
    /// `version`, in ascending version order.
    async fn retrieve_all_after_version(
        &self,
        id: &AggregateRootId,
        version: i64,
    ) -> Result<Messages<E>, MessageStoreError>;

    /// Returns the page of the global log following `cursor`.
    ///
    /// # Errors
    ///
    /// Returns `MessageStoreError::ContractViolation` if the cursor is not an
    /// [`OffsetCursor`] and `MessageStoreError::InvalidPageLimit` if its limit
    /// is below 1.
    async fn paginate(&self, cursor: &dyn PaginationCursor) -> Result<Page<E>, MessageStoreError>;
}

/// Downcasts `cursor` to the [`OffsetCursor`] it must be and checks that it
/// asks for at least one row.
///
/// # Errors
///
/// Returns `MessageStoreError::ContractViolation` for any other cursor type
/// and `MessageStoreError::InvalidPageLimit` for a limit below 1.
pub fn expect_offset_cursor(
    cursor: &dyn PaginationCursor,
) -> Result<OffsetCursor, MessageStoreError> {
    let offset_cursor = cursor
        .as_any()
        .downcast_ref::<OffsetCursor>()
        .copied()
        .ok_or_else(|| MessageStoreError::ContractViolation {
            expected: std::any::type_name::<OffsetCursor>(),
            received: cursor.cursor_type(),
        })?;
    if offset_cursor.limit() < 1 {
        return Err(MessageStoreError::InvalidPageLimit(offset_cursor.limit()));
    }
    Ok(offset_cursor)
}
