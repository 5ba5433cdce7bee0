//! `MessageRepository` doubles for tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use evlog_core::clock::SystemClock;
use evlog_core::cursor::PaginationCursor;
use evlog_core::error::MessageStoreError;
use evlog_core::event_id::{EventIdGenerator, UuidV7Generator};
use evlog_core::message::{AggregateRootId, Message, header};
use evlog_core::repository::{MessageRepository, Messages, Page, expect_offset_cursor};
use serde_json::Value;

/// A message repository backed by a `Vec`. Mirrors the database-backed
/// semantics: batches are all-or-nothing, missing event ids are assigned,
/// duplicate event ids are rejected and incremental ids start at 1.
pub struct InMemoryMessageRepository<E> {
    log: Mutex<Vec<(i64, Message<E>)>>,
    event_ids: Box<dyn EventIdGenerator>,
}

impl<E: Clone> InMemoryMessageRepository<E> {
    /// Creates an empty repository that assigns UUIDv7 event ids.
    #[must_use]
    pub fn new() -> Self {
        Self::with_event_id_generator(UuidV7Generator::new(SystemClock))
    }

    /// Creates an empty repository that assigns event ids with `generator`.
    #[must_use]
    pub fn with_event_id_generator(generator: impl EventIdGenerator + 'static) -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            event_ids: Box::new(generator),
        }
    }

    /// Returns a snapshot of every stored message in log order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn stored_messages(&self) -> Vec<Message<E>> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .map(|(_, message)| message.clone())
            .collect()
    }

    fn select(&self, filter: impl Fn(&Message<E>) -> bool) -> Vec<Message<E>> {
        let mut selected: Vec<Message<E>> = self
            .log
            .lock()
            .unwrap()
            .iter()
            .map(|(_, message)| message)
            .filter(|message| filter(message))
            .cloned()
            .collect();
        selected.sort_by_key(Message::aggregate_version);
        selected
    }
}

impl<E: Clone> Default for InMemoryMessageRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for InMemoryMessageRepository<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryMessageRepository")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<E> MessageRepository<E> for InMemoryMessageRepository<E>
where
    E: Clone + Send + Sync + 'static,
{
    async fn persist(&self, messages: &[Message<E>]) -> Result<(), MessageStoreError> {
        if messages.is_empty() {
            return Ok(());
        }

        let mut log = self.log.lock().unwrap();
        let mut seen: HashSet<String> = log
            .iter()
            .filter_map(|(_, message)| message.event_id().map(str::to_owned))
            .collect();

        let mut batch = Vec::with_capacity(messages.len());
        for message in messages {
            let message = match message.header(header::EVENT_ID) {
                None | Some(Value::Null) => message
                    .clone()
                    .with_header(header::EVENT_ID, self.event_ids.next_event_id()),
                Some(_) => message.clone(),
            };
            let event_id = message.event_id().unwrap_or_default().to_owned();
            if !seen.insert(event_id.clone()) {
                return Err(MessageStoreError::unable_to_persist(
                    "insert statement failed",
                    format!("duplicate event id {event_id}"),
                ));
            }
            batch.push(message);
        }

        let next_id = log.last().map_or(0, |(id, _)| *id) + 1;
        log.extend((next_id..).zip(batch));
        Ok(())
    }

    async fn retrieve_all(&self, id: &AggregateRootId) -> Result<Messages<E>, MessageStoreError> {
        let selected = self.select(|message| message.aggregate_root_id() == id);
        Ok(Messages::new(selected.into_iter().map(Ok)))
    }

    async fn retrieve_all_after_version(
        &self,
        id: &AggregateRootId,
        version: i64,
    ) -> Result<Messages<E>, MessageStoreError> {
        let selected = self.select(|message| {
            message.aggregate_root_id() == id && message.aggregate_version() > version
        });
        Ok(Messages::new(selected.into_iter().map(Ok)))
    }

    async fn paginate(&self, cursor: &dyn PaginationCursor) -> Result<Page<E>, MessageStoreError> {
        let cursor = expect_offset_cursor(cursor)?;
        let limit = usize::try_from(cursor.limit()).unwrap_or(0);
        let rows: Vec<(i64, Result<Message<E>, MessageStoreError>)> = self
            .log
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id > cursor.offset())
            .take(limit)
            .map(|(id, message)| (*id, Ok(message.clone())))
            .collect();
        Ok(Page::new(cursor, rows.into_iter()))
    }
}

/// A message repository that always reports a connectivity failure. Useful
/// for testing error-handling paths.
#[derive(Debug, Default)]
pub struct FailingMessageRepository;

fn connection_refused() -> MessageStoreError {
    MessageStoreError::connectivity("connection refused")
}

#[async_trait]
impl<E> MessageRepository<E> for FailingMessageRepository
where
    E: Send + Sync + 'static,
{
    async fn persist(&self, _messages: &[Message<E>]) -> Result<(), MessageStoreError> {
        Err(connection_refused())
    }

    async fn retrieve_all(&self, _id: &AggregateRootId) -> Result<Messages<E>, MessageStoreError> {
        Err(connection_refused())
    }

    async fn retrieve_all_after_version(
        &self,
        _id: &AggregateRootId,
        _version: i64,
    ) -> Result<Messages<E>, MessageStoreError> {
        Err(connection_refused())
    }

    async fn paginate(
        &self,
        _cursor: &dyn PaginationCursor,
    ) -> Result<Page<E>, MessageStoreError> {
        Err(connection_refused())
    }
}
