//! Shared helpers for message store integration tests.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use evlog_core::error::MessageStoreError;
use evlog_core::message::{AggregateRootId, Message, header};
use evlog_core::serializer::JsonMessageSerializer;
use evlog_message_store::{ConnectionManager, DefaultConnectionManager, SqliteMessageRepository};
use evlog_test_support::SequenceEventIdGenerator;
use serde::{Deserialize, Serialize};
use sqlx::Connection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use tempfile::TempDir;

pub const TABLE: &str = "domain_messages";

pub const CREATE_DEFAULT_TABLE: &str = r"
CREATE TABLE domain_messages (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id          BLOB NOT NULL UNIQUE,
    aggregate_root_id BLOB NOT NULL,
    version           INTEGER NOT NULL,
    payload           TEXT NOT NULL
)";

pub const CREATE_LEGACY_TABLE: &str = r"
CREATE TABLE legacy_messages (
    id                     INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id               BLOB NOT NULL UNIQUE,
    aggregate_root_id      BLOB NOT NULL,
    aggregate_root_version INTEGER NOT NULL,
    payload                TEXT NOT NULL,
    time_of_recording      TEXT NOT NULL,
    event_type             TEXT NOT NULL
)";

pub const CREATE_TEXT_ID_TABLE: &str = r"
CREATE TABLE text_messages (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id          TEXT NOT NULL UNIQUE,
    aggregate_root_id TEXT NOT NULL,
    version           INTEGER NOT NULL,
    payload           TEXT NOT NULL
)";

/// Events used across the suites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartEvent {
    ItemAdded { sku: String, quantity: u32 },
    ItemRemoved { sku: String },
    CheckedOut,
}

pub type CartRepository<M> = SqliteMessageRepository<M, JsonMessageSerializer<CartEvent>>;

/// A throwaway `SQLite` database file, removed on drop.
pub struct TestDatabase {
    _dir: TempDir,
    path: PathBuf,
}

impl TestDatabase {
    /// Creates an empty database and runs `ddl` against it.
    pub async fn with_tables(ddl: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.db");
        let db = Self { _dir: dir, path };

        let mut conn = db.connect().await;
        for statement in ddl {
            sqlx::query(statement).execute(&mut conn).await.unwrap();
        }
        conn.close().await.unwrap();

        db
    }

    /// Creates a database holding the default message table.
    pub async fn new() -> Self {
        Self::with_tables(&[CREATE_DEFAULT_TABLE]).await
    }

    pub fn options(&self) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true)
    }

    pub fn manager(&self) -> DefaultConnectionManager {
        DefaultConnectionManager::new(self.options())
    }

    /// Opens a connection outside of any manager, for assertions.
    pub async fn connect(&self) -> SqliteConnection {
        SqliteConnection::connect_with(&self.options()).await.unwrap()
    }

    pub async fn execute(&self, statement: &str) {
        let mut conn = self.connect().await;
        sqlx::query(statement).execute(&mut conn).await.unwrap();
    }
}

/// Wraps a manager and counts checkouts that have not been returned.
pub struct CountingConnectionManager<M> {
    inner: M,
    gets: AtomicUsize,
    puts: AtomicUsize,
}

impl<M> CountingConnectionManager<M> {
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
        }
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn outstanding(&self) -> usize {
        self.gets() - self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<M: ConnectionManager> ConnectionManager for CountingConnectionManager<M> {
    async fn get(&self) -> Result<SqliteConnection, MessageStoreError> {
        let connection = self.inner.get().await?;
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(connection)
    }

    fn put(&self, connection: SqliteConnection) {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(connection);
    }
}

/// A manager whose connections can never be opened.
pub struct UnreachableConnectionManager;

#[async_trait]
impl ConnectionManager for UnreachableConnectionManager {
    async fn get(&self) -> Result<SqliteConnection, MessageStoreError> {
        Err(MessageStoreError::connectivity("connection refused"))
    }

    fn put(&self, _connection: SqliteConnection) {}
}

pub fn repository<M: ConnectionManager>(manager: M) -> CartRepository<M> {
    SqliteMessageRepository::new(manager, TABLE, JsonMessageSerializer::new())
        .with_event_id_generator(SequenceEventIdGenerator::new())
}

pub fn item_added(aggregate: &AggregateRootId, version: i64, sku: &str) -> Message<CartEvent> {
    Message::new(
        aggregate.clone(),
        CartEvent::ItemAdded {
            sku: sku.to_owned(),
            quantity: 1,
        },
    )
    .with_header(header::AGGREGATE_ROOT_VERSION, version)
}

pub fn new_aggregate() -> AggregateRootId {
    AggregateRootId::from(uuid::Uuid::new_v4())
}
