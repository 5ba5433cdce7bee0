//! `SQLite` message store.
//!
//! Appends batches of messages with a single multi-row insert, reads one
//! aggregate's history in version order, and pages through the global log by
//! incremental id. Every statement runs on a connection borrowed from a
//! [`ConnectionManager`](connection::ConnectionManager) and handed back as
//! soon as the statement has executed, on success and failure alike.

pub mod config;
pub mod connection;
pub mod schema;
pub mod sqlite_message_repository;

mod sql;

pub use config::{ConfigError, ConnectionConfig, JsonFormat};
pub use connection::{CheckedOutConnection, ConnectionManager, DefaultConnectionManager};
pub use schema::{CustomTableSchema, DefaultTableSchema, LegacyTableSchema};
pub use sqlite_message_repository::SqliteMessageRepository;
