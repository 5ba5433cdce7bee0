//! Connection lifecycle.
//!
//! Repositories never hold a connection across calls. Each statement
//! borrows one through [`CheckedOutConnection::acquire`], and the guard puts
//! it back when it is released or dropped, so early returns and `?` cannot
//! leak a connection.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use evlog_core::error::MessageStoreError;
use sqlx::Connection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};

use crate::config::ConnectionConfig;

/// Hands out database connections and takes them back after use.
#[async_trait]
pub trait ConnectionManager: Send + Sync {
    /// Returns a connection that no one else holds.
    ///
    /// # Errors
    ///
    /// Returns `MessageStoreError::Connectivity` if a new connection has to
    /// be opened and opening it fails. Nothing is retried.
    async fn get(&self) -> Result<SqliteConnection, MessageStoreError>;

    /// Returns a connection for later reuse.
    fn put(&self, connection: SqliteConnection);
}

#[async_trait]
impl<M: ConnectionManager + ?Sized> ConnectionManager for Arc<M> {
    async fn get(&self) -> Result<SqliteConnection, MessageStoreError> {
        (**self).get().await
    }

    fn put(&self, connection: SqliteConnection) {
        (**self).put(connection);
    }
}

/// A connection borrowed from a [`ConnectionManager`] for one statement.
///
/// The connection slot is `Some` from `acquire` until `drop`, so
/// dereferencing the guard never panics.
pub struct CheckedOutConnection<'a, M: ConnectionManager + ?Sized> {
    manager: &'a M,
    connection: Option<SqliteConnection>,
}

impl<'a, M: ConnectionManager + ?Sized> CheckedOutConnection<'a, M> {
    /// Borrows a connection from `manager`.
    ///
    /// # Errors
    ///
    /// Propagates the manager's connectivity error.
    pub async fn acquire(manager: &'a M) -> Result<Self, MessageStoreError> {
        let connection = manager.get().await?;
        Ok(Self {
            manager,
            connection: Some(connection),
        })
    }

    /// Hands the connection back to the manager.
    pub fn release(self) {}
}

impl<M: ConnectionManager + ?Sized> Deref for CheckedOutConnection<'_, M> {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        // Only `drop` empties the slot.
        self.connection
            .as_ref()
            .expect("connection is only taken when the guard drops")
    }
}

impl<M: ConnectionManager + ?Sized> DerefMut for CheckedOutConnection<'_, M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // Only `drop` empties the slot.
        self.connection
            .as_mut()
            .expect("connection is only taken when the guard drops")
    }
}

impl<M: ConnectionManager + ?Sized> Drop for CheckedOutConnection<'_, M> {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            self.manager.put(connection);
        }
    }
}

/// Keeps at most one idle connection and opens a new one whenever the slot
/// is empty.
///
/// The slot is cleared the moment a connection is handed out, so a second
/// `get` before the matching `put` opens a fresh connection instead of
/// sharing one. If a connection is returned while another is already idle,
/// the returned one is closed. The slot is behind a mutex, so the manager can
/// be shared between tasks.
pub struct DefaultConnectionManager {
    options: SqliteConnectOptions,
    idle: Mutex<Option<SqliteConnection>>,
}

impl DefaultConnectionManager {
    /// Creates a manager that opens connections with `options`.
    #[must_use]
    pub fn new(options: SqliteConnectOptions) -> Self {
        Self {
            options,
            idle: Mutex::new(None),
        }
    }

    /// Creates a manager from a [`ConnectionConfig`].
    ///
    /// # Errors
    ///
    /// Returns `MessageStoreError::Connectivity` if the database URL is
    /// invalid.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self, MessageStoreError> {
        Ok(Self::new(config.connect_options()?))
    }

    fn take_idle(&self) -> Option<SqliteConnection> {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[async_trait]
impl ConnectionManager for DefaultConnectionManager {
    async fn get(&self) -> Result<SqliteConnection, MessageStoreError> {
        if let Some(connection) = self.take_idle() {
            tracing::trace!("reusing idle connection");
            return Ok(connection);
        }

        tracing::debug!("opening database connection");
        SqliteConnection::connect_with(&self.options)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "failed to open database connection");
                MessageStoreError::connectivity(e)
            })
    }

    fn put(&self, connection: SqliteConnection) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.is_some() {
            tracing::debug!("idle slot occupied, closing surplus connection");
            drop(idle);
            drop(connection);
        } else {
            *idle = Some(connection);
        }
    }
}

impl std::fmt::Debug for DefaultConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let idle = self
            .idle
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false);
        f.debug_struct("DefaultConnectionManager")
            .field("options", &self.options)
            .field("idle", &idle)
            .finish()
    }
}
