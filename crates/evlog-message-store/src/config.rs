//! Connection and encoding configuration.

use std::str::FromStr;

use evlog_core::error::MessageStoreError;
use serde::Serialize;
use sqlx::sqlite::SqliteConnectOptions;
use thiserror::Error;

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("configuration error: {0} must be set")]
    Missing(&'static str),

    /// A variable is set to a value that cannot be used.
    #[error("configuration error: {name} has invalid value `{value}`")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Where and how to open database connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// `SQLite` URL, e.g. `sqlite://data/messages.db`.
    pub database_url: String,
    /// Create the database file when it does not exist yet.
    pub create_if_missing: bool,
}

impl ConnectionConfig {
    /// Creates a config for `database_url` that does not create missing files.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            create_if_missing: false,
        }
    }

    /// Reads `DATABASE_URL` and the optional `EVLOG_CREATE_IF_MISSING`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `DATABASE_URL` is unset or
    /// `EVLOG_CREATE_IF_MISSING` is not a boolean.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) but reads variables through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let create_if_missing = match lookup("EVLOG_CREATE_IF_MISSING") {
            None => false,
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "EVLOG_CREATE_IF_MISSING",
                value,
            })?,
        };

        Ok(Self {
            database_url,
            create_if_missing,
        })
    }

    /// Builds driver connect options.
    ///
    /// # Errors
    ///
    /// Returns `MessageStoreError::Connectivity` if the URL cannot be parsed.
    pub fn connect_options(&self) -> Result<SqliteConnectOptions, MessageStoreError> {
        let options = SqliteConnectOptions::from_str(&self.database_url)
            .map_err(MessageStoreError::connectivity)?;
        Ok(options.create_if_missing(self.create_if_missing))
    }
}

/// How payload documents are rendered before they are stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JsonFormat {
    /// Single-line JSON.
    #[default]
    Compact,
    /// Indented JSON.
    Pretty,
}

impl JsonFormat {
    /// Renders `value` in this format.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if `value` cannot be rendered.
    pub fn encode<T: Serialize + ?Sized>(self, value: &T) -> serde_json::Result<String> {
        match self {
            Self::Compact => serde_json::to_string(value),
            Self::Pretty => serde_json::to_string_pretty(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_from_lookup_requires_database_url() {
        let result = ConnectionConfig::from_lookup(lookup(&[]));

        assert!(matches!(result, Err(ConfigError::Missing("DATABASE_URL"))));
    }

    #[test]
    fn test_from_lookup_defaults_create_if_missing_to_false() {
        let config =
            ConnectionConfig::from_lookup(lookup(&[("DATABASE_URL", "sqlite://m.db")])).unwrap();

        assert_eq!(config, ConnectionConfig::new("sqlite://m.db"));
    }

    #[test]
    fn test_from_lookup_reads_create_if_missing() {
        let config = ConnectionConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite://m.db"),
            ("EVLOG_CREATE_IF_MISSING", "true"),
        ]))
        .unwrap();

        assert!(config.create_if_missing);
    }

    #[test]
    fn test_from_lookup_rejects_non_boolean_flag() {
        let result = ConnectionConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite://m.db"),
            ("EVLOG_CREATE_IF_MISSING", "sometimes"),
        ]));

        assert!(matches!(
            result,
            Err(ConfigError::Invalid { name: "EVLOG_CREATE_IF_MISSING", ref value }) if value == "sometimes"
        ));
    }

    #[test]
    fn test_connect_options_rejects_unknown_open_mode() {
        let config = ConnectionConfig::new("sqlite://m.db?mode=bogus");

        assert!(matches!(
            config.connect_options(),
            Err(MessageStoreError::Connectivity(_))
        ));
    }

    #[test]
    fn test_json_format_compact_and_pretty() {
        let value = json!({"headers": {}, "body": {"a": 1}});

        let compact = JsonFormat::Compact.encode(&value).unwrap();
        let pretty = JsonFormat::Pretty.encode(&value).unwrap();

        assert!(!compact.contains('\n'));
        assert!(pretty.contains('\n'));
        assert_eq!(serde_json::from_str::<serde_json::Value>(&compact).unwrap(), value);
        assert_eq!(serde_json::from_str::<serde_json::Value>(&pretty).unwrap(), value);
    }
}
