//! Environment and argument handling for the dump tool.

use evlog_core::cursor::OffsetCursor;
use evlog_core::message::AggregateRootId;
use evlog_message_store::{ConfigError, ConnectionConfig};

/// How aggregate and event ids are stored in the table being read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdEncoding {
    /// 16-byte binary UUIDs.
    #[default]
    Binary,
    /// Ids stored as text.
    Text,
}

/// Everything the dump tool reads from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpConfig {
    /// Where the message table lives.
    pub connection: ConnectionConfig,
    /// Name of the message table (`EVLOG_TABLE`).
    pub table: String,
    /// Rows fetched per page when dumping the whole log (`EVLOG_PAGE_SIZE`).
    pub page_size: i64,
    /// How ids are stored in the table (`EVLOG_ID_ENCODING`).
    pub id_encoding: IdEncoding,
}

impl DumpConfig {
    /// Reads the connection settings plus `EVLOG_TABLE`, `EVLOG_PAGE_SIZE`
    /// and `EVLOG_ID_ENCODING`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `DATABASE_URL` is unset or any variable has
    /// an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) but reads variables through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let connection = ConnectionConfig::from_lookup(&lookup)?;
        let table = lookup("EVLOG_TABLE").unwrap_or_else(|| "domain_messages".to_owned());

        let page_size = match lookup("EVLOG_PAGE_SIZE") {
            None => OffsetCursor::DEFAULT_LIMIT,
            Some(value) => match value.parse::<i64>() {
                Ok(size) if size > 0 => size,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "EVLOG_PAGE_SIZE",
                        value,
                    });
                }
            },
        };

        let id_encoding = match lookup("EVLOG_ID_ENCODING").as_deref() {
            None | Some("binary") => IdEncoding::Binary,
            Some("text") => IdEncoding::Text,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "EVLOG_ID_ENCODING",
                    value: other.to_owned(),
                });
            }
        };

        Ok(Self {
            connection,
            table,
            page_size,
            id_encoding,
        })
    }
}

/// What to dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Every message in the table, in log order.
    Log,
    /// One aggregate's messages, in version order.
    History(AggregateRootId),
}

impl Command {
    /// Reads the command from the arguments after the program name. An
    /// aggregate id selects its history; no argument dumps the whole log.
    pub fn from_args(mut args: impl Iterator<Item = String>) -> Self {
        match args.next() {
            Some(id) => Self::History(AggregateRootId::new(id)),
            None => Self::Log,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_apply_when_only_url_is_set() {
        let config =
            DumpConfig::from_lookup(lookup(&[("DATABASE_URL", "sqlite://m.db")])).unwrap();

        assert_eq!(config.table, "domain_messages");
        assert_eq!(config.page_size, 100);
        assert_eq!(config.id_encoding, IdEncoding::Binary);
        assert!(!config.connection.create_if_missing);
    }

    #[test]
    fn test_overrides_are_read() {
        let config = DumpConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite://m.db"),
            ("EVLOG_TABLE", "cart_messages"),
            ("EVLOG_PAGE_SIZE", "25"),
            ("EVLOG_ID_ENCODING", "text"),
        ]))
        .unwrap();

        assert_eq!(config.table, "cart_messages");
        assert_eq!(config.page_size, 25);
        assert_eq!(config.id_encoding, IdEncoding::Text);
    }

    #[test]
    fn test_missing_database_url_is_rejected() {
        let result = DumpConfig::from_lookup(lookup(&[]));

        assert!(matches!(result, Err(ConfigError::Missing("DATABASE_URL"))));
    }

    #[test]
    fn test_non_positive_page_size_is_rejected() {
        for bad in ["0", "-3", "many"] {
            let result = DumpConfig::from_lookup(lookup(&[
                ("DATABASE_URL", "sqlite://m.db"),
                ("EVLOG_PAGE_SIZE", bad),
            ]));

            assert!(
                matches!(result, Err(ConfigError::Invalid { name: "EVLOG_PAGE_SIZE", .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_unknown_id_encoding_is_rejected() {
        let result = DumpConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite://m.db"),
            ("EVLOG_ID_ENCODING", "base64"),
        ]));

        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_command_from_args() {
        assert_eq!(Command::from_args(std::iter::empty()), Command::Log);
        assert_eq!(
            Command::from_args(vec!["cart-1".to_owned()].into_iter()),
            Command::History(AggregateRootId::new("cart-1"))
        );
    }
}
