//! Writes the contents of an evlog message table to any `io::Write`, one
//! JSON payload per line.

pub mod config;
pub mod error;

use std::io::Write;

use evlog_core::cursor::OffsetCursor;
use evlog_core::id_encoding::StringIdEncoder;
use evlog_core::message::Message;
use evlog_core::repository::MessageRepository;
use evlog_core::serializer::{JsonMessageSerializer, MessageSerializer};
use evlog_message_store::{ConnectionManager, SqliteMessageRepository};
use serde_json::Value;

pub use config::{Command, DumpConfig, IdEncoding};
pub use error::CliError;

/// Repository reading events as untyped JSON.
pub type DumpRepository<M> = SqliteMessageRepository<M, JsonMessageSerializer<Value>>;

/// Builds the repository described by `config` over `connections`.
pub fn repository<M: ConnectionManager>(
    connections: M,
    config: &DumpConfig,
) -> DumpRepository<M> {
    let repository = SqliteMessageRepository::new(
        connections,
        config.table.as_str(),
        JsonMessageSerializer::new(),
    );
    match config.id_encoding {
        IdEncoding::Binary => repository,
        IdEncoding::Text => repository.with_aggregate_root_id_encoder(StringIdEncoder),
    }
}

/// Runs `command` and writes every message it yields to `out`. Returns the
/// number of messages written.
///
/// # Errors
///
/// Stops at the first store, decoding or output failure.
pub async fn run<R, W>(
    repository: &R,
    command: &Command,
    page_size: i64,
    out: &mut W,
) -> Result<usize, CliError>
where
    R: MessageRepository<Value> + ?Sized,
    W: Write,
{
    let serializer = JsonMessageSerializer::<Value>::new();
    let mut written = 0;

    match command {
        Command::History(id) => {
            for message in repository.retrieve_all(id).await? {
                write_message(&serializer, &message?, out)?;
                written += 1;
            }
        }
        Command::Log => {
            let mut cursor = OffsetCursor::from_start(page_size);
            loop {
                let mut page = repository.paginate(&cursor).await?;
                let mut rows = 0;
                for message in page.by_ref() {
                    write_message(&serializer, &message?, out)?;
                    rows += 1;
                }
                if rows == 0 {
                    break;
                }
                written += rows;
                cursor = page.cursor();
                tracing::debug!(cursor = %cursor, rows, "page written");
            }
        }
    }

    out.flush()?;
    Ok(written)
}

fn write_message<W: Write>(
    serializer: &JsonMessageSerializer<Value>,
    message: &Message<Value>,
    out: &mut W,
) -> Result<(), CliError> {
    let payload = serializer.serialize_message(message)?;
    serde_json::to_writer(&mut *out, &payload)?;
    out.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use evlog_core::message::{AggregateRootId, Payload, header};
    use evlog_message_store::{ConnectionConfig, DefaultConnectionManager};
    use evlog_test_support::{FailingMessageRepository, InMemoryMessageRepository};
    use serde_json::json;
    use sqlx::Connection;
    use sqlx::sqlite::SqliteConnection;

    use super::*;

    const CREATE_TABLE: &str = r"
        CREATE TABLE domain_messages (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id          BLOB NOT NULL UNIQUE,
            aggregate_root_id BLOB NOT NULL,
            version           INTEGER NOT NULL,
            payload           TEXT NOT NULL
        )";

    async fn seeded_repository(
        dir: &tempfile::TempDir,
    ) -> (DumpRepository<DefaultConnectionManager>, AggregateRootId) {
        let config = DumpConfig {
            connection: ConnectionConfig {
                create_if_missing: true,
                ..ConnectionConfig::new(format!(
                    "sqlite://{}",
                    dir.path().join("dump.db").display()
                ))
            },
            table: "domain_messages".to_owned(),
            page_size: 2,
            id_encoding: IdEncoding::Binary,
        };
        let options = config.connection.connect_options().unwrap();
        let mut conn = SqliteConnection::connect_with(&options).await.unwrap();
        sqlx::query(CREATE_TABLE).execute(&mut conn).await.unwrap();
        conn.close().await.unwrap();

        let repo = repository(
            DefaultConnectionManager::from_config(&config.connection).unwrap(),
            &config,
        );
        let cart = AggregateRootId::from(uuid::Uuid::new_v4());
        let other = AggregateRootId::from(uuid::Uuid::new_v4());
        let messages: Vec<_> = [(&cart, 0), (&other, 0), (&cart, 1)]
            .into_iter()
            .map(|(id, version)| {
                Message::new(id.clone(), json!({"n": version}))
                    .with_header(header::AGGREGATE_ROOT_VERSION, version)
            })
            .collect();
        repo.persist(&messages).await.unwrap();

        (repo, cart)
    }

    fn lines(out: &[u8]) -> Vec<Payload> {
        std::str::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_log_dump_walks_every_page() {
        let dir = tempfile::tempdir().unwrap();
        let (repo, _) = seeded_repository(&dir).await;
        let mut out = Vec::new();

        let written = run(&repo, &Command::Log, 2, &mut out).await.unwrap();

        let payloads = lines(&out);
        assert_eq!(written, 3);
        assert_eq!(payloads.len(), 3);
        assert!(payloads.iter().all(|p| p.headers.contains_key(header::EVENT_ID)));
    }

    #[tokio::test]
    async fn test_history_dump_filters_by_aggregate() {
        let dir = tempfile::tempdir().unwrap();
        let (repo, cart) = seeded_repository(&dir).await;
        let mut out = Vec::new();

        let written = run(&repo, &Command::History(cart.clone()), 2, &mut out)
            .await
            .unwrap();

        let payloads = lines(&out);
        assert_eq!(written, 2);
        assert_eq!(payloads[0].body, json!({"n": 0}));
        assert_eq!(payloads[1].body, json!({"n": 1}));
        assert!(
            payloads
                .iter()
                .all(|p| p.headers[header::AGGREGATE_ROOT_ID] == json!(cart.as_str()))
        );
    }

    #[tokio::test]
    async fn test_log_dump_with_single_row_pages() {
        let repo = InMemoryMessageRepository::<Value>::new();
        let cart = AggregateRootId::new("cart-1");
        repo.persist(&[
            Message::new(cart.clone(), json!("opened")),
            Message::new(cart.clone(), json!("closed")),
        ])
        .await
        .unwrap();
        let mut out = Vec::new();

        let written = run(&repo, &Command::Log, 1, &mut out).await.unwrap();

        let bodies: Vec<Value> = lines(&out).into_iter().map(|p| p.body).collect();
        assert_eq!(written, 2);
        assert_eq!(bodies, vec![json!("opened"), json!("closed")]);
    }

    #[tokio::test]
    async fn test_store_failure_is_reported() {
        let mut out = Vec::new();

        let result = run(&FailingMessageRepository, &Command::Log, 10, &mut out).await;

        assert!(matches!(result, Err(CliError::Store(_))));
        assert!(out.is_empty());
    }
}
