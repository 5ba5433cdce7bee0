//! `SQLite` implementation of the `MessageRepository` trait.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Connection, Row};

use evlog_core::clock::SystemClock;
use evlog_core::cursor::PaginationCursor;
use evlog_core::error::MessageStoreError;
use evlog_core::event_id::{EventIdGenerator, UuidV7Generator};
use evlog_core::id_encoding::{BinaryUuidIdEncoder, IdEncoder};
use evlog_core::message::{AggregateRootId, Message, Payload, header};
use evlog_core::repository::{MessageRepository, Messages, Page, expect_offset_cursor};
use evlog_core::serializer::MessageSerializer;
use evlog_core::table_schema::TableSchema;

use crate::config::JsonFormat;
use crate::connection::{CheckedOutConnection, ConnectionManager};
use crate::schema::DefaultTableSchema;
use crate::sql::{self, SqlValue};

/// SQLite-backed message repository.
///
/// Rows are fetched when the statement executes and the connection goes
/// straight back to the manager; the returned sequences decode one row per
/// `next()` without touching the database again.
pub struct SqliteMessageRepository<M, S> {
    connections: M,
    table_name: String,
    serializer: Arc<S>,
    table_schema: Arc<dyn TableSchema>,
    aggregate_root_id_encoder: Arc<dyn IdEncoder>,
    event_id_encoder: Option<Arc<dyn IdEncoder>>,
    json_format: JsonFormat,
    event_ids: Arc<dyn EventIdGenerator>,
}

impl<M, S> SqliteMessageRepository<M, S>
where
    M: ConnectionManager,
    S: MessageSerializer + 'static,
{
    /// Creates a repository over `table_name` with the default table schema,
    /// binary UUID id encoding, compact JSON and UUIDv7 event ids.
    pub fn new(connections: M, table_name: impl Into<String>, serializer: S) -> Self {
        Self {
            connections,
            table_name: table_name.into(),
            serializer: Arc::new(serializer),
            table_schema: Arc::new(DefaultTableSchema),
            aggregate_root_id_encoder: Arc::new(BinaryUuidIdEncoder),
            event_id_encoder: None,
            json_format: JsonFormat::default(),
            event_ids: Arc::new(UuidV7Generator::new(SystemClock)),
        }
    }

    /// Uses `schema` for column names.
    #[must_use]
    pub fn with_table_schema(mut self, schema: impl TableSchema + 'static) -> Self {
        self.table_schema = Arc::new(schema);
        self
    }

    /// Encodes aggregate root ids with `encoder`. Event ids use the same
    /// encoder unless one is set with
    /// [`with_event_id_encoder`](Self::with_event_id_encoder).
    #[must_use]
    pub fn with_aggregate_root_id_encoder(mut self, encoder: impl IdEncoder + 'static) -> Self {
        self.aggregate_root_id_encoder = Arc::new(encoder);
        self
    }

    /// Encodes event ids with `encoder`.
    #[must_use]
    pub fn with_event_id_encoder(mut self, encoder: impl IdEncoder + 'static) -> Self {
        self.event_id_encoder = Some(Arc::new(encoder));
        self
    }

    /// Renders payload documents in `format`.
    #[must_use]
    pub fn with_json_format(mut self, format: JsonFormat) -> Self {
        self.json_format = format;
        self
    }

    /// Assigns missing event ids with `generator`.
    #[must_use]
    pub fn with_event_id_generator(mut self, generator: impl EventIdGenerator + 'static) -> Self {
        self.event_ids = Arc::new(generator);
        self
    }

    /// Returns the table this repository reads and writes.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    fn event_id_encoder(&self) -> &dyn IdEncoder {
        self.event_id_encoder
            .as_deref()
            .unwrap_or(self.aggregate_root_id_encoder.as_ref())
    }

    /// Builds the bound values for one message, in insert column order.
    fn row_parameters(
        &self,
        message: &Message<S::Event>,
    ) -> Result<Vec<SqlValue>, MessageStoreError> {
        let mut payload = self
            .serializer
            .serialize_message(message)
            .map_err(|e| MessageStoreError::unable_to_persist("message could not be serialized", e))?;

        let event_id = match payload.headers.get(header::EVENT_ID) {
            None | Some(Value::Null) => {
                let id = self.event_ids.next_event_id();
                payload
                    .headers
                    .insert(header::EVENT_ID.to_owned(), Value::String(id.clone()));
                id
            }
            Some(Value::String(id)) => id.clone(),
            Some(other) => {
                return Err(MessageStoreError::unable_to_persist(
                    "event id header must be a string",
                    format!("found {other}"),
                ));
            }
        };

        let version = match payload.headers.get(header::AGGREGATE_ROOT_VERSION) {
            None | Some(Value::Null) => 0,
            Some(value) => value.as_i64().ok_or_else(|| {
                MessageStoreError::unable_to_persist(
                    "aggregate root version header must be an integer",
                    format!("found {value}"),
                )
            })?,
        };

        let encoded_event_id = self
            .event_id_encoder()
            .encode_id(&event_id)
            .map_err(|e| MessageStoreError::unable_to_persist("event id could not be encoded", e))?;
        let encoded_aggregate_root_id = self
            .aggregate_root_id_encoder
            .encode_id(message.aggregate_root_id().as_str())
            .map_err(|e| {
                MessageStoreError::unable_to_persist("aggregate root id could not be encoded", e)
            })?;
        let document = self
            .json_format
            .encode(&payload)
            .map_err(|e| MessageStoreError::unable_to_persist("payload could not be encoded", e))?;

        let mut parameters = vec![
            SqlValue::Integer(version),
            encoded_event_id.into(),
            SqlValue::Text(document),
            encoded_aggregate_root_id.into(),
        ];
        for (column, source) in self.table_schema.additional_columns() {
            let value =
                payload
                    .headers
                    .get(source)
                    .ok_or_else(|| MessageStoreError::MissingHeader {
                        column: column.clone(),
                        header: source.clone(),
                    })?;
            parameters.push(SqlValue::from(value));
        }

        Ok(parameters)
    }

    /// Runs a select on a borrowed connection and hands the connection back
    /// before returning, whatever the outcome.
    async fn fetch_rows(
        &self,
        statement: &str,
        parameters: Vec<SqlValue>,
    ) -> Result<Vec<SqliteRow>, MessageStoreError> {
        let mut connection = CheckedOutConnection::acquire(&self.connections).await?;
        let result = sql::bind_all(statement, parameters)
            .fetch_all(&mut *connection)
            .await;
        connection.release();

        result.map_err(|e| {
            tracing::warn!(table = %self.table_name, error = %e, "select statement failed");
            MessageStoreError::unable_to_retrieve("select statement failed", e)
        })
    }

    /// Inserts `rows` with as few statements as the bound-parameter limit
    /// allows. A batch that needs more than one statement runs inside a
    /// transaction, so it is still all-or-nothing.
    async fn insert_rows(
        &self,
        connection: &mut SqliteConnection,
        columns: &[&str],
        rows: Vec<Vec<SqlValue>>,
    ) -> Result<u64, sqlx::Error> {
        let rows_per_statement = sql::rows_per_insert(columns.len());
        if rows.len() <= rows_per_statement {
            let statement = sql::insert(&self.table_name, columns, rows.len());
            let done = sql::bind_all(&statement, rows.into_iter().flatten().collect())
                .execute(connection)
                .await?;
            return Ok(done.rows_affected());
        }

        let mut transaction = connection.begin().await?;
        let mut rows_affected = 0;
        let mut rows = rows.into_iter().peekable();
        while rows.peek().is_some() {
            let chunk: Vec<Vec<SqlValue>> = rows.by_ref().take(rows_per_statement).collect();
            let statement = sql::insert(&self.table_name, columns, chunk.len());
            let done = sql::bind_all(&statement, chunk.into_iter().flatten().collect())
                .execute(&mut *transaction)
                .await?;
            rows_affected += done.rows_affected();
        }
        transaction.commit().await?;

        Ok(rows_affected)
    }

    fn encode_aggregate_root_id(&self, id: &AggregateRootId) -> Result<SqlValue, MessageStoreError> {
        self.aggregate_root_id_encoder
            .encode_id(id.as_str())
            .map(SqlValue::from)
            .map_err(|e| {
                MessageStoreError::unable_to_retrieve("aggregate root id could not be encoded", e)
            })
    }

    fn messages_from_rows(&self, rows: Vec<SqliteRow>) -> Messages<S::Event>
    where
        S::Event: Send + 'static,
    {
        let serializer = Arc::clone(&self.serializer);
        Messages::new(
            rows.into_iter()
                .map(move |row| decode_row(serializer.as_ref(), &row)),
        )
    }
}

/// Decodes the payload in the first column of `row`.
fn decode_row<S: MessageSerializer>(
    serializer: &S,
    row: &SqliteRow,
) -> Result<Message<S::Event>, MessageStoreError> {
    let document: String = row.try_get(0).map_err(|e| {
        MessageStoreError::unable_to_retrieve("payload column could not be read", e)
    })?;
    let payload: Payload = serde_json::from_str(&document)
        .map_err(|e| MessageStoreError::unable_to_retrieve("payload is not valid JSON", e))?;
    serializer
        .unserialize_payload(payload)
        .map_err(|e| MessageStoreError::unable_to_retrieve("payload could not be unserialized", e))
}

#[async_trait]
impl<M, S> MessageRepository<S::Event> for SqliteMessageRepository<M, S>
where
    M: ConnectionManager,
    S: MessageSerializer + 'static,
    S::Event: Send + Sync + 'static,
{
    async fn persist(&self, messages: &[Message<S::Event>]) -> Result<(), MessageStoreError> {
        if messages.is_empty() {
            return Ok(());
        }

        let columns = sql::insert_columns(self.table_schema.as_ref());
        let rows = messages
            .iter()
            .map(|message| self.row_parameters(message))
            .collect::<Result<Vec<_>, _>>()?;

        let mut connection = CheckedOutConnection::acquire(&self.connections).await?;
        let result = self.insert_rows(&mut connection, &columns, rows).await;
        connection.release();

        match result {
            Ok(rows_affected) => {
                tracing::debug!(
                    table = %self.table_name,
                    rows = rows_affected,
                    "persisted messages"
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!(table = %self.table_name, error = %e, "insert statement failed");
                Err(MessageStoreError::unable_to_persist(
                    "insert statement failed",
                    e,
                ))
            }
        }
    }

    async fn retrieve_all(
        &self,
        id: &AggregateRootId,
    ) -> Result<Messages<S::Event>, MessageStoreError> {
        let statement = sql::select_for_aggregate(&self.table_name, self.table_schema.as_ref());
        let parameters = vec![self.encode_aggregate_root_id(id)?];

        let rows = self.fetch_rows(&statement, parameters).await?;
        tracing::debug!(aggregate_root_id = %id, rows = rows.len(), "retrieved messages");

        Ok(self.messages_from_rows(rows))
    }

    async fn retrieve_all_after_version(
        &self,
        id: &AggregateRootId,
        version: i64,
    ) -> Result<Messages<S::Event>, MessageStoreError> {
        let statement = sql::select_for_aggregate_after_version(
            &self.table_name,
            self.table_schema.as_ref(),
        );
        let parameters = vec![
            self.encode_aggregate_root_id(id)?,
            SqlValue::Integer(version),
        ];

        let rows = self.fetch_rows(&statement, parameters).await?;
        tracing::debug!(
            aggregate_root_id = %id,
            after_version = version,
            rows = rows.len(),
            "retrieved messages"
        );

        Ok(self.messages_from_rows(rows))
    }

    async fn paginate(
        &self,
        cursor: &dyn PaginationCursor,
    ) -> Result<Page<S::Event>, MessageStoreError> {
        let cursor = expect_offset_cursor(cursor)?;
        let statement = sql::select_page(&self.table_name, self.table_schema.as_ref());
        let parameters = vec![
            SqlValue::Integer(cursor.offset()),
            SqlValue::Integer(cursor.limit()),
        ];

        let rows = self.fetch_rows(&statement, parameters).await?;
        let rows = rows
            .into_iter()
            .map(|row| row.try_get::<i64, _>(1).map(|id| (id, row)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                MessageStoreError::unable_to_retrieve("incremental id column could not be read", e)
            })?;
        tracing::debug!(
            offset = cursor.offset(),
            limit = cursor.limit(),
            rows = rows.len(),
            "paginated messages"
        );

        let serializer = Arc::clone(&self.serializer);
        Ok(Page::new(
            cursor,
            rows.into_iter()
                .map(move |(id, row)| (id, decode_row(serializer.as_ref(), &row))),
        ))
    }
}

impl<M, S> std::fmt::Debug for SqliteMessageRepository<M, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteMessageRepository")
            .field("table_name", &self.table_name)
            .field("table_schema", &self.table_schema)
            .field("json_format", &self.json_format)
            .finish_non_exhaustive()
    }
}
