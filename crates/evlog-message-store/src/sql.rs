//! SQL statements and parameter binding.

use evlog_core::id_encoding::StorageKey;
use evlog_core::table_schema::TableSchema;
use serde_json::Value;
use sqlx::Sqlite;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;

pub(crate) type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// A positional statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub(crate) fn bind(self, query: SqliteQuery<'_>) -> SqliteQuery<'_> {
        match self {
            Self::Null => query.bind(None::<String>),
            Self::Integer(value) => query.bind(value),
            Self::Real(value) => query.bind(value),
            Self::Text(value) => query.bind(value),
            Self::Blob(value) => query.bind(value),
        }
    }
}

impl From<StorageKey> for SqlValue {
    fn from(key: StorageKey) -> Self {
        match key {
            StorageKey::Binary(bytes) => Self::Blob(bytes),
            StorageKey::Text(text) => Self::Text(text),
        }
    }
}

impl From<&Value> for SqlValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Integer(i64::from(*flag)),
            // u64 values above i64::MAX are kept exact as text.
            Value::Number(number) => number.as_i64().map_or_else(
                || {
                    if number.is_u64() {
                        Self::Text(number.to_string())
                    } else {
                        number
                            .as_f64()
                            .map_or_else(|| Self::Text(number.to_string()), Self::Real)
                    }
                },
                Self::Integer,
            ),
            Value::String(text) => Self::Text(text.clone()),
            Value::Array(_) | Value::Object(_) => Self::Text(value.to_string()),
        }
    }
}

/// Binds `parameters` positionally, in order.
pub(crate) fn bind_all(statement: &str, parameters: Vec<SqlValue>) -> SqliteQuery<'_> {
    parameters
        .into_iter()
        .fold(sqlx::query(statement), |query, value| value.bind(query))
}

/// Core columns followed by the schema's additional columns.
pub(crate) fn insert_columns(schema: &dyn TableSchema) -> Vec<&str> {
    let mut columns = vec![
        schema.version_column(),
        schema.event_id_column(),
        schema.payload_column(),
        schema.aggregate_root_id_column(),
    ];
    columns.extend(
        schema
            .additional_columns()
            .iter()
            .map(|(column, _)| column.as_str()),
    );
    columns
}

/// Highest number of `?` parameters one statement may bind. This is
/// SQLite's `SQLITE_MAX_VARIABLE_NUMBER` default since 3.32.
pub(crate) const MAX_BOUND_PARAMETERS: usize = 32_766;

/// How many rows of `columns` values fit in one insert statement.
pub(crate) fn rows_per_insert(columns: usize) -> usize {
    (MAX_BOUND_PARAMETERS / columns.max(1)).max(1)
}

/// `INSERT INTO t(c1,c2) VALUES (?,?),(?,?)` with one group per row.
pub(crate) fn insert(table: &str, columns: &[&str], rows: usize) -> String {
    let group = format!("({})", vec!["?"; columns.len()].join(","));
    let groups = vec![group.as_str(); rows].join(",");
    format!("INSERT INTO {table}({}) VALUES {groups}", columns.join(","))
}

pub(crate) fn select_for_aggregate(table: &str, schema: &dyn TableSchema) -> String {
    format!(
        "SELECT {payload} FROM {table} WHERE {aggregate} = ? ORDER BY {version} ASC",
        payload = schema.payload_column(),
        aggregate = schema.aggregate_root_id_column(),
        version = schema.version_column(),
    )
}

pub(crate) fn select_for_aggregate_after_version(table: &str, schema: &dyn TableSchema) -> String {
    format!(
        "SELECT {payload} FROM {table} WHERE {aggregate} = ? AND {version} > ? ORDER BY {version} ASC",
        payload = schema.payload_column(),
        aggregate = schema.aggregate_root_id_column(),
        version = schema.version_column(),
    )
}

/// Selects the payload and the incremental id, so the cursor can advance to
/// the last id actually read even when ids have gaps. Parameters are
/// `offset` then `limit`.
pub(crate) fn select_page(table: &str, schema: &dyn TableSchema) -> String {
    format!(
        "SELECT {payload}, {id} FROM {table} WHERE {id} > ? ORDER BY {id} ASC LIMIT ?",
        payload = schema.payload_column(),
        id = schema.incremental_id_column(),
    )
}
