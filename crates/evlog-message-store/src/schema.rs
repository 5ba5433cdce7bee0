//! Message table layouts.

use evlog_core::message::header;
use evlog_core::table_schema::TableSchema;

/// The standard message table:
///
/// ```sql
/// id INTEGER PRIMARY KEY AUTOINCREMENT,
/// event_id BLOB NOT NULL UNIQUE,
/// aggregate_root_id BLOB NOT NULL,
/// version INTEGER NOT NULL,
/// payload TEXT NOT NULL
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTableSchema;

impl TableSchema for DefaultTableSchema {
    fn incremental_id_column(&self) -> &str {
        "id"
    }

    fn event_id_column(&self) -> &str {
        "event_id"
    }

    fn payload_column(&self) -> &str {
        "payload"
    }

    fn aggregate_root_id_column(&self) -> &str {
        "aggregate_root_id"
    }

    fn version_column(&self) -> &str {
        "version"
    }

    fn additional_columns(&self) -> &[(String, String)] {
        &[]
    }
}

/// Layout of older tables that name the version column
/// `aggregate_root_version` and denormalize the recording time and event
/// type into their own columns.
#[derive(Debug, Clone)]
pub struct LegacyTableSchema {
    additional_columns: Vec<(String, String)>,
}

impl Default for LegacyTableSchema {
    fn default() -> Self {
        Self {
            additional_columns: vec![
                (
                    "time_of_recording".to_owned(),
                    header::TIME_OF_RECORDING.to_owned(),
                ),
                ("event_type".to_owned(), header::EVENT_TYPE.to_owned()),
            ],
        }
    }
}

impl TableSchema for LegacyTableSchema {
    fn incremental_id_column(&self) -> &str {
        "id"
    }

    fn event_id_column(&self) -> &str {
        "event_id"
    }

    fn payload_column(&self) -> &str {
        "payload"
    }

    fn aggregate_root_id_column(&self) -> &str {
        "aggregate_root_id"
    }

    fn version_column(&self) -> &str {
        "aggregate_root_version"
    }

    fn additional_columns(&self) -> &[(String, String)] {
        &self.additional_columns
    }
}

/// A table layout assembled column by column, starting from the
/// [`DefaultTableSchema`] names.
#[derive(Debug, Clone)]
pub struct CustomTableSchema {
    incremental_id: String,
    event_id: String,
    payload: String,
    aggregate_root_id: String,
    version: String,
    additional_columns: Vec<(String, String)>,
}

impl CustomTableSchema {
    /// Starts from the default column names.
    #[must_use]
    pub fn new() -> Self {
        let defaults = DefaultTableSchema;
        Self {
            incremental_id: defaults.incremental_id_column().to_owned(),
            event_id: defaults.event_id_column().to_owned(),
            payload: defaults.payload_column().to_owned(),
            aggregate_root_id: defaults.aggregate_root_id_column().to_owned(),
            version: defaults.version_column().to_owned(),
            additional_columns: Vec::new(),
        }
    }

    /// Renames the incremental id column.
    #[must_use]
    pub fn with_incremental_id_column(mut self, column: impl Into<String>) -> Self {
        self.incremental_id = column.into();
        self
    }

    /// Renames the event id column.
    #[must_use]
    pub fn with_event_id_column(mut self, column: impl Into<String>) -> Self {
        self.event_id = column.into();
        self
    }

    /// Renames the payload column.
    #[must_use]
    pub fn with_payload_column(mut self, column: impl Into<String>) -> Self {
        self.payload = column.into();
        self
    }

    /// Renames the aggregate root id column.
    #[must_use]
    pub fn with_aggregate_root_id_column(mut self, column: impl Into<String>) -> Self {
        self.aggregate_root_id = column.into();
        self
    }

    /// Renames the version column.
    #[must_use]
    pub fn with_version_column(mut self, column: impl Into<String>) -> Self {
        self.version = column.into();
        self
    }

    /// Appends a column populated from `header`. Columns are written in the
    /// order they are added.
    #[must_use]
    pub fn with_additional_column(
        mut self,
        column: impl Into<String>,
        header: impl Into<String>,
    ) -> Self {
        self.additional_columns.push((column.into(), header.into()));
        self
    }
}

impl Default for CustomTableSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl TableSchema for CustomTableSchema {
    fn incremental_id_column(&self) -> &str {
        &self.incremental_id
    }

    fn event_id_column(&self) -> &str {
        &self.event_id
    }

    fn payload_column(&self) -> &str {
        &self.payload
    }

    fn aggregate_root_id_column(&self) -> &str {
        &self.aggregate_root_id
    }

    fn version_column(&self) -> &str {
        &self.version
    }

    fn additional_columns(&self) -> &[(String, String)] {
        &self.additional_columns
    }
}
