//! Table schema abstraction.

/// Names the physical columns of a message table.
///
/// Additional columns are populated from message headers. Their order is
/// the order in which they appear in the generated SQL, so implementations
/// must return them in a stable order.
pub trait TableSchema: Send + Sync + std::fmt::Debug {
    /// Auto-assigned, monotonically increasing column ordering the global log.
    fn incremental_id_column(&self) -> &str;

    /// Column holding the encoded event id.
    fn event_id_column(&self) -> &str;

    /// Column holding the JSON payload.
    fn payload_column(&self) -> &str;

    /// Column holding the encoded aggregate root id.
    fn aggregate_root_id_column(&self) -> &str;

    /// Column holding the aggregate root version.
    fn version_column(&self) -> &str;

    /// `(column, source header)` pairs for header-backed columns.
    fn additional_columns(&self) -> &[(String, String)];
}
