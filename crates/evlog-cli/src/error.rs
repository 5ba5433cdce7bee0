//! CLI error types.

use evlog_core::error::MessageStoreError;
use evlog_core::serializer::SerializationError;
use evlog_message_store::ConfigError;
use thiserror::Error;

/// Startup and runtime errors for the dump tool.
#[derive(Debug, Error)]
pub enum CliError {
    /// A required environment variable is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The message store rejected a call.
    #[error("message store error: {0}")]
    Store(#[from] MessageStoreError),

    /// A retrieved message could not be turned back into a payload.
    #[error("payload could not be rebuilt: {0}")]
    Serialize(#[from] SerializationError),

    /// A payload could not be written out as JSON.
    #[error("payload could not be rendered: {0}")]
    Render(#[from] serde_json::Error),

    /// Writing to the output failed.
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}
