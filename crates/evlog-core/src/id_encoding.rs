//! Encoding of aggregate and event identifiers into storage keys.

use thiserror::Error;
use uuid::Uuid;

/// Storage-native representation of an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// Raw bytes, stored in a BLOB column.
    Binary(Vec<u8>),
    /// Text, stored in a TEXT column.
    Text(String),
}

/// Failure converting an identifier to or from its storage key.
#[derive(Debug, Error)]
pub enum IdEncodingError {
    /// The identifier is not a UUID.
    #[error("`{id}` is not a valid UUID")]
    InvalidUuid {
        /// The rejected identifier.
        id: String,
        /// Parser error.
        #[source]
        source: uuid::Error,
    },

    /// The storage key has a representation this encoder does not produce.
    #[error("unexpected storage key representation: {0}")]
    UnexpectedKey(&'static str),
}

/// Converts identifiers into the key stored in a column, and back.
pub trait IdEncoder: Send + Sync + std::fmt::Debug {
    /// Encodes an identifier.
    ///
    /// # Errors
    ///
    /// Returns `IdEncodingError` if `id` is not in the form this encoder
    /// understands.
    fn encode_id(&self, id: &str) -> Result<StorageKey, IdEncodingError>;

    /// Decodes a storage key back into an identifier.
    ///
    /// # Errors
    ///
    /// Returns `IdEncodingError` if `key` was not produced by this encoder.
    fn decode_id(&self, key: &StorageKey) -> Result<String, IdEncodingError>;
}

/// Stores UUIDs in their compact 16-byte binary form.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryUuidIdEncoder;

impl IdEncoder for BinaryUuidIdEncoder {
    fn encode_id(&self, id: &str) -> Result<StorageKey, IdEncodingError> {
        let uuid = Uuid::parse_str(id).map_err(|source| IdEncodingError::InvalidUuid {
            id: id.to_owned(),
            source,
        })?;
        Ok(StorageKey::Binary(uuid.as_bytes().to_vec()))
    }

    fn decode_id(&self, key: &StorageKey) -> Result<String, IdEncodingError> {
        match key {
            StorageKey::Binary(bytes) => Uuid::from_slice(bytes)
                .map(|uuid| uuid.hyphenated().to_string())
                .map_err(|source| IdEncodingError::InvalidUuid {
                    id: format!("{bytes:02x?}"),
                    source,
                }),
            StorageKey::Text(_) => Err(IdEncodingError::UnexpectedKey("text")),
        }
    }
}

/// Stores identifiers verbatim as text.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringIdEncoder;

impl IdEncoder for StringIdEncoder {
    fn encode_id(&self, id: &str) -> Result<StorageKey, IdEncodingError> {
        Ok(StorageKey::Text(id.to_owned()))
    }

    fn decode_id(&self, key: &StorageKey) -> Result<String, IdEncodingError> {
        match key {
            StorageKey::Text(text) => Ok(text.clone()),
            StorageKey::Binary(_) => Err(IdEncodingError::UnexpectedKey("binary")),
        }
    }
}
