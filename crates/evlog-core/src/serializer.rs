//! Message serialization.

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::message::{AggregateRootId, Message, Payload, header};

/// Failure converting between a message and its payload.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// The event could not be converted to or from JSON.
    #[error("event body could not be converted: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload does not say which aggregate it belongs to.
    #[error("payload is missing the `{}` header", header::AGGREGATE_ROOT_ID)]
    MissingAggregateRootId,
}

/// Converts messages to and from their stored payload.
pub trait MessageSerializer: Send + Sync {
    /// The event type carried by messages.
    type Event;

    /// Serializes a message into headers and body.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if the event cannot be represented.
    fn serialize_message(
        &self,
        message: &Message<Self::Event>,
    ) -> Result<Payload, SerializationError>;

    /// Rebuilds a message from a stored payload.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if the payload does not describe a
    /// message of this serializer's event type.
    fn unserialize_payload(
        &self,
        payload: Payload,
    ) -> Result<Message<Self::Event>, SerializationError>;
}

/// Serializer for any serde-compatible event type. The aggregate id travels
/// in the `__aggregate_root_id` header.
pub struct JsonMessageSerializer<E> {
    _event: PhantomData<fn() -> E>,
}

impl<E> JsonMessageSerializer<E> {
    /// Creates a new `JsonMessageSerializer`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _event: PhantomData,
        }
    }
}

impl<E> Default for JsonMessageSerializer<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for JsonMessageSerializer<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonMessageSerializer").finish()
    }
}

impl<E> MessageSerializer for JsonMessageSerializer<E>
where
    E: Serialize + DeserializeOwned,
{
    type Event = E;

    fn serialize_message(&self, message: &Message<E>) -> Result<Payload, SerializationError> {
        let mut headers = message.headers().clone();
        headers.insert(
            header::AGGREGATE_ROOT_ID.to_owned(),
            Value::String(message.aggregate_root_id().to_string()),
        );

        Ok(Payload {
            headers,
            body: serde_json::to_value(message.event())?,
        })
    }

    fn unserialize_payload(&self, payload: Payload) -> Result<Message<E>, SerializationError> {
        let aggregate_root_id = payload
            .headers
            .get(header::AGGREGATE_ROOT_ID)
            .and_then(Value::as_str)
            .map(AggregateRootId::new)
            .ok_or(SerializationError::MissingAggregateRootId)?;
        let event = serde_json::from_value(payload.body)?;

        Ok(Message::with_headers(aggregate_root_id, payload.headers, event))
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::message::Headers;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "type", rename_all = "snake_case")]
    enum CartEvent {
        ItemAdded { sku: String, quantity: u32 },
        CheckedOut,
    }

    #[test]
    fn test_serialize_writes_aggregate_id_header_and_body() {
        let serializer = JsonMessageSerializer::<CartEvent>::new();
        let message = Message::new(
            AggregateRootId::new("cart-1"),
            CartEvent::ItemAdded {
                sku: "X-1".into(),
                quantity: 2,
            },
        )
        .with_header(header::AGGREGATE_ROOT_VERSION, 1);

        let payload = serializer.serialize_message(&message).unwrap();

        assert_eq!(payload.headers[header::AGGREGATE_ROOT_ID], json!("cart-1"));
        assert_eq!(payload.headers[header::AGGREGATE_ROOT_VERSION], json!(1));
        assert_eq!(
            payload.body,
            json!({"type": "item_added", "sku": "X-1", "quantity": 2})
        );
    }

    #[test]
    fn test_unserialize_restores_message() {
        let serializer = JsonMessageSerializer::<CartEvent>::new();
        let message = Message::new(AggregateRootId::new("cart-1"), CartEvent::CheckedOut)
            .with_header(header::EVENT_ID, "evt-9");

        let payload = serializer.serialize_message(&message).unwrap();
        let restored = serializer.unserialize_payload(payload).unwrap();

        assert_eq!(restored.aggregate_root_id().as_str(), "cart-1");
        assert_eq!(restored.event(), &CartEvent::CheckedOut);
        assert_eq!(restored.event_id(), Some("evt-9"));
    }

    #[test]
    fn test_unserialize_without_aggregate_id_fails() {
        let serializer = JsonMessageSerializer::<CartEvent>::new();
        let payload = Payload {
            headers: Headers::new(),
            body: json!({"type": "checked_out"}),
        };

        let result = serializer.unserialize_payload(payload);

        assert!(matches!(
            result,
            Err(SerializationError::MissingAggregateRootId)
        ));
    }

    #[test]
    fn test_unserialize_with_foreign_body_fails() {
        let serializer = JsonMessageSerializer::<CartEvent>::new();
        let mut headers = Headers::new();
        headers.insert(header::AGGREGATE_ROOT_ID.into(), json!("cart-1"));
        let payload = Payload {
            headers,
            body: json!({"type": "teleported"}),
        };

        assert!(matches!(
            serializer.unserialize_payload(payload),
            Err(SerializationError::Json(_))
        ));
    }
}
