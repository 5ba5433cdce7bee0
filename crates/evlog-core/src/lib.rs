//! Message model and collaborator abstractions for the evlog message store.
//!
//! This crate defines the types that flow through the message store and the
//! small capability traits it is composed from (serializer, id encoder, table
//! schema, event-id generator). It contains no infrastructure code.

pub mod clock;
pub mod cursor;
pub mod error;
pub mod event_id;
pub mod id_encoding;
pub mod message;
pub mod repository;
pub mod serializer;
pub mod table_schema;
