//! Error and result types for mapping-layer operations.
//!
//! Use [`GlueResult<T>`] as the return type for fallible operations. All errors
//! are raised synchronously at the point of detection and propagate to the
//! caller; the layer performs no retries.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors raised by the mapping layer.
#[derive(Error, Debug)]
pub enum GlueError {
    /// An input value failed validation: wrong shape for a schema fragment,
    /// a required field left null, a choice violation, or a custom-validator
    /// rejection.
    #[error("Validation error: {0}")]
    Validation(String),
    /// Misuse of the layer by the integrating developer, e.g. requesting a
    /// schema from a property kind that has none configured, or a parent-id
    /// arity mismatch against the collection path template.
    #[error("Programming error: {0}")]
    Programming(String),
    /// An operation targeted a document identifier that does not exist.
    /// The first argument is the document ID, the second the collection path.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// Serialization/deserialization error when converting between value
    /// representations (JSON, BSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// An error surfaced by the underlying store client.
    #[error("Client error: {0}")]
    Client(String),
}

/// A specialized `Result` type for mapping-layer operations.
pub type GlueResult<T> = Result<T, GlueError>;

impl From<BsonError> for GlueError {
    fn from(err: BsonError) -> Self {
        GlueError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for GlueError {
    fn from(err: SerdeJsonError) -> Self {
        GlueError::Serialization(err.to_string())
    }
}
