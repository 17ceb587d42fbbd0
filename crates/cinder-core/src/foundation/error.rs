//! Error types for the message and event model.

use thiserror::Error;

// =============================================================================
// Codec Errors
// =============================================================================

/// Errors raised while building a message from its structured form.
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    /// The value was neither a segment object nor an array of them.
    #[error("expected a segment object or an array of segments, found {0}")]
    UnexpectedShape(&'static str),

    /// A segment object has no string `type` field.
    #[error("segment is missing its `type` field")]
    MissingType,

    /// A segment's `data` field is not an object.
    #[error("segment `{kind}` has a non-object `data` field")]
    InvalidData {
        /// The segment type.
        kind: String,
    },
}

// =============================================================================
// Event Errors
// =============================================================================

/// Errors raised while normalizing a raw payload into an [`Event`](super::Event).
#[derive(Debug, Clone, Error)]
pub enum EventError {
    /// The payload is not a JSON object.
    #[error("event payload is not an object")]
    NotAnObject,

    /// A required field is absent.
    #[error("event payload is missing `{0}`")]
    MissingField(&'static str),

    /// A required field has the wrong JSON type.
    #[error("event field `{0}` has an invalid value")]
    InvalidField(&'static str),

    /// `post_type` names no known event category.
    #[error("unknown post_type `{0}`")]
    UnknownType(String),

    /// The `message` field could not be decoded.
    #[error("invalid message: {0}")]
    Message(#[from] CodecError),
}

/// Result type for event construction.
pub type EventResult<T> = Result<T, EventError>;
