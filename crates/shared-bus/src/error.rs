//! Error types for the event bus

use crate::events::TopicMode;
use thiserror::Error;

/// Errors from bus operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Topic names must be non-empty.
    #[error("Topic name must not be empty")]
    EmptyTopic,

    /// The topic already exists under the other mode.
    #[error("Topic '{topic}' exists as {existing}, requested as {requested}")]
    TopicModeConflict {
        topic: String,
        existing: TopicMode,
        requested: TopicMode,
    },

    /// A subscriber expected a different payload type than was published.
    #[error("Payload type mismatch on '{topic}': expected {expected}, got {actual}")]
    PayloadTypeMismatch {
        topic: String,
        expected: &'static str,
        actual: &'static str,
    },
}
