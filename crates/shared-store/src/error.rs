//! Error types for the scoped store

use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Store keys must be non-empty.
    #[error("Store key must not be empty")]
    EmptyKey,

    /// The live container under `key` has a different type.
    #[error("Container type mismatch for '{key}': expected {expected}, stored {actual}")]
    ContainerTypeMismatch {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A factory ran twice for the same entry generation.
    #[error("Factory for '{key}' ran more than once in generation {generation}")]
    DuplicateFactoryInvocation { key: String, generation: u64 },
}
