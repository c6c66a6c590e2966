//! Error types for the scoring engine
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Error policy (see ARCHITECTURE notes in the scoring crate):
//! - configuration problems fail at query construction, never mid-scan
//! - per-document decode problems degrade to a missing value, never an error
//! - scoring-strategy failures abort the whole request

use crate::types::FieldType;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the scoring engine
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid query configuration, detected before any scan starts
    #[error("Query construction error: {0}")]
    QueryConstruction(String),

    /// A strategy or query referenced a field the schema does not declare
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    /// A field was accessed with the wrong type or arity
    #[error("Field type mismatch on {field}: expected {expected}, found {actual}")]
    FieldTypeMismatch {
        /// Field being accessed
        field: String,
        /// What the accessor asked for
        expected: String,
        /// What the schema declares
        actual: String,
    },

    /// A scoring strategy failed; the whole request is aborted
    #[error("Scoring failure: {0}")]
    ScoringFailure(String),

    /// Data corruption detected outside the per-document degrade path
    #[error("Data corruption: {0}")]
    Corruption(String),
}

impl Error {
    /// Convenience constructor for query-construction failures
    pub fn query(msg: impl Into<String>) -> Self {
        Error::QueryConstruction(msg.into())
    }

    /// Convenience constructor for a type/arity mismatch against the schema
    pub fn type_mismatch(field: &str, expected: impl Into<String>, actual: FieldType) -> Self {
        Error::FieldTypeMismatch {
            field: field.to_string(),
            expected: expected.into(),
            actual: actual.to_string(),
        }
    }
}
