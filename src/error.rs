//! Error types for the embedding index and matching service.

use thiserror::Error;

/// Result type alias for index and matching operations
pub type Result<T> = std::result::Result<T, MatchError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    /// Vector length differs from the dimension the index was established with
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Zero-norm, empty or non-finite embedding
    #[error("embedding cannot be normalized: {reason}")]
    DegenerateVector { reason: &'static str },

    #[error("no faces registered")]
    EmptyDatabase,

    #[error("similarity index has no rows")]
    EmptyIndex,

    /// Store and index disagree about a row. Only reachable if the
    /// row correspondence invariant has been broken.
    #[error("row {row} out of range (store holds {len} records)")]
    IndexOutOfRange { row: usize, len: usize },
}

impl MatchError {
    /// Stable machine-readable name, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            MatchError::DimensionMismatch { .. } => "dimension_mismatch",
            MatchError::DegenerateVector { .. } => "degenerate_vector",
            MatchError::EmptyDatabase => "empty_database",
            MatchError::EmptyIndex => "empty_index",
            MatchError::IndexOutOfRange { .. } => "index_out_of_range",
        }
    }

    /// True for failures caused by caller input rather than by a fault
    /// inside the index.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            MatchError::DimensionMismatch { .. }
                | MatchError::DegenerateVector { .. }
                | MatchError::EmptyDatabase
        )
    }
}
