//! Error types for sdigraph operations.
//!
//! Provides rich error context for library consumers.

use thiserror::Error;

/// Main error type for sdigraph operations.
///
/// Raised at model and graph boundaries: mismatched node/edge/target
/// dimensions, weight blocks that cannot be tiled over the edge set, and
/// invalid hyperparameters. Shape errors deeper inside the autograd engine
/// are programming errors and panic instead.
///
/// # Examples
///
/// ```
/// use sdigraph::error::SdiError;
///
/// let err = SdiError::DimensionMismatch {
///     expected: "160x2".to_string(),
///     actual: "160x1".to_string(),
/// };
/// assert!(err.to_string().contains("dimension mismatch"));
/// ```
#[derive(Debug, Error)]
pub enum SdiError {
    /// Tensor or graph dimensions don't match for the operation.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// Invalid hyperparameter value provided.
    #[error("invalid hyperparameter: {param} = {value}, expected {constraint}")]
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Edge-type weight block cannot be repeated to cover the edge set.
    #[error("cannot tile {weight_rows} edge-type weight rows over {edges} edges")]
    EdgeWeightTiling {
        /// Number of edges in the graph
        edges: usize,
        /// Number of rows in the edge-type weight block
        weight_rows: usize,
    },

    /// Node index outside the graph.
    #[error("index {index} out of bounds (len={len})")]
    IndexOutOfBounds {
        /// Offending index
        index: usize,
        /// Valid length
        len: usize,
    },

    /// A supervised operation was called on a graph without targets.
    #[error("graph sample has no target matrix")]
    MissingTarget,

    /// I/O error (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SdiError {
    /// Create a dimension mismatch error with descriptive context
    #[must_use]
    pub fn dimension_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            expected: format!("{context}={expected}"),
            actual: format!("{actual}"),
        }
    }

    /// Create a shape mismatch error from two tensor shapes
    #[must_use]
    pub fn shape_mismatch(context: &str, expected: &[usize], actual: &[usize]) -> Self {
        Self::DimensionMismatch {
            expected: format!("{context}={expected:?}"),
            actual: format!("{actual:?}"),
        }
    }

    /// Create an invalid hyperparameter error
    #[must_use]
    pub fn invalid_hyperparameter(
        param: &str,
        value: impl ToString,
        constraint: &str,
    ) -> Self {
        Self::InvalidHyperparameter {
            param: param.to_string(),
            value: value.to_string(),
            constraint: constraint.to_string(),
        }
    }

    /// Create an index out of bounds error
    #[must_use]
    pub fn index_out_of_bounds(index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds { index, len }
    }
}

/// Convenience alias for results carrying [`SdiError`].
pub type Result<T> = std::result::Result<T, SdiError>;
