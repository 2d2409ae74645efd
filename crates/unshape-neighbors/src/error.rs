//! Error types for unshape-neighbors.

use thiserror::Error;

/// Errors that can occur while building or querying a neighbor index.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NeighborError {
    /// A KD-tree needs at least one dimension to split on.
    #[error("kd-tree requires at least one dimension")]
    ZeroDimensions,

    /// A coordinate selector produced a vector of the wrong length.
    #[error("coordinate dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Dimensions the tree was configured with.
        expected: usize,
        /// Dimensions the selector actually produced.
        got: usize,
    },

    /// M-tree node capacity is too small to split.
    #[error("invalid node capacity {0}: must be at least 2")]
    InvalidCapacity(usize),

    /// A backing-store index does not exist.
    #[error("index {index} out of bounds for {len} points")]
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// Number of points in the backing store.
        len: usize,
    },

    /// No element satisfied the given predicate.
    #[error("no matching element")]
    NoMatchingElement,
}

/// Result type for neighbor index operations.
pub type Result<T> = std::result::Result<T, NeighborError>;
