//! Error types for classification and clustering.

use thiserror::Error;
use unshape_neighbors::NeighborError;

/// Errors from training, classifying or clustering.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClusterError {
    /// Points and labels were supplied in different numbers.
    #[error("{points} points but {labels} labels")]
    LengthMismatch {
        /// Points supplied or already indexed.
        points: usize,
        /// Labels supplied.
        labels: usize,
    },

    /// Fewer points than requested clusters.
    #[error("cannot form {clusters} clusters from {points} points")]
    NotEnoughPoints {
        /// Clusters requested.
        clusters: usize,
        /// Points available.
        points: usize,
    },

    /// Zero clusters requested.
    #[error("cluster count must be at least 1")]
    ZeroClusters,

    /// A query was made before any training data was added.
    #[error("classifier has no training data")]
    Untrained,

    /// A lookup found nothing to return.
    #[error("no matching element")]
    NoMatchingElement,

    /// Error from the underlying index.
    #[error(transparent)]
    Neighbors(#[from] NeighborError),
}

/// Result type for clustering operations.
pub type Result<T> = std::result::Result<T, ClusterError>;
