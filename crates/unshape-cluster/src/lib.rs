//! Classification and clustering on top of `unshape-neighbors` indexes.
//!
//! Everything here talks to points only through the
//! [`SpatialIndex`](unshape_neighbors::SpatialIndex) contract, so any of
//! [`KdTree`](unshape_neighbors::KdTree), [`MTree`](unshape_neighbors::MTree)
//! or [`LinearScan`](unshape_neighbors::LinearScan) can back it.
//!
//! - [`KNearestNeighbors`] - majority-vote classifier with explicit tie breaking
//! - [`KMeans`] - Lloyd's algorithm with seedable initialisation
//! - [`Clusters`] - label to member-index map, read through an index

mod clusters;
mod error;
mod kmeans;
mod knn;
pub mod util;

pub use clusters::Clusters;
pub use error::{ClusterError, Result};
pub use kmeans::{KMeans, KMeansConfig, KMeansFit, mean};
pub use knn::{KNearestNeighbors, KNearestNeighborsConfig, TieBreak};
