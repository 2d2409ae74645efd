//! Exact nearest-neighbor and radial search under a user-supplied metric.
//!
//! This crate provides three interchangeable indexes behind one contract,
//! [`SpatialIndex`]:
//!
//! - [`KdTree`] - balanced binary space partition over coordinate vectors
//! - [`MTree`] - balanced metric-space tree; needs only a distance function
//! - [`LinearScan`] - brute-force reference implementation
//!
//! and the building blocks they share:
//!
//! - [`BoundedPriorityList`] - capacity-limited list sorted by priority
//! - [`HyperRect`] - axis-aligned box used for KD-tree pruning
//! - [`DistanceMatrix`] - compact pairwise-distance cache used by M-tree splits
//!
//! Every index owns an append-only backing store and hands out positions in
//! it, never the points themselves. Nothing here is synchronized: mutation
//! must be serialized by the caller.
//!
//! # Example
//!
//! ```
//! use unshape_neighbors::{Euclidean, MTree, SpatialIndex};
//!
//! let mut tree = MTree::new(Euclidean);
//! tree.add_all(vec![[1.0, 3.0], [2.0, 1.0], [4.0, 2.0], [10.0, 10.0], [9.0, 9.0]])
//!     .unwrap();
//!
//! assert_eq!(tree.nearest_neighbor_indexes(&[9.5, 9.5], 2).len(), 2);
//! assert_eq!(tree.radial_search(&[2.0, 2.0], 2.5).len(), 3);
//! ```

use std::ops::Range;

mod candidates;
mod distance_matrix;
mod error;
mod hyper_rect;
mod kdtree;
mod linear;
mod metric;
mod mtree;

pub use candidates::*;
pub use distance_matrix::*;
pub use error::*;
pub use hyper_rect::*;
pub use kdtree::*;
pub use linear::*;
pub use metric::*;
pub use mtree::*;

// ============================================================================
// Spatial index contract
// ============================================================================

/// An append-only point collection that answers exact neighbor queries.
///
/// Implemented identically by [`KdTree`], [`MTree`] and [`LinearScan`], so
/// consumers can swap one for another.
///
/// - Indexes returned by [`add`](Self::add) are stable positions in the
///   backing store and are what every `*_indexes` query returns.
/// - k-nearest results are sorted closest first. Radial results contain
///   exactly the points with `distance <= radius`; their order is
///   deterministic but differs between implementations.
pub trait SpatialIndex<T> {
    /// Appends `item`, returning its backing-store index.
    fn add(&mut self, item: T) -> Result<usize>;

    /// Appends a batch, returning the range of assigned indexes.
    fn add_all<I>(&mut self, items: I) -> Result<Range<usize>>
    where
        I: IntoIterator<Item = T>,
        Self: Sized,
    {
        let start = self.len();
        for item in items {
            self.add(item)?;
        }
        Ok(start..self.len())
    }

    /// Indexes of the `k` points nearest to `target`, closest first.
    ///
    /// Returns every point if fewer than `k` exist.
    fn nearest_neighbor_indexes(&self, target: &T, k: usize) -> Vec<usize>;

    /// The `k` points nearest to `target`, closest first.
    fn nearest_neighbors(&self, target: &T, k: usize) -> Vec<&T> {
        self.nearest_neighbor_indexes(target, k)
            .into_iter()
            .filter_map(|index| self.get(index))
            .collect()
    }

    /// Indexes of every point within `radius` of `center` (inclusive).
    fn radial_search_indexes(&self, center: &T, radius: f64) -> Vec<usize>;

    /// Every point within `radius` of `center` (inclusive).
    fn radial_search(&self, center: &T, radius: f64) -> Vec<&T> {
        self.radial_search_indexes(center, radius)
            .into_iter()
            .filter_map(|index| self.get(index))
            .collect()
    }

    /// The point at backing-store `index`.
    fn get(&self, index: usize) -> Option<&T>;

    /// The points at the given backing-store indexes, in the given order.
    fn get_many(&self, indexes: &[usize]) -> Result<Vec<&T>> {
        indexes
            .iter()
            .map(|&index| {
                self.get(index).ok_or(NeighborError::IndexOutOfBounds {
                    index,
                    len: self.len(),
                })
            })
            .collect()
    }

    /// Number of points in the backing store.
    fn len(&self) -> usize;

    /// Returns `true` if no points have been added.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Tests
// ============================================================================


// ============================================================================
// Invariant tests
// ============================================================================
