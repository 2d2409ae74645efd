use std::collections::BTreeMap;

use unshape_neighbors::SpatialIndex;

use crate::{ClusterError, Result};

/// Groups of backing-store indexes keyed by cluster label.
///
/// Holds only indexes; members are read back through whichever
/// [`SpatialIndex`] owns the points.
///
/// # Example
///
/// ```
/// use unshape_cluster::Clusters;
/// use unshape_neighbors::{Euclidean, LinearScan};
///
/// let points = LinearScan::from_points(vec![[0.0], [10.0], [1.0]], Euclidean);
/// let clusters = Clusters::from_labels(["low", "high", "low"]);
///
/// assert_eq!(clusters.members(&"low", &points).unwrap(), vec![&[0.0], &[1.0]]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Clusters<L: Ord> {
    groups: BTreeMap<L, Vec<usize>>,
}

impl<L: Ord> Default for Clusters<L> {
    fn default() -> Self {
        Self {
            groups: BTreeMap::new(),
        }
    }
}

impl<L: Ord> Clusters<L> {
    /// Creates an empty set of clusters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups positions by label: the `i`-th label assigns index `i`.
    pub fn from_labels(labels: impl IntoIterator<Item = L>) -> Self {
        let mut clusters = Self::new();
        for (index, label) in labels.into_iter().enumerate() {
            clusters.insert(label, index);
        }
        clusters
    }

    /// Adds `index` to the cluster `label`, creating it if needed.
    pub fn insert(&mut self, label: L, index: usize) {
        self.groups.entry(label).or_default().push(index);
    }

    /// Number of clusters.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// `true` if there are no clusters.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// `true` if a cluster with `label` exists.
    pub fn contains(&self, label: &L) -> bool {
        self.groups.contains_key(label)
    }

    /// Member indexes of cluster `label`, in insertion order.
    pub fn indexes(&self, label: &L) -> Option<&[usize]> {
        self.groups.get(label).map(Vec::as_slice)
    }

    /// Cluster labels in ascending order.
    pub fn labels(&self) -> impl Iterator<Item = &L> {
        self.groups.keys()
    }

    /// `(label, member indexes)` pairs in label order.
    pub fn iter(&self) -> impl Iterator<Item = (&L, &[usize])> {
        self.groups.iter().map(|(label, indexes)| (label, indexes.as_slice()))
    }

    /// The members of cluster `label`, read from `source`.
    ///
    /// Fails with [`ClusterError::NoMatchingElement`] for an unknown label.
    pub fn members<'a, T, I>(&self, label: &L, source: &'a I) -> Result<Vec<&'a T>>
    where
        I: SpatialIndex<T> + ?Sized,
    {
        let indexes = self.indexes(label).ok_or(ClusterError::NoMatchingElement)?;
        Ok(source.get_many(indexes)?)
    }
}
