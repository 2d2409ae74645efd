use std::collections::BTreeMap;
use std::marker::PhantomData;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use unshape_neighbors::SpatialIndex;

use crate::util::max_index;
use crate::{ClusterError, Result};

/// How a vote between equally popular labels is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TieBreak {
    /// The smallest tied label wins.
    #[default]
    Lowest,
    /// A tied label is drawn from an RNG seeded with this value, so the same
    /// query always gets the same answer.
    Seeded(u64),
}

/// Configuration for [`KNearestNeighbors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KNearestNeighborsConfig {
    /// Number of neighbors that vote.
    pub k: usize,
    /// Rule for settling tied votes.
    pub tie_break: TieBreak,
}

impl Default for KNearestNeighborsConfig {
    fn default() -> Self {
        Self {
            k: 5,
            tie_break: TieBreak::Lowest,
        }
    }
}

impl KNearestNeighborsConfig {
    /// Creates a config with `k` voters and the default tie break.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ..Default::default()
        }
    }
}

/// Supervised k-nearest-neighbors classifier.
///
/// Training points live in any [`SpatialIndex`]; `labels[i]` is the label of
/// the point at backing-store index `i`. A query is labelled by majority vote
/// of its `k` nearest training points.
///
/// # Example
///
/// ```
/// use unshape_cluster::{KNearestNeighbors, KNearestNeighborsConfig};
/// use unshape_neighbors::{Euclidean, MTree};
///
/// let mut knn =
///     KNearestNeighbors::new(MTree::new(Euclidean), KNearestNeighborsConfig::new(3)).unwrap();
/// knn.train(
///     vec![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [9.0, 9.0], [9.0, 8.0]],
///     vec!["cold", "cold", "cold", "hot", "hot"],
/// )
/// .unwrap();
///
/// assert_eq!(knn.classify(&[0.5, 0.5]).unwrap(), "cold");
/// assert_eq!(knn.classify(&[8.0, 8.0]).unwrap(), "hot");
/// ```
#[derive(Debug)]
pub struct KNearestNeighbors<T, L, I> {
    index: I,
    labels: Vec<L>,
    config: KNearestNeighborsConfig,
    _points: PhantomData<fn() -> T>,
}

impl<T, L, I> KNearestNeighbors<T, L, I>
where
    L: Ord + Clone,
    I: SpatialIndex<T>,
{
    /// Creates a classifier over an empty index.
    ///
    /// Fails with [`ClusterError::LengthMismatch`] if `index` already holds
    /// points; use [`with_labels`](Self::with_labels) for a pre-filled index.
    pub fn new(index: I, config: KNearestNeighborsConfig) -> Result<Self> {
        Self::with_labels(index, Vec::new(), config)
    }

    /// Creates a classifier over an index whose points are already labelled.
    pub fn with_labels(index: I, labels: Vec<L>, config: KNearestNeighborsConfig) -> Result<Self> {
        if index.len() != labels.len() {
            return Err(ClusterError::LengthMismatch {
                points: index.len(),
                labels: labels.len(),
            });
        }
        Ok(Self {
            index,
            labels,
            config,
            _points: PhantomData,
        })
    }

    /// Adds labelled training points.
    pub fn train(&mut self, points: Vec<T>, labels: Vec<L>) -> Result<()> {
        if points.len() != labels.len() {
            return Err(ClusterError::LengthMismatch {
                points: points.len(),
                labels: labels.len(),
            });
        }
        let added = self.index.add_all(points)?;
        debug_assert_eq!(added, self.labels.len()..self.labels.len() + labels.len());
        self.labels.extend(labels);
        Ok(())
    }

    /// The underlying index.
    pub fn index(&self) -> &I {
        &self.index
    }

    /// Training labels by backing-store index.
    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    /// Voter count and tie rule.
    pub fn config(&self) -> &KNearestNeighborsConfig {
        &self.config
    }

    /// Vote counts among the `k` nearest training points, by label.
    pub fn votes(&self, target: &T) -> Result<BTreeMap<L, usize>> {
        if self.labels.is_empty() {
            return Err(ClusterError::Untrained);
        }
        let mut votes = BTreeMap::new();
        for index in self.index.nearest_neighbor_indexes(target, self.config.k) {
            let label = self.labels.get(index).ok_or(ClusterError::NoMatchingElement)?;
            *votes.entry(label.clone()).or_insert(0) += 1;
        }
        Ok(votes)
    }

    /// The majority label among the `k` nearest training points.
    ///
    /// Ties are settled by the configured [`TieBreak`].
    pub fn classify(&self, target: &T) -> Result<L> {
        match self.config.tie_break {
            TieBreak::Lowest => {
                let votes = self.votes(target)?;
                let counts: Vec<f64> = votes.values().map(|&n| n as f64).collect();
                let winner = max_index(&counts)?;
                votes
                    .into_keys()
                    .nth(winner)
                    .ok_or(ClusterError::NoMatchingElement)
            }
            TieBreak::Seeded(seed) => {
                self.classify_with_rng(target, &mut StdRng::seed_from_u64(seed))
            }
        }
    }

    /// Like [`classify`](Self::classify) but draws tied labels from `rng`.
    pub fn classify_with_rng<R: Rng>(&self, target: &T, rng: &mut R) -> Result<L> {
        let votes = self.votes(target)?;
        let most = votes.values().copied().max().ok_or(ClusterError::NoMatchingElement)?;
        let mut tied: Vec<L> = votes
            .into_iter()
            .filter(|&(_, n)| n == most)
            .map(|(label, _)| label)
            .collect();
        let pick = rng.random_range(0..tied.len());
        Ok(tied.swap_remove(pick))
    }

    /// Classifies every target.
    pub fn classify_all<'a>(&self, targets: impl IntoIterator<Item = &'a T>) -> Result<Vec<L>>
    where
        T: 'a,
    {
        targets.into_iter().map(|t| self.classify(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unshape_neighbors::{Euclidean, KdTree, LinearScan, NeighborError};

    fn two_blobs() -> (Vec<[f64; 2]>, Vec<u8>) {
        let points = vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [0.0, 1.0],
            [1.0, 1.0],
            [10.0, 10.0],
            [11.0, 10.0],
            [10.0, 11.0],
        ];
        let labels = vec![0, 0, 0, 0, 1, 1, 1];
        (points, labels)
    }

    #[test]
    fn test_classify_majority() {
        let (points, labels) = two_blobs();
        let mut knn =
            KNearestNeighbors::new(LinearScan::new(Euclidean), Default::default()).unwrap();
        knn.train(points, labels).unwrap();

        assert_eq!(knn.classify(&[0.4, 0.6]).unwrap(), 0);
        assert_eq!(knn.classify(&[10.5, 10.5]).unwrap(), 1);
        assert_eq!(knn.classify_all(&[[2.0, 2.0], [9.0, 9.0]]).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_works_over_kdtree() {
        let (points, labels) = two_blobs();
        let tree = KdTree::build(2, points, Euclidean).unwrap();
        let knn =
            KNearestNeighbors::with_labels(tree, labels, KNearestNeighborsConfig::new(3)).unwrap();
        assert_eq!(knn.classify(&[9.0, 10.0]).unwrap(), 1);
    }

    #[test]
    fn test_tie_breaks() {
        let points = vec![[-1.0], [1.0]];
        let index = LinearScan::from_points(points, Euclidean);
        let config = KNearestNeighborsConfig {
            k: 2,
            tie_break: TieBreak::Lowest,
        };
        let knn = KNearestNeighbors::with_labels(index, vec!['b', 'a'], config).unwrap();

        let votes = knn.votes(&[0.0]).unwrap();
        assert_eq!(votes.get(&'a'), Some(&1));
        assert_eq!(votes.get(&'b'), Some(&1));
        assert_eq!(knn.classify(&[0.0]).unwrap(), 'a');

        let index = LinearScan::from_points(vec![[-1.0], [1.0]], Euclidean);
        let config = KNearestNeighborsConfig {
            k: 2,
            tie_break: TieBreak::Seeded(7),
        };
        let knn = KNearestNeighbors::with_labels(index, vec!['b', 'a'], config).unwrap();
        let first = knn.classify(&[0.0]).unwrap();
        for _ in 0..10 {
            assert_eq!(knn.classify(&[0.0]).unwrap(), first);
        }
        assert!(first == 'a' || first == 'b');
    }

    #[test]
    fn test_errors() {
        let mut knn: KNearestNeighbors<[f64; 1], u8, _> =
            KNearestNeighbors::new(LinearScan::new(Euclidean), Default::default()).unwrap();
        assert_eq!(knn.classify(&[0.0]), Err(ClusterError::Untrained));
        assert_eq!(
            knn.train(vec![[0.0], [1.0]], vec![1]),
            Err(ClusterError::LengthMismatch {
                points: 2,
                labels: 1
            })
        );

        let tree = KdTree::new(2, Euclidean).unwrap();
        let mut knn = KNearestNeighbors::new(tree, Default::default()).unwrap();
        assert_eq!(
            knn.train(vec![vec![1.0, 2.0, 3.0]], vec![0u8]),
            Err(ClusterError::Neighbors(NeighborError::DimensionMismatch {
                expected: 2,
                got: 3
            }))
        );
        assert!(knn.labels().is_empty());
    }

    #[test]
    fn test_new_rejects_prefilled_index() {
        let index = LinearScan::from_points(vec![[100.0]], Euclidean);
        let result = KNearestNeighbors::<_, char, _>::new(index, KNearestNeighborsConfig::new(1));
        assert_eq!(
            result.unwrap_err(),
            ClusterError::LengthMismatch {
                points: 1,
                labels: 0
            }
        );
    }

    #[test]
    fn test_labels_follow_training_order() {
        let mut index = LinearScan::new(Euclidean);
        index.add([100.0]).unwrap();
        let mut knn =
            KNearestNeighbors::with_labels(index, vec!['z'], KNearestNeighborsConfig::new(1))
                .unwrap();
        knn.train(vec![[0.0], [50.0]], vec!['a', 'b']).unwrap();

        assert_eq!(knn.classify(&[0.0]).unwrap(), 'a');
        assert_eq!(knn.classify(&[49.0]).unwrap(), 'b');
        assert_eq!(knn.classify(&[99.0]).unwrap(), 'z');
    }
}
