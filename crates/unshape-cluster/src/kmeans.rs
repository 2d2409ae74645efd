use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;
use unshape_neighbors::{Metric, SpatialIndex};

use crate::util::{max_index, min_index};
use crate::{ClusterError, Clusters, Result};

/// Configuration for [`KMeans`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KMeansConfig {
    /// Number of clusters.
    pub clusters: usize,
    /// Upper bound on assign/update rounds.
    pub max_iterations: usize,
    /// Seed for choosing the initial centroids.
    pub seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            clusters: 2,
            max_iterations: 100,
            seed: 0,
        }
    }
}

impl KMeansConfig {
    /// Creates a config for `clusters` clusters with default limits.
    pub fn new(clusters: usize) -> Self {
        Self {
            clusters,
            ..Default::default()
        }
    }
}

/// Outcome of a k-means run.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit<T> {
    /// Final centroid of each cluster.
    pub centroids: Vec<T>,
    /// Cluster of each point, by backing-store index.
    pub labels: Vec<usize>,
    /// Assign/update rounds performed.
    pub iterations: usize,
    /// `true` if the centroids stopped moving before `max_iterations`.
    pub converged: bool,
}

impl<T> KMeansFit<T> {
    /// The points of each cluster, as indexes into the clustered store.
    pub fn clusters(&self) -> Clusters<usize> {
        Clusters::from_labels(self.labels.iter().copied())
    }
}

/// Lloyd's k-means over the points of any [`SpatialIndex`].
///
/// Initial centroids are chosen farthest-first from a random starting point.
/// Each round assigns every point to its nearest centroid under the metric,
/// then replaces each centroid with the central tendency of its members. A
/// centroid whose cluster empties keeps its previous value. Stops once no
/// centroid changes or after `max_iterations` rounds.
///
/// # Example
///
/// ```
/// use unshape_cluster::{KMeans, KMeansConfig, mean};
/// use unshape_neighbors::{Euclidean, LinearScan};
///
/// let points = LinearScan::from_points(
///     vec![[0.0, 0.0], [0.0, 1.0], [9.0, 9.0], [10.0, 9.0]],
///     Euclidean,
/// );
/// let fit = KMeans::new(KMeansConfig::new(2), Euclidean).fit(&points, mean).unwrap();
///
/// assert!(fit.converged);
/// assert_eq!(fit.labels[0], fit.labels[1]);
/// assert_ne!(fit.labels[0], fit.labels[2]);
/// ```
#[derive(Debug, Clone)]
pub struct KMeans<M> {
    config: KMeansConfig,
    metric: M,
}

impl<M> KMeans<M> {
    /// Creates a clusterer measuring point-to-centroid distance with `metric`.
    pub fn new(config: KMeansConfig, metric: M) -> Self {
        Self { config, metric }
    }

    /// Cluster count, iteration limit and seed.
    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }

    /// Runs k-means, seeding the initial centroids from the config.
    pub fn fit<T, I, C>(&self, data: &I, central_tendency: C) -> Result<KMeansFit<T>>
    where
        T: Clone + PartialEq,
        M: Metric<T>,
        I: SpatialIndex<T> + ?Sized,
        C: Fn(&[&T]) -> T,
    {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        self.fit_with_rng(data, central_tendency, &mut rng)
    }

    /// Runs k-means, drawing the initial centroids from `rng`.
    pub fn fit_with_rng<T, I, C, R>(
        &self,
        data: &I,
        central_tendency: C,
        rng: &mut R,
    ) -> Result<KMeansFit<T>>
    where
        T: Clone + PartialEq,
        M: Metric<T>,
        I: SpatialIndex<T> + ?Sized,
        C: Fn(&[&T]) -> T,
        R: Rng,
    {
        let k = self.config.clusters;
        if k == 0 {
            return Err(ClusterError::ZeroClusters);
        }
        let points = data.get_many(&(0..data.len()).collect::<Vec<_>>())?;
        if points.len() < k {
            return Err(ClusterError::NotEnoughPoints {
                clusters: k,
                points: points.len(),
            });
        }

        let mut centroids: Vec<T> = self
            .initial_centroids(&points, rng)?
            .into_iter()
            .map(|i| points[i].clone())
            .collect();
        let mut labels = vec![0; points.len()];
        let mut distances = vec![0.0; k];

        let mut iterations = 0;
        let mut converged = false;
        while iterations < self.config.max_iterations {
            iterations += 1;

            let mut changed = 0;
            for (label, point) in labels.iter_mut().zip(&points) {
                for (distance, centroid) in distances.iter_mut().zip(&centroids) {
                    *distance = self.metric.distance(*point, centroid);
                }
                let nearest = min_index(&distances)?;
                if *label != nearest {
                    changed += 1;
                }
                *label = nearest;
            }

            let mut moved = 0;
            for (cluster, centroid) in centroids.iter_mut().enumerate() {
                let members: Vec<&T> = points
                    .iter()
                    .zip(&labels)
                    .filter(|&(_, &label)| label == cluster)
                    .map(|(&point, _)| point)
                    .collect();
                if members.is_empty() {
                    continue;
                }
                let updated = central_tendency(&members);
                if updated != *centroid {
                    moved += 1;
                    *centroid = updated;
                }
            }

            debug!(iteration = iterations, changed, moved, "k-means round");
            if moved == 0 {
                converged = true;
                break;
            }
        }

        Ok(KMeansFit {
            centroids,
            labels,
            iterations,
            converged,
        })
    }

    /// Farthest-first seeding: one random point, then repeatedly the point
    /// farthest from every centroid chosen so far.
    fn initial_centroids<T, R>(&self, points: &[&T], rng: &mut R) -> Result<Vec<usize>>
    where
        M: Metric<T>,
        R: Rng,
    {
        let first = rng.random_range(0..points.len());
        let mut chosen = vec![first];
        let mut nearest: Vec<f64> = points
            .iter()
            .map(|&p| self.metric.distance(p, points[first]))
            .collect();
        while chosen.len() < self.config.clusters {
            let next = max_index(&nearest)?;
            chosen.push(next);
            for (d, &p) in nearest.iter_mut().zip(points) {
                *d = d.min(self.metric.distance(p, points[next]));
            }
        }
        Ok(chosen)
    }
}

/// Component-wise mean, for use as a k-means central tendency.
///
/// The mean of no points is the origin.
pub fn mean<const N: usize>(members: &[&[f64; N]]) -> [f64; N] {
    let mut sum = [0.0; N];
    for member in members {
        for (s, v) in sum.iter_mut().zip(member.iter()) {
            *s += v;
        }
    }
    if !members.is_empty() {
        let n = members.len() as f64;
        for s in &mut sum {
            *s /= n;
        }
    }
    sum
}
