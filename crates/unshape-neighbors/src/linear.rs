use std::fmt;
use std::ops::Index;

use crate::{BoundedPriorityList, Metric, Result, SpatialIndex};

/// Brute-force neighbor search: every query measures every point.
///
/// O(n) per query with no build cost. Useful for small sets, metrics too
/// irregular for pruning, and as the reference the trees are tested against.
/// Equal distances come back in insertion order.
pub struct LinearScan<T, M> {
    metric: M,
    points: Vec<T>,
}

impl<T, M: Metric<T>> LinearScan<T, M> {
    /// Creates an empty scan over `metric`.
    pub fn new(metric: M) -> Self {
        Self {
            metric,
            points: Vec::new(),
        }
    }

    /// Wraps an existing point set.
    pub fn from_points(points: Vec<T>, metric: M) -> Self {
        Self { metric, points }
    }

    /// The distance function.
    pub fn metric(&self) -> &M {
        &self.metric
    }

    /// All points in insertion order.
    pub fn points(&self) -> &[T] {
        &self.points
    }

    fn scan(&self, target: &T, found: &mut BoundedPriorityList<usize, f64>, radius: f64) {
        for (index, point) in self.points.iter().enumerate() {
            let distance = self.metric.distance(point, target);
            if distance <= radius {
                found.add(index, distance);
            }
        }
    }
}

impl<T, M: Metric<T>> SpatialIndex<T> for LinearScan<T, M> {
    fn add(&mut self, item: T) -> Result<usize> {
        self.points.push(item);
        Ok(self.points.len() - 1)
    }

    fn nearest_neighbor_indexes(&self, target: &T, k: usize) -> Vec<usize> {
        if k == 0 {
            return Vec::new();
        }
        let mut found = BoundedPriorityList::new(k);
        self.scan(target, &mut found, f64::INFINITY);
        found.into_elements()
    }

    /// Results are sorted by distance, closest first.
    fn radial_search_indexes(&self, center: &T, radius: f64) -> Vec<usize> {
        let mut found = BoundedPriorityList::unbounded();
        self.scan(center, &mut found, radius);
        found.into_elements()
    }

    fn get(&self, index: usize) -> Option<&T> {
        self.points.get(index)
    }

    fn len(&self) -> usize {
        self.points.len()
    }
}

impl<T, M> Index<usize> for LinearScan<T, M> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.points[index]
    }
}

impl<T: fmt::Debug, M> fmt::Debug for LinearScan<T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinearScan")
            .field("points", &self.points)
            .finish_non_exhaustive()
    }
}
