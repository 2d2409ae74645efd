use std::ops::Index;

use crate::Metric;

/// Pairwise distances over a small, fixed point set.
///
/// Only the `n * (n - 1) / 2` unique off-diagonal pairs are stored, row by
/// row: the pair `(i, j)` with `i < j` lives at
///
/// ```text
/// i * (2n - i - 1) / 2 + (j - i - 1)
/// ```
///
/// which is the number of pairs in the rows before `i` (a triangular-number
/// offset) plus the position within row `i`. The diagonal is always zero and
/// is not stored.
///
/// The M-tree builds one of these per node split so the O(capacity²)
/// promotion scan never calls the metric twice for the same pair.
///
/// # Example
///
/// ```
/// use unshape_neighbors::{DistanceMatrix, Euclidean};
///
/// let points = [[0.0, 0.0], [3.0, 4.0], [6.0, 8.0]];
/// let matrix = DistanceMatrix::new(&points, &Euclidean);
/// assert_eq!(matrix.get(0, 2), 10.0);
/// assert_eq!(matrix[(2, 1)], 5.0);
/// assert_eq!(matrix[(1, 1)], 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    len: usize,
    distances: Vec<f64>,
}

const ZERO: f64 = 0.0;

impl DistanceMatrix {
    /// Computes all pairwise distances of `points` under `metric`.
    pub fn new<T, M: Metric<T>>(points: &[T], metric: &M) -> Self {
        Self::from_fn(points.len(), |i, j| metric.distance(&points[i], &points[j]))
    }

    /// Builds a matrix over `len` points, calling `distance(i, j)` once per
    /// unique pair with `i < j`.
    pub fn from_fn(len: usize, mut distance: impl FnMut(usize, usize) -> f64) -> Self {
        let distances = unique_pairs(len).map(|(i, j)| distance(i, j)).collect();
        Self { len, distances }
    }

    /// Number of points the matrix covers.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the matrix covers no points.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Distance between points `i` and `j`.
    ///
    /// # Panics
    ///
    /// Panics if `i` or `j` is out of range.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self[(i, j)]
    }

    fn offset(&self, i: usize, j: usize) -> usize {
        let (lo, hi) = if i < j { (i, j) } else { (j, i) };
        lo * (2 * self.len - lo - 1) / 2 + (hi - lo - 1)
    }

    /// Expands the matrix into a full `len × len` table.
    pub fn to_rectangular(&self) -> Vec<Vec<f64>> {
        (0..self.len)
            .map(|i| (0..self.len).map(|j| self[(i, j)]).collect())
            .collect()
    }
}

impl Index<(usize, usize)> for DistanceMatrix {
    type Output = f64;

    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        assert!(
            i < self.len && j < self.len,
            "distance matrix index ({i}, {j}) out of range for {} points",
            self.len
        );
        if i == j {
            &ZERO
        } else {
            &self.distances[self.offset(i, j)]
        }
    }
}

/// All pairs `(i, j)` with `i < j < n`, ordered by `i` then `j`.
pub fn unique_pairs(n: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..n).flat_map(move |i| (i + 1..n).map(move |j| (i, j)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Euclidean;

    #[test]
    fn test_unique_pairs() {
        let pairs: Vec<_> = unique_pairs(4).collect();
        assert_eq!(pairs, vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);
        assert_eq!(unique_pairs(0).count(), 0);
        assert_eq!(unique_pairs(1).count(), 0);
    }

    #[test]
    fn test_stores_only_unique_pairs() {
        let points: Vec<[f64; 1]> = (0..6).map(|i| [i as f64]).collect();
        let matrix = DistanceMatrix::new(&points, &Euclidean);
        assert_eq!(matrix.distances.len(), 15);
        assert_eq!(matrix.len(), 6);
    }

    #[test]
    fn test_symmetric_with_zero_diagonal() {
        let points = [[0.0, 1.0], [2.0, 5.0], [-3.0, 4.0], [7.0, 7.0], [1.0, -1.0]];
        let matrix = DistanceMatrix::new(&points, &Euclidean);
        for i in 0..points.len() {
            assert_eq!(matrix[(i, i)], 0.0);
            for j in 0..points.len() {
                let expected = Euclidean.distance(&points[i], &points[j]);
                assert_eq!(matrix.get(i, j), expected);
                assert_eq!(matrix.get(i, j), matrix.get(j, i));
            }
        }
    }

    #[test]
    fn test_from_fn_calls_each_pair_once() {
        let mut calls = 0;
        let matrix = DistanceMatrix::from_fn(5, |i, j| {
            calls += 1;
            (i * 10 + j) as f64
        });
        assert_eq!(calls, 10);
        assert_eq!(matrix.get(3, 1), 13.0);
        assert_eq!(matrix.get(1, 3), 13.0);
    }

    #[test]
    fn test_to_rectangular() {
        let points = [[0.0], [1.0], [3.0]];
        let table = DistanceMatrix::new(&points, &Euclidean).to_rectangular();
        assert_eq!(
            table,
            vec![
                vec![0.0, 1.0, 3.0],
                vec![1.0, 0.0, 2.0],
                vec![3.0, 2.0, 0.0],
            ]
        );
    }

    #[test]
    fn test_empty_and_single() {
        assert!(DistanceMatrix::new::<[f64; 1], _>(&[], &Euclidean).is_empty());
        let single = DistanceMatrix::new(&[[4.0]], &Euclidean);
        assert_eq!(single.get(0, 0), 0.0);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_panics() {
        let matrix = DistanceMatrix::new(&[[0.0], [1.0]], &Euclidean);
        matrix.get(0, 2);
    }
}
