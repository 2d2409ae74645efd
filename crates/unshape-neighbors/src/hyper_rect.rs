/// An N-dimensional axis-aligned box.
///
/// The KD-tree search tracks one of these per branch: it is the region in
/// which the points of an unvisited subtree must lie, and its closest point
/// to the query gives a cheap lower bound on their distance.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HyperRect {
    /// Minimum corner.
    pub min: Vec<f64>,
    /// Maximum corner.
    pub max: Vec<f64>,
}

impl HyperRect {
    /// Creates a box from its min and max corners.
    ///
    /// Both corners must have the same length.
    pub fn new(min: Vec<f64>, max: Vec<f64>) -> Self {
        debug_assert_eq!(min.len(), max.len(), "corner dimensions differ");
        Self { min, max }
    }

    /// A box spanning all representable coordinates.
    pub fn infinite(dimensions: usize) -> Self {
        Self {
            min: vec![f64::MIN; dimensions],
            max: vec![f64::MAX; dimensions],
        }
    }

    /// Number of dimensions.
    pub fn dimensions(&self) -> usize {
        self.min.len()
    }

    /// Checks if the box contains a point (boundary inclusive).
    pub fn contains_point(&self, point: &[f64]) -> bool {
        point
            .iter()
            .zip(self.min.iter().zip(&self.max))
            .all(|(&p, (&lo, &hi))| p >= lo && p <= hi)
    }

    /// Returns the point on or inside the box nearest to `target`.
    ///
    /// Each coordinate is clamped into `[min, max]`, so a target inside the
    /// box is returned unchanged.
    pub fn closest_point(&self, target: &[f64]) -> Vec<f64> {
        target
            .iter()
            .zip(self.min.iter().zip(&self.max))
            .map(|(&t, (&lo, &hi))| t.max(lo).min(hi))
            .collect()
    }

    /// Splits the box at `value` along `axis` into (lower, upper) halves.
    ///
    /// Both halves include the splitting plane.
    pub fn split(&self, axis: usize, value: f64) -> (HyperRect, HyperRect) {
        let mut lower = self.clone();
        let mut upper = self.clone();
        lower.max[axis] = value;
        upper.min[axis] = value;
        (lower, upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infinite_contains_everything() {
        let rect = HyperRect::infinite(3);
        assert_eq!(rect.dimensions(), 3);
        assert!(rect.contains_point(&[1e300, -1e300, 0.0]));
        assert_eq!(rect.closest_point(&[4.0, -2.0, 7.5]), vec![4.0, -2.0, 7.5]);
    }

    #[test]
    fn test_closest_point_clamps() {
        let rect = HyperRect::new(vec![0.0, 0.0], vec![10.0, 5.0]);
        assert_eq!(rect.closest_point(&[-3.0, 2.0]), vec![0.0, 2.0]);
        assert_eq!(rect.closest_point(&[12.0, 9.0]), vec![10.0, 5.0]);
        assert_eq!(rect.closest_point(&[4.0, 4.0]), vec![4.0, 4.0]);
    }

    #[test]
    fn test_split() {
        let rect = HyperRect::new(vec![0.0, 0.0], vec![10.0, 10.0]);
        let (lower, upper) = rect.split(1, 3.0);
        assert_eq!(lower, HyperRect::new(vec![0.0, 0.0], vec![10.0, 3.0]));
        assert_eq!(upper, HyperRect::new(vec![0.0, 3.0], vec![10.0, 10.0]));
        assert!(lower.contains_point(&[5.0, 3.0]));
        assert!(upper.contains_point(&[5.0, 3.0]));
    }
}
