use glam::{DVec2, DVec3, Vec2, Vec3};

// ============================================================================
// Metric
// ============================================================================

/// A distance function between two points.
///
/// Implementations are assumed to be symmetric, non-negative and to satisfy
/// the triangle inequality. None of this is checked: a function that breaks
/// the axioms makes the pruning in [`KdTree`](crate::KdTree) and
/// [`MTree`](crate::MTree) return wrong answers without raising an error.
///
/// Any `Fn(&T, &T) -> f64` is a metric:
///
/// ```
/// use unshape_neighbors::Metric;
///
/// let hamming = |a: &u32, b: &u32| (a ^ b).count_ones() as f64;
/// assert_eq!(hamming.distance(&0b1010, &0b0110), 2.0);
/// ```
pub trait Metric<T: ?Sized> {
    /// Returns the distance between `a` and `b`.
    fn distance(&self, a: &T, b: &T) -> f64;
}

impl<T: ?Sized, F> Metric<T> for F
where
    F: Fn(&T, &T) -> f64,
{
    fn distance(&self, a: &T, b: &T) -> f64 {
        self(a, b)
    }
}

// ============================================================================
// Coordinates
// ============================================================================

/// A point with a fixed-length numeric coordinate representation.
///
/// Required by the [`KdTree`](crate::KdTree) default selector. The
/// [`MTree`](crate::MTree) and [`LinearScan`](crate::LinearScan) never look at
/// coordinates.
pub trait Coordinates {
    /// Number of coordinates.
    fn dimensions(&self) -> usize;

    /// Coordinate along `axis`. `axis` is always `< dimensions()`.
    fn coordinate(&self, axis: usize) -> f64;

    /// Collects all coordinates into a vector.
    fn to_coordinates(&self) -> Vec<f64> {
        (0..self.dimensions()).map(|axis| self.coordinate(axis)).collect()
    }
}

impl Coordinates for [f64] {
    fn dimensions(&self) -> usize {
        self.len()
    }

    fn coordinate(&self, axis: usize) -> f64 {
        self[axis]
    }

    fn to_coordinates(&self) -> Vec<f64> {
        self.to_vec()
    }
}

impl Coordinates for Vec<f64> {
    fn dimensions(&self) -> usize {
        self.len()
    }

    fn coordinate(&self, axis: usize) -> f64 {
        self[axis]
    }

    fn to_coordinates(&self) -> Vec<f64> {
        self.clone()
    }
}

impl<const N: usize> Coordinates for [f64; N] {
    fn dimensions(&self) -> usize {
        N
    }

    fn coordinate(&self, axis: usize) -> f64 {
        self[axis]
    }
}

impl<const N: usize> Coordinates for [f32; N] {
    fn dimensions(&self) -> usize {
        N
    }

    fn coordinate(&self, axis: usize) -> f64 {
        self[axis] as f64
    }
}

impl Coordinates for Vec2 {
    fn dimensions(&self) -> usize {
        2
    }

    fn coordinate(&self, axis: usize) -> f64 {
        self[axis] as f64
    }
}

impl Coordinates for Vec3 {
    fn dimensions(&self) -> usize {
        3
    }

    fn coordinate(&self, axis: usize) -> f64 {
        self[axis] as f64
    }
}

impl Coordinates for DVec2 {
    fn dimensions(&self) -> usize {
        2
    }

    fn coordinate(&self, axis: usize) -> f64 {
        self[axis]
    }
}

impl Coordinates for DVec3 {
    fn dimensions(&self) -> usize {
        3
    }

    fn coordinate(&self, axis: usize) -> f64 {
        self[axis]
    }
}

// ============================================================================
// Coordinate selectors
// ============================================================================

/// Maps a point to its coordinate vector for the [`KdTree`](crate::KdTree).
///
/// Any `Fn(&T) -> Vec<f64>` is a selector, which lets a tree index types that
/// do not implement [`Coordinates`] themselves.
pub trait CoordinateSelector<T> {
    /// Returns the coordinates of `item`.
    fn select(&self, item: &T) -> Vec<f64>;
}

impl<T, F> CoordinateSelector<T> for F
where
    F: Fn(&T) -> Vec<f64>,
{
    fn select(&self, item: &T) -> Vec<f64> {
        self(item)
    }
}

/// The default selector: reads coordinates through the [`Coordinates`] trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByCoordinates;

impl<T: Coordinates> CoordinateSelector<T> for ByCoordinates {
    fn select(&self, item: &T) -> Vec<f64> {
        item.to_coordinates()
    }
}

// ============================================================================
// Built-in metrics
// ============================================================================

/// Straight-line (L2) distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct Euclidean;

/// Squared L2 distance.
///
/// Orders points like [`Euclidean`] but is not a metric (it breaks the
/// triangle inequality), so it is only safe with [`LinearScan`](crate::LinearScan).
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredEuclidean;

/// Taxicab (L1) distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct Manhattan;

/// Maximum per-axis (L∞) distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct Chebyshev;

/// Per-axis absolute differences over the shared dimensions of `a` and `b`.
fn axis_deltas<'a, C: Coordinates + ?Sized>(
    a: &'a C,
    b: &'a C,
) -> impl Iterator<Item = f64> + 'a {
    debug_assert_eq!(a.dimensions(), b.dimensions(), "points differ in dimensions");
    let dims = a.dimensions().min(b.dimensions());
    (0..dims).map(move |axis| (a.coordinate(axis) - b.coordinate(axis)).abs())
}

impl<C: Coordinates + ?Sized> Metric<C> for SquaredEuclidean {
    fn distance(&self, a: &C, b: &C) -> f64 {
        axis_deltas(a, b).map(|d| d * d).sum()
    }
}

impl<C: Coordinates + ?Sized> Metric<C> for Euclidean {
    fn distance(&self, a: &C, b: &C) -> f64 {
        SquaredEuclidean.distance(a, b).sqrt()
    }
}

impl<C: Coordinates + ?Sized> Metric<C> for Manhattan {
    fn distance(&self, a: &C, b: &C) -> f64 {
        axis_deltas(a, b).sum()
    }
}

impl<C: Coordinates + ?Sized> Metric<C> for Chebyshev {
    fn distance(&self, a: &C, b: &C) -> f64 {
        axis_deltas(a, b).fold(0.0, f64::max)
    }
}
