use std::fmt;
use std::ops::{Index, Range};

use tracing::{debug, warn};

use crate::{
    BoundedPriorityList, ByCoordinates, CoordinateSelector, Coordinates, HyperRect, Metric,
    NeighborError, Result, SpatialIndex,
};

// ============================================================================
// KD-Tree
// ============================================================================

/// A node in the KD-tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct KdNode {
    /// Backing-store index of the point held by this node.
    pub point: usize,
    /// Split dimension.
    pub axis: usize,
    /// Left child (coordinate `axis` ≤ this node's).
    pub left: Option<usize>,
    /// Right child (coordinate `axis` ≥ this node's).
    pub right: Option<usize>,
    /// Parent node, `None` for the root.
    pub parent: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// A pending subtree during construction: `order[start..end]` at `depth`.
struct BuildTask {
    start: usize,
    end: usize,
    depth: usize,
    parent: Option<(usize, Side)>,
}

/// A balanced KD-tree over any point type with a coordinate representation.
///
/// Points are kept in an append-only backing store; searches return indexes
/// into it. Coordinates are read once per point through a
/// [`CoordinateSelector`] (by default the [`Coordinates`] trait) and the
/// metric works on those coordinate slices.
///
/// # Rebuild on insert
///
/// Every [`add`](SpatialIndex::add) or [`add_all`](SpatialIndex::add_all)
/// call rebuilds the whole tree by median splitting: an O(n log n) sort per
/// call. Insert in batches where possible. Construction uses an explicit
/// work stack and the positional median keeps the tree height at
/// ⌈log2(n + 1)⌉ even when coordinates repeat.
///
/// # Example
///
/// ```
/// use unshape_neighbors::{Euclidean, KdTree, SpatialIndex};
///
/// let points = vec![[7.0, 2.0], [5.0, 4.0], [2.0, 3.0], [4.0, 7.0], [9.0, 6.0], [8.0, 1.0]];
/// let tree = KdTree::build(2, points, Euclidean).unwrap();
///
/// let nearest = tree.nearest_neighbors(&[9.0, 2.0], 2);
/// assert_eq!(nearest, vec![&[8.0, 1.0], &[7.0, 2.0]]);
///
/// let root = tree.root().unwrap();
/// assert_eq!(root.value(), &[7.0, 2.0]);
/// ```
pub struct KdTree<T, M, S = ByCoordinates> {
    dimensions: usize,
    metric: M,
    selector: S,
    points: Vec<T>,
    /// Row-major coordinates, `dimensions` values per point.
    coordinates: Vec<f64>,
    nodes: Vec<KdNode>,
    root: Option<usize>,
}

impl<T: Coordinates, M: Metric<[f64]>> KdTree<T, M, ByCoordinates> {
    /// Creates an empty tree over points implementing [`Coordinates`].
    pub fn new(dimensions: usize, metric: M) -> Result<Self> {
        Self::with_selector(dimensions, metric, ByCoordinates)
    }

    /// Builds a tree from an initial batch of points.
    pub fn build(
        dimensions: usize,
        points: impl IntoIterator<Item = T>,
        metric: M,
    ) -> Result<Self> {
        let mut tree = Self::new(dimensions, metric)?;
        tree.add_all(points)?;
        Ok(tree)
    }
}

impl<T, M: Metric<[f64]>, S: CoordinateSelector<T>> KdTree<T, M, S> {
    /// Creates an empty tree that reads coordinates through `selector`.
    ///
    /// ```
    /// use unshape_neighbors::{Euclidean, KdTree, SpatialIndex};
    ///
    /// struct City { name: &'static str, lat: f64, lon: f64 }
    ///
    /// let mut tree = KdTree::with_selector(2, Euclidean, |c: &City| vec![c.lat, c.lon]).unwrap();
    /// tree.add(City { name: "a", lat: 0.0, lon: 0.0 }).unwrap();
    /// tree.add(City { name: "b", lat: 5.0, lon: 5.0 }).unwrap();
    ///
    /// let probe = City { name: "?", lat: 4.0, lon: 4.5 };
    /// assert_eq!(tree.nearest_neighbors(&probe, 1)[0].name, "b");
    /// ```
    pub fn with_selector(dimensions: usize, metric: M, selector: S) -> Result<Self> {
        if dimensions == 0 {
            return Err(NeighborError::ZeroDimensions);
        }
        Ok(Self {
            dimensions,
            metric,
            selector,
            points: Vec::new(),
            coordinates: Vec::new(),
            nodes: Vec::new(),
            root: None,
        })
    }

    /// Number of dimensions the tree splits on.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// The metric used for all distance computations.
    pub fn metric(&self) -> &M {
        &self.metric
    }

    /// The backing store, in insertion order.
    pub fn points(&self) -> &[T] {
        &self.points
    }

    /// Coordinates of the point at backing-store `index`.
    pub fn coordinates_of(&self, index: usize) -> Option<&[f64]> {
        let start = index.checked_mul(self.dimensions)?;
        self.coordinates.get(start..start + self.dimensions)
    }

    fn coords(&self, index: usize) -> &[f64] {
        let start = index * self.dimensions;
        &self.coordinates[start..start + self.dimensions]
    }

    fn select(&self, item: &T) -> Result<Vec<f64>> {
        let coords = self.selector.select(item);
        if coords.len() != self.dimensions {
            return Err(NeighborError::DimensionMismatch {
                expected: self.dimensions,
                got: coords.len(),
            });
        }
        Ok(coords)
    }

    /// Navigator positioned at the root, or `None` if the tree is empty.
    pub fn root(&self) -> Option<KdNavigator<'_, T, M, S>> {
        self.root.map(|node| KdNavigator { tree: self, node })
    }

    /// Number of levels in the tree (0 when empty).
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut stack: Vec<(usize, usize)> = self.root.map(|r| (r, 1)).into_iter().collect();
        while let Some((id, depth)) = stack.pop() {
            height = height.max(depth);
            let node = &self.nodes[id];
            stack.extend(node.left.map(|c| (c, depth + 1)));
            stack.extend(node.right.map(|c| (c, depth + 1)));
        }
        height
    }

    /// Rebuilds the tree from scratch over the whole backing store.
    ///
    /// At each level the working set is stably sorted by the coordinate on
    /// `depth % dimensions`; the element at `len / 2` becomes the node, the
    /// elements before it the left subtree and those after it the right.
    /// Rebuilding twice from the same points gives the same tree.
    pub fn rebuild(&mut self) {
        self.nodes.clear();
        self.root = None;

        let dims = self.dimensions;
        let mut order: Vec<usize> = (0..self.points.len()).collect();
        let mut stack = vec![BuildTask {
            start: 0,
            end: order.len(),
            depth: 0,
            parent: None,
        }];
        let mut height = 0;

        while let Some(task) = stack.pop() {
            if task.start >= task.end {
                continue;
            }
            let axis = task.depth % dims;
            let coordinates = &self.coordinates;
            order[task.start..task.end].sort_by(|&a, &b| {
                coordinates[a * dims + axis].total_cmp(&coordinates[b * dims + axis])
            });

            let median = task.start + (task.end - task.start) / 2;
            let id = self.nodes.len();
            self.nodes.push(KdNode {
                point: order[median],
                axis,
                left: None,
                right: None,
                parent: task.parent.map(|(parent, _)| parent),
            });
            match task.parent {
                None => self.root = Some(id),
                Some((parent, Side::Left)) => self.nodes[parent].left = Some(id),
                Some((parent, Side::Right)) => self.nodes[parent].right = Some(id),
            }
            height = height.max(task.depth + 1);

            stack.push(BuildTask {
                start: median + 1,
                end: task.end,
                depth: task.depth + 1,
                parent: Some((id, Side::Right)),
            });
            stack.push(BuildTask {
                start: task.start,
                end: median,
                depth: task.depth + 1,
                parent: Some((id, Side::Left)),
            });
        }

        debug!(points = self.points.len(), height, "rebuilt kd-tree");
    }

    /// Indexes of the `k` points nearest to a coordinate vector, closest first.
    pub fn nearest_indexes_to(&self, target: &[f64], k: usize) -> Vec<usize> {
        if k == 0 || !self.accepts(target) {
            return Vec::new();
        }
        let mut found = BoundedPriorityList::new(k);
        if let Some(root) = self.root {
            let bounds = HyperRect::infinite(self.dimensions);
            self.search(root, target, &bounds, f64::INFINITY, &mut found);
        }
        found.into_elements()
    }

    /// Indexes of all points within `radius` of a coordinate vector, closest first.
    pub fn radial_indexes_around(&self, center: &[f64], radius: f64) -> Vec<usize> {
        if !self.accepts(center) {
            return Vec::new();
        }
        let mut found = BoundedPriorityList::unbounded();
        if let Some(root) = self.root {
            let bounds = HyperRect::infinite(self.dimensions);
            self.search(root, center, &bounds, radius, &mut found);
        }
        found.into_elements()
    }

    fn accepts(&self, target: &[f64]) -> bool {
        if target.len() == self.dimensions {
            return true;
        }
        warn!(
            expected = self.dimensions,
            got = target.len(),
            "kd-tree query has wrong dimensions"
        );
        false
    }

    /// Branch-and-bound descent.
    ///
    /// `bounds` is the region that can hold points of the subtree at `id`.
    /// The near half is searched first; the far half only if the distance
    /// from `target` to that half's closest point is within the current
    /// search radius. The node's own point is offered last. Points farther
    /// than `max_radius` are never offered.
    fn search(
        &self,
        id: usize,
        target: &[f64],
        bounds: &HyperRect,
        max_radius: f64,
        found: &mut BoundedPriorityList<usize, f64>,
    ) {
        let node = self.nodes[id];
        let point = self.coords(node.point);
        let split = point[node.axis];
        let (lower, upper) = bounds.split(node.axis, split);

        let (near, near_bounds, far, far_bounds) = if target[node.axis] <= split {
            (node.left, lower, node.right, upper)
        } else {
            (node.right, upper, node.left, lower)
        };

        if let Some(near) = near {
            self.search(near, target, &near_bounds, max_radius, found);
        }

        if let Some(far) = far {
            let closest = far_bounds.closest_point(target);
            let lower_bound = self.metric.distance(&closest, target);
            if lower_bound <= Self::search_radius(found, max_radius) {
                self.search(far, target, &far_bounds, max_radius, found);
            }
        }

        let distance = self.metric.distance(point, target);
        if distance <= max_radius {
            found.add(node.point, distance);
        }
    }

    fn search_radius(found: &BoundedPriorityList<usize, f64>, max_radius: f64) -> f64 {
        match found.worst_priority() {
            Some(&worst) if found.is_full() => worst.min(max_radius),
            _ => max_radius,
        }
    }
}

impl<T, M: Metric<[f64]>, S: CoordinateSelector<T>> SpatialIndex<T> for KdTree<T, M, S> {
    /// Appends `item` and rebuilds the tree.
    fn add(&mut self, item: T) -> Result<usize> {
        let coords = self.select(&item)?;
        self.coordinates.extend_from_slice(&coords);
        self.points.push(item);
        self.rebuild();
        Ok(self.points.len() - 1)
    }

    /// Appends every item and rebuilds once.
    ///
    /// If any item has the wrong number of coordinates nothing is added.
    fn add_all<I>(&mut self, items: I) -> Result<Range<usize>>
    where
        I: IntoIterator<Item = T>,
    {
        let start = self.points.len();
        let mut batch = Vec::new();
        let mut coords = Vec::new();
        for item in items {
            coords.extend(self.select(&item)?);
            batch.push(item);
        }
        if batch.is_empty() {
            return Ok(start..start);
        }
        self.coordinates.extend(coords);
        self.points.extend(batch);
        self.rebuild();
        Ok(start..self.points.len())
    }

    fn nearest_neighbor_indexes(&self, target: &T, k: usize) -> Vec<usize> {
        match self.select(target) {
            Ok(coords) => self.nearest_indexes_to(&coords, k),
            Err(err) => {
                warn!(%err, "kd-tree query target rejected");
                Vec::new()
            }
        }
    }

    fn radial_search_indexes(&self, center: &T, radius: f64) -> Vec<usize> {
        match self.select(center) {
            Ok(coords) => self.radial_indexes_around(&coords, radius),
            Err(err) => {
                warn!(%err, "kd-tree query center rejected");
                Vec::new()
            }
        }
    }

    fn get(&self, index: usize) -> Option<&T> {
        self.points.get(index)
    }

    fn len(&self) -> usize {
        self.points.len()
    }
}

impl<T, M, S> Index<usize> for KdTree<T, M, S> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.points[index]
    }
}

impl<T, M, S> fmt::Debug for KdTree<T, M, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KdTree")
            .field("dimensions", &self.dimensions)
            .field("len", &self.points.len())
            .field("nodes", &self.nodes.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Navigation
// ============================================================================

/// Read-only cursor over the nodes of a [`KdTree`].
pub struct KdNavigator<'a, T, M, S> {
    tree: &'a KdTree<T, M, S>,
    node: usize,
}

impl<T, M, S> Clone for KdNavigator<'_, T, M, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, M, S> Copy for KdNavigator<'_, T, M, S> {}

impl<'a, T, M, S> KdNavigator<'a, T, M, S> {
    fn at(&self, node: Option<usize>) -> Option<Self> {
        node.map(|node| KdNavigator {
            tree: self.tree,
            node,
        })
    }

    fn node(&self) -> &'a KdNode {
        &self.tree.nodes[self.node]
    }

    /// The point stored at this node.
    pub fn value(&self) -> &'a T {
        &self.tree.points[self.node().point]
    }

    /// Backing-store index of the point stored at this node.
    pub fn index(&self) -> usize {
        self.node().point
    }

    /// Dimension this node splits on.
    pub fn axis(&self) -> usize {
        self.node().axis
    }

    /// Coordinates of the point stored at this node.
    pub fn coordinates(&self) -> &'a [f64] {
        let start = self.node().point * self.tree.dimensions;
        &self.tree.coordinates[start..start + self.tree.dimensions]
    }

    /// Left child.
    pub fn left(&self) -> Option<Self> {
        self.at(self.node().left)
    }

    /// Right child.
    pub fn right(&self) -> Option<Self> {
        self.at(self.node().right)
    }

    /// Parent node, `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        self.at(self.node().parent)
    }
}

// ============================================================================
// Tests
// ============================================================================
