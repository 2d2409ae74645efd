use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::ops::Index;

use tracing::{debug, trace};

use crate::{
    BoundedPriorityList, DistanceMatrix, Metric, NeighborError, Result, SpatialIndex,
    unique_pairs,
};

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for an [`MTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MTreeConfig {
    /// Maximum number of entries per node. Must be at least 2.
    pub capacity: usize,
}

impl Default for MTreeConfig {
    fn default() -> Self {
        Self { capacity: 16 }
    }
}

impl MTreeConfig {
    /// Creates a config with the given node capacity.
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

// ============================================================================
// Nodes
// ============================================================================

type NodeId = usize;

/// Where a node hangs in the tree: the entry `slot` of node `node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ParentLink {
    node: NodeId,
    slot: usize,
}

/// A routing object (internal nodes) or a data object (leaves).
#[derive(Debug, Clone, PartialEq)]
struct MEntry {
    /// Backing-store index of the object.
    value: usize,
    /// Distance to the routing object of the enclosing node's parent entry.
    /// `None` in the root.
    distance_from_parent: Option<f64>,
    /// Upper bound on the distance to anything below `child`. `None` in leaves.
    covering_radius: Option<f64>,
    child: Option<NodeId>,
}

#[derive(Debug, Clone, Default)]
struct MNode {
    entries: Vec<MEntry>,
    parent: Option<ParentLink>,
}

impl MNode {
    fn is_leaf(&self) -> bool {
        self.entries.iter().all(|entry| entry.child.is_none())
    }
}

/// One side of a node split.
struct Promotion {
    value: usize,
    radius: f64,
    members: Vec<MEntry>,
}

/// A node waiting in the best-first queue, smallest `bound` first.
#[derive(Debug)]
struct Pending {
    bound: f64,
    sequence: usize,
    node: NodeId,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap.
        other
            .bound
            .total_cmp(&self.bound)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

// ============================================================================
// M-Tree
// ============================================================================

/// A balanced metric-space tree.
///
/// Unlike [`KdTree`](crate::KdTree) the M-tree needs no coordinates: it only
/// ever calls the metric on pairs of points, and prunes with the triangle
/// inequality. Every internal entry stores a routing object with a covering
/// radius bounding its whole subtree; every leaf sits at the same depth.
///
/// Insertion is incremental. A full leaf is split by promoting the pair of
/// entries whose partitions have the smallest larger covering radius, and
/// splits cascade towards the root, which is the only place the tree grows.
///
/// Results are exact only when the metric is symmetric and satisfies the
/// triangle inequality; violations are not detected.
///
/// # Example
///
/// ```
/// use unshape_neighbors::{MTree, MTreeConfig, SpatialIndex};
///
/// // Any distance function works, no coordinates required.
/// let edit = |a: &&str, b: &&str| a.len().abs_diff(b.len()) as f64;
/// let mut tree = MTree::with_config(edit, MTreeConfig::new(4)).unwrap();
/// tree.add_all(["a", "bb", "ccc", "dddd", "eeeee", "ffffff"]).unwrap();
///
/// assert_eq!(tree.nearest_neighbors(&"xyz", 1), vec![&"ccc"]);
/// assert!(tree.height() >= 2);
/// ```
pub struct MTree<T, M> {
    metric: M,
    capacity: usize,
    points: Vec<T>,
    nodes: Vec<MNode>,
    root: NodeId,
}

impl<T, M: Metric<T>> MTree<T, M> {
    /// Creates an empty tree with the default node capacity.
    pub fn new(metric: M) -> Self {
        Self::empty(metric, MTreeConfig::default().capacity)
    }

    /// Creates an empty tree with the given configuration.
    pub fn with_config(metric: M, config: MTreeConfig) -> Result<Self> {
        if config.capacity < 2 {
            return Err(NeighborError::InvalidCapacity(config.capacity));
        }
        Ok(Self::empty(metric, config.capacity))
    }

    fn empty(metric: M, capacity: usize) -> Self {
        Self {
            metric,
            capacity,
            points: Vec::new(),
            nodes: vec![MNode::default()],
            root: 0,
        }
    }

    /// The distance function.
    pub fn metric(&self) -> &M {
        &self.metric
    }

    /// Maximum entries per node.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The backing store, in insertion order.
    pub fn points(&self) -> &[T] {
        &self.points
    }

    /// View of the root node, or `None` if the tree is empty.
    pub fn root(&self) -> Option<MNodeRef<'_, T, M>> {
        if self.points.is_empty() {
            return None;
        }
        Some(MNodeRef {
            tree: self,
            id: self.root,
        })
    }

    /// Number of levels (0 when empty). All leaves are at this depth.
    pub fn height(&self) -> usize {
        if self.points.is_empty() {
            return 0;
        }
        let mut height = 1;
        let mut id = self.root;
        while let Some(child) = self.nodes[id].entries.first().and_then(|e| e.child) {
            height += 1;
            id = child;
        }
        height
    }

    /// Number of nodes (0 when empty).
    pub fn node_count(&self) -> usize {
        if self.points.is_empty() { 0 } else { self.nodes.len() }
    }

    fn distance(&self, a: usize, b: usize) -> f64 {
        self.metric.distance(&self.points[a], &self.points[b])
    }

    fn distance_to(&self, a: usize, target: &T) -> f64 {
        self.metric.distance(&self.points[a], target)
    }

    /// Routing object of the entry that points at `id`.
    fn parent_value(&self, id: NodeId) -> Option<usize> {
        self.nodes[id]
            .parent
            .map(|link| self.nodes[link.node].entries[link.slot].value)
    }

    // ------------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------------

    fn insert(&mut self, value: usize) {
        let mut id = self.root;
        while let Some(child) = self.choose_subtree(id, value) {
            id = child;
        }

        let entry = MEntry {
            value,
            distance_from_parent: self.parent_value(id).map(|p| self.distance(p, value)),
            covering_radius: None,
            child: None,
        };
        if self.nodes[id].entries.len() < self.capacity {
            self.nodes[id].entries.push(entry);
        } else {
            self.split(id, entry);
        }
    }

    /// Picks the child of internal node `id` to descend into for `value`,
    /// growing its covering radius if needed. `None` at a leaf.
    ///
    /// Prefers the closest entry whose ball already contains `value`;
    /// otherwise the entry needing the least radius growth.
    fn choose_subtree(&mut self, id: NodeId, value: usize) -> Option<NodeId> {
        let mut inside: Option<(usize, f64)> = None;
        let mut growth: Option<(usize, f64, f64)> = None;

        for (slot, entry) in self.nodes[id].entries.iter().enumerate() {
            entry.child?;
            let distance = self.distance(entry.value, value);
            let radius = entry.covering_radius.unwrap_or(0.0);
            if distance < radius {
                if inside.is_none_or(|(_, best)| distance < best) {
                    inside = Some((slot, distance));
                }
            } else if growth.is_none_or(|(_, best, _)| distance - radius < best) {
                growth = Some((slot, distance - radius, distance));
            }
        }

        let slot = match (inside, growth) {
            (Some((slot, _)), _) => slot,
            (None, Some((slot, _, distance))) => {
                self.nodes[id].entries[slot].covering_radius = Some(distance);
                slot
            }
            (None, None) => return None,
        };
        trace!(node = id, slot, "m-tree descent");
        self.nodes[id].entries[slot].child
    }

    /// Splits full node `id`, cascading upward while parents are full.
    fn split(&mut self, mut id: NodeId, mut overflow: MEntry) {
        loop {
            let mut entries = std::mem::take(&mut self.nodes[id].entries);
            entries.push(overflow);
            let internal = entries.iter().any(|entry| entry.child.is_some());
            let (mut first, mut second) = self.promote(entries, internal);

            let sibling = self.nodes.len();
            self.nodes.push(MNode::default());
            self.attach(id, std::mem::take(&mut first.members));
            self.attach(sibling, std::mem::take(&mut second.members));

            let routing = |promotion: &Promotion, child: NodeId| MEntry {
                value: promotion.value,
                distance_from_parent: None,
                covering_radius: Some(promotion.radius),
                child: Some(child),
            };

            let Some(link) = self.nodes[id].parent else {
                let root = self.nodes.len();
                self.nodes.push(MNode::default());
                let entries = vec![routing(&first, id), routing(&second, sibling)];
                self.attach(root, entries);
                self.root = root;
                debug!(height = self.height(), nodes = self.nodes.len(), "m-tree root split");
                return;
            };

            let grandparent = self.parent_value(link.node);
            let mut promoted_first = routing(&first, id);
            let mut promoted_second = routing(&second, sibling);
            promoted_first.distance_from_parent =
                grandparent.map(|g| self.distance(g, promoted_first.value));
            promoted_second.distance_from_parent =
                grandparent.map(|g| self.distance(g, promoted_second.value));

            self.nodes[link.node].entries[link.slot] = promoted_first;
            debug!(node = id, sibling, parent = link.node, "m-tree node split");

            let parent = &mut self.nodes[link.node];
            if parent.entries.len() < self.capacity {
                let slot = parent.entries.len();
                parent.entries.push(promoted_second);
                self.nodes[sibling].parent = Some(ParentLink {
                    node: link.node,
                    slot,
                });
                return;
            }
            id = link.node;
            overflow = promoted_second;
        }
    }

    /// Installs `entries` as node `id`'s entries and repoints their children.
    fn attach(&mut self, id: NodeId, entries: Vec<MEntry>) {
        for (slot, entry) in entries.iter().enumerate() {
            if let Some(child) = entry.child {
                self.nodes[child].parent = Some(ParentLink { node: id, slot });
            }
        }
        self.nodes[id].entries = entries;
    }

    /// Chooses two routing objects among `entries` and partitions them.
    ///
    /// Every unordered pair is tried; the others join whichever candidate is
    /// nearer (the first on ties). The winning pair has the smallest larger
    /// covering radius, first pair on ties. For internal entries a member's
    /// own covering radius is added to its distance.
    fn promote(&self, entries: Vec<MEntry>, internal: bool) -> (Promotion, Promotion) {
        let n = entries.len();
        let matrix =
            DistanceMatrix::from_fn(n, |i, j| self.distance(entries[i].value, entries[j].value));
        let joins_first = |i: usize, a: usize, b: usize| {
            i == a || (i != b && matrix[(i, a)] <= matrix[(i, b)])
        };
        let extent = |entry: &MEntry, distance: f64| {
            if internal {
                distance + entry.covering_radius.unwrap_or(0.0)
            } else {
                distance
            }
        };

        let mut best = (f64::INFINITY, 0, 1);
        for (a, b) in unique_pairs(n) {
            let mut radii = (0.0f64, 0.0f64);
            for (i, entry) in entries.iter().enumerate() {
                if joins_first(i, a, b) {
                    radii.0 = radii.0.max(extent(entry, matrix[(i, a)]));
                } else {
                    radii.1 = radii.1.max(extent(entry, matrix[(i, b)]));
                }
            }
            let score = radii.0.max(radii.1);
            if score < best.0 {
                best = (score, a, b);
            }
        }

        let (_, a, b) = best;
        let mut first = Promotion {
            value: entries[a].value,
            radius: 0.0,
            members: Vec::new(),
        };
        let mut second = Promotion {
            value: entries[b].value,
            radius: 0.0,
            members: Vec::new(),
        };
        for (i, mut entry) in entries.into_iter().enumerate() {
            let (side, distance) = if joins_first(i, a, b) {
                (&mut first, matrix[(i, a)])
            } else {
                (&mut second, matrix[(i, b)])
            };
            side.radius = side.radius.max(extent(&entry, distance));
            entry.distance_from_parent = Some(distance);
            side.members.push(entry);
        }
        (first, second)
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    /// Depth-first search pruned by the triangle inequality.
    ///
    /// Pruning bounds are widened by [`rounding_slack`]; only the final
    /// per-point test is exact.
    fn radial_from(&self, id: NodeId, center: &T, radius: f64, found: &mut Vec<usize>) {
        let is_root = id == self.root;
        let parent_to_center = self.parent_value(id).map(|p| self.distance_to(p, center));

        for entry in &self.nodes[id].entries {
            let reach = radius + entry.covering_radius.unwrap_or(0.0);
            if let (Some(pc), Some(dfp)) = (parent_to_center, entry.distance_from_parent) {
                if (pc - dfp).abs() > reach + rounding_slack(pc + dfp + reach) {
                    continue;
                }
            }
            match entry.child {
                Some(child) if is_root => self.radial_from(child, center, radius, found),
                Some(child) => {
                    let distance = self.distance_to(entry.value, center);
                    if distance <= reach + rounding_slack(distance + reach) {
                        self.radial_from(child, center, radius, found);
                    }
                }
                None => {
                    if self.distance_to(entry.value, center) <= radius {
                        found.push(entry.value);
                    }
                }
            }
        }
    }

    /// Best-first search over nodes ordered by a lower bound on distance.
    fn nearest_from_root(&self, target: &T, k: usize) -> Vec<usize> {
        let mut found: BoundedPriorityList<Option<usize>, f64> = BoundedPriorityList::new(k);
        found.add(None, f64::INFINITY);
        let worst = |found: &BoundedPriorityList<Option<usize>, f64>| {
            found.worst_priority().copied().unwrap_or(f64::INFINITY)
        };

        let mut queue = BinaryHeap::new();
        let mut sequence = 0;
        queue.push(Pending {
            bound: 0.0,
            sequence,
            node: self.root,
        });

        while let Some(Pending { bound, node, .. }) = queue.pop() {
            if found.is_full() && bound >= worst(&found) {
                break;
            }
            for entry in &self.nodes[node].entries {
                let distance = self.distance_to(entry.value, target);
                match entry.child {
                    Some(child) => {
                        let radius = entry.covering_radius.unwrap_or(0.0);
                        let slack = rounding_slack(distance + radius);
                        let bound = (distance - radius - slack).max(0.0);
                        if bound < worst(&found) {
                            sequence += 1;
                            queue.push(Pending {
                                bound,
                                sequence,
                                node: child,
                            });
                        }
                    }
                    None => {
                        found.add(Some(entry.value), distance);
                    }
                }
            }
        }

        found.into_elements().into_iter().flatten().collect()
    }
}

/// Float error allowed in a pruning bound whose operands sum to `scale`.
///
/// Covering radii and parent distances are rounded sums, so a bound computed
/// from them can land a few ulps past a point lying exactly on the query
/// radius.
fn rounding_slack(scale: f64) -> f64 {
    const ULPS: f64 = 64.0;
    scale * ULPS * f64::EPSILON + f64::EPSILON
}

impl<T, M: Metric<T>> SpatialIndex<T> for MTree<T, M> {
    fn add(&mut self, item: T) -> Result<usize> {
        let index = self.points.len();
        self.points.push(item);
        self.insert(index);
        Ok(index)
    }

    fn nearest_neighbor_indexes(&self, target: &T, k: usize) -> Vec<usize> {
        if k == 0 || self.points.is_empty() {
            return Vec::new();
        }
        self.nearest_from_root(target, k)
    }

    /// Results come in depth-first tree order, not sorted by distance.
    fn radial_search_indexes(&self, center: &T, radius: f64) -> Vec<usize> {
        let mut found = Vec::new();
        self.radial_from(self.root, center, radius, &mut found);
        found
    }

    fn get(&self, index: usize) -> Option<&T> {
        self.points.get(index)
    }

    fn len(&self) -> usize {
        self.points.len()
    }
}

impl<T, M> Index<usize> for MTree<T, M> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.points[index]
    }
}

impl<T, M> fmt::Debug for MTree<T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MTree")
            .field("capacity", &self.capacity)
            .field("len", &self.points.len())
            .field("nodes", &self.nodes.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Views
// ============================================================================

/// Read-only view of an M-tree node.
pub struct MNodeRef<'a, T, M> {
    tree: &'a MTree<T, M>,
    id: NodeId,
}

impl<T, M> Clone for MNodeRef<'_, T, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, M> Copy for MNodeRef<'_, T, M> {}

impl<'a, T, M> MNodeRef<'a, T, M> {
    /// Returns `true` if no entry has a child.
    pub fn is_leaf(&self) -> bool {
        self.tree.nodes[self.id].is_leaf()
    }

    /// Returns `true` for the root node.
    pub fn is_root(&self) -> bool {
        self.id == self.tree.root
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.tree.nodes[self.id].entries.len()
    }

    /// Returns `true` if the node holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The node's entries, in order.
    pub fn entries(&self) -> impl Iterator<Item = MEntryRef<'a, T, M>> + 'a {
        let (tree, node) = (self.tree, self.id);
        (0..self.len()).map(move |slot| MEntryRef { tree, node, slot })
    }

    /// The entry routing to this node, `None` at the root.
    pub fn parent_entry(&self) -> Option<MEntryRef<'a, T, M>> {
        self.tree.nodes[self.id].parent.map(|link| MEntryRef {
            tree: self.tree,
            node: link.node,
            slot: link.slot,
        })
    }
}

/// Read-only view of an entry in an M-tree node.
pub struct MEntryRef<'a, T, M> {
    tree: &'a MTree<T, M>,
    node: NodeId,
    slot: usize,
}

impl<T, M> Clone for MEntryRef<'_, T, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, M> Copy for MEntryRef<'_, T, M> {}

impl<'a, T, M> MEntryRef<'a, T, M> {
    fn entry(&self) -> &'a MEntry {
        &self.tree.nodes[self.node].entries[self.slot]
    }

    /// Backing-store index of the entry's object.
    pub fn index(&self) -> usize {
        self.entry().value
    }

    /// The entry's object.
    pub fn value(&self) -> &'a T {
        &self.tree.points[self.entry().value]
    }

    /// Distance to the parent routing object, `None` in the root node.
    pub fn distance_from_parent(&self) -> Option<f64> {
        self.entry().distance_from_parent
    }

    /// Covering radius of the subtree, `None` for leaf entries.
    pub fn covering_radius(&self) -> Option<f64> {
        self.entry().covering_radius
    }

    /// The subtree this entry routes to.
    pub fn child(&self) -> Option<MNodeRef<'a, T, M>> {
        self.entry().child.map(|id| MNodeRef {
            tree: self.tree,
            id,
        })
    }

    /// The node holding this entry.
    pub fn node(&self) -> MNodeRef<'a, T, M> {
        MNodeRef {
            tree: self.tree,
            id: self.node,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
