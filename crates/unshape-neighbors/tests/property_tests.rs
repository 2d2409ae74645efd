//! Property-based tests for the neighbor indexes.
//!
//! Every index is checked against a full sort of the point set, and the
//! helper structures against their documented invariants.

use proptest::prelude::*;
use unshape_neighbors::{
    BoundedPriorityList, DistanceMatrix, Euclidean, KdTree, MNodeRef, MTree, MTreeConfig,
    Manhattan, Metric, SortOrder, SpatialIndex,
};

fn brute_force_knn(points: &[[f64; 3]], target: &[f64; 3], k: usize) -> Vec<f64> {
    let mut distances: Vec<f64> = points.iter().map(|p| Euclidean.distance(p, target)).collect();
    distances.sort_by(|a, b| a.total_cmp(b));
    distances.truncate(k);
    distances
}

fn brute_force_radial(points: &[[f64; 3]], center: &[f64; 3], radius: f64) -> Vec<usize> {
    (0..points.len())
        .filter(|&i| Euclidean.distance(&points[i], center) <= radius)
        .collect()
}

fn distances_of<I: SpatialIndex<[f64; 3]>>(index: &I, target: &[f64; 3], k: usize) -> Vec<f64> {
    index
        .nearest_neighbors(target, k)
        .into_iter()
        .map(|p| Euclidean.distance(p, target))
        .collect()
}

/// Points on a coarse lattice so exact distance ties are common.
fn arb_point() -> impl Strategy<Value = [f64; 3]> {
    (-20i32..20, -20i32..20, -20i32..20).prop_map(|(x, y, z)| [x as f64, y as f64, z as f64])
}

fn arb_points(max: usize) -> impl Strategy<Value = Vec<[f64; 3]>> {
    proptest::collection::vec(arb_point(), 0..max)
}

fn subtree_values<T, M>(node: MNodeRef<'_, T, M>, out: &mut Vec<usize>) {
    for entry in node.entries() {
        match entry.child() {
            Some(child) => subtree_values(child, out),
            None => out.push(entry.index()),
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        ..ProptestConfig::default()
    })]

    // ─────────────────────────────────────────────────────────────────────────
    // Exactness
    // ─────────────────────────────────────────────────────────────────────────

    /// KD-tree k-nearest distances equal a brute-force sort.
    #[test]
    fn kdtree_knn_is_exact(points in arb_points(120), target in arb_point(), k in 0usize..20) {
        let tree = KdTree::build(3, points.clone(), Euclidean).unwrap();
        prop_assert_eq!(distances_of(&tree, &target, k), brute_force_knn(&points, &target, k));
    }

    /// M-tree k-nearest distances equal a brute-force sort.
    #[test]
    fn mtree_knn_is_exact(
        points in arb_points(120),
        target in arb_point(),
        k in 0usize..20,
        capacity in 2usize..8,
    ) {
        let mut tree = MTree::with_config(Euclidean, MTreeConfig::new(capacity)).unwrap();
        tree.add_all(points.clone()).unwrap();
        prop_assert_eq!(distances_of(&tree, &target, k), brute_force_knn(&points, &target, k));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Radial correctness
    // ─────────────────────────────────────────────────────────────────────────

    /// Both trees return exactly the closed ball.
    #[test]
    fn radial_is_closed_ball(
        points in arb_points(120),
        center in arb_point(),
        radius in 0.0f64..30.0,
        capacity in 2usize..8,
    ) {
        let expected = brute_force_radial(&points, &center, radius);

        let kd = KdTree::build(3, points.clone(), Euclidean).unwrap();
        let mut found = kd.radial_search_indexes(&center, radius);
        found.sort_unstable();
        prop_assert_eq!(&found, &expected);

        let mut m = MTree::with_config(Euclidean, MTreeConfig::new(capacity)).unwrap();
        m.add_all(points.clone()).unwrap();
        let mut found = m.radial_search_indexes(&center, radius);
        found.sort_unstable();
        prop_assert_eq!(&found, &expected);
    }

    /// KD-tree radial results come back closest first.
    #[test]
    fn kdtree_radial_sorted(points in arb_points(80), center in arb_point()) {
        let tree = KdTree::build(3, points.clone(), Manhattan).unwrap();
        let found: Vec<f64> = tree
            .radial_search(&center, 25.0)
            .into_iter()
            .map(|p| Manhattan.distance(p, &center))
            .collect();
        prop_assert!(found.windows(2).all(|w| w[0] <= w[1]));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Structure
    // ─────────────────────────────────────────────────────────────────────────

    /// Covering radii bound every subtree and all leaves share one depth.
    #[test]
    fn mtree_invariants_hold(points in arb_points(150), capacity in 2usize..6) {
        let mut tree = MTree::with_config(Euclidean, MTreeConfig::new(capacity)).unwrap();
        tree.add_all(points.clone()).unwrap();
        let Some(root) = tree.root() else {
            prop_assert!(points.is_empty());
            return Ok(());
        };

        let mut stack = vec![(root, 1)];
        while let Some((node, depth)) = stack.pop() {
            prop_assert!(node.len() <= capacity);
            for entry in node.entries() {
                prop_assert_eq!(entry.distance_from_parent().is_none(), node.is_root());
                match entry.child() {
                    None => {
                        prop_assert!(entry.covering_radius().is_none());
                        prop_assert_eq!(depth, tree.height());
                    }
                    Some(child) => {
                        let radius = entry.covering_radius().unwrap();
                        let mut below = Vec::new();
                        subtree_values(child, &mut below);
                        for i in below {
                            let d = Euclidean.distance(entry.value(), &points[i]);
                            prop_assert!(d <= radius + 1e-9);
                        }
                        stack.push((child, depth + 1));
                    }
                }
            }
        }
    }

    /// Rebuilding from the same sequence gives the same tree shape.
    #[test]
    fn kdtree_rebuild_is_deterministic(points in arb_points(60)) {
        let a = KdTree::build(3, points.clone(), Euclidean).unwrap();
        let mut b = KdTree::build(3, points.clone(), Euclidean).unwrap();
        b.rebuild();

        let mut stack = vec![(a.root(), b.root())];
        while let Some((x, y)) = stack.pop() {
            match (x, y) {
                (None, None) => {}
                (Some(x), Some(y)) => {
                    prop_assert_eq!(x.index(), y.index());
                    stack.push((x.left(), y.left()));
                    stack.push((x.right(), y.right()));
                }
                _ => prop_assert!(false, "tree shapes differ"),
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// A bounded list never exceeds capacity and stays sorted.
    #[test]
    fn bounded_list_respects_bound(
        priorities in proptest::collection::vec(-100i32..100, 0..200),
        capacity in 1usize..20,
        descending in any::<bool>(),
    ) {
        let order = if descending { SortOrder::Descending } else { SortOrder::Ascending };
        let mut list = BoundedPriorityList::with_order(capacity, order);
        for (i, &p) in priorities.iter().enumerate() {
            list.add(i, p);
            prop_assert!(list.len() <= capacity);
            let sorted = list.priorities().windows(2).all(|w| match order {
                SortOrder::Ascending => w[0] <= w[1],
                SortOrder::Descending => w[0] >= w[1],
            });
            prop_assert!(sorted);
        }

        let mut expected = priorities.clone();
        expected.sort_unstable();
        if descending {
            expected.reverse();
        }
        expected.truncate(capacity);
        prop_assert_eq!(list.priorities(), expected.as_slice());
    }

    /// Distance matrices are symmetric, zero on the diagonal and match the metric.
    #[test]
    fn distance_matrix_symmetric(points in arb_points(25)) {
        let matrix = DistanceMatrix::new(&points, &Euclidean);
        prop_assert_eq!(matrix.len(), points.len());
        for i in 0..points.len() {
            prop_assert_eq!(matrix[(i, i)], 0.0);
            for j in 0..points.len() {
                prop_assert_eq!(matrix[(i, j)], matrix[(j, i)]);
                prop_assert_eq!(matrix[(i, j)], Euclidean.distance(&points[i], &points[j]));
            }
        }
    }
}
