#![no_main]

use libfuzzer_sys::fuzz_target;
use unshape_neighbors::{Euclidean, LinearScan, MTree, MTreeConfig, Metric, SpatialIndex};

fuzz_target!(|data: &[u8]| {
    let Some((&capacity, rest)) = data.split_first() else {
        return;
    };
    let Ok(mut tree) = MTree::with_config(Euclidean, MTreeConfig::new(capacity as usize % 8 + 2))
    else {
        return;
    };
    let mut scan = LinearScan::new(Euclidean);

    // Byte pairs become small integer points, so distance ties are frequent.
    for pair in rest.chunks_exact(2) {
        let point = [f64::from(pair[0] % 32), f64::from(pair[1] % 32)];
        let _ = tree.add(point);
        let _ = scan.add(point);
    }

    // Insertion should never panic, and queries must agree with brute force.
    for target in [[0.0, 0.0], [15.5, 15.5], [31.0, 7.0]] {
        let distances = |found: Vec<&[f64; 2]>| -> Vec<f64> {
            found.into_iter().map(|p| Euclidean.distance(p, &target)).collect()
        };
        assert_eq!(
            distances(tree.nearest_neighbors(&target, 5)),
            distances(scan.nearest_neighbors(&target, 5))
        );

        let mut inside = tree.radial_search_indexes(&target, 6.0);
        inside.sort_unstable();
        let mut expected = scan.radial_search_indexes(&target, 6.0);
        expected.sort_unstable();
        assert_eq!(inside, expected);
    }
});
