#![allow(dead_code)]

use rand::SeedableRng;
use rand::rngs::StdRng;
use rustml_core::Tensor;
use rustml_geometric::{Set2Set, Set2SetConfig};

/// `[n, channels]` features drawn uniformly from [-1, 1) with a fixed seed.
pub fn seeded_features(n: usize, channels: usize, seed: u64) -> Tensor {
    let mut rng = StdRng::seed_from_u64(seed);
    Tensor::uniform([n, channels], -1.0, 1.0, &mut rng).unwrap()
}

/// Set2Set with LSTM weights drawn from a fixed seed.
pub fn seeded_layer(config: Set2SetConfig, seed: u64) -> Set2Set {
    Set2Set::with_rng(config, &mut StdRng::seed_from_u64(seed)).unwrap()
}

/// Set-id vector for consecutive sets of the given sizes.
pub fn batch_for_sizes(sizes: &[usize]) -> Vec<usize> {
    sizes
        .iter()
        .enumerate()
        .flat_map(|(id, &n)| std::iter::repeat(id).take(n))
        .collect()
}

/// Row `row` of a 2-D tensor.
pub fn row(t: &Tensor, row: usize) -> Vec<f32> {
    let width = t.shape()[1];
    t.as_slice()[row * width..(row + 1) * width].to_vec()
}

/// Gather rows of a 2-D tensor in the given order.
pub fn gather_rows(t: &Tensor, order: &[usize]) -> Tensor {
    let width = t.shape()[1];
    let data = order.iter().flat_map(|&r| row(t, r)).collect();
    Tensor::from_vec(data, [order.len(), width]).unwrap()
}

/// Assert that two f32 slices are element-wise close within a tolerance.
pub fn assert_f32_near(actual: &[f32], expected: &[f32], tolerance: f32, msg: &str) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "{}: length mismatch (actual={}, expected={})",
        msg,
        actual.len(),
        expected.len()
    );
    for (i, (&a, &e)) in actual.iter().zip(expected.iter()).enumerate() {
        assert!(
            (a - e).abs() <= tolerance,
            "{}: element [{}] mismatch: actual={}, expected={}, diff={}, tolerance={}",
            msg,
            i,
            a,
            e,
            (a - e).abs(),
            tolerance
        );
    }
}
