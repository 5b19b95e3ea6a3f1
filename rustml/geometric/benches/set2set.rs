use criterion::{Criterion, criterion_group, criterion_main, black_box};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rustml_core::Tensor;
use rustml_geometric::{PaddingMode, Set2Set, Set2SetConfig, to_batch};

fn make_batch(num_sets: usize, max_size: usize, channels: usize) -> (Tensor, Vec<usize>) {
    let batch: Vec<usize> = (0..num_sets)
        .flat_map(|s| std::iter::repeat(s).take(1 + (s * 13) % max_size))
        .collect();
    let x = Tensor::from_fn([batch.len(), channels], |i| (i as f32 * 0.01).sin());
    (x, batch)
}

fn bench_to_batch(c: &mut Criterion) {
    let (x, batch) = make_batch(128, 64, 32);
    c.bench_function("to_batch_128sets_c32", |b| {
        b.iter(|| to_batch(black_box(&x), black_box(&batch)).unwrap())
    });
}

fn bench_forward(c: &mut Criterion) {
    let mut group = c.benchmark_group("set2set_forward");
    for (num_sets, channels) in [(32, 16), (128, 32)] {
        let (x, batch) = make_batch(num_sets, 48, channels);
        for padding in [PaddingMode::Unmasked, PaddingMode::Masked] {
            let config = Set2SetConfig::new(channels, 3).with_padding(padding);
            let s2s = Set2Set::with_rng(config, &mut StdRng::seed_from_u64(0)).unwrap();
            group.bench_function(format!("sets={}_c={}_{:?}", num_sets, channels, padding), |b| {
                b.iter(|| s2s.forward(black_box(&x), black_box(&batch)).unwrap())
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_to_batch, bench_forward);
criterion_main!(benches);
