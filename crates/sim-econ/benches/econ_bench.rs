use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn bench_curves(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    c.bench_function("calculate_price 10k", |b| {
        b.iter(|| {
            for i in 0..10_000u32 {
                let demand = (i % 100) as f64;
                let supply = ((i * 7) % 100) as f64;
                let _ = black_box(sim_econ::calculate_price(
                    120.0, demand, supply, 1.0, 1.0, 0.02, &mut rng,
                ));
            }
        })
    });
    c.bench_function("calculate_demand 10k", |b| {
        b.iter(|| {
            for i in 0..10_000u32 {
                let quality = (i % 100) as f64;
                let _ = black_box(sim_econ::calculate_demand(
                    60.0,
                    90.0,
                    100.0,
                    quality,
                    40.0,
                    2_000_000,
                    &mut rng,
                ));
            }
        })
    });
}

criterion_group!(benches, bench_curves);
criterion_main!(benches);
