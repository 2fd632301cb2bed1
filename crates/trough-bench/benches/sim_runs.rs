//! Criterion benchmarks for whole simulation runs under contention.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use trough_arbiter::ArbiterMode;
use trough_bench::{contended_profile, roomy_profile, zero_delay};
use trough_sim::Simulation;

/// Benchmark: 16 actors fighting over 2 bowls, no eat or sleep time.
fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended");
    group.sample_size(20);
    for (name, mode) in [
        ("monitor", ArbiterMode::Monitor),
        ("dispatch", ArbiterMode::Dispatch),
    ] {
        let config = zero_delay(contended_profile(mode, 42));
        group.bench_function(name, |b| {
            b.iter(|| black_box(Simulation::run(&config).unwrap()));
        });
    }
    group.finish();
}

/// Benchmark: 8 actors over 16 bowls, no eat or sleep time.
fn bench_roomy(c: &mut Criterion) {
    let mut group = c.benchmark_group("roomy");
    group.sample_size(20);
    for (name, mode) in [
        ("monitor", ArbiterMode::Monitor),
        ("dispatch", ArbiterMode::Dispatch),
    ] {
        let config = zero_delay(roomy_profile(mode, 42));
        group.bench_function(name, |b| {
            b.iter(|| black_box(Simulation::run(&config).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_contended, bench_roomy);
criterion_main!(benches);
