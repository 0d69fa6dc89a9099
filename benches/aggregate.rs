//! Aggregation benchmark suite
//!
//! Cost of reducing a case to its summary and of the determinism check, at the
//! case sizes the profiles produce and beyond.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use faas_compare_bench::determinism::check_deterministic;
use faas_compare_bench::schema::Sample;
use faas_compare_bench::stats::summarize;
use faas_compare_bench::Backend;

/// Deterministic pseudo-latencies so runs are comparable.
fn samples(count: usize) -> Vec<Sample> {
    (0..count as u64)
        .map(|i| {
            let jitter = i.wrapping_mul(0x9e37_79b9) % 10_000;
            Sample {
                host_total_ns: 3_000_000 + jitter * 7,
                startup_ns: 2_500_000 + jitter * 5,
                exec_ns: 1_000 + jitter % 97,
                result: "120".to_string(),
            }
        })
        .collect()
}

fn bench_summarize(c: &mut Criterion) {
    let mut group = c.benchmark_group("summarize");

    for count in [5usize, 30, 1_000, 100_000] {
        let data = samples(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &data, |bencher, data| {
            bencher.iter(|| summarize(black_box(data)))
        });
    }

    group.finish();
}

fn bench_determinism(c: &mut Criterion) {
    let mut group = c.benchmark_group("determinism_check");

    for count in [30usize, 10_000] {
        let data = samples(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &data, |bencher, data| {
            bencher.iter(|| check_deterministic(Backend::Wasm, 5, black_box(data)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_summarize, bench_determinism);
criterion_main!(benches);
