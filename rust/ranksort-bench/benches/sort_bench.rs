//! Criterion benchmarks for the ranksort worker pool.
//!
//! Compares the local fallback sort against the distributed pool across
//! input sizes, pool sizes, and both delegation schemes. Pool numbers
//! include thread spawn/join, so small inputs mostly measure protocol
//! overhead, which is the interesting part.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use ranksort_bench::scrambled;
use ranksort_core::{fallback, Topology};
use ranksort_rt::{sort, PoolConfig};

const SEED: u32 = 314159;

fn bench_fallback(c: &mut Criterion) {
    let mut group = c.benchmark_group("fallback_sort");
    for size in [1_000usize, 10_000, 100_000] {
        let input = scrambled(size, SEED);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            b.iter(|| {
                let mut values = input.clone();
                fallback::sort(black_box(&mut values));
                values
            });
        });
    }
    group.finish();
}

fn bench_pool_schemes(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_sort");
    for topology in [Topology::Doubling, Topology::HeapIndex] {
        for size in [10_000usize, 100_000] {
            let input = scrambled(size, SEED);
            let config = PoolConfig {
                workers: 4,
                topology,
            };
            group.throughput(Throughput::Elements(size as u64));
            group.bench_with_input(
                BenchmarkId::new(topology.to_string(), size),
                &input,
                |b, input| {
                    b.iter(|| sort(black_box(input.clone()), &config).unwrap());
                },
            );
        }
    }
    group.finish();
}

fn bench_pool_widths(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_width");
    let size = 100_000usize;
    let input = scrambled(size, SEED);
    for workers in [1usize, 2, 4, 8] {
        let config = PoolConfig {
            workers,
            topology: Topology::Doubling,
        };
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(workers),
            &input,
            |b, input| {
                b.iter(|| sort(black_box(input.clone()), &config).unwrap());
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_fallback,
    bench_pool_schemes,
    bench_pool_widths
);
criterion_main!(benches);
