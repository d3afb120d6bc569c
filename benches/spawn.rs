use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use std::hint::black_box;

use corral::prelude::*;

mod common;
use common::*;

fn spawn_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn");

    for &(label, n) in &[("spawn_10k", AGENTS_SMALL), ("spawn_100k", AGENTS_MED)] {
        group.bench_function(label, |b| {
            b.iter_batched(
                World::new,
                |mut world| {
                    populate(&mut world, n);
                    black_box(world);
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, spawn_benchmark);
criterion_main!(benches);
