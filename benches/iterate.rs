use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use corral::prelude::*;

mod common;
use common::*;

fn iterate_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterate");

    for &(label, n) in &[("sum_10k", AGENTS_SMALL), ("sum_100k", AGENTS_MED)] {
        let mut world = World::new();
        populate(&mut world, n);

        group.bench_function(label, |b| {
            b.iter(|| {
                let query = Query::<(Read<Position>, Read<Velocity>)>::new(&world);
                let mut sum = 0.0f32;
                for entity in &query {
                    sum += entity.get::<Position, _>().x * entity.get::<Velocity, _>().dx;
                }
                black_box(sum);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, iterate_benchmark);
criterion_main!(benches);
