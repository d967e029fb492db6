//! Measures raw append throughput, then random-order point-get latency,
//! against a single segment.

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use inkdb::key::Key;
use inkdb::segment::Segment;
use std::hint::black_box;
use tempfile::TempDir;

fn placeholder(i: usize) -> Vec<u8> {
    format!("Value Of i:{i}").into_bytes()
}

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("segment_append");
    for size in [100usize, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || {
                    let dir = TempDir::new().unwrap();
                    let path = dir.path().join("bench.txt");
                    (dir, Segment::open(path, size as u32 + 1).unwrap())
                },
                |(dir, mut segment)| {
                    for i in 0..size {
                        segment.auto_append(black_box(placeholder(i))).unwrap();
                    }
                    drop(dir);
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_random_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("segment_get_random_order");
    for size in [100usize, 1_000, 10_000] {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bench.txt");
        let mut segment = Segment::open(&path, size as u32 + 1).unwrap();
        let mut keys: Vec<Key> = Vec::with_capacity(size);
        for i in 0..size {
            keys.push(segment.auto_append(placeholder(i)).unwrap());
        }
        // a cheap deterministic shuffle, good enough to avoid sequential-access bias
        for i in 0..keys.len() {
            let j = (i * 2654435761 + 1) % keys.len();
            keys.swap(i, j);
        }

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                for key in &keys {
                    black_box(segment.get(*key).unwrap());
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_append, bench_random_get);
criterion_main!(benches);
