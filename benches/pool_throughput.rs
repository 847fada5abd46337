//! Benchmarks for submission, dispatch and waiting

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use taskpool_rs::prelude::*;

fn spin(iterations: u64) -> u64 {
    (0..iterations).fold(0u64, |acc, x| acc.wrapping_mul(31).wrapping_add(x))
}

fn bench_enqueue_wait(c: &mut Criterion) {
    let pool = ThreadPool::with_threads(4).expect("Failed to create pool");
    let mut group = c.benchmark_group("enqueue_wait");

    for size in [10, 100, 1_000].iter() {
        group.bench_with_input(BenchmarkId::new("group", size), size, |b, &size| {
            b.iter(|| {
                let sink = Arc::new(AtomicU64::new(0));
                let mut tasks = TaskGroup::new(&pool);
                for n in 0..size {
                    let sink = sink.clone();
                    tasks.enqueue(
                        move || {
                            sink.fetch_add(spin(black_box(n)), Ordering::Relaxed);
                        },
                        TaskPriority::Normal,
                    );
                }
                tasks.wait_all(None);
                sink.load(Ordering::Relaxed)
            })
        });
    }

    group.finish();
}

fn bench_mixed_priorities(c: &mut Criterion) {
    let pool = ThreadPool::with_threads(4).expect("Failed to create pool");
    let mut group = c.benchmark_group("mixed_priorities");

    for size in [100, 1_000].iter() {
        group.bench_with_input(BenchmarkId::new("group", size), size, |b, &size| {
            b.iter(|| {
                let mut tasks = TaskGroup::new(&pool);
                for n in 0..size {
                    tasks.enqueue(
                        move || {
                            black_box(spin(100));
                        },
                        TaskPriority::ALL[n % TaskPriority::ALL.len()],
                    );
                }
                tasks.wait_all(None)
            })
        });
    }

    group.finish();
}

fn bench_nested_wait(c: &mut Criterion) {
    let pool = Arc::new(ThreadPool::with_threads(2).expect("Failed to create pool"));

    c.bench_function("nested_wait_helping", |b| {
        b.iter(|| {
            let inner_pool = pool.clone();
            let outer = pool
                .execute(move || {
                    let mut inner = TaskGroup::new(&inner_pool);
                    for _ in 0..64 {
                        inner.enqueue(|| { black_box(spin(200)); }, TaskPriority::High);
                    }
                    inner.wait_all(None);
                })
                .expect("pool stopped");
            pool.wait_all(&[outer], None)
        })
    });
}

fn bench_cancel(c: &mut Criterion) {
    let pool = ThreadPool::with_threads(1).expect("Failed to create pool");

    c.bench_function("enqueue_dequeue", |b| {
        b.iter(|| {
            let ids: Vec<TaskId> = (0..256)
                .filter_map(|_| pool.enqueue(|| {}, TaskPriority::Lowest))
                .collect();
            black_box(pool.dequeue_many(&ids));
            pool.wait_all(&ids, None)
        })
    });
}

criterion_group!(
    benches,
    bench_enqueue_wait,
    bench_mixed_priorities,
    bench_nested_wait,
    bench_cancel
);
criterion_main!(benches);
