use criterion::{black_box, BatchSize, BenchmarkId, Criterion};
use criterion::{criterion_group, criterion_main};
use tempfile::tempdir;

use spoolq::Queue;

const ENQUEUES_PER_ITER: usize = 1_000;

fn bench_enqueue(c: &mut Criterion) {
    let mut group = c.benchmark_group("enqueue");
    for &size in &[16_usize, 256, 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || {
                    let dir = tempdir().expect("tempdir");
                    let queue = Queue::open(dir.path().join("bench_queue"), 1 << 20)
                        .expect("queue open");
                    let payload = vec![0u8; size];
                    (dir, queue, payload)
                },
                |(_dir, mut queue, payload)| {
                    for _ in 0..ENQUEUES_PER_ITER {
                        queue.enqueue(black_box(&payload)).expect("enqueue");
                    }
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_drain(c: &mut Criterion) {
    c.bench_function("dequeue_1k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().expect("tempdir");
                let mut queue = Queue::open(dir.path().join("bench_queue"), 1 << 20)
                    .expect("queue open");
                let payload = vec![0u8; 256];
                for _ in 0..ENQUEUES_PER_ITER {
                    queue.enqueue(&payload).expect("enqueue");
                }
                (dir, queue)
            },
            |(_dir, mut queue)| {
                while queue.dequeue().expect("dequeue") {}
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, bench_enqueue, bench_drain);
criterion_main!(benches);
