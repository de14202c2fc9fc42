use carousel::{ConcurrentQueue, RingBuffer};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_push_back(c: &mut Criterion) {
    let mut ring = RingBuffer::with_capacity(1024);

    c.bench_function("push_back_overwrite_u64", |b| {
        b.iter(|| {
            ring.push_back(black_box(7u64));
        })
    });
}

fn bench_push_pop(c: &mut Criterion) {
    let mut ring = RingBuffer::with_capacity(1024);

    c.bench_function("push_pop_roundtrip_u64", |b| {
        b.iter(|| {
            ring.push_back(black_box(7u64));
            black_box(ring.pop_front());
        })
    });
}

fn bench_iterate_wrapped(c: &mut Criterion) {
    // Push past capacity so the occupied range wraps the physical end.
    let mut ring = RingBuffer::with_capacity(1024);
    for value in 0..1536u64 {
        ring.push_back(value);
    }

    c.bench_function("iterate_wrapped_1024", |b| {
        b.iter(|| {
            let sum: u64 = ring.iter().sum();
            black_box(sum)
        })
    });
}

fn bench_queue_roundtrip(c: &mut Criterion) {
    let queue = ConcurrentQueue::with_capacity(1024);

    c.bench_function("queue_push_try_pop_u64", |b| {
        b.iter(|| {
            queue.push_back(black_box(7u64));
            black_box(queue.try_pop());
        })
    });
}

criterion_group!(
    benches,
    bench_push_back,
    bench_push_pop,
    bench_iterate_wrapped,
    bench_queue_roundtrip
);
criterion_main!(benches);
