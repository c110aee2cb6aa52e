use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use keyflake::{
    AtomicGenerator, BitLayout, CachedGenerator, IdAllocator, Identity, LockGenerator,
    MonotonicClock, Poll, Resolution, SequenceSeed, TimeSource,
};
use std::{
    sync::{Arc, Barrier},
    thread::scope,
    time::Instant,
};

struct FixedMockTime {
    millis: u64,
}

impl TimeSource for FixedMockTime {
    fn current_millis(&self) -> u64 {
        self.millis
    }
}

// Number of IDs generated per benchmark iteration (per-thread for
// multi-threaded). Exactly one tick's worth of sequence space under the
// standard millisecond layout.
const TOTAL_IDS: usize = 4096;

const CACHE_SIZE: usize = 4096;

fn layout() -> BitLayout {
    BitLayout::standard(Resolution::Millisecond, 0)
}

fn identity() -> Identity {
    Identity::new(1, 1, &layout()).unwrap()
}

/// Benchmarks a hot-path generator where IDs are always `Ready`.
fn bench_generator<G>(c: &mut Criterion, group_name: &str, generator_factory: impl Fn() -> G)
where
    G: IdAllocator,
{
    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{}", TOTAL_IDS), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                let generator = generator_factory();
                for _ in 0..TOTAL_IDS {
                    match generator.try_poll_id().unwrap() {
                        Poll::Ready { id } => {
                            black_box(id);
                        }
                        Poll::Pending { .. } => unreachable!(),
                    }
                }
            }

            start.elapsed()
        });
    });

    group.finish();
}

/// Benchmarks generators that may wait on clock stall (realistic wallclock
/// behavior).
fn bench_generator_yield<G>(c: &mut Criterion, group_name: &str, generator: G)
where
    G: IdAllocator,
{
    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{}", TOTAL_IDS), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                for _ in 0..TOTAL_IDS {
                    black_box(generator.next_id().unwrap());
                }
            }

            start.elapsed()
        });
    });

    group.finish();
}

/// Benchmarks one generator shared across threads.
fn bench_generator_contended<G>(c: &mut Criterion, group_name: &str, generator: G)
where
    G: IdAllocator + Send + Sync,
{
    let mut group = c.benchmark_group(group_name);
    let generator = Arc::new(generator);

    for thread_count in [1, 2, 4, 8, 16] {
        let ids_per_thread = TOTAL_IDS / thread_count;

        group.throughput(Throughput::Elements(TOTAL_IDS as u64));
        group.bench_function(
            format!("elems/{}/threads/{}", TOTAL_IDS, thread_count),
            |b| {
                b.iter_custom(|iters| {
                    let start = Instant::now();

                    for _ in 0..iters {
                        let barrier = Arc::new(Barrier::new(thread_count + 1));
                        scope(|s| {
                            for _ in 0..thread_count {
                                let generator = Arc::clone(&generator);
                                let barrier = Arc::clone(&barrier);
                                s.spawn(move || {
                                    barrier.wait();
                                    for _ in 0..ids_per_thread {
                                        black_box(generator.next_id().unwrap());
                                    }
                                });
                            }
                            barrier.wait();
                        });
                    }

                    start.elapsed()
                });
            },
        );
    }

    group.finish();
}

fn benchmark_mock_sequential_lock(c: &mut Criterion) {
    bench_generator(c, "mock/sequential/lock", || {
        LockGenerator::with_seed(
            layout(),
            identity(),
            FixedMockTime { millis: 1 },
            SequenceSeed::disabled(),
        )
    });
}

fn benchmark_mock_sequential_atomic(c: &mut Criterion) {
    bench_generator(c, "mock/sequential/atomic", || {
        AtomicGenerator::with_seed(
            layout(),
            identity(),
            FixedMockTime { millis: 1 },
            SequenceSeed::disabled(),
        )
    });
}

fn benchmark_mono_sequential_lock(c: &mut Criterion) {
    let generator = LockGenerator::new(layout(), identity(), MonotonicClock::default());
    bench_generator_yield(c, "mono/sequential/lock", generator);
}

fn benchmark_mono_sequential_atomic(c: &mut Criterion) {
    let generator = AtomicGenerator::new(layout(), identity(), MonotonicClock::default());
    bench_generator_yield(c, "mono/sequential/atomic", generator);
}

fn benchmark_mono_sequential_cached(c: &mut Criterion) {
    let source = LockGenerator::new(layout(), identity(), MonotonicClock::default());
    let generator = CachedGenerator::new(source, CACHE_SIZE).unwrap();
    bench_generator_yield(c, "mono/sequential/cached", generator);
}

fn benchmark_mono_threaded_lock(c: &mut Criterion) {
    let generator = LockGenerator::new(layout(), identity(), MonotonicClock::default());
    bench_generator_contended(c, "mono/threaded/lock", generator);
}

fn benchmark_mono_threaded_atomic(c: &mut Criterion) {
    let generator = AtomicGenerator::new(layout(), identity(), MonotonicClock::default());
    bench_generator_contended(c, "mono/threaded/atomic", generator);
}

fn benchmark_mono_threaded_cached(c: &mut Criterion) {
    let source = LockGenerator::new(layout(), identity(), MonotonicClock::default());
    let generator = CachedGenerator::new(source, CACHE_SIZE).unwrap();
    bench_generator_contended(c, "mono/threaded/cached", generator);
}

fn benchmark_decode(c: &mut Criterion) {
    let layout = layout();
    let ids: Vec<i64> = (0..TOTAL_IDS as u64)
        .map(|i| layout.compose(1_000 + i, 7, 3, i % 4096).unwrap())
        .collect();

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));
    group.bench_function(format!("elems/{}", TOTAL_IDS), |b| {
        b.iter(|| {
            for id in &ids {
                black_box(layout.decode(black_box(*id)));
            }
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    // Mock clock
    benchmark_mock_sequential_lock,
    benchmark_mock_sequential_atomic,
    // Monotonic clock
    benchmark_mono_sequential_lock,
    benchmark_mono_sequential_atomic,
    benchmark_mono_sequential_cached,
    benchmark_mono_threaded_lock,
    benchmark_mono_threaded_atomic,
    benchmark_mono_threaded_cached,
    // Decoding
    benchmark_decode,
);
criterion_main!(benches);
