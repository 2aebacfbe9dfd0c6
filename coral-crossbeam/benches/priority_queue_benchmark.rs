//! Benchmark comparing concurrent priority queues:
//! - LockFreePriorityQueue, FineGrainedHeap vs crossbeam-skiplist
//! - LockFreeSkipList vs crossbeam-skiplist for plain set operations
//!
//! Run with: cargo bench --package coral-crossbeam --bench priority_queue_benchmark

use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use crossbeam_skiplist::{SkipMap, SkipSet};
use mimalloc::MiMalloc;
use std::sync::Arc;
use std::thread;

use coral_core::ConcurrentPriorityQueue;
use coral_core::FineGrainedHeap;
use coral_core::HeapOptions;
use coral_crossbeam::EpochPriorityQueue;
use coral_crossbeam::EpochSkipList;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const OPS_PER_THREAD: usize = 10_000;

/// SkipMap driven as a priority queue: deleteMin is `pop_front`.
struct SkipMapQueue(SkipMap<i64, i64>);

impl SkipMapQueue {
    fn insert(&self, value: i64, key: i64) -> bool {
        if self.0.contains_key(&key) {
            return false;
        }
        self.0.insert(key, value);
        true
    }

    fn delete_min(&self) -> Option<i64> {
        self.0.pop_front().map(|entry| *entry.value())
    }
}

fn make_heap(threads: usize, ops_per_thread: usize) -> FineGrainedHeap<i64> {
    // Enough room that inserts never fail for capacity reasons
    let options = HeapOptions::new().with_capacity(threads * ops_per_thread + 1);
    FineGrainedHeap::with_options(options).unwrap()
}

// ============================================================================
// Generic benchmark helpers for ConcurrentPriorityQueue
// ============================================================================

/// Every thread inserts its own disjoint range of keys.
fn bench_insert<Q>(queue: Arc<Q>, thread_count: usize, ops_per_thread: usize)
where
    Q: ConcurrentPriorityQueue<i64> + 'static,
{
    let mut handles = vec![];

    for t in 0..thread_count {
        let queue_clone = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            let base = (t * ops_per_thread) as i64;
            for i in 0..ops_per_thread {
                queue_clone.insert(base + i as i64, base + i as i64);
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

/// Pre-fill, then every thread drains with deleteMin.
fn bench_drain<Q>(queue: Arc<Q>, thread_count: usize, ops_per_thread: usize)
where
    Q: ConcurrentPriorityQueue<i64> + 'static,
{
    let total = (thread_count * ops_per_thread) as i64;
    for key in 0..total {
        queue.insert(key, key);
    }

    let mut handles = vec![];

    for _ in 0..thread_count {
        let queue_clone = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            for _ in 0..ops_per_thread {
                black_box(queue_clone.delete_min());
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

/// Half the threads insert, half call deleteMin.
fn bench_mixed<Q>(queue: Arc<Q>, thread_count: usize, ops_per_thread: usize)
where
    Q: ConcurrentPriorityQueue<i64> + 'static,
{
    let mut handles = vec![];

    for t in 0..thread_count {
        let queue_clone = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            let mut rng = fastrand::Rng::with_seed(t as u64);
            for _ in 0..ops_per_thread {
                if t % 2 == 0 {
                    let key = rng.i64(0..1_000_000);
                    queue_clone.insert(key, key);
                } else {
                    black_box(queue_clone.delete_min());
                }
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

fn bench_skipmap_mixed(thread_count: usize, ops_per_thread: usize) {
    let queue = Arc::new(SkipMapQueue(SkipMap::new()));
    let mut handles = vec![];

    for t in 0..thread_count {
        let queue_clone = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            let mut rng = fastrand::Rng::with_seed(t as u64);
            for _ in 0..ops_per_thread {
                if t % 2 == 0 {
                    let key = rng.i64(0..1_000_000);
                    queue_clone.insert(key, key);
                } else {
                    black_box(queue_clone.delete_min());
                }
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

fn bench_skipmap_drain(thread_count: usize, ops_per_thread: usize) {
    let queue = Arc::new(SkipMapQueue(SkipMap::new()));
    let total = (thread_count * ops_per_thread) as i64;
    for key in 0..total {
        queue.insert(key, key);
    }

    let mut handles = vec![];

    for _ in 0..thread_count {
        let queue_clone = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            for _ in 0..ops_per_thread {
                black_box(queue_clone.delete_min());
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

// ============================================================================
// Ordered set benchmarks
// ============================================================================

fn bench_coral_set_add_remove(thread_count: usize, ops_per_thread: usize) {
    let set = Arc::new(EpochSkipList::new());
    let mut handles = vec![];

    for t in 0..thread_count {
        let set_clone = Arc::clone(&set);
        let handle = thread::spawn(move || {
            let base = (t * 100) as i64;
            for i in 0..ops_per_thread {
                let key = base + (i % 100) as i64;
                set_clone.add(key);
                set_clone.remove(key);
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

fn bench_crossbeam_set_add_remove(thread_count: usize, ops_per_thread: usize) {
    let set: Arc<SkipSet<i64>> = Arc::new(SkipSet::new());
    let mut handles = vec![];

    for t in 0..thread_count {
        let set_clone = Arc::clone(&set);
        let handle = thread::spawn(move || {
            let base = (t * 100) as i64;
            for i in 0..ops_per_thread {
                let key = base + (i % 100) as i64;
                set_clone.insert(key);
                set_clone.remove(&key);
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

// ============================================================================
// Criterion benchmark groups
// ============================================================================

fn insert_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_benchmark_priority_queue");

    for threads in [1, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("insert_benchmark_lock_free", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    bench_insert(
                        Arc::new(EpochPriorityQueue::<i64>::new()),
                        black_box(threads),
                        black_box(OPS_PER_THREAD),
                    )
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("insert_benchmark_heap", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    bench_insert(
                        Arc::new(make_heap(threads, OPS_PER_THREAD)),
                        black_box(threads),
                        black_box(OPS_PER_THREAD),
                    )
                })
            },
        );
    }

    group.finish();
}

fn drain_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("drain_benchmark_priority_queue");

    for threads in [1, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("drain_benchmark_lock_free", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    bench_drain(
                        Arc::new(EpochPriorityQueue::<i64>::new()),
                        black_box(threads),
                        black_box(OPS_PER_THREAD),
                    )
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("drain_benchmark_heap", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    bench_drain(
                        Arc::new(make_heap(threads, OPS_PER_THREAD)),
                        black_box(threads),
                        black_box(OPS_PER_THREAD),
                    )
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("drain_benchmark_crossbeam", threads),
            &threads,
            |b, &threads| {
                b.iter(|| bench_skipmap_drain(black_box(threads), black_box(OPS_PER_THREAD)))
            },
        );
    }

    group.finish();
}

fn mixed_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed_benchmark_priority_queue");

    for threads in [2, 4, 8, 12, 16] {
        group.bench_with_input(
            BenchmarkId::new("mixed_benchmark_lock_free", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    bench_mixed(
                        Arc::new(EpochPriorityQueue::<i64>::new()),
                        black_box(threads),
                        black_box(OPS_PER_THREAD),
                    )
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("mixed_benchmark_heap", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    bench_mixed(
                        Arc::new(make_heap(threads, OPS_PER_THREAD)),
                        black_box(threads),
                        black_box(OPS_PER_THREAD),
                    )
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("mixed_benchmark_crossbeam", threads),
            &threads,
            |b, &threads| {
                b.iter(|| bench_skipmap_mixed(black_box(threads), black_box(OPS_PER_THREAD)))
            },
        );
    }

    group.finish();
}

fn set_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_remove_benchmark_ordered_set");

    for threads in [1, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("add_remove_benchmark_skiplist", threads),
            &threads,
            |b, &threads| {
                b.iter(|| bench_coral_set_add_remove(black_box(threads), black_box(OPS_PER_THREAD)))
            },
        );

        group.bench_with_input(
            BenchmarkId::new("add_remove_benchmark_crossbeam", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    bench_crossbeam_set_add_remove(black_box(threads), black_box(OPS_PER_THREAD))
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    insert_benchmark,
    drain_benchmark,
    mixed_benchmark,
    set_benchmark,
);
criterion_main!(benches);
