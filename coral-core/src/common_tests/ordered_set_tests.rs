use std::sync::{Arc, Barrier};
use std::thread;

use rand::Rng;

use crate::backoff::Backoff;
use crate::data_structures::LockFreeSkipList;
use crate::guard::Guard;
use crate::options::SkipListOptions;

/// Test add, contains, remove and duplicate rejection
pub fn test_basic_operations<G: Guard, B: Backoff>(set: &LockFreeSkipList<G, B>) {
    for key in [5, 10, 3, 7, 1] {
        assert!(set.add(key));
    }

    // Duplicates
    assert!(!set.add(5));
    assert!(!set.add(10));

    for key in [1, 3, 5, 7, 10] {
        assert!(set.contains(key), "missing {}", key);
    }
    assert!(!set.contains(2));
    assert!(!set.contains(99));

    assert!(set.remove(3));
    assert!(!set.contains(3));
    assert!(!set.remove(3)); // Already removed

    assert_eq!(set.to_vec(), vec![1, 5, 7, 10]);
    assert!(set.verify());
}

/// Disjoint concurrent adds all land
pub fn test_concurrent_adds<G: Guard + 'static, B: Backoff + 'static>() {
    let set = Arc::new(LockFreeSkipList::<G, B>::new());
    let num_threads = 4;
    let keys_per_thread = 250;

    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let set = Arc::clone(&set);
            thread::spawn(move || {
                for i in 0..keys_per_thread {
                    // Interleave the key ranges so threads contend on neighbours
                    assert!(set.add(i * num_threads + thread_id));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let expected: Vec<i64> = (0..num_threads * keys_per_thread).collect();
    assert_eq!(set.to_vec(), expected);
    assert!(set.verify());
}

/// Each thread adds its own keys and removes the odd ones while the others
/// do the same next door; only the even keys survive.
pub fn test_concurrent_add_remove<G: Guard + 'static, B: Backoff + 'static>() {
    let set = Arc::new(LockFreeSkipList::<G, B>::new());
    let num_threads: i64 = 8;
    let keys_per_thread: i64 = 200;

    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let set = Arc::clone(&set);
            thread::spawn(move || {
                let keys: Vec<i64> = (0..keys_per_thread)
                    .map(|i| i * num_threads + thread_id)
                    .collect();
                for &key in &keys {
                    assert!(set.add(key));
                }
                for &key in keys.iter().filter(|key| *key % 2 == 1) {
                    assert!(set.remove(key), "remove {} failed", key);
                }
                // Re-add and remove again to churn freed positions
                for &key in keys.iter().filter(|key| *key % 2 == 1) {
                    assert!(set.add(key));
                    assert!(set.remove(key));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let expected: Vec<i64> = (0..num_threads * keys_per_thread)
        .filter(|key| key % 2 == 0)
        .collect();
    assert_eq!(set.to_vec(), expected);
    assert!(set.verify());
}

/// Concurrent adds of one key: exactly one wins
pub fn test_add_race<G: Guard, B: Backoff>() {
    for _ in 0..100 {
        let set = LockFreeSkipList::<G, B>::new();
        let start = Barrier::new(4);

        let wins = thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        start.wait();
                        set.add(11)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|won| *won)
                .count()
        });

        assert_eq!(wins, 1);
        assert_eq!(set.to_vec(), vec![11]);
        assert!(set.verify());
    }
}

/// Concurrent removes of one key: exactly one wins
pub fn test_remove_race<G: Guard, B: Backoff>() {
    for _ in 0..100 {
        let set = LockFreeSkipList::<G, B>::new();
        for key in 0..20 {
            set.add(key);
        }
        let start = Barrier::new(4);

        let wins = thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        start.wait();
                        set.remove(10)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|won| *won)
                .count()
        });

        assert_eq!(wins, 1);
        assert!(!set.contains(10));
        assert_eq!(set.len(), 19);
        assert!(set.verify());
    }
}

/// Threads add and remove random keys from a tiny range, so new nodes keep
/// landing next to removed nodes with the same key at every level.
///
/// Per key, successful adds minus successful removes must be 0 or 1 and must
/// match final membership.
pub fn test_same_key_churn<G: Guard, B: Backoff>() {
    const THREADS: usize = 8;
    const OPS_PER_THREAD: usize = 2000;
    const KEYS: usize = 8;

    for _ in 0..50 {
        let set = LockFreeSkipList::<G, B>::with_options(SkipListOptions::new().with_max_level(4))
            .unwrap();
        let start = Barrier::new(THREADS);

        let net = thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    scope.spawn(|| {
                        let mut rng = rand::thread_rng();
                        let mut net = [0i64; KEYS];
                        start.wait();
                        for _ in 0..OPS_PER_THREAD {
                            let key = rng.gen_range(0..KEYS);
                            if rng.gen_bool(0.5) {
                                if set.add(key as i64) {
                                    net[key] += 1;
                                }
                            } else if set.remove(key as i64) {
                                net[key] -= 1;
                            }
                        }
                        net
                    })
                })
                .collect();

            let mut net = [0i64; KEYS];
            for handle in handles {
                for (total, delta) in net.iter_mut().zip(handle.join().unwrap()) {
                    *total += delta;
                }
            }
            net
        });

        for (key, count) in net.iter().enumerate() {
            assert!(
                *count == 0 || *count == 1,
                "key {} added {} more times than removed",
                key,
                count
            );
            assert_eq!(set.contains(key as i64), *count == 1, "membership of key {}", key);
        }
        assert_eq!(set.len() as i64, net.iter().sum::<i64>());
        assert!(set.verify());
    }
}
