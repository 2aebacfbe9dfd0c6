//! Concurrent priority queues.
//!
//! - [`FineGrainedHeap`]: bounded binary heap with one lock per slot
//! - [`LockFreePriorityQueue`]: lock-free skip list specialised for deleteMin
//! - [`LockFreeSkipList`]: lock-free ordered set of `i64` keys
//!
//! The lock-free structures take their memory reclamation strategy as a
//! [`Guard`] type parameter and their contention policy as a [`Backoff`].

pub mod backoff;
pub mod common_tests;
pub mod data_structures;
pub mod error;
pub mod guard;
pub mod options;
pub mod preemptive_synchronization;
pub mod workload;

pub use backoff::{Backoff, SpinBackoff, YieldBackoff};
pub use data_structures::{
    ConcurrentPriorityQueue, FineGrainedHeap, LockFreePriorityQueue, LockFreeSkipList,
};
pub use error::{CoralError, Result};
pub use guard::{DeferredGuard, Guard};
pub use options::{HeapOptions, SkipListOptions};
pub use workload::{StressConfig, StressReport, run_stress};

/*
Task list:

Benchmark:

- [ ] https://github.com/bheisler/iai

*/

/*

cargo llvm-cov --html

sudo CARGO_PROFILE_RELEASE_DEBUG=true cargo flamegraph --bench priority_queue_benchmark --root --

cargo valgrind test

*/
