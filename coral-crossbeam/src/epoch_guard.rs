//! Epoch-based guard implementation using crossbeam-epoch.
//!
//! This module provides `EpochGuard`, an implementation of the `Guard` trait
//! using crossbeam-epoch for memory reclamation.
//!
//! # Design
//!
//! `EpochGuard` is a zero-sized type that schedules destruction using the global
//! epoch collector. Collections parameterized with `EpochGuard` get epoch-based
//! memory reclamation:
//!
//! ```text
//! LockFreePriorityQueue<V, EpochGuard>
//!     │
//!     └── Uses crossbeam-epoch for memory safety
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use coral_core::LockFreePriorityQueue;
//! use coral_crossbeam::EpochGuard;
//!
//! let queue: LockFreePriorityQueue<&str, EpochGuard> = LockFreePriorityQueue::new();
//!
//! queue.insert("low", 42);
//! queue.insert("high", 17);
//!
//! assert_eq!(queue.delete_min(), Some("high"));
//! ```

use coral_core::guard::Guard;
use crossbeam_epoch::{self as epoch, Guard as CrossbeamGuard};

/// Epoch-based memory reclamation guard.
///
/// Nodes handed to `defer_destroy` are not freed until every thread that was
/// pinned at the time has unpinned. Each public operation of a lock-free
/// collection holds a pin for its whole duration, so pointers read during
/// the operation stay valid until it returns.
///
/// Unlike `DeferredGuard` which stores pending destructions, `EpochGuard`
/// is a zero-sized type that schedules destruction using the global epoch
/// collector, so memory is returned while the collection is still in use.
///
/// When `defer_destroy` is called, it:
/// 1. Pins the current thread to the current epoch
/// 2. Schedules the destruction to run after all threads have advanced
/// 3. Unpins immediately (the destruction is managed globally)
///
#[derive(Debug, Clone, Copy, Default)]
pub struct EpochGuard {
    // Zero-sized - all state is in the global epoch collector
}

impl EpochGuard {
    pub fn new() -> Self {
        EpochGuard {}
    }

    /// Push this thread's deferred destructions to the global collector and
    /// try to advance the epoch.
    ///
    /// Useful in tests and benchmarks that want garbage collected promptly.
    pub fn flush() {
        epoch::pin().flush();
    }
}

// EpochGuard is Send and Sync since it's stateless (zero-sized)
unsafe impl Send for EpochGuard {}
unsafe impl Sync for EpochGuard {}

impl Guard for EpochGuard {
    /// An actual crossbeam epoch guard that pins the current thread for the
    /// duration of one operation.
    type ReadGuard = CrossbeamGuard;

    fn pin() -> Self::ReadGuard {
        epoch::pin()
    }

    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N)) {
        // The destruction will happen after all threads have advanced past
        // the current epoch
        let guard = epoch::pin();
        unsafe {
            guard.defer_unchecked(move || {
                dealloc(node);
            });
        }
    }
}
