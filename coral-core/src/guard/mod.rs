//! Guard trait for memory reclamation strategies.
//!
//! Lock-free collections unlink nodes while other threads may still be
//! traversing them, so an unlinked node cannot be freed on the spot. The
//! `Guard` trait abstracts over the strategy that decides when it can:
//!
//! ```text
//! LockFreePriorityQueue<V, G: Guard>
//!     │
//!     ├── LockFreePriorityQueue<V, EpochGuard>      (production)
//!     └── LockFreePriorityQueue<V, DeferredGuard>   (testing)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use coral_core::{DeferredGuard, LockFreePriorityQueue};
//! use coral_crossbeam::EpochGuard;
//!
//! // Production: epoch-based reclamation
//! let queue: LockFreePriorityQueue<u64, EpochGuard> = LockFreePriorityQueue::new();
//! queue.insert(7, 42);
//!
//! // Testing: deferred destruction
//! let test_queue: LockFreePriorityQueue<u64, DeferredGuard> = LockFreePriorityQueue::new();
//! ```

mod deferred_guard;

pub use deferred_guard::DeferredGuard;

/// A memory reclamation guard that protects concurrent access to nodes.
///
/// # Safety Contract
///
/// Implementations must ensure:
/// 1. Nodes passed to `defer_destroy` are not freed while any thread that
///    pinned before the call is still pinned
/// 2. Every node passed to `defer_destroy` is eventually freed exactly once
///
/// # Design Note
///
/// Guards are stored in collections and must be `Send + Sync`. The stored
/// guard schedules destruction; thread pinning happens per operation through
/// [`Guard::pin`].
///
pub trait Guard: Sized + Default + Send + Sync {
    /// An active guard that protects reads for its lifetime.
    ///
    /// For epoch-based guards, this holds a pinned `crossbeam_epoch::Guard`.
    /// For deferred guards it is `()`, since nothing is freed before the
    /// collection itself drops.
    ///
    type ReadGuard: Sized;

    /// Pin an active read guard for the duration of one operation.
    fn pin() -> Self::ReadGuard;

    /// Schedule a node for deferred destruction.
    ///
    /// # Safety
    ///
    /// - `node` must be a valid pointer previously allocated by the collection
    /// - `node` must be unlinked from the collection at every level
    /// - `node` must not be passed to `defer_destroy` again
    /// - `dealloc` must be the correct deallocation function for `node`
    ///
    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N));
}
