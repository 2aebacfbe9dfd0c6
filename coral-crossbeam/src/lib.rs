//! Crossbeam-based memory reclamation for coral collections.
//!
//! This crate provides `EpochGuard`, an implementation of the `Guard` trait
//! using crossbeam-epoch for memory reclamation.
//!
//! # Usage
//!
//! ```ignore
//! use coral_core::{LockFreePriorityQueue, LockFreeSkipList};
//! use coral_crossbeam::EpochGuard;
//!
//! let queue: LockFreePriorityQueue<u64, EpochGuard> = LockFreePriorityQueue::new();
//! queue.insert(1, 42);
//!
//! let set: LockFreeSkipList<EpochGuard> = LockFreeSkipList::new();
//! set.add(42);
//! ```

pub mod epoch_guard;

// Export the Guard implementation
pub use epoch_guard::EpochGuard;

/// Lock-free priority queue with epoch-based reclamation.
pub type EpochPriorityQueue<V> = coral_core::LockFreePriorityQueue<V, EpochGuard>;

/// Lock-free ordered set with epoch-based reclamation.
pub type EpochSkipList = coral_core::LockFreeSkipList<EpochGuard>;
