//! Data structures for concurrent priority queues.
//!
//! # Organization
//!
//! - [`heap`] - Fine-grained lock based binary heap
//! - [`priority`] - Lock-free skip list priority queue
//! - [`sorted`] - Lock-free skip list ordered set
//! - [`priority_queue`] - Common interface of the two priority queues
//! - `internal` - Markable references and skip nodes (pub(crate))

pub mod heap;
pub(crate) mod internal;
pub mod priority;
pub mod priority_queue;
pub mod sorted;

pub use heap::{FineGrainedHeap, OpToken, Tag};
pub use priority::LockFreePriorityQueue;
pub use priority_queue::ConcurrentPriorityQueue;
pub use sorted::LockFreeSkipList;
