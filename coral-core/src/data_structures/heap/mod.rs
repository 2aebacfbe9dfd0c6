//! Lock-based priority queue.
//!
//! A bounded binary heap with one lock per slot plus a global lock that only
//! guards the item count.

pub mod fine_grained_heap;

pub use fine_grained_heap::{FineGrainedHeap, OpToken, Tag};
