//! Lock-free sorted collections.
//!
//! Collections are parameterized by a guard type `G: Guard` that determines
//! the memory reclamation strategy:
//!
//! - `DeferredGuard`: Testing - defers destruction until guard drops
//! - `EpochGuard`: Production - epoch-based reclamation (crossbeam-epoch)

pub mod lock_free_skip_list;

pub use lock_free_skip_list::LockFreeSkipList;
