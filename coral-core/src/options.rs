//! Construction options for the collections.
//!
//! Options follow the create-options pattern: a plain struct with `new()`,
//! `Default`, `with_*` setters and a `validate()` that the constructors call.

use crate::error::{CoralError, Result};

/// Default number of items a [`FineGrainedHeap`](crate::FineGrainedHeap) can hold.
pub const DEFAULT_HEAP_CAPACITY: usize = 100;

/// Default tower height for skip lists.
pub const DEFAULT_MAX_LEVEL: usize = 16;

/// Hard upper bound on skip list tower height.
///
/// Per-operation predecessor arrays are sized by this constant.
pub const MAX_LEVEL_LIMIT: usize = 32;

/// Options for the bounded fine-grained heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapOptions {
    capacity: usize,
}

impl HeapOptions {
    pub fn new() -> Self {
        HeapOptions {
            capacity: DEFAULT_HEAP_CAPACITY,
        }
    }

    /// Maximum number of items held at once. Inserts beyond it are rejected.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CoralError::InvalidCapacity(self.capacity));
        }
        Ok(())
    }
}

impl Default for HeapOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Options shared by the lock-free skip list and the lock-free priority queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipListOptions {
    max_level: usize,
}

impl SkipListOptions {
    pub fn new() -> Self {
        SkipListOptions {
            max_level: DEFAULT_MAX_LEVEL,
        }
    }

    /// Number of levels in the skip list (sentinel tower height).
    pub fn with_max_level(mut self, max_level: usize) -> Self {
        self.max_level = max_level;
        self
    }

    pub fn max_level(&self) -> usize {
        self.max_level
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_level == 0 || self.max_level > MAX_LEVEL_LIMIT {
            return Err(CoralError::InvalidMaxLevel {
                requested: self.max_level,
                limit: MAX_LEVEL_LIMIT,
            });
        }
        Ok(())
    }
}

impl Default for SkipListOptions {
    fn default() -> Self {
        Self::new()
    }
}
