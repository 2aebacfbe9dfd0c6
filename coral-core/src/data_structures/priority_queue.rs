use crate::backoff::Backoff;
use crate::data_structures::heap::FineGrainedHeap;
use crate::data_structures::priority::LockFreePriorityQueue;
use crate::guard::Guard;

/// Operations shared by the priority queues.
///
/// Lower keys come out first. Both implementations are safe to share across
/// threads; `verify` and `len` are only exact at quiescence.
pub trait ConcurrentPriorityQueue<V>: Send + Sync {
    /// Insert `value` with priority `key`.
    ///
    /// Returns `false` if the entry was rejected (capacity or duplicate key,
    /// depending on the implementation).
    fn insert(&self, value: V, key: i64) -> bool;

    /// Remove the entry with the smallest key.
    fn delete_min(&self) -> Option<V>;

    /// Check the structure's ordering invariant.
    fn verify(&self) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Send> ConcurrentPriorityQueue<V> for FineGrainedHeap<V> {
    fn insert(&self, value: V, key: i64) -> bool {
        FineGrainedHeap::insert(self, value, key)
    }

    fn delete_min(&self) -> Option<V> {
        FineGrainedHeap::delete_min(self)
    }

    fn verify(&self) -> bool {
        FineGrainedHeap::verify(self)
    }

    fn len(&self) -> usize {
        FineGrainedHeap::len(self)
    }
}

impl<V: Send, G: Guard, B: Backoff> ConcurrentPriorityQueue<V> for LockFreePriorityQueue<V, G, B> {
    fn insert(&self, value: V, key: i64) -> bool {
        LockFreePriorityQueue::insert(self, value, key)
    }

    fn delete_min(&self) -> Option<V> {
        LockFreePriorityQueue::delete_min(self)
    }

    fn verify(&self) -> bool {
        LockFreePriorityQueue::verify(self)
    }

    fn len(&self) -> usize {
        LockFreePriorityQueue::len(self)
    }

    fn is_empty(&self) -> bool {
        LockFreePriorityQueue::is_empty(self)
    }
}
