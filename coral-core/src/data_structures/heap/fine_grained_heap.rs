use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::thread;

use crate::error::Result;
use crate::options::HeapOptions;

/// Identifies one in-flight insert while its item percolates up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpToken(u64);

impl OpToken {
    fn next() -> Self {
        static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);
        OpToken(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }
}

/// Ownership state of a heap slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// No item.
    Empty,
    /// Holds an item that is settled in heap order.
    Available,
    /// Holds an item still being percolated up by the insert with this token.
    Owned(OpToken),
}

struct Slot<V> {
    priority: i64,
    value: Option<V>,
    tag: Tag,
}

impl<V> Slot<V> {
    fn empty() -> Self {
        Slot {
            priority: 0,
            value: None,
            tag: Tag::Empty,
        }
    }
}

/// Outcome of one percolate-up step.
enum Climb {
    /// Our item moved to the parent slot.
    Swapped,
    /// The item is settled (or a deleteMin took over); nothing left to do.
    Settled,
    /// Someone moved our item up; follow it.
    Chase,
    /// The parent is still owned by another insert.
    Wait,
}

// ============================================================================
// FineGrainedHeap - bounded min-heap with per-slot locks
// ============================================================================

/// A bounded, array backed min-heap with one lock per slot.
///
/// The global lock only guards the item count. Inserts percolate their item
/// up while tagged `Owned(token)`, so a concurrent deleteMin that moves the
/// item can be detected and chased. Locks are taken parent before child, and
/// the global lock before any slot lock.
///
/// Index 0 is unused; the root lives at index 1. The array has
/// `2 * capacity + 2` slots so every occupied slot has both children.
///
pub struct FineGrainedHeap<V> {
    slots: Box<[Mutex<Slot<V>>]>,
    next_index: Mutex<usize>,
    capacity: usize,
}

impl<V> FineGrainedHeap<V> {
    /// Create an empty heap holding up to 100 items.
    pub fn new() -> Self {
        Self::build(HeapOptions::default().capacity())
    }

    pub fn with_options(options: HeapOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self::build(options.capacity()))
    }

    fn build(capacity: usize) -> Self {
        let slots = (0..2 * capacity + 2)
            .map(|_| Mutex::new(Slot::empty()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        FineGrainedHeap {
            slots,
            next_index: Mutex::new(1),
            capacity,
        }
    }

    #[inline]
    fn lock_slot(&self, index: usize) -> MutexGuard<'_, Slot<V>> {
        // A panic while holding a slot lock cannot leave the slot half written
        // in a way later operations could not handle, so poisoning is ignored.
        self.slots[index]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[inline]
    fn lock_count(&self) -> MutexGuard<'_, usize> {
        self.next_index
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items (including inserts still percolating).
    pub fn len(&self) -> usize {
        *self.lock_count() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert `value` with `priority`. Returns `false` if the heap is full.
    pub fn insert(&self, value: V, priority: i64) -> bool {
        let token = OpToken::next();

        let mut next_index = self.lock_count();
        let mut index = *next_index;
        if index > self.capacity {
            drop(next_index);
            tracing::debug!(capacity = self.capacity, priority, "heap full, insert rejected");
            return false;
        }
        *next_index += 1;

        // Lock the reserved slot before the count so a deleteMin cannot
        // consume it before it is stamped.
        let mut slot = self.lock_slot(index);
        drop(next_index);
        slot.priority = priority;
        slot.value = Some(value);
        slot.tag = Tag::Owned(token);
        drop(slot);

        while index > 1 {
            let parent_index = index / 2;
            match self.climb(parent_index, index, token) {
                Climb::Swapped | Climb::Chase => index = parent_index,
                Climb::Settled => return true,
                Climb::Wait => thread::yield_now(),
            }
        }

        let mut root = self.lock_slot(1);
        if root.tag == Tag::Owned(token) {
            root.tag = Tag::Available;
        }
        true
    }

    fn climb(&self, parent_index: usize, index: usize, token: OpToken) -> Climb {
        let mut parent = self.lock_slot(parent_index);
        let mut current = self.lock_slot(index);

        if parent.tag == Tag::Available && current.tag == Tag::Owned(token) {
            if parent.priority > current.priority {
                mem::swap(&mut *parent, &mut *current);
                Climb::Swapped
            } else {
                current.tag = Tag::Available;
                Climb::Settled
            }
        } else if parent.tag == Tag::Empty {
            // A deleteMin moved our item to the root and settles it there
            Climb::Settled
        } else if current.tag != Tag::Owned(token) {
            Climb::Chase
        } else {
            Climb::Wait
        }
    }

    /// Remove and return the value with the smallest priority.
    pub fn delete_min(&self) -> Option<V> {
        let mut next_index = self.lock_count();
        let last_index = *next_index - 1;
        if last_index == 0 {
            return None;
        }
        *next_index -= 1;

        let mut root = self.lock_slot(1);
        if last_index == 1 {
            drop(next_index);
            root.tag = Tag::Empty;
            return root.value.take();
        }

        let mut last = self.lock_slot(last_index);
        drop(next_index);

        let result = root.value.take();
        root.tag = Tag::Empty;
        mem::swap(&mut *root, &mut *last);
        drop(last);

        if root.tag == Tag::Empty {
            return result;
        }
        root.tag = Tag::Available;

        let mut index = 1;
        let mut current = root;
        while index < self.slots.len() / 2 {
            let (left_index, right_index) = (2 * index, 2 * index + 1);
            let left = self.lock_slot(left_index);
            let right = self.lock_slot(right_index);

            if left.tag == Tag::Empty {
                break;
            }

            let (child_index, mut child) =
                if right.tag == Tag::Empty || left.priority < right.priority {
                    drop(right);
                    (left_index, left)
                } else {
                    drop(left);
                    (right_index, right)
                };

            if child.tag != Tag::Empty && child.priority < current.priority {
                mem::swap(&mut *child, &mut *current);
                drop(current);
                current = child;
                index = child_index;
            } else {
                break;
            }
        }

        result
    }

    /// Read `(priority, tag)` of every slot, locking one slot at a time.
    fn snapshot(&self) -> (usize, Vec<(i64, Tag)>) {
        let next_index = *self.lock_count();
        let slots = (0..self.slots.len())
            .map(|index| {
                let slot = self.lock_slot(index);
                (slot.priority, slot.tag)
            })
            .collect();
        (next_index, slots)
    }

    /// Check heap order over the first half of the occupied slots.
    ///
    /// Only meaningful at quiescence. See [`verify_full`](Self::verify_full)
    /// for a check of every slot.
    pub fn verify(&self) -> bool {
        let (next_index, slots) = self.snapshot();
        let bound = next_index.saturating_sub(1) / 2;

        for index in 1..bound {
            let (parent, left, right) = (index / 2, 2 * index, 2 * index + 1);
            let priority = slots[index].0;

            if parent >= 1 && slots[parent].0 > priority {
                tracing::warn!(index, parent, "heap order violated above slot");
                return false;
            }
            if slots[left].0 < priority || slots[right].0 < priority {
                tracing::warn!(index, "heap order violated below slot");
                return false;
            }
        }
        true
    }

    /// Check every occupied slot against its parent and that every slot past
    /// the end is empty. Only meaningful at quiescence.
    pub fn verify_full(&self) -> bool {
        let (next_index, slots) = self.snapshot();

        for (index, &(priority, tag)) in slots.iter().enumerate().skip(1) {
            if index < next_index {
                if tag != Tag::Available {
                    tracing::warn!(index, ?tag, "occupied slot not available");
                    return false;
                }
                let parent = index / 2;
                if parent >= 1 && slots[parent].0 > priority {
                    tracing::warn!(
                        index,
                        priority,
                        parent_priority = slots[parent].0,
                        "heap order violated"
                    );
                    return false;
                }
            } else if tag != Tag::Empty {
                tracing::warn!(index, ?tag, "slot past the end is not empty");
                return false;
            }
        }
        true
    }
}

impl<V> Default for FineGrainedHeap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Display for FineGrainedHeap<V> {
    /// Every slot in array order: its priority, or `EMPTY`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (_, slots) = self.snapshot();
        for (priority, tag) in slots {
            match tag {
                Tag::Empty => write!(f, "EMPTY, ")?,
                _ => write!(f, "{}, ", priority)?,
            }
        }
        Ok(())
    }
}
