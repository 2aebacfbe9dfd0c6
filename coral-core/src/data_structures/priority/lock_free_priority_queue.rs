use std::fmt;
use std::marker::PhantomData;
use std::ptr;

use crate::backoff::{Backoff, SpinBackoff};
use crate::data_structures::internal::marked_ptr::MarkedPtr;
use crate::data_structures::internal::skip_node::{NodeKey, SkipNode, SkipNodePtr, random_height};
use crate::error::Result;
use crate::guard::Guard;
use crate::options::{MAX_LEVEL_LIMIT, SkipListOptions};

// ============================================================================
// LockFreePriorityQueue - skip list specialised for extract-minimum
// ============================================================================

/// A lock-free priority queue keyed by unique `i64` priorities.
///
/// Structure:
/// - Skip list with head/tail sentinels spanning every level
/// - `deleted` on a node transfers ownership of its value to one deleteMin
/// - Marked successor slots mean the node is being unlinked at that level
///
/// Any thread that steps on a deleted node helps unlink it before moving
/// on (`help_delete`), so a stalled deleteMin never blocks the others.
///
/// Node lifetime:
/// - Inserter and deleteMin winner each release the node once (`release`)
/// - The last release hands the node to the guard, after it is unlinked at
///   every level
///
pub struct LockFreePriorityQueue<V, G: Guard, B: Backoff = SpinBackoff> {
    head: SkipNodePtr<V>,
    tail: SkipNodePtr<V>,
    max_level: usize,
    guard: G,
    _backoff: PhantomData<fn() -> B>,
}

impl<V, G: Guard, B: Backoff> LockFreePriorityQueue<V, G, B> {
    pub fn new() -> Self {
        Self::build(SkipListOptions::default().max_level())
    }

    pub fn with_options(options: SkipListOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self::build(options.max_level()))
    }

    fn build(max_level: usize) -> Self {
        let head = SkipNode::alloc_sentinel(NodeKey::NegInf, max_level);
        let tail = SkipNode::alloc_sentinel(NodeKey::PosInf, max_level);
        unsafe {
            for level in 0..max_level {
                (*head).next(level).store(tail, false);
            }
        }

        LockFreePriorityQueue {
            head,
            tail,
            max_level,
            guard: G::default(),
            _backoff: PhantomData,
        }
    }

    pub fn max_level(&self) -> usize {
        self.max_level
    }

    // =========================================================================
    // Helping traversal
    // =========================================================================

    /// Successor of `node1` at `level`, helping deletions on the way.
    ///
    /// Returns `(pred, next)` where `pred` is the live node whose slot was
    /// read. `hint` is a predecessor of `node1` if the caller knows one.
    unsafe fn read_next(
        &self,
        node1: SkipNodePtr<V>,
        level: usize,
        hint: Option<SkipNodePtr<V>>,
    ) -> (SkipNodePtr<V>, SkipNodePtr<V>) {
        unsafe {
            let mut node1 = node1;
            if (*node1).is_deleted() {
                node1 = self.help_delete(node1, level, hint);
            }

            loop {
                let next = (*node1).next(level).load();
                if !next.is_marked() {
                    assert!(
                        !next.as_ptr().is_null(),
                        "INVARIANT VIOLATION: null successor at level {} before tail",
                        level
                    );
                    return (node1, next.as_ptr());
                }
                node1 = self.help_delete(node1, level, None);
            }
        }
    }

    /// Advance from `node1` at `level` to the first node with key `>= key`.
    unsafe fn scan_key(
        &self,
        node1: SkipNodePtr<V>,
        level: usize,
        key: NodeKey,
    ) -> (SkipNodePtr<V>, SkipNodePtr<V>) {
        unsafe {
            let (mut pred, mut node) = self.read_next(node1, level, None);
            while (*node).key() < key {
                let hint = pred;
                (pred, node) = self.read_next(node, level, Some(hint));
            }
            (pred, node)
        }
    }

    /// Mark `node` from `level` upward and unlink it at `level`.
    ///
    /// Returns a predecessor of `node`'s position at `level`.
    unsafe fn help_delete(
        &self,
        node: SkipNodePtr<V>,
        level: usize,
        hint: Option<SkipNodePtr<V>>,
    ) -> SkipNodePtr<V> {
        unsafe {
            (*node).mark_levels_from(level);

            let key = (*node).key();
            let pred = match hint {
                Some(hint)
                    if hint != node && (*hint).valid_level() > level && (*hint).key() < key =>
                {
                    hint
                }
                _ => {
                    let mut pred = self.head;
                    for search_level in (level..self.max_level).rev() {
                        pred = self.scan_key(pred, search_level, key).0;
                    }
                    pred
                }
            };

            self.remove_node(node, pred, level)
        }
    }

    /// Physically unlink a marked `node` at `level`, starting the search at `pred`.
    unsafe fn remove_node(
        &self,
        node: SkipNodePtr<V>,
        pred: SkipNodePtr<V>,
        level: usize,
    ) -> SkipNodePtr<V> {
        let mut backoff = B::default();
        let mut pred = pred;

        unsafe {
            let key = (*node).key();
            loop {
                let (found_pred, last) = self.scan_key(pred, level, key);
                pred = found_pred;
                if last != node {
                    // Not linked at this level (any more)
                    return pred;
                }

                // The marked slot no longer changes, so its reference is stable
                let succ = (*node).next(level).reference();
                let unlinked = (*pred)
                    .next(level)
                    .compare_and_set(MarkedPtr::new(node, false), MarkedPtr::new(succ, false));
                if unlinked.is_ok() {
                    return pred;
                }
                backoff.snooze();
            }
        }
    }

    /// Mark every level of `node` and unlink it top-down.
    unsafe fn unlink_all(&self, node: SkipNodePtr<V>, hint: Option<SkipNodePtr<V>>) {
        unsafe {
            (*node).mark_levels_from(0);

            let mut pred = self.head;
            for level in (0..(*node).height()).rev() {
                if level == 0 {
                    match hint {
                        Some(hint) if !hint.is_null() && !(*hint).is_deleted() => pred = hint,
                        _ => {}
                    }
                }
                pred = self.remove_node(node, pred, level);
            }
        }
    }

    #[inline]
    unsafe fn retire(&self, node: SkipNodePtr<V>) {
        unsafe {
            if (*node).release() {
                self.guard.defer_destroy(node, SkipNode::dealloc_node);
            }
        }
    }

    // =========================================================================
    // Public operations
    // =========================================================================

    /// Insert `value` under priority `key`.
    ///
    /// Returns `false` (dropping `value`) if a live entry already has `key`.
    pub fn insert(&self, value: V, key: i64) -> bool {
        let _pin = G::pin();
        let target = NodeKey::Key(key);
        let height = random_height(self.max_level);
        let mut saved: [SkipNodePtr<V>; MAX_LEVEL_LIMIT] = [ptr::null_mut(); MAX_LEVEL_LIMIT];
        let mut backoff = B::default();

        unsafe {
            let mut pred = self.head;
            for level in (1..self.max_level).rev() {
                pred = self.scan_key(pred, level, target).0;
                if level < height {
                    saved[level] = pred;
                }
            }

            let node = SkipNode::alloc_with_key(key, Some(value), height);

            loop {
                let (found_pred, succ) = self.scan_key(pred, 0, target);
                pred = found_pred;

                if (*succ).key() == target {
                    if !(*succ).is_deleted() {
                        // Never published
                        SkipNode::dealloc_node(node);
                        return false;
                    }
                    tracing::trace!(key, "helping deletion of an equal key before insert");
                    pred = self.help_delete(succ, 0, Some(pred));
                    continue;
                }

                (*node).next(0).store(succ, false);
                let linked = (*pred)
                    .next(0)
                    .compare_and_set(MarkedPtr::new(succ, false), MarkedPtr::new(node, false));
                if linked.is_ok() {
                    break;
                }
                backoff.snooze();
            }
            (*node).set_valid_level(1);
            backoff.reset();

            'levels: for level in 1..height {
                let mut pred = saved[level];
                loop {
                    if (*node).is_deleted() {
                        break 'levels;
                    }

                    let (found_pred, succ) = self.scan_key(pred, level, target);
                    pred = found_pred;

                    if succ != node && (*succ).key() == target {
                        // An older entry with our key is still linked here; it
                        // must leave before we link in front of it. A live one
                        // means we were deleted meanwhile.
                        if (*succ).is_deleted() {
                            pred = self.help_delete(succ, level, Some(pred));
                        } else {
                            backoff.snooze();
                        }
                        continue;
                    }

                    let current = (*node).next(level).load();
                    if current.is_marked() {
                        break 'levels;
                    }
                    if current.as_ptr() != succ
                        && (*node)
                            .next(level)
                            .compare_and_set(current, MarkedPtr::new(succ, false))
                            .is_err()
                    {
                        continue;
                    }

                    let linked = (*pred)
                        .next(level)
                        .compare_and_set(MarkedPtr::new(succ, false), MarkedPtr::new(node, false));
                    if linked.is_ok() {
                        break;
                    }
                    backoff.snooze();
                }
                (*node).set_valid_level(level + 1);
            }

            if (*node).is_deleted() {
                tracing::trace!(key, "insert overtaken by deleteMin, finishing the unlink");
                self.unlink_all(node, None);
            }
            self.retire(node);
        }

        true
    }

    /// Remove and return the value with the smallest key, or `None` if empty.
    pub fn delete_min(&self) -> Option<V> {
        let _pin = G::pin();

        unsafe {
            let mut pred = self.head;
            let node = 'search: loop {
                let (found_pred, node) = self.read_next(pred, 0, None);
                pred = found_pred;
                if node == self.tail {
                    return None;
                }

                loop {
                    if (*pred).next(0).reference() != node {
                        continue 'search;
                    }
                    if !(*node).is_deleted() {
                        if (*node).try_mark_deleted() {
                            (*node).set_prev(pred);
                            break 'search node;
                        }
                        // Lost the race; the node is deleted now
                        continue;
                    }

                    let key = (*node).key();
                    tracing::trace!(key = %key, "helping deletion of the minimum");
                    pred = self.help_delete(node, 0, Some(pred));
                    continue 'search;
                }
            };

            let value = (*node).take_value();
            debug_assert!(value.is_some(), "INVARIANT VIOLATION: deleted node had no value");

            self.unlink_all(node, Some((*node).prev()));
            self.retire(node);
            value
        }
    }

    /// Smallest key currently present, without removing it.
    pub fn peek_min_key(&self) -> Option<i64> {
        let _pin = G::pin();
        unsafe {
            let mut curr = (*self.head).next(0).reference();
            while curr != self.tail {
                match (*curr).key() {
                    NodeKey::Key(key) if !(*curr).is_deleted() => return Some(key),
                    _ => {}
                }
                curr = (*curr).next(0).reference();
            }
        }
        None
    }

    /// Number of live entries; exact only when no operation is in flight.
    pub fn len(&self) -> usize {
        let _pin = G::pin();
        let mut count = 0;
        unsafe {
            let mut curr = (*self.head).next(0).reference();
            while curr != self.tail {
                if !(*curr).is_deleted() {
                    count += 1;
                }
                curr = (*curr).next(0).reference();
            }
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        self.peek_min_key().is_none()
    }

    /// Check that keys strictly increase along every level from head to tail.
    ///
    /// Only meaningful at quiescence.
    pub fn verify(&self) -> bool {
        let _pin = G::pin();
        for level in 0..self.max_level {
            unsafe {
                let mut prev = self.head;
                let mut curr = (*self.head).next(level).reference();
                while !curr.is_null() {
                    let (prev_key, curr_key) = ((*prev).key(), (*curr).key());
                    if prev_key >= curr_key {
                        tracing::warn!(
                            level,
                            prev = %prev_key,
                            curr = %curr_key,
                            "priority queue level out of order"
                        );
                        return false;
                    }
                    if curr == self.tail {
                        break;
                    }
                    prev = curr;
                    curr = (*curr).next(level).reference();
                }
                if curr != self.tail {
                    tracing::warn!(level, "priority queue level does not end at the tail");
                    return false;
                }
            }
        }
        true
    }
}

impl<V, G: Guard, B: Backoff> Default for LockFreePriorityQueue<V, G, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, G: Guard, B: Backoff> fmt::Display for LockFreePriorityQueue<V, G, B> {
    /// One line per level, top first: `head, keys..., tail, `.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let _pin = G::pin();
        for level in (0..self.max_level).rev() {
            unsafe {
                let mut curr = self.head;
                loop {
                    write!(f, "{}, ", (*curr).key())?;
                    if curr == self.tail {
                        break;
                    }
                    curr = (*curr).next(level).reference();
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl<V, G: Guard, B: Backoff> Drop for LockFreePriorityQueue<V, G, B> {
    fn drop(&mut self) {
        // Nodes still linked at level 0 were never retired; free them along
        // with their values. Retired nodes belong to the guard.
        unsafe {
            let mut curr = (*self.head).next(0).reference();
            while curr != self.tail {
                let next = (*curr).next(0).reference();
                SkipNode::dealloc_node(curr);
                curr = next;
            }
            SkipNode::dealloc_node(self.head);
            SkipNode::dealloc_node(self.tail);
        }
    }
}

// Safety: values move between threads through delete_min, and nodes are only
// reached through atomic slots under the guard's protection.
unsafe impl<V: Send, G: Guard, B: Backoff> Send for LockFreePriorityQueue<V, G, B> {}
unsafe impl<V: Send, G: Guard, B: Backoff> Sync for LockFreePriorityQueue<V, G, B> {}
