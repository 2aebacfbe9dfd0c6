use std::fmt;
use std::marker::PhantomData;
use std::ptr;

use crate::backoff::{Backoff, SpinBackoff};
use crate::data_structures::internal::marked_ptr::MarkedPtr;
use crate::data_structures::internal::skip_node::{NodeKey, SkipNode, SkipNodePtr, random_height};
use crate::error::Result;
use crate::guard::Guard;
use crate::options::{MAX_LEVEL_LIMIT, SkipListOptions};

type Node = SkipNode<()>;
type Tower = [SkipNodePtr<()>; MAX_LEVEL_LIMIT];

// ============================================================================
// LockFreeSkipList - ordered set of i64 keys
// ============================================================================

/// A lock-free ordered set of `i64` keys.
///
/// Structure:
/// - Head and tail sentinels span every level
/// - A key is in the set iff its node is reachable at level 0 with an
///   unmarked level-0 successor slot
/// - Removal marks the slots top-down; marking level 0 decides the winner
///
/// Traversals physically unlink marked nodes they pass. A failed unlink
/// restarts the search from the head.
///
pub struct LockFreeSkipList<G: Guard, B: Backoff = SpinBackoff> {
    head: SkipNodePtr<()>,
    tail: SkipNodePtr<()>,
    max_level: usize,
    guard: G,
    _backoff: PhantomData<fn() -> B>,
}

impl<G: Guard, B: Backoff> LockFreeSkipList<G, B> {
    /// Create an empty set with the default level cap.
    pub fn new() -> Self {
        Self::build(SkipListOptions::default().max_level())
    }

    /// Create an empty set with validated options.
    pub fn with_options(options: SkipListOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self::build(options.max_level()))
    }

    fn build(max_level: usize) -> Self {
        let head = Node::alloc_sentinel(NodeKey::NegInf, max_level);
        let tail = Node::alloc_sentinel(NodeKey::PosInf, max_level);
        unsafe {
            for level in 0..max_level {
                (*head).next(level).store(tail, false);
            }
        }

        LockFreeSkipList {
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

    /// Locate `key` at every level, unlinking marked nodes on the way.
    ///
    /// On return `preds[l].key < key <= succs[l].key` for every level, and the
    /// result says whether `succs[0]` holds `key`.
    fn find(&self, key: i64, preds: &mut Tower, succs: &mut Tower) -> bool {
        let target = NodeKey::Key(key);

        'retry: loop {
            let mut pred = self.head;
            for level in (0..self.max_level).rev() {
                unsafe {
                    let mut curr = (*pred).next(level).reference();
                    loop {
                        assert!(
                            !curr.is_null(),
                            "INVARIANT VIOLATION: null successor at level {} before tail",
                            level
                        );
                        let mut succ = (*curr).next(level).load();
                        while succ.is_marked() {
                            let snipped = (*pred).next(level).compare_and_set(
                                MarkedPtr::new(curr, false),
                                MarkedPtr::new(succ.as_ptr(), false),
                            );
                            if snipped.is_err() {
                                tracing::trace!(key, level, "unlink contended, restarting search");
                                continue 'retry;
                            }
                            curr = succ.as_ptr();
                            assert!(
                                !curr.is_null(),
                                "INVARIANT VIOLATION: null successor at level {} before tail",
                                level
                            );
                            succ = (*curr).next(level).load();
                        }

                        if (*curr).key() < target {
                            pred = curr;
                            curr = succ.as_ptr();
                        } else {
                            break;
                        }
                    }
                    preds[level] = pred;
                    succs[level] = curr;
                }
            }

            return unsafe { (*succs[0]).key() } == target;
        }
    }

    /// Insert `key`. Returns `false` if it is already present.
    pub fn add(&self, key: i64) -> bool {
        let _pin = G::pin();
        let mut preds: Tower = [ptr::null_mut(); MAX_LEVEL_LIMIT];
        let mut succs: Tower = [ptr::null_mut(); MAX_LEVEL_LIMIT];
        let height = random_height(self.max_level);
        let mut node: SkipNodePtr<()> = ptr::null_mut();
        let mut backoff = B::default();

        loop {
            if self.find(key, &mut preds, &mut succs) {
                if !node.is_null() {
                    // Never published
                    unsafe { Node::dealloc_node(node) };
                }
                return false;
            }

            if node.is_null() {
                node = Node::alloc_with_key(key, None, height);
            }

            unsafe {
                for level in 0..height {
                    (*node).next(level).store(succs[level], false);
                }

                // Linking level 0 is the linearization point
                let linked = (*preds[0]).next(0).compare_and_set(
                    MarkedPtr::new(succs[0], false),
                    MarkedPtr::new(node, false),
                );
                if linked.is_ok() {
                    break;
                }
            }
            backoff.snooze();
        }

        unsafe {
            (*node).set_valid_level(1);
            self.link_upper_levels(node, key, &mut preds, &mut succs);

            if (*node).next(0).is_marked() {
                // A remover overtook the upper-level linking; make sure no
                // level still points at the node before giving up our claim.
                self.find(key, &mut preds, &mut succs);
            }

            if (*node).release() {
                self.guard.defer_destroy(node, Node::dealloc_node);
            }
        }

        true
    }

    /// Link `node` at levels `1..height`, stopping early once it is marked.
    unsafe fn link_upper_levels(
        &self,
        node: SkipNodePtr<()>,
        key: i64,
        preds: &mut Tower,
        succs: &mut Tower,
    ) {
        let mut backoff = B::default();
        let height = unsafe { (*node).height() };

        for level in 1..height {
            loop {
                unsafe {
                    let pred = preds[level];
                    let succ = succs[level];

                    let current = (*node).next(level).load();
                    if current.is_marked() {
                        return;
                    }
                    if succ != node && (*succ).key() == NodeKey::Key(key) {
                        // A removed node with our key is still linked here.
                        // Linking in front of it would hide it from the
                        // searches that must unlink it.
                        if !self.find(key, preds, succs) || succs[0] != node {
                            return;
                        }
                        continue;
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
                    if !self.find(key, preds, succs) || succs[0] != node {
                        // Removed while we were linking
                        return;
                    }
                }
            }
            unsafe { (*node).set_valid_level(level + 1) };
            backoff.reset();
        }
    }

    /// Remove `key`. Returns `true` only for the thread whose removal took effect.
    pub fn remove(&self, key: i64) -> bool {
        let _pin = G::pin();
        let mut preds: Tower = [ptr::null_mut(); MAX_LEVEL_LIMIT];
        let mut succs: Tower = [ptr::null_mut(); MAX_LEVEL_LIMIT];

        if !self.find(key, &mut preds, &mut succs) {
            return false;
        }

        let node = succs[0];
        unsafe {
            for level in (1..(*node).height()).rev() {
                (*node).next(level).mark();
            }

            if !(*node).next(0).mark() {
                return false;
            }

            // Physically unlink at every level
            self.find(key, &mut preds, &mut succs);

            if (*node).release() {
                self.guard.defer_destroy(node, Node::dealloc_node);
            }
        }

        true
    }

    /// Membership test; unlinks marked nodes on the search path.
    pub fn contains(&self, key: i64) -> bool {
        let _pin = G::pin();
        let mut preds: Tower = [ptr::null_mut(); MAX_LEVEL_LIMIT];
        let mut succs: Tower = [ptr::null_mut(); MAX_LEVEL_LIMIT];
        self.find(key, &mut preds, &mut succs)
    }

    /// Keys currently in the set, in ascending order.
    pub fn to_vec(&self) -> Vec<i64> {
        let _pin = G::pin();
        let mut keys = Vec::new();
        unsafe {
            let mut curr = (*self.head).next(0).reference();
            while curr != self.tail {
                let succ = (*curr).next(0).load();
                match (*curr).key() {
                    NodeKey::Key(key) if !succ.is_marked() => keys.push(key),
                    _ => {}
                }
                curr = succ.as_ptr();
            }
        }
        keys
    }

    /// Number of keys; exact only when no operation is in flight.
    pub fn len(&self) -> usize {
        let _pin = G::pin();
        let mut count = 0;
        unsafe {
            let mut curr = (*self.head).next(0).reference();
            while curr != self.tail {
                let succ = (*curr).next(0).load();
                if !succ.is_marked() {
                    count += 1;
                }
                curr = succ.as_ptr();
            }
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check that every level is strictly increasing from head to tail.
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
                            "skip list level out of order"
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
                    tracing::warn!(level, "skip list level does not end at the tail");
                    return false;
                }
            }
        }
        true
    }
}

impl<G: Guard, B: Backoff> Default for LockFreeSkipList<G, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Guard, B: Backoff> fmt::Display for LockFreeSkipList<G, B> {
    /// One line per level, top level first, listing every key from head to tail.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let _pin = G::pin();
        for level in (0..self.max_level).rev() {
            write!(f, "{}:", level)?;
            unsafe {
                let mut curr = self.head;
                while !curr.is_null() {
                    write!(f, " {}", (*curr).key())?;
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

impl<G: Guard, B: Backoff> Drop for LockFreeSkipList<G, B> {
    fn drop(&mut self) {
        // Retired nodes belong to the guard; everything still linked at level 0
        // (and only those) is freed here.
        unsafe {
            let mut curr = (*self.head).next(0).reference();
            while !curr.is_null() && curr != self.tail {
                let next = (*curr).next(0).reference();
                Node::dealloc_node(curr);
                curr = next;
            }
            Node::dealloc_node(self.head);
            Node::dealloc_node(self.tail);
        }
    }
}

// Safety: nodes are only reached through atomic slots, and their memory is
// reclaimed through the guard.
unsafe impl<G: Guard, B: Backoff> Send for LockFreeSkipList<G, B> {}
unsafe impl<G: Guard, B: Backoff> Sync for LockFreeSkipList<G, B> {}
