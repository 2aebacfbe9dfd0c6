use std::alloc::{Layout, alloc, dealloc};
use std::cell::UnsafeCell;
use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, AtomicU8, AtomicUsize, Ordering};

use super::marked_ptr::MarkableReference;

pub(crate) type SkipNodePtr<V> = *mut SkipNode<V>;

/// Ordering key of a skip node.
///
/// The derived ordering follows declaration order, so the head sentinel
/// (`NegInf`) sorts below and the tail sentinel (`PosInf`) above every user key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum NodeKey {
    NegInf,
    Key(i64),
    PosInf,
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::NegInf => write!(f, "{}", i64::MIN),
            NodeKey::Key(key) => write!(f, "{}", key),
            NodeKey::PosInf => write!(f, "{}", i64::MAX),
        }
    }
}

/// Parties that must release a node before it can be retired: its inserter
/// and its remover.
const RELEASE_PARTIES: u8 = 2;

// ============================================================================
// SkipNode - Multi-level node with inline tower
// ============================================================================

/// A skip list node with tower structure.
///
/// Uses the flexible array member pattern:
/// - Single allocation per node
/// - Successor slots are laid out inline after the header
/// - Layout: [header][next[0..h]] where h = height
///
/// The header carries everything both lock-free collections need. The
/// ordered set leaves `value`, `deleted` and `prev` unused.
///
#[repr(C)]
pub(crate) struct SkipNode<V> {
    key: NodeKey,
    /// Moved out by the deleteMin winner; nobody else touches it.
    value: UnsafeCell<Option<V>>,
    height: usize,
    /// Levels `< valid_level` have been linked by the inserter.
    valid_level: AtomicUsize,
    /// Logical deletion flag (priority queue ownership of the value).
    deleted: AtomicBool,
    /// Predecessor recorded by the deleteMin winner.
    prev: AtomicPtr<SkipNode<V>>,
    pending_release: AtomicU8,
    // Flexible array: successor slots are allocated inline after this struct
    next: [MarkableReference<SkipNode<V>>; 0],
}

impl<V> SkipNode<V> {
    /// Calculate layout for a node with given height
    fn get_layout(height: usize) -> Layout {
        Layout::new::<Self>()
            .extend(
                Layout::array::<MarkableReference<Self>>(height)
                    .expect("skip node tower layout overflow"),
            )
            .expect("skip node layout overflow")
            .0
            .pad_to_align()
    }

    fn alloc_raw(key: NodeKey, value: Option<V>, height: usize, valid_level: usize) -> *mut Self {
        assert!(height > 0, "skip node height must be at least 1");
        unsafe {
            let layout = Self::get_layout(height);
            let node = alloc(layout) as *mut Self;
            if node.is_null() {
                std::alloc::handle_alloc_error(layout);
            }

            ptr::write(&mut (*node).key, key);
            ptr::write(&mut (*node).value, UnsafeCell::new(value));
            ptr::write(&mut (*node).height, height);
            ptr::write(&mut (*node).valid_level, AtomicUsize::new(valid_level));
            ptr::write(&mut (*node).deleted, AtomicBool::new(false));
            ptr::write(&mut (*node).prev, AtomicPtr::new(ptr::null_mut()));
            ptr::write(
                &mut (*node).pending_release,
                AtomicU8::new(RELEASE_PARTIES),
            );

            let slots = (*node).next.as_ptr() as *mut MarkableReference<Self>;
            for i in 0..height {
                ptr::write(
                    slots.add(i),
                    MarkableReference::new(ptr::null_mut(), false),
                );
            }

            node
        }
    }

    /// Allocate a data node. Nothing is linked yet, so `valid_level` is 0.
    pub(crate) fn alloc_with_key(key: i64, value: Option<V>, height: usize) -> *mut Self {
        Self::alloc_raw(NodeKey::Key(key), value, height, 0)
    }

    /// Allocate a head or tail sentinel spanning `height` levels.
    pub(crate) fn alloc_sentinel(key: NodeKey, height: usize) -> *mut Self {
        debug_assert!(!matches!(key, NodeKey::Key(_)));
        Self::alloc_raw(key, None, height, height)
    }

    /// Deallocate a node.
    ///
    /// # Safety
    /// The pointer must come from `alloc_with_key`/`alloc_sentinel`, must not
    /// be reachable by any thread, and must not be freed twice.
    pub(crate) unsafe fn dealloc_node(node: *mut Self) {
        unsafe {
            let layout = Self::get_layout((*node).height);

            // The slots and atomics need no drop; the value does.
            ptr::drop_in_place(&mut (*node).value);

            dealloc(node as *mut u8, layout);
        }
    }

    // =========================================================================
    // Field accessors
    // =========================================================================

    #[inline]
    pub(crate) fn key(&self) -> NodeKey {
        self.key
    }

    /// Move the value out of the node.
    ///
    /// # Safety
    /// The caller must own the value: it won `try_mark_deleted` on this node.
    #[inline]
    pub(crate) unsafe fn take_value(&self) -> Option<V> {
        unsafe { (*self.value.get()).take() }
    }

    #[inline]
    pub(crate) fn height(&self) -> usize {
        self.height
    }

    /// Successor slot at `level`.
    #[inline]
    pub(crate) fn next(&self, level: usize) -> &MarkableReference<SkipNode<V>> {
        assert!(
            level < self.height,
            "INVARIANT VIOLATION: level {} beyond node height {}",
            level,
            self.height
        );
        unsafe { &*self.next.as_ptr().add(level) }
    }

    #[inline]
    pub(crate) fn valid_level(&self) -> usize {
        self.valid_level.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_valid_level(&self, level: usize) {
        self.valid_level.store(level, Ordering::Release)
    }

    // =========================================================================
    // Logical deletion (priority queue)
    // =========================================================================

    #[inline]
    pub(crate) fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::SeqCst)
    }

    /// CAS the deletion flag `false -> true`. Exactly one caller wins.
    #[inline]
    pub(crate) fn try_mark_deleted(&self) -> bool {
        self.deleted
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    #[inline]
    pub(crate) fn prev(&self) -> *mut SkipNode<V> {
        self.prev.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_prev(&self, prev: *mut SkipNode<V>) {
        self.prev.store(prev, Ordering::Release)
    }

    /// Mark every successor slot from `from_level` upward.
    pub(crate) fn mark_levels_from(&self, from_level: usize) {
        for level in from_level..self.height {
            self.next(level).mark();
        }
    }

    // =========================================================================
    // Retirement hand-off
    // =========================================================================

    /// Give up one party's claim on the node.
    ///
    /// Returns `true` for the last party, which must retire the node.
    #[inline]
    pub(crate) fn release(&self) -> bool {
        let previous = self.pending_release.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "skip node released too many times");
        previous == 1
    }
}

/// Pick a tower height with a geometric distribution (p = 1/2), capped.
///
/// Instead of calling the RNG once per level, generate a single random word
/// and count trailing ones:
/// - Height 1: 50%
/// - Height 2: 25%
/// - Height N: (1/2)^N
#[inline]
pub(crate) fn random_height(max_level: usize) -> usize {
    let random_bits = fastrand::u32(..);
    let extra_levels = (!random_bits).trailing_zeros() as usize;
    (1 + extra_levels).min(max_level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_key_ordering() {
        assert!(NodeKey::NegInf < NodeKey::Key(i64::MIN));
        assert!(NodeKey::Key(i64::MAX) < NodeKey::PosInf);
        assert!(NodeKey::Key(-5) < NodeKey::Key(3));
        assert_eq!(NodeKey::Key(4).to_string(), "4");
    }

    #[test]
    fn test_alloc_and_slots() {
        let tail = SkipNode::<u32>::alloc_sentinel(NodeKey::PosInf, 4);
        let node = SkipNode::alloc_with_key(10, Some(7u32), 3);

        unsafe {
            assert_eq!((*node).key(), NodeKey::Key(10));
            assert_eq!((*node).height(), 3);
            assert_eq!((*node).valid_level(), 0);
            assert_eq!((*tail).key(), NodeKey::PosInf);
            assert_eq!((*tail).valid_level(), 4);

            for level in 0..3 {
                assert!((*node).next(level).reference().is_null());
                (*node).next(level).store(tail, false);
            }

            (*node).mark_levels_from(1);
            assert!(!(*node).next(0).is_marked());
            assert!((*node).next(1).is_marked());
            assert!((*node).next(2).is_marked());
            assert_eq!((*node).next(2).reference(), tail);

            assert!((*node).try_mark_deleted());
            assert_eq!((*node).take_value(), Some(7));
            assert_eq!((*node).take_value(), None);

            SkipNode::dealloc_node(node);
            SkipNode::dealloc_node(tail);
        }
    }

    #[test]
    fn test_deleted_flag_single_winner() {
        let node = SkipNode::<()>::alloc_with_key(1, None, 1);
        unsafe {
            assert!((*node).try_mark_deleted());
            assert!(!(*node).try_mark_deleted());
            assert!((*node).is_deleted());
            SkipNode::dealloc_node(node);
        }
    }

    #[test]
    fn test_release_two_parties() {
        let node = SkipNode::<()>::alloc_with_key(1, None, 1);
        unsafe {
            assert!(!(*node).release());
            assert!((*node).release());
            SkipNode::dealloc_node(node);
        }
    }

    #[test]
    fn test_random_height_bounds() {
        for _ in 0..10_000 {
            let height = random_height(8);
            assert!((1..=8).contains(&height));
        }
        assert_eq!(random_height(1), 1);
    }
}
