// Markable reference: a node pointer and a deletion bit in one atomic word.
//
// Bit layout:
//   Bit 0: DELETE_MARK - the node owning this slot is logically removed at
//          this level; the slot must not be changed except to unlink it.
//
// Nodes are at least pointer aligned, so bit 0 of a real address is always 0.
//
// Reading and compare-and-swapping the pair as one word is what lets a remover
// freeze a slot while a concurrent insert tries to link behind it: with two
// separate atomics the insert could win after the mark and the new node would
// be lost.
//
// All slot accesses are SeqCst. An inserter links an upper level and then
// checks whether its node was marked, while a remover marks and then searches
// for the node to unlink it; one of the two must observe the other's write.
//
use std::sync::atomic::{AtomicPtr, Ordering};

const DELETE_MARK: usize = 0b1;

/// A snapshot of a markable reference: pointer plus deletion bit.
pub(crate) struct MarkedPtr<T> {
    ptr: *mut T,
}

// Manual impls to avoid requiring T: Clone/Copy
impl<T> Copy for MarkedPtr<T> {}

impl<T> Clone for MarkedPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for MarkedPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl<T> Eq for MarkedPtr<T> {}

impl<T> std::fmt::Debug for MarkedPtr<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkedPtr")
            .field("ptr", &self.as_ptr())
            .field("marked", &self.is_marked())
            .finish()
    }
}

impl<T> MarkedPtr<T> {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Create from a raw word (possibly carrying the mark).
    #[inline]
    pub(crate) fn from_raw(ptr: *mut T) -> Self {
        MarkedPtr { ptr }
    }

    /// Create from a clean pointer and a mark.
    #[inline]
    pub(crate) fn new(ptr: *mut T, marked: bool) -> Self {
        debug_assert_eq!(ptr as usize & DELETE_MARK, 0, "pointer is not aligned");
        let bits = if marked {
            ptr as usize | DELETE_MARK
        } else {
            ptr as usize
        };
        MarkedPtr {
            ptr: bits as *mut T,
        }
    }

    // =========================================================================
    // Extraction
    // =========================================================================

    /// The clean pointer without the mark (the one you dereference).
    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut T {
        (self.ptr as usize & !DELETE_MARK) as *mut T
    }

    /// The raw word with the mark intact (for CAS operations).
    #[inline]
    pub(crate) fn as_raw(&self) -> *mut T {
        self.ptr
    }

    #[inline]
    pub(crate) fn is_marked(&self) -> bool {
        (self.ptr as usize & DELETE_MARK) != 0
    }

    // =========================================================================
    // Transformers
    // =========================================================================

    /// Same pointer with the given mark.
    #[inline]
    pub(crate) fn with_mark(&self, mark: bool) -> Self {
        MarkedPtr::new(self.as_ptr(), mark)
    }
}

/// An atomically updatable `(pointer, mark)` pair.
pub(crate) struct MarkableReference<T> {
    word: AtomicPtr<T>,
}

impl<T> MarkableReference<T> {
    #[inline]
    pub(crate) fn new(ptr: *mut T, marked: bool) -> Self {
        MarkableReference {
            word: AtomicPtr::new(MarkedPtr::new(ptr, marked).as_raw()),
        }
    }

    /// Load the pair.
    #[inline]
    pub(crate) fn load(&self) -> MarkedPtr<T> {
        MarkedPtr::from_raw(self.word.load(Ordering::SeqCst))
    }

    /// Load only the pointer.
    #[inline]
    pub(crate) fn reference(&self) -> *mut T {
        self.load().as_ptr()
    }

    #[inline]
    pub(crate) fn is_marked(&self) -> bool {
        self.load().is_marked()
    }

    /// Unconditionally store a pair.
    ///
    /// Only valid while the owning node is not yet reachable by other threads.
    #[inline]
    pub(crate) fn store(&self, ptr: *mut T, marked: bool) {
        self.word
            .store(MarkedPtr::new(ptr, marked).as_raw(), Ordering::SeqCst)
    }

    /// Compare-and-swap the whole pair.
    ///
    /// Returns `Err(actual)` with the observed pair on failure.
    #[inline]
    pub(crate) fn compare_and_set(
        &self,
        expected: MarkedPtr<T>,
        new: MarkedPtr<T>,
    ) -> Result<MarkedPtr<T>, MarkedPtr<T>> {
        self.word
            .compare_exchange(
                expected.as_raw(),
                new.as_raw(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .map(MarkedPtr::from_raw)
            .map_err(MarkedPtr::from_raw)
    }

    /// Set the mark while keeping the reference, retrying until the slot is
    /// marked by someone.
    ///
    /// Returns `true` if this call performed the `false -> true` transition.
    #[inline]
    pub(crate) fn mark(&self) -> bool {
        let mut current = self.load();
        loop {
            if current.is_marked() {
                return false;
            }
            match self.compare_and_set(current, current.with_mark(true)) {
                Ok(_) => return true,
                // Either the reference moved (an insert linked behind us) or
                // another thread marked it; re-examine.
                Err(actual) => current = actual,
            }
        }
    }
}
