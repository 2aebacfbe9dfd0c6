//! Back-off policies for compare-and-swap retry loops.
//!
//! Each retry loop creates a fresh policy instance and calls [`Backoff::snooze`]
//! after every failed attempt. The lock-free collections are generic over the
//! policy so that contention handling can be tuned per platform.

use std::thread;

/// A back-off policy for a single retry loop.
pub trait Backoff: Default {
    /// Pause before the next attempt.
    fn snooze(&mut self);

    /// Forget accumulated contention (called after progress is made).
    fn reset(&mut self);
}

/// Yields the time slice on every failed attempt.
#[derive(Debug, Default, Clone, Copy)]
pub struct YieldBackoff;

impl Backoff for YieldBackoff {
    #[inline]
    fn snooze(&mut self) {
        thread::yield_now();
    }

    #[inline]
    fn reset(&mut self) {}
}

/// Exponential spinning that switches to yielding once spinning stops paying off.
///
/// Thin wrapper over `crossbeam::utils::Backoff`.
#[derive(Debug, Default)]
pub struct SpinBackoff {
    inner: crossbeam::utils::Backoff,
}

impl Backoff for SpinBackoff {
    #[inline]
    fn snooze(&mut self) {
        self.inner.snooze();
    }

    #[inline]
    fn reset(&mut self) {
        self.inner.reset();
    }
}
