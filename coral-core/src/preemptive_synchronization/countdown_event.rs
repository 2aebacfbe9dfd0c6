use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// A latch that opens once it has been signalled `count` times.
pub struct CountdownEvent {
    count: Mutex<usize>,
    condvar: Condvar,
    notified: AtomicBool,
}

impl CountdownEvent {
    // Create a new CountdownEvent with initial count.
    //
    pub fn new(count: usize) -> Self {
        CountdownEvent {
            count: Mutex::new(count),
            condvar: Condvar::new(),
            notified: AtomicBool::new(count == 0),
        }
    }

    // Workers signal from threads that may be unwinding, so a poisoned count
    // is still a valid count.
    //
    fn lock_count(&self) -> MutexGuard<'_, usize> {
        self.count
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // Signal the event, decrementing count by one.
    // Returns true for the signal that opened the latch.
    //
    pub fn signal(&self) -> bool {
        let mut count = self.lock_count();
        if *count == 0 {
            return false;
        }
        *count -= 1;
        if *count == 0 {
            self.condvar.notify_all();
            self.notified.store(true, Ordering::Release);
            true
        } else {
            false
        }
    }

    pub fn is_set(&self) -> bool {
        self.notified.load(Ordering::Acquire)
    }

    pub fn remaining(&self) -> usize {
        *self.lock_count()
    }

    // Wait until count reaches zero.
    //
    pub fn wait(&self) {
        let mut count = self.lock_count();
        while *count > 0 {
            count = self
                .condvar
                .wait(count)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    // Wait until count reaches zero or `timeout` elapses.
    // Returns false on timeout.
    //
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.lock_count();
        while *count > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            count = self
                .condvar
                .wait_timeout(count, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .0;
        }
        true
    }
}
