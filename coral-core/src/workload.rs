//! Mixed insert/deleteMin stress driver.
//!
//! Runs a fixed number of inserter and deleter threads against one queue at
//! the same time, then reports what happened and whether the queue still
//! verifies. Priorities are drawn uniformly from `0..priority_range` and each
//! entry's value is its priority.

use std::any::Any;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rand::Rng;

use crate::data_structures::ConcurrentPriorityQueue;
use crate::error::{CoralError, Result};
use crate::preemptive_synchronization::CountdownEvent;

/// Shape of a stress run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StressConfig {
    inserters: usize,
    inserts_per_thread: usize,
    deleters: usize,
    deletes_per_thread: usize,
    priority_range: i64,
    timeout: Duration,
}

impl StressConfig {
    pub fn new() -> Self {
        StressConfig {
            inserters: 10,
            inserts_per_thread: 1000,
            deleters: 10,
            deletes_per_thread: 100,
            priority_range: 10_000,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_inserters(mut self, inserters: usize) -> Self {
        self.inserters = inserters;
        self
    }

    pub fn with_inserts_per_thread(mut self, inserts: usize) -> Self {
        self.inserts_per_thread = inserts;
        self
    }

    pub fn with_deleters(mut self, deleters: usize) -> Self {
        self.deleters = deleters;
        self
    }

    pub fn with_deletes_per_thread(mut self, deletes: usize) -> Self {
        self.deletes_per_thread = deletes;
        self
    }

    /// Priorities are drawn from `0..priority_range`.
    pub fn with_priority_range(mut self, priority_range: i64) -> Self {
        self.priority_range = priority_range;
        self
    }

    /// Upper bound on how long the driver waits for its workers.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn inserters(&self) -> usize {
        self.inserters
    }

    pub fn inserts_per_thread(&self) -> usize {
        self.inserts_per_thread
    }

    pub fn deleters(&self) -> usize {
        self.deleters
    }

    pub fn deletes_per_thread(&self) -> usize {
        self.deletes_per_thread
    }

    pub fn priority_range(&self) -> i64 {
        self.priority_range
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn validate(&self) -> Result<()> {
        if self.inserters + self.deleters == 0 {
            return Err(CoralError::InvalidStressConfig(
                "at least one worker thread is required".to_string(),
            ));
        }
        if self.priority_range <= 0 {
            return Err(CoralError::InvalidStressConfig(format!(
                "priority range must be positive, got {}",
                self.priority_range
            )));
        }
        if self.timeout.is_zero() {
            return Err(CoralError::InvalidStressConfig(
                "timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a stress run.
#[derive(Debug, Clone, Default)]
pub struct StressReport {
    /// Inserts that returned `true`.
    pub inserted: usize,
    /// Inserts that returned `false` (full heap or duplicate key).
    pub rejected: usize,
    /// deleteMin calls that returned a value.
    pub deleted: usize,
    /// deleteMin calls that found the queue empty.
    pub empty: usize,
    /// `verify()` after all workers finished.
    pub valid: bool,
    /// Values of the successful inserts.
    pub accepted: Vec<i64>,
    /// Values returned by deleteMin, per deleter in delivery order.
    pub delivered: Vec<Vec<i64>>,
    pub elapsed: Duration,
}

enum WorkerOutcome {
    Inserter { accepted: Vec<i64>, rejected: usize },
    Deleter { delivered: Vec<i64>, empty: usize },
}

/// Signals the latch when a worker finishes, including by panicking.
struct SignalOnDrop(Arc<CountdownEvent>);

impl Drop for SignalOnDrop {
    fn drop(&mut self) {
        self.0.signal();
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run inserters and deleters concurrently against `queue`.
///
/// Fails with `StressTimeout` if the workers do not finish within the
/// configured timeout (the stragglers are left running), and with
/// `WorkerPanicked` if any worker panics.
pub fn run_stress<Q>(queue: Arc<Q>, config: &StressConfig) -> Result<StressReport>
where
    Q: ConcurrentPriorityQueue<i64> + 'static,
{
    config.validate()?;

    let started = Instant::now();
    let finished = Arc::new(CountdownEvent::new(config.inserters + config.deleters));
    let mut handles: Vec<JoinHandle<WorkerOutcome>> =
        Vec::with_capacity(config.inserters + config.deleters);

    for _ in 0..config.inserters {
        let queue = Arc::clone(&queue);
        let finished = Arc::clone(&finished);
        let (count, range) = (config.inserts_per_thread, config.priority_range);
        handles.push(thread::spawn(move || {
            let _signal = SignalOnDrop(finished);
            let mut rng = rand::thread_rng();
            let mut accepted = Vec::with_capacity(count);
            let mut rejected = 0;
            for _ in 0..count {
                let priority = rng.gen_range(0..range);
                if queue.insert(priority, priority) {
                    accepted.push(priority);
                } else {
                    rejected += 1;
                }
            }
            WorkerOutcome::Inserter { accepted, rejected }
        }));
    }

    for _ in 0..config.deleters {
        let queue = Arc::clone(&queue);
        let finished = Arc::clone(&finished);
        let count = config.deletes_per_thread;
        handles.push(thread::spawn(move || {
            let _signal = SignalOnDrop(finished);
            let mut delivered = Vec::new();
            let mut empty = 0;
            for _ in 0..count {
                match queue.delete_min() {
                    Some(value) => delivered.push(value),
                    None => empty += 1,
                }
            }
            WorkerOutcome::Deleter { delivered, empty }
        }));
    }

    if !finished.wait_timeout(config.timeout) {
        let pending = finished.remaining();
        tracing::warn!(timeout = ?config.timeout, pending, "stress workers timed out");
        return Err(CoralError::StressTimeout {
            timeout: config.timeout,
            pending,
        });
    }

    let mut report = StressReport::default();
    for handle in handles {
        match handle.join() {
            Ok(WorkerOutcome::Inserter { accepted, rejected }) => {
                report.inserted += accepted.len();
                report.rejected += rejected;
                report.accepted.extend(accepted);
            }
            Ok(WorkerOutcome::Deleter { delivered, empty }) => {
                report.deleted += delivered.len();
                report.empty += empty;
                report.delivered.push(delivered);
            }
            Err(payload) => return Err(CoralError::WorkerPanicked(panic_message(payload))),
        }
    }

    report.valid = queue.verify();
    report.elapsed = started.elapsed();

    tracing::info!(
        inserted = report.inserted,
        rejected = report.rejected,
        deleted = report.deleted,
        empty = report.empty,
        valid = report.valid,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "stress run finished"
    );

    Ok(report)
}
