//! Error types for coral.
//!
//! Structure operations never fail; contention is absorbed by retries and
//! negative outcomes are `false`/`None`. Errors only come from configuration
//! validation and from the stress driver.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoralError {
    /// Heap capacity outside the supported range.
    #[error("Invalid heap capacity: {0} (must be at least 1)")]
    InvalidCapacity(usize),

    /// Skip list height outside the supported range.
    #[error("Invalid skip list max level: {requested} (must be within 1..={limit})")]
    InvalidMaxLevel { requested: usize, limit: usize },

    /// Stress driver configuration that cannot run.
    #[error("Invalid stress configuration: {0}")]
    InvalidStressConfig(String),

    /// Workers did not finish within the configured bound.
    #[error("Stress workers did not finish within {timeout:?} ({pending} still running)")]
    StressTimeout { timeout: Duration, pending: usize },

    /// A worker thread panicked.
    #[error("Stress worker panicked: {0}")]
    WorkerPanicked(String),
}

pub type Result<T> = std::result::Result<T, CoralError>;
