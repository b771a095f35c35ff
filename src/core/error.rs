//! Error types for pool operations.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by the thread pool.
///
/// `ThreadPool::submit` never surfaces these; only the explicit
/// `try_submit` / `wait_for_termination` APIs do.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Every admission slot is taken; the job was dropped.
    #[error("job queue is full")]
    QueueFull,
    /// The cancellation signal has been raised.
    #[error("pool has been shut down")]
    PoolShutdown,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// An executor or dispatcher thread (or its runtime) could not be started.
    #[error("failed to spawn {what}: {source}")]
    Spawn {
        /// Which unit failed to start.
        what: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
    /// Threads were still running when the wait deadline passed.
    #[error("pool did not terminate within {0:?}")]
    Timeout(Duration),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
