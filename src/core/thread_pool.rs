//! The pool facade: construction, submission and shutdown.
//!
//! # Example
//!
//! ```rust
//! use prometheus_dispatch_pool::core::ThreadPool;
//! use std::time::Duration;
//!
//! let pool = ThreadPool::with_limits(4, 100)?;
//!
//! // Fire and forget; dropped silently if the queue is full.
//! pool.submit(|| {
//!     // send an email, write an audit row, ...
//!     Ok(())
//! });
//!
//! pool.shutdown_and_wait(Duration::from_secs(5))?;
//! # Ok::<(), prometheus_dispatch_pool::core::PoolError>(())
//! ```

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ThreadPoolConfig;

use super::dispatcher::Dispatcher;
use super::error::PoolError;
use super::executor::Executor;
use super::job::JobResult;
use super::queue::PendingQueue;
use super::registry::{Availability, ExecutorRegistry};
use super::stats::{PoolCounters, PoolStats};

/// A fixed set of executor threads fed through a bounded pending queue.
///
/// At most `max_executors` jobs run at once. While every executor is busy at
/// most `max_queue` further jobs wait; anything beyond that is dropped.
/// Jobs are not guaranteed to run in submission order once more than one is
/// waiting for an executor.
///
/// The pool is not restartable: after [`shutdown`](Self::shutdown) every
/// submission is dropped. Share it between callers with `Arc<ThreadPool>`.
pub struct ThreadPool {
    config: ThreadPoolConfig,
    queue: PendingQueue,
    cancel: CancellationToken,
    counters: Arc<PoolCounters>,
    /// Parking side of the registry, only read for the idle count.
    availability: Availability,
    /// Disconnects once every pool thread has exited.
    exited: Receiver<()>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadPool {
    /// Create a pool and start its executors and dispatcher.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` if the configuration is invalid
    /// - `PoolError::Spawn` if a thread or runtime cannot be started; threads
    ///   already started are told to stop
    pub fn new(config: ThreadPoolConfig) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let cancel = CancellationToken::new();
        let counters = Arc::new(PoolCounters::default());
        let (queue, queue_rx) =
            PendingQueue::new(config.max_executors, config.max_queue, Arc::clone(&counters));
        let (registry, availability) = ExecutorRegistry::new(config.max_executors);
        let (exit_guard, exited) = flume::bounded::<()>(0);

        let executors = (0..config.max_executors)
            .map(|id| Executor::new(id, availability.clone(), cancel.clone(), Arc::clone(&counters)))
            .collect();
        let dispatcher = Dispatcher::new(queue_rx, registry, cancel.clone());

        let mut threads = Vec::with_capacity(config.max_executors + 1);
        if let Err(e) = start_threads(&config, executors, dispatcher, exit_guard, &mut threads) {
            cancel.cancel();
            warn!(error = %e, started = threads.len(), "ThreadPool start failed");
            return Err(e);
        }

        info!(
            max_executors = config.max_executors,
            max_queue = config.max_queue,
            "ThreadPool initialized"
        );

        Ok(Self {
            config,
            queue,
            cancel,
            counters,
            availability,
            exited,
            threads: Mutex::new(threads),
        })
    }

    /// Create a pool with `max_executors` executors and room for `max_queue`
    /// waiting jobs, using defaults for everything else.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_limits(max_executors: usize, max_queue: usize) -> Result<Self, PoolError> {
        Self::new(
            ThreadPoolConfig::new()
                .with_max_executors(max_executors)
                .with_max_queue(max_queue),
        )
    }

    /// Submit a job, fire and forget.
    ///
    /// Never blocks. If the queue is full, or the pool has been shut down, the
    /// job is dropped without running and nothing is reported to the caller.
    /// Use [`try_submit`](Self::try_submit) to observe the rejection.
    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() -> JobResult + Send + 'static,
    {
        if let Err(e) = self.try_submit(job) {
            debug!(reason = %e, "Job dropped");
        }
    }

    /// Submit a job, reporting whether it was accepted.
    ///
    /// Acceptance has the same rules as [`submit`](Self::submit); only the
    /// outcome is visible.
    ///
    /// # Errors
    ///
    /// - `PoolError::QueueFull` if the job was dropped for lack of room
    /// - `PoolError::PoolShutdown` if the pool has been shut down
    pub fn try_submit<F>(&self, job: F) -> Result<(), PoolError>
    where
        F: FnOnce() -> JobResult + Send + 'static,
    {
        if self.is_shutdown() {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(PoolError::PoolShutdown);
        }
        self.queue.try_push(job)
    }

    /// Raise the cancellation signal and return immediately.
    ///
    /// Jobs already running finish; jobs still waiting are discarded. A job
    /// handed to an idle executor that has not started it yet counts as
    /// waiting and is discarded too. This does not wait for any thread to
    /// exit; see [`wait_for_termination`](Self::wait_for_termination).
    pub fn shutdown(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        info!("Shutting down thread pool");
        self.cancel.cancel();
    }

    /// Block until the dispatcher and every executor have exited.
    ///
    /// Only returns `Ok` after [`shutdown`](Self::shutdown) has been called
    /// and every running job has finished.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Timeout` if threads are still running at the
    /// deadline; the wait can be retried.
    pub fn wait_for_termination(&self, timeout: Duration) -> Result<(), PoolError> {
        let deadline = Instant::now() + timeout;
        match self.exited.recv_deadline(deadline) {
            Err(RecvTimeoutError::Disconnected) => {}
            Ok(()) | Err(RecvTimeoutError::Timeout) => return Err(PoolError::Timeout(timeout)),
        }

        let threads: Vec<_> = self.threads.lock().drain(..).collect();
        let count = threads.len();
        for thread in threads {
            let name = thread.thread().name().unwrap_or("unnamed").to_string();
            if thread.join().is_err() {
                warn!(thread = %name, "Pool thread panicked");
            }
        }
        if count > 0 {
            info!(threads = count, "Thread pool shut down complete");
        }
        Ok(())
    }

    /// [`shutdown`](Self::shutdown) followed by
    /// [`wait_for_termination`](Self::wait_for_termination).
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Timeout` if threads are still running at the deadline.
    pub fn shutdown_and_wait(&self, timeout: Duration) -> Result<(), PoolError> {
        self.shutdown();
        self.wait_for_termination(timeout)
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The configuration this pool was built with.
    #[must_use]
    pub const fn config(&self) -> &ThreadPoolConfig {
        &self.config
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let mut stats = self
            .counters
            .snapshot(self.config.max_executors, self.config.max_queue);
        stats.idle_executors = self.availability.idle();
        stats
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        // Signal only; joining here could hang on a job that never returns.
        if !self.cancel.is_cancelled() {
            self.cancel.cancel();
            debug!("ThreadPool dropped without explicit shutdown - threads will be detached");
        }
    }
}

fn start_threads(
    config: &ThreadPoolConfig,
    executors: Vec<Executor>,
    dispatcher: Dispatcher,
    exit_guard: Sender<()>,
    threads: &mut Vec<JoinHandle<()>>,
) -> Result<(), PoolError> {
    for (id, executor) in executors.into_iter().enumerate() {
        threads.push(executor.spawn(
            format!("{}-executor-{id}", config.thread_name_prefix),
            config.thread_stack_size,
            exit_guard.clone(),
        )?);
    }
    threads.push(dispatcher.spawn(
        format!("{}-dispatcher", config.thread_name_prefix),
        config.thread_stack_size,
        exit_guard,
    )?);
    Ok(())
}
