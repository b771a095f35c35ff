//! Pool statistics and the shared counters behind them.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time view of pool utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Number of executor threads.
    pub executor_count: usize,
    /// Configured pending queue capacity.
    pub max_queue: usize,
    /// Executors parked in the registry waiting for a job.
    pub idle_executors: usize,
    /// Jobs currently executing.
    pub active_jobs: usize,
    /// Jobs accepted but not yet running.
    pub queued_jobs: usize,
    /// Jobs accepted by `submit`/`try_submit`.
    pub submitted_jobs: u64,
    /// Jobs that returned `Ok`.
    pub completed_jobs: u64,
    /// Jobs that returned `Err`.
    pub failed_jobs: u64,
    /// Jobs that panicked.
    pub panicked_jobs: u64,
    /// Jobs dropped because the queue was full or the pool was shut down.
    pub rejected_jobs: u64,
    /// Accepted jobs dropped at shutdown without running.
    pub discarded_jobs: u64,
}

impl PoolStats {
    /// Jobs that have finished running, whatever the outcome.
    #[must_use]
    pub const fn finished_jobs(&self) -> u64 {
        self.completed_jobs + self.failed_jobs + self.panicked_jobs
    }
}

/// Internal counters shared by the facade, the queue and the executors.
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    /// Admission slots currently held (accepted, not yet dropped).
    pub in_flight: AtomicUsize,
    pub active: AtomicUsize,
    pub submitted: AtomicU64,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub panicked: AtomicU64,
    pub rejected: AtomicU64,
    pub discarded: AtomicU64,
}

impl PoolCounters {
    /// Reserve one admission slot if fewer than `limit` are held.
    ///
    /// CAS loop so concurrent submitters never push the count past `limit`.
    pub fn try_reserve(&self, limit: usize) -> bool {
        let mut current = self.in_flight.load(Ordering::Acquire);
        loop {
            if current >= limit {
                return false;
            }
            match self.in_flight.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn release(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, executor_count: usize, max_queue: usize) -> PoolStats {
        let in_flight = self.in_flight.load(Ordering::Acquire);
        let active = self.active.load(Ordering::Acquire);
        PoolStats {
            executor_count,
            max_queue,
            idle_executors: 0,
            active_jobs: active,
            queued_jobs: in_flight.saturating_sub(active),
            submitted_jobs: self.submitted.load(Ordering::Relaxed),
            completed_jobs: self.completed.load(Ordering::Relaxed),
            failed_jobs: self.failed.load(Ordering::Relaxed),
            panicked_jobs: self.panicked.load(Ordering::Relaxed),
            rejected_jobs: self.rejected.load(Ordering::Relaxed),
            discarded_jobs: self.discarded.load(Ordering::Relaxed),
        }
    }
}
