//! Executor threads.
//!
//! Each executor is a dedicated OS thread with its own single-threaded tokio
//! runtime. The runtime only drives the two suspension points (parking the
//! handle, waiting for an assignment); the job itself runs synchronously on
//! the thread, outside the runtime.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use flume::{Receiver, Sender};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::error::PoolError;
use super::job::{Job, JobOutcome};
use super::registry::{Availability, ExecutorHandle};
use super::stats::PoolCounters;

/// Everything an executor thread needs, moved into the thread at spawn.
pub(crate) struct Executor {
    id: usize,
    handle: ExecutorHandle,
    mailbox: Receiver<Job>,
    availability: Availability,
    cancel: CancellationToken,
    counters: Arc<PoolCounters>,
}

impl Executor {
    pub(crate) fn new(
        id: usize,
        availability: Availability,
        cancel: CancellationToken,
        counters: Arc<PoolCounters>,
    ) -> Self {
        let (handle, mailbox) = ExecutorHandle::new(id);
        Self {
            id,
            handle,
            mailbox,
            availability,
            cancel,
            counters,
        }
    }

    /// Start the executor on a named thread.
    ///
    /// `exit_guard` is dropped when the thread ends; the pool waits on its
    /// channel to learn that every thread has exited.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Spawn` if the runtime or the thread cannot be created.
    pub(crate) fn spawn(
        self,
        name: String,
        stack_size: usize,
        exit_guard: Sender<()>,
    ) -> Result<JoinHandle<()>, PoolError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| PoolError::Spawn {
                what: format!("{name} runtime"),
                source,
            })?;

        thread::Builder::new()
            .name(name.clone())
            .stack_size(stack_size)
            .spawn(move || {
                let _exit_guard = exit_guard;
                self.run(&rt);
            })
            .map_err(|source| PoolError::Spawn { what: name, source })
    }

    fn run(self, rt: &Runtime) {
        debug!(executor_id = self.id, "Executor started");

        while let Some(job) = rt.block_on(self.next_assignment()) {
            self.execute(job);
        }

        // Closing the mailbox makes any in-flight hand-off to us fail fast.
        drop(self.mailbox);
        debug!(executor_id = self.id, "Executor terminated");
    }

    /// Park as idle, then wait for a job. `None` means terminate.
    async fn next_assignment(&self) -> Option<Job> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => return None,
            registered = self.availability.register(self.handle.clone()) => {
                if !registered {
                    return None;
                }
            }
        }

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            job = self.mailbox.recv_async() => job.ok(),
        }
    }

    fn execute(&self, job: Job) {
        self.counters.active.fetch_add(1, Ordering::AcqRel);
        let outcome = job.run();
        self.counters.active.fetch_sub(1, Ordering::AcqRel);

        match outcome {
            JobOutcome::Succeeded => {
                self.counters.completed.fetch_add(1, Ordering::Relaxed);
            }
            JobOutcome::Failed(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                error!(executor_id = self.id, error = %format!("{e:#}"), "Job failed");
            }
            JobOutcome::Panicked(message) => {
                self.counters.panicked.fetch_add(1, Ordering::Relaxed);
                error!(executor_id = self.id, panic = %message, "Job panicked");
            }
        }
    }
}
