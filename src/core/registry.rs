//! Executor handles and the registry of idle executors.
//!
//! Each executor owns one single-slot mailbox for its whole lifetime. While
//! idle it parks a handle to that mailbox in the registry; a hand-off task
//! takes the handle out and assigns exactly one job through it.

use flume::{Receiver, Sender, TrySendError};

use super::job::Job;

/// Sending side of an executor's single-slot mailbox.
#[derive(Debug, Clone)]
pub(crate) struct ExecutorHandle {
    executor_id: usize,
    slot: Sender<Job>,
}

impl ExecutorHandle {
    /// Create the handle and the mailbox it feeds.
    pub(crate) fn new(executor_id: usize) -> (Self, Receiver<Job>) {
        let (slot, mailbox) = flume::bounded(1);
        (Self { executor_id, slot }, mailbox)
    }

    pub(crate) const fn executor_id(&self) -> usize {
        self.executor_id
    }

    /// Hand a job to the owning executor.
    ///
    /// The slot is empty whenever the handle came out of the registry, so the
    /// only failure is an executor that already closed its mailbox. The job is
    /// returned in that case.
    pub(crate) fn assign(&self, job: Job) -> Result<(), Job> {
        self.slot.try_send(job).map_err(|e| match e {
            TrySendError::Full(job) | TrySendError::Disconnected(job) => job,
        })
    }
}

/// Bounded set of idle executor handles; capacity equals the executor count.
///
/// This is the taking side, held by the dispatcher and its hand-off tasks.
/// Dropping every clone tears the registry down.
#[derive(Debug, Clone)]
pub(crate) struct ExecutorRegistry {
    rx: Receiver<ExecutorHandle>,
}

/// The parking side of the registry, held by executors and by the pool for
/// its idle count. Holding it never keeps the registry alive.
#[derive(Debug, Clone)]
pub(crate) struct Availability {
    tx: Sender<ExecutorHandle>,
}

impl ExecutorRegistry {
    pub(crate) fn new(capacity: usize) -> (Self, Availability) {
        let (tx, rx) = flume::bounded(capacity);
        (Self { rx }, Availability { tx })
    }

    /// Wait for an idle executor. `None` once every executor has gone away.
    pub(crate) async fn acquire(&self) -> Option<ExecutorHandle> {
        self.rx.recv_async().await.ok()
    }
}

impl Availability {
    /// Park a handle as idle. Returns `false` once the registry is torn down.
    pub(crate) async fn register(&self, handle: ExecutorHandle) -> bool {
        self.tx.send_async(handle).await.is_ok()
    }

    /// Number of executors currently parked as idle.
    pub(crate) fn idle(&self) -> usize {
        self.tx.len()
    }
}
