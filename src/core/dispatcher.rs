//! The dispatcher: matches pending jobs with idle executors.
//!
//! The dispatcher never waits for an executor itself. For every job it pulls
//! it spawns a hand-off task that waits for an idle handle and forwards the
//! job, so the next job is pulled right away. Hand-off tasks race for idle
//! handles, which means execution order is only FIFO while at most one
//! hand-off is outstanding.

use std::thread::{self, JoinHandle};

use flume::{Receiver, Sender};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::error::PoolError;
use super::job::Job;
use super::registry::ExecutorRegistry;

/// The dispatcher loop plus the state it owns.
pub(crate) struct Dispatcher {
    queue: Receiver<Job>,
    registry: ExecutorRegistry,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub(crate) fn new(
        queue: Receiver<Job>,
        registry: ExecutorRegistry,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            queue,
            registry,
            cancel,
        }
    }

    /// Start the dispatcher on its own thread and single-threaded runtime.
    ///
    /// Hand-off tasks live on the same runtime, so they are dropped with it
    /// when the dispatcher stops.
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
                run_dispatcher(self, rt);
            })
            .map_err(|source| PoolError::Spawn { what: name, source })
    }

    async fn dispatch(self) {
        debug!("Dispatcher started");

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                next = self.queue.recv_async() => match next {
                    Ok(job) => {
                        tokio::spawn(hand_off(job, self.registry.clone(), self.cancel.clone()));
                    }
                    Err(_) => break,
                },
            }
        }

        // Tear down: nothing may be read from the queue or registry after this.
        let discarded = self.queue.drain().count();
        drop(self.registry);
        debug!(discarded_jobs = discarded, "Dispatcher stopped");
    }
}

fn run_dispatcher(dispatcher: Dispatcher, rt: Runtime) {
    rt.block_on(dispatcher.dispatch());
    // Dropping the runtime cancels hand-off tasks still waiting for an
    // executor; their jobs are discarded.
    drop(rt);
}

/// Wait for an idle executor, then give it the job.
async fn hand_off(job: Job, registry: ExecutorRegistry, cancel: CancellationToken) {
    let handle = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            trace!("Discarding job still waiting for an executor");
            return;
        }
        handle = registry.acquire() => match handle {
            Some(handle) => handle,
            None => return,
        },
    };

    if let Err(job) = handle.assign(job) {
        debug!(
            executor_id = handle.executor_id(),
            "Executor closed its mailbox before the hand-off; discarding job"
        );
        drop(job);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::core::registry::ExecutorHandle;
    use crate::core::stats::PoolCounters;

    fn admitted(counters: &Arc<PoolCounters>) -> Job {
        assert!(counters.try_reserve(usize::MAX));
        Job::admitted(|| Ok(()), Arc::clone(counters))
    }

    #[test]
    fn test_job_is_forwarded_to_idle_handle() {
        let counters = Arc::new(PoolCounters::default());
        let cancel = CancellationToken::new();
        let (queue_tx, queue_rx) = flume::bounded(4);
        let (registry, availability) = ExecutorRegistry::new(1);
        let (exit_tx, exit_rx) = flume::bounded::<()>(0);

        let (handle, mailbox) = ExecutorHandle::new(3);
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        assert!(rt.block_on(availability.register(handle)));

        let thread = Dispatcher::new(queue_rx, registry, cancel.clone())
            .spawn("test-dispatcher".into(), 256 * 1024, exit_tx)
            .unwrap();

        queue_tx.send(admitted(&counters)).unwrap();
        let job = mailbox.recv_timeout(Duration::from_secs(5)).expect("job forwarded");
        job.run();

        cancel.cancel();
        assert!(matches!(
            exit_rx.recv_timeout(Duration::from_secs(5)),
            Err(flume::RecvTimeoutError::Disconnected)
        ));
        thread.join().unwrap();
        assert_eq!(counters.discarded.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_queued_jobs_are_discarded_on_cancel() {
        let counters = Arc::new(PoolCounters::default());
        let cancel = CancellationToken::new();
        let (queue_tx, queue_rx) = flume::bounded(4);
        let (registry, _availability) = ExecutorRegistry::new(1);
        let (exit_tx, exit_rx) = flume::bounded::<()>(0);

        cancel.cancel();
        queue_tx.send(admitted(&counters)).unwrap();
        queue_tx.send(admitted(&counters)).unwrap();

        let thread = Dispatcher::new(queue_rx, registry, cancel)
            .spawn("test-dispatcher".into(), 256 * 1024, exit_tx)
            .unwrap();
        assert!(exit_rx.recv_timeout(Duration::from_secs(5)).is_err());
        thread.join().unwrap();

        assert_eq!(counters.discarded.load(Ordering::Relaxed), 2);
        assert_eq!(counters.in_flight.load(Ordering::Relaxed), 0);
    }
}
