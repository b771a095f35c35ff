//! The bounded pending-job queue and its admission check.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use flume::{Receiver, Sender, TrySendError};

use super::error::PoolError;
use super::job::{Job, JobResult};
use super::stats::PoolCounters;

/// Producer side of the pending queue.
///
/// Admission is decided here, synchronously, against a slot count of
/// `executors + max_queue`: with every executor busy, at most `max_queue`
/// jobs wait. The channel is sized to the same bound so an admitted job
/// always fits.
#[derive(Debug)]
pub(crate) struct PendingQueue {
    tx: Sender<Job>,
    slots: usize,
    counters: Arc<PoolCounters>,
}

impl PendingQueue {
    /// Create the queue and the receiver the dispatcher pulls from.
    pub(crate) fn new(
        executors: usize,
        max_queue: usize,
        counters: Arc<PoolCounters>,
    ) -> (Self, Receiver<Job>) {
        let slots = executors.saturating_add(max_queue);
        let (tx, rx) = flume::bounded(slots);
        (Self { tx, slots, counters }, rx)
    }

    /// Try to enqueue without blocking.
    ///
    /// # Errors
    ///
    /// - `PoolError::QueueFull` when every admission slot is taken
    /// - `PoolError::PoolShutdown` when the dispatcher is gone
    pub(crate) fn try_push<F>(&self, work: F) -> Result<(), PoolError>
    where
        F: FnOnce() -> JobResult + Send + 'static,
    {
        if !self.counters.try_reserve(self.slots) {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(PoolError::QueueFull);
        }

        let job = Job::admitted(work, Arc::clone(&self.counters));
        match self.tx.try_send(job) {
            Ok(()) => {
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Full(job)) => {
                job.reject();
                Err(PoolError::QueueFull)
            }
            Err(TrySendError::Disconnected(job)) => {
                job.reject();
                Err(PoolError::PoolShutdown)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admits_up_to_executors_plus_queue() {
        let counters = Arc::new(PoolCounters::default());
        let (queue, _rx) = PendingQueue::new(2, 1, Arc::clone(&counters));

        assert!(queue.try_push(|| Ok(())).is_ok());
        assert!(queue.try_push(|| Ok(())).is_ok());
        assert!(queue.try_push(|| Ok(())).is_ok());
        assert!(matches!(queue.try_push(|| Ok(())), Err(PoolError::QueueFull)));

        assert_eq!(counters.submitted.load(Ordering::Relaxed), 3);
        assert_eq!(counters.rejected.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_slot_frees_when_job_finishes() {
        let counters = Arc::new(PoolCounters::default());
        let (queue, rx) = PendingQueue::new(1, 0, Arc::clone(&counters));

        queue.try_push(|| Ok(())).unwrap();
        assert!(matches!(queue.try_push(|| Ok(())), Err(PoolError::QueueFull)));

        rx.try_recv().unwrap().run();
        assert!(queue.try_push(|| Ok(())).is_ok());
    }

    #[test]
    fn test_pulled_in_arrival_order() {
        let counters = Arc::new(PoolCounters::default());
        let (queue, rx) = PendingQueue::new(1, 2, Arc::clone(&counters));
        let (seen_tx, seen_rx) = flume::unbounded();

        for i in 0..3 {
            let seen_tx = seen_tx.clone();
            queue
                .try_push(move || {
                    seen_tx
                        .send(i)
                        .map_err(|_| anyhow::anyhow!("receiver gone"))
                })
                .unwrap();
        }
        while let Ok(job) = rx.try_recv() {
            job.run();
        }

        let order: Vec<i32> = seen_rx.try_iter().collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_disconnected_queue_reports_shutdown() {
        let counters = Arc::new(PoolCounters::default());
        let (queue, rx) = PendingQueue::new(1, 1, Arc::clone(&counters));
        drop(rx);

        assert!(matches!(queue.try_push(|| Ok(())), Err(PoolError::PoolShutdown)));
        assert_eq!(counters.in_flight.load(Ordering::Relaxed), 0);
        assert_eq!(counters.discarded.load(Ordering::Relaxed), 0);
    }
}
