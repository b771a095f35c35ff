//! Jobs: caller-supplied units of work and their admission slots.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::stats::PoolCounters;

/// Outcome reported by a job. `Err` is logged by the executor and discarded.
pub type JobResult = anyhow::Result<()>;

type Work = Box<dyn FnOnce() -> JobResult + Send + 'static>;

/// Holds one admission slot for as long as the job is alive.
struct AdmissionSlot {
    counters: Arc<PoolCounters>,
}

impl Drop for AdmissionSlot {
    fn drop(&mut self) {
        self.counters.release();
    }
}

/// What happened when an executor ran a job.
pub(crate) enum JobOutcome {
    Succeeded,
    Failed(anyhow::Error),
    Panicked(String),
}

/// An accepted job travelling from the pending queue to an executor.
///
/// Dropping a job that still holds its work counts it as discarded.
pub(crate) struct Job {
    work: Option<Work>,
    slot: AdmissionSlot,
}

impl Job {
    /// Wrap `work` in an already reserved admission slot.
    pub(crate) fn admitted<F>(work: F, counters: Arc<PoolCounters>) -> Self
    where
        F: FnOnce() -> JobResult + Send + 'static,
    {
        Self {
            work: Some(Box::new(work)),
            slot: AdmissionSlot { counters },
        }
    }

    /// Run the job on the current thread, containing any panic.
    pub(crate) fn run(mut self) -> JobOutcome {
        let Some(work) = self.work.take() else {
            return JobOutcome::Succeeded;
        };
        match panic::catch_unwind(AssertUnwindSafe(work)) {
            Ok(Ok(())) => JobOutcome::Succeeded,
            Ok(Err(e)) => JobOutcome::Failed(e),
            Err(payload) => JobOutcome::Panicked(panic_message(payload.as_ref())),
        }
    }

    /// Drop the work without counting it as discarded (overflow path).
    pub(crate) fn reject(mut self) {
        self.work = None;
        self.slot.counters.rejected.fetch_add(1, Ordering::Relaxed);
    }
}

impl Drop for Job {
    fn drop(&mut self) {
        if self.work.is_some() {
            self.slot.counters.discarded.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("pending", &self.work.is_some())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admitted<F>(counters: &Arc<PoolCounters>, work: F) -> Job
    where
        F: FnOnce() -> JobResult + Send + 'static,
    {
        assert!(counters.try_reserve(usize::MAX));
        Job::admitted(work, Arc::clone(counters))
    }

    #[test]
    fn test_run_releases_slot() {
        let counters = Arc::new(PoolCounters::default());
        let job = admitted(&counters, || Ok(()));
        assert_eq!(counters.in_flight.load(Ordering::Relaxed), 1);

        assert!(matches!(job.run(), JobOutcome::Succeeded));
        assert_eq!(counters.in_flight.load(Ordering::Relaxed), 0);
        assert_eq!(counters.discarded.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_failure_is_reported() {
        let counters = Arc::new(PoolCounters::default());
        let job = admitted(&counters, || Err(anyhow::anyhow!("disk full")));

        match job.run() {
            JobOutcome::Failed(e) => assert_eq!(e.to_string(), "disk full"),
            _ => panic!("expected failure"),
        }
    }

    #[test]
    fn test_panic_is_contained() {
        let counters = Arc::new(PoolCounters::default());
        let job = admitted(&counters, || panic!("boom"));

        match job.run() {
            JobOutcome::Panicked(msg) => assert_eq!(msg, "boom"),
            _ => panic!("expected panic outcome"),
        }
        assert_eq!(counters.in_flight.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_unrun_job_counts_as_discarded() {
        let counters = Arc::new(PoolCounters::default());
        drop(admitted(&counters, || Ok(())));

        assert_eq!(counters.discarded.load(Ordering::Relaxed), 1);
        assert_eq!(counters.in_flight.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_rejected_job_is_not_discarded() {
        let counters = Arc::new(PoolCounters::default());
        admitted(&counters, || Ok(())).reject();

        assert_eq!(counters.rejected.load(Ordering::Relaxed), 1);
        assert_eq!(counters.discarded.load(Ordering::Relaxed), 0);
    }
}
