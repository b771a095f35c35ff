//! The worker pool: jobs, executors, the idle-executor registry, the pending
//! queue, the dispatcher and the `ThreadPool` facade that owns them.

pub mod error;
pub mod stats;
pub mod thread_pool;

mod dispatcher;
mod executor;
mod job;
mod queue;
mod registry;

pub use error::{AppResult, PoolError};
pub use job::JobResult;
pub use stats::PoolStats;
pub use thread_pool::ThreadPool;
