//! # Prometheus Dispatch Pool
//!
//! A bounded thread pool for offloading background work (sending mail,
//! writing audit rows, calling out to other processes) so request-handling
//! code never waits for it.
//!
//! ## How it works
//!
//! - **Executors**: a fixed number of dedicated OS threads. Each runs at most
//!   one job at a time and parks a handle to its single-slot mailbox in a
//!   registry whenever it is idle.
//! - **Pending queue**: a bounded buffer of accepted jobs. When every executor
//!   is busy at most `max_queue` jobs wait; any further submission is dropped.
//! - **Dispatcher**: pulls jobs in arrival order and spawns a small hand-off
//!   task per job that waits for an idle executor and forwards the job. Hand-off
//!   tasks race each other, so execution order is not strictly FIFO.
//! - **Cancellation**: one token shared by every thread. `shutdown` raises it
//!   and returns; running jobs finish, queued jobs are discarded.
//!
//! ```rust
//! use prometheus_dispatch_pool::config::ThreadPoolConfig;
//! use prometheus_dispatch_pool::core::ThreadPool;
//! use std::time::Duration;
//!
//! let pool = ThreadPool::new(
//!     ThreadPoolConfig::new()
//!         .with_max_executors(2)
//!         .with_max_queue(16),
//! )?;
//!
//! pool.submit(|| {
//!     tracing::info!("doing background work");
//!     Ok(())
//! });
//!
//! // Fire-and-forget shutdown, plus an explicit wait when it matters.
//! pool.shutdown_and_wait(Duration::from_secs(5))?;
//! # Ok::<(), prometheus_dispatch_pool::core::PoolError>(())
//! ```
//!
//! The `util` module carries the small stateless helpers that usually sit
//! next to the pool: tracing setup and file log sinks, signed user tokens,
//! content hashing and external command execution.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Configuration models for the pool.
pub mod config;
/// The worker pool and its building blocks.
pub mod core;
/// Shared utilities.
pub mod util;
