//! Configuration models for the thread pool.

pub mod pool;

pub use pool::{ThreadPoolConfig, ENV_PREFIX};
