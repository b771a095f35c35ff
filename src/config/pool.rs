//! Thread pool configuration.

use serde::{Deserialize, Serialize};

/// Prefix of the environment variables read by [`ThreadPoolConfig::from_env`].
pub const ENV_PREFIX: &str = "DISPATCH_POOL_";

const DEFAULT_MAX_QUEUE: usize = 256;
const DEFAULT_STACK_SIZE: usize = 2 * 1024 * 1024;
const MIN_STACK_SIZE: usize = 64 * 1024;

/// Sizing and threading options for a `ThreadPool`.
///
/// ```rust
/// use prometheus_dispatch_pool::config::ThreadPoolConfig;
///
/// let config = ThreadPoolConfig::new()
///     .with_max_executors(4)
///     .with_max_queue(100);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadPoolConfig {
    /// Number of executor threads; also the maximum number of concurrent jobs.
    pub max_executors: usize,
    /// Jobs allowed to wait while every executor is busy. Zero disables buffering.
    pub max_queue: usize,
    /// Stack size of every pool thread, in bytes.
    pub thread_stack_size: usize,
    /// Thread names are `{prefix}-executor-{n}` and `{prefix}-dispatcher`.
    pub thread_name_prefix: String,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            max_executors: num_cpus::get(),
            max_queue: DEFAULT_MAX_QUEUE,
            thread_stack_size: DEFAULT_STACK_SIZE,
            thread_name_prefix: "dp".into(),
        }
    }
}

impl ThreadPoolConfig {
    /// Defaults: one executor per CPU, 256 queued jobs, 2 MiB stacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the executor count.
    #[must_use]
    pub fn with_max_executors(mut self, max_executors: usize) -> Self {
        self.max_executors = max_executors;
        self
    }

    /// Set the pending queue capacity.
    #[must_use]
    pub fn with_max_queue(mut self, max_queue: usize) -> Self {
        self.max_queue = max_queue;
        self
    }

    /// Set the stack size of pool threads.
    #[must_use]
    pub fn with_thread_stack_size(mut self, thread_stack_size: usize) -> Self {
        self.thread_stack_size = thread_stack_size;
        self
    }

    /// Set the thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_executors == 0 {
            return Err("max_executors must be greater than 0".into());
        }
        if self.thread_stack_size < MIN_STACK_SIZE {
            return Err(format!(
                "thread_stack_size must be at least {MIN_STACK_SIZE} bytes"
            ));
        }
        if self.thread_name_prefix.trim().is_empty() {
            return Err("thread_name_prefix must not be empty".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation error message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from the process environment.
    ///
    /// A `.env` file is loaded first if present. Recognised variables:
    /// `DISPATCH_POOL_MAX_EXECUTORS`, `DISPATCH_POOL_MAX_QUEUE`,
    /// `DISPATCH_POOL_THREAD_STACK_SIZE` and `DISPATCH_POOL_THREAD_NAME_PREFIX`.
    ///
    /// # Errors
    ///
    /// Returns an error message if a variable does not parse or the result is invalid.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    ///
    /// `lookup` receives full variable names, prefix included.
    ///
    /// # Errors
    ///
    /// Returns an error message if a variable does not parse or the result is invalid.
    pub fn from_env_with<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read_usize = |name: &str| -> Result<Option<usize>, String> {
            let key = format!("{ENV_PREFIX}{name}");
            lookup(&key)
                .map(|raw| {
                    raw.trim()
                        .parse::<usize>()
                        .map_err(|e| format!("{key}: {e}"))
                })
                .transpose()
        };

        let mut cfg = Self::default();
        if let Some(v) = read_usize("MAX_EXECUTORS")? {
            cfg.max_executors = v;
        }
        if let Some(v) = read_usize("MAX_QUEUE")? {
            cfg.max_queue = v;
        }
        if let Some(v) = read_usize("THREAD_STACK_SIZE")? {
            cfg.thread_stack_size = v;
        }
        if let Some(prefix) = lookup(&format!("{ENV_PREFIX}THREAD_NAME_PREFIX")) {
            cfg.thread_name_prefix = prefix;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
