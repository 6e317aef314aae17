//! Worker pool configuration.

use std::env;

use serde::{Deserialize, Serialize};

/// Environment variable overriding [`WorkerPoolConfig::worker_count`].
pub const ENV_WORKER_COUNT: &str = "CORO_WORKER_COUNT";
/// Environment variable overriding [`WorkerPoolConfig::thread_name_prefix`].
pub const ENV_THREAD_NAME_PREFIX: &str = "CORO_THREAD_NAME_PREFIX";
/// Environment variable overriding [`WorkerPoolConfig::thread_stack_size`].
pub const ENV_THREAD_STACK_SIZE: &str = "CORO_THREAD_STACK_SIZE";

const DEFAULT_THREAD_NAME_PREFIX: &str = "coro-worker";

/// Worker pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    /// Number of worker threads. Defaults to the number of logical CPUs.
    pub worker_count: usize,
    /// Worker threads are named `{thread_name_prefix}-{index}`.
    pub thread_name_prefix: String,
    /// Stack size in bytes for worker threads; the platform default if unset.
    pub thread_stack_size: Option<usize>,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get().max(1),
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            thread_stack_size: None,
        }
    }
}

impl WorkerPoolConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads.
    #[must_use]
    pub const fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Set the worker thread stack size in bytes.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = Some(bytes);
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// A description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.thread_name_prefix.is_empty() {
            return Err("thread_name_prefix must not be empty".into());
        }
        if self.thread_stack_size == Some(0) {
            return Err("thread_stack_size must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate. Missing fields take
    /// their defaults.
    ///
    /// # Errors
    ///
    /// A parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults overridden by `CORO_*` environment variables, after loading a
    /// `.env` file if one exists.
    ///
    /// # Errors
    ///
    /// A message naming the variable that failed to parse, or a validation message.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the `CORO_*` keys.
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(raw) = lookup(ENV_WORKER_COUNT) {
            cfg.worker_count = parse_usize(ENV_WORKER_COUNT, &raw)?;
        }
        if let Some(prefix) = lookup(ENV_THREAD_NAME_PREFIX) {
            cfg.thread_name_prefix = prefix;
        }
        if let Some(raw) = lookup(ENV_THREAD_STACK_SIZE) {
            cfg.thread_stack_size = Some(parse_usize(ENV_THREAD_STACK_SIZE, &raw)?);
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_usize(key: &str, raw: &str) -> Result<usize, String> {
    raw.trim()
        .parse()
        .map_err(|e| format!("{key}={raw:?} is not a valid count: {e}"))
}
