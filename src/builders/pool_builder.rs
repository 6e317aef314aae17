//! Builder to construct a worker pool from configuration and thread hooks.

use std::sync::Arc;

use crate::config::WorkerPoolConfig;
use crate::core::{Options, PoolError, ThreadHook, WorkerPool};

/// Assembles [`Options`] step by step and starts the pool.
///
/// ```
/// use prometheus_coro::builders::WorkerPoolBuilder;
///
/// let pool = WorkerPoolBuilder::new()
///     .worker_count(2)
///     .thread_name_prefix("render")
///     .on_thread_start(|index| tracing::debug!(index, "render worker up"))
///     .build()?;
/// assert_eq!(pool.thread_count(), 2);
/// # Ok::<(), prometheus_coro::core::PoolError>(())
/// ```
#[derive(Debug, Default)]
pub struct WorkerPoolBuilder {
    options: Options,
}

impl WorkerPoolBuilder {
    /// Builder starting from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder starting from `config`.
    #[must_use]
    pub fn from_config(config: WorkerPoolConfig) -> Self {
        Self {
            options: Options::from(config),
        }
    }

    /// Number of worker threads.
    #[must_use]
    pub fn worker_count(mut self, worker_count: usize) -> Self {
        self.options.config.worker_count = worker_count;
        self
    }

    /// Prefix of the worker thread names.
    #[must_use]
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.config.thread_name_prefix = prefix.into();
        self
    }

    /// Stack size in bytes of each worker thread.
    #[must_use]
    pub fn thread_stack_size(mut self, bytes: usize) -> Self {
        self.options.config.thread_stack_size = Some(bytes);
        self
    }

    /// Run `hook` on every worker thread, with its index, before it takes work.
    #[must_use]
    pub fn on_thread_start<F>(mut self, hook: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.options.on_thread_start = Some(Arc::new(hook) as ThreadHook);
        self
    }

    /// Run `hook` on every worker thread, with its index, after it stops.
    #[must_use]
    pub fn on_thread_stop<F>(mut self, hook: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.options.on_thread_stop = Some(Arc::new(hook) as ThreadHook);
        self
    }

    /// The options assembled so far.
    #[must_use]
    pub fn options(self) -> Options {
        self.options
    }

    /// Validate the configuration and start the pool.
    ///
    /// # Errors
    ///
    /// Same as [`WorkerPool::new`].
    pub fn build(self) -> Result<Arc<WorkerPool>, PoolError> {
        WorkerPool::new(self.options)
    }
}
