//! Fixed-size worker thread pool driving a FIFO queue of ready tasks.
//!
//! The pool owns `worker_count` OS threads, a mutex-guarded ready queue of
//! [`Handle`]s with a condition variable, and an atomic counter of outstanding
//! work (queued plus executing). Work enters the pool in four ways:
//!
//! - awaiting [`WorkerPool::schedule`] (or [`WorkerPool::yield_now`]) from inside
//!   a running task moves that task onto a worker;
//! - [`WorkerPool::schedule_task`] wraps a task so it starts on a worker;
//! - [`WorkerPool::spawn`] runs a `Task<()>` detached, fire-and-forget;
//! - [`WorkerPool::resume`] / [`WorkerPool::resume_batch`] enqueue arbitrary
//!   resumption points.
//!
//! # Shutdown
//!
//! [`WorkerPool::shutdown`] stops admitting new work but finishes everything
//! already admitted, including work that admitted work enqueues while draining,
//! then joins every worker. It runs at most once and also runs on drop.
//!
//! # Example
//!
//! ```
//! use prometheus_coro::config::WorkerPoolConfig;
//! use prometheus_coro::core::{Options, Task, WorkerPool};
//! use prometheus_coro::runtime::sync_wait;
//!
//! let pool = WorkerPool::new(Options::from(WorkerPoolConfig::new().with_worker_count(2)))?;
//!
//! let worker = std::sync::Arc::clone(&pool);
//! let task = Task::new(async move {
//!     worker.schedule()?.await;
//!     Ok(std::thread::current().name().map(str::to_owned))
//! });
//!
//! let name = sync_wait(task)?;
//! assert!(name.unwrap().starts_with("coro-worker"));
//! pool.shutdown();
//! assert!(pool.is_empty());
//! # Ok::<(), anyhow::Error>(())
//! ```

mod schedule;
mod shared;

use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::WorkerPoolConfig;
use crate::core::error::PoolError;
use crate::core::handle::Handle;
use crate::core::self_owning::SelfOwningTask;
use crate::core::task::Task;

pub use schedule::ScheduleOperation;
use shared::Shared;

/// Hook invoked on a worker thread with the worker's index.
pub type ThreadHook = Arc<dyn Fn(usize) + Send + Sync>;

/// Construction options for a [`WorkerPool`].
#[derive(Clone, Default)]
pub struct Options {
    /// Thread count, naming and stack size.
    pub config: WorkerPoolConfig,
    /// Called once on each worker thread before it processes any work.
    pub on_thread_start: Option<ThreadHook>,
    /// Called once on each worker thread after it has stopped processing work.
    pub on_thread_stop: Option<ThreadHook>,
}

impl From<WorkerPoolConfig> for Options {
    fn from(config: WorkerPoolConfig) -> Self {
        Self {
            config,
            on_thread_start: None,
            on_thread_stop: None,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("config", &self.config)
            .field("on_thread_start", &self.on_thread_start.is_some())
            .field("on_thread_stop", &self.on_thread_stop.is_some())
            .finish()
    }
}

/// Snapshot of pool activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Queued plus executing units of work.
    pub outstanding: usize,
    /// Handles waiting in the ready queue.
    pub queued: usize,
    /// Handles resumed by workers since the pool started.
    pub resumed_total: u64,
    /// Whether shutdown has been requested.
    pub shutdown_requested: bool,
}

/// FIFO worker thread pool for [`Task`]s.
///
/// Created behind an [`Arc`] so tasks can capture the pool and schedule
/// themselves onto it.
pub struct WorkerPool {
    shared: Arc<Shared>,
    config: WorkerPoolConfig,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Start a pool with `options.config.worker_count` worker threads.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidConfig`] if the configuration does not validate,
    /// [`PoolError::ThreadSpawn`] if a worker thread cannot be started (workers
    /// already started are shut down first).
    pub fn new(options: Options) -> Result<Arc<Self>, PoolError> {
        let Options {
            config,
            on_thread_start,
            on_thread_stop,
        } = options;
        config.validate().map_err(PoolError::InvalidConfig)?;

        let shared = Arc::new(Shared::new(
            config.worker_count,
            on_thread_start,
            on_thread_stop,
        ));
        let pool = Arc::new(Self {
            shared,
            config,
            workers: Mutex::new(Vec::new()),
        });

        for worker_id in 0..pool.config.worker_count {
            match pool.spawn_worker(worker_id) {
                Ok(worker) => pool.workers.lock().push(worker),
                Err(err) => {
                    warn!(pool_id = %pool.id(), worker_id, error = %err, "failed to start worker");
                    pool.shutdown();
                    return Err(PoolError::ThreadSpawn(err));
                }
            }
        }

        info!(
            pool_id = %pool.id(),
            worker_count = pool.config.worker_count,
            "worker pool started"
        );
        Ok(pool)
    }

    fn spawn_worker(&self, worker_id: usize) -> std::io::Result<JoinHandle<()>> {
        let mut builder =
            thread::Builder::new().name(format!("{}-{worker_id}", self.config.thread_name_prefix));
        if let Some(stack_size) = self.config.thread_stack_size {
            builder = builder.stack_size(stack_size);
        }
        let shared = Arc::clone(&self.shared);
        builder.spawn(move || shared.worker_loop(worker_id))
    }

    /// Identifier of this pool, attached to its log events.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Admit one unit of work and return the operation that moves the awaiting
    /// task onto a worker.
    ///
    /// # Errors
    ///
    /// [`PoolError::ShuttingDown`] if shutdown was requested; nothing is counted
    /// or enqueued in that case.
    pub fn schedule(&self) -> Result<ScheduleOperation, PoolError> {
        self.shared.schedule()
    }

    /// Re-queue the awaiting task at the tail of the FIFO so queued work runs
    /// first. Same as [`WorkerPool::schedule`].
    ///
    /// # Errors
    ///
    /// Same as [`WorkerPool::schedule`].
    pub fn yield_now(&self) -> Result<ScheduleOperation, PoolError> {
        self.schedule()
    }

    /// Wrap `task` so that it starts on a worker thread.
    ///
    /// The returned task first awaits [`WorkerPool::schedule`], then `task`, and
    /// reports `task`'s result or failure. A rejected schedule surfaces as the
    /// returned task's failure.
    pub fn schedule_task<R: Send + Sync + 'static>(&self, task: Task<R>) -> Task<R> {
        let shared = Arc::clone(&self.shared);
        Task::new(async move {
            shared.schedule()?.await;
            Ok(task.await?)
        })
    }

    /// Run `task` detached on the pool.
    ///
    /// Ownership moves to the pool; the task is released once it finishes and
    /// only then stops counting as outstanding. Returns whether the task was
    /// accepted; after shutdown has been requested it is dropped unrun.
    ///
    /// A detached task's failure has no observer and is discarded (logged at
    /// `debug` level).
    pub fn spawn(&self, task: Task<()>) -> bool {
        self.shared.outstanding.fetch_add(1, Ordering::Release);
        let detached = SelfOwningTask::new(task, Some(Arc::clone(&self.shared.outstanding)));
        if self.resume(Handle::new(detached)) {
            true
        } else {
            self.shared.release(1);
            false
        }
    }

    /// Enqueue a resumption point.
    ///
    /// Returns `false` without counting anything if the handle is already
    /// finished, or after rolling back its count if shutdown was requested.
    pub fn resume(&self, handle: Handle) -> bool {
        if handle.is_done() {
            return false;
        }
        if self.shared.admit(1).is_err() {
            return false;
        }
        self.shared.enqueue(handle);
        true
    }

    /// Enqueue a batch of resumption points as one contiguous FIFO block.
    ///
    /// `None` entries are discarded. Returns how many handles were enqueued;
    /// the outstanding count grows by exactly that number. After shutdown has
    /// been requested the whole batch is rejected and `0` is returned.
    pub fn resume_batch<I>(&self, handles: I) -> usize
    where
        I: IntoIterator<Item = Option<Handle>>,
    {
        let handles: Vec<Option<Handle>> = handles.into_iter().collect();
        if handles.is_empty() || self.shared.admit(handles.len()).is_err() {
            return 0;
        }
        self.shared.enqueue_batch(handles)
    }

    /// Stop admitting work, finish everything already admitted, and join the
    /// workers. Only the first call has any effect; later calls return at once.
    ///
    /// When called from one of the pool's own workers, that worker is not
    /// joined; it exits on its own after draining.
    pub fn shutdown(&self) {
        if !self.shared.request_shutdown() {
            return;
        }
        info!(pool_id = %self.id(), outstanding = self.size(), "shutting down worker pool");

        let current = thread::current().id();
        let workers: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        for (worker_id, worker) in workers.into_iter().enumerate() {
            if worker.thread().id() == current {
                debug!(pool_id = %self.id(), worker_id, "shutdown called on a worker; not joining it");
                continue;
            }
            if worker.join().is_err() {
                warn!(pool_id = %self.id(), worker_id, "worker panicked");
            }
        }

        info!(pool_id = %self.id(), outstanding = self.size(), "worker pool shut down");
    }

    /// Queued plus executing units of work.
    #[must_use]
    pub fn size(&self) -> usize {
        self.shared.outstanding()
    }

    /// True if nothing is queued or executing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Handles waiting in the ready queue.
    #[must_use]
    pub fn queue_size(&self) -> usize {
        self.shared.queue_len()
    }

    /// True if the ready queue is empty.
    #[must_use]
    pub fn queue_empty(&self) -> bool {
        self.queue_size() == 0
    }

    /// Number of worker threads.
    #[must_use]
    pub const fn thread_count(&self) -> usize {
        self.config.worker_count
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shared.is_shutting_down()
    }

    /// Current activity counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.shared.stats()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("id", &self.id())
            .field("thread_count", &self.thread_count())
            .field("size", &self.size())
            .field("queue_size", &self.queue_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pool(workers: usize) -> Arc<WorkerPool> {
        WorkerPool::new(Options::from(WorkerPoolConfig::new().with_worker_count(workers))).unwrap()
    }

    #[test]
    fn test_pool_starts_requested_threads() {
        let pool = pool(3);
        assert_eq!(pool.thread_count(), 3);
        assert!(pool.is_empty());
        assert!(pool.queue_empty());
        pool.shutdown();
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = WorkerPool::new(Options::from(WorkerPoolConfig::new().with_worker_count(0)))
            .unwrap_err();
        assert!(matches!(err, PoolError::InvalidConfig(_)));
    }

    #[test]
    fn test_dropping_schedule_operation_releases_count() {
        let pool = pool(1);
        let op = pool.schedule().unwrap();
        assert_eq!(pool.size(), 1);
        drop(op);
        assert_eq!(pool.size(), 0);
        pool.shutdown();
    }

    #[test]
    fn test_resume_rejects_finished_handle() {
        let pool = pool(1);
        let task = Task::new(async { Ok(()) });
        let handle = task.handle().unwrap();
        task.resume();

        assert!(!pool.resume(handle));
        assert_eq!(pool.size(), 0);
        pool.shutdown();
    }

    #[test]
    fn test_hooks_run_once_per_worker() {
        let started = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));
        let (s, t) = (Arc::clone(&started), Arc::clone(&stopped));
        let options = Options {
            config: WorkerPoolConfig::new().with_worker_count(4),
            on_thread_start: Some(Arc::new(move |_| {
                s.fetch_add(1, Ordering::SeqCst);
            })),
            on_thread_stop: Some(Arc::new(move |_| {
                t.fetch_add(1, Ordering::SeqCst);
            })),
        };

        let pool = WorkerPool::new(options).unwrap();
        pool.shutdown();
        pool.shutdown();

        assert_eq!(started.load(Ordering::SeqCst), 4);
        assert_eq!(stopped.load(Ordering::SeqCst), 4);
    }
}
