//! State shared between the pool handle, its workers and in-flight schedule
//! operations: the FIFO ready queue and the outstanding-work counter.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use super::{PoolStats, ThreadHook};
use crate::core::error::PoolError;
use crate::core::handle::Handle;

use super::schedule::ScheduleOperation;

pub(crate) struct Shared {
    pub(crate) id: Uuid,
    worker_count: usize,
    queue: Mutex<VecDeque<Handle>>,
    /// Mirror of `queue.len()` for lock-free reads.
    queue_len: AtomicUsize,
    wait_cv: Condvar,
    /// Queued plus executing units of work.
    pub(crate) outstanding: Arc<AtomicUsize>,
    shutdown_requested: AtomicBool,
    resumed_total: AtomicU64,
    on_thread_start: Option<ThreadHook>,
    on_thread_stop: Option<ThreadHook>,
}

impl Shared {
    pub(crate) fn new(
        worker_count: usize,
        on_thread_start: Option<ThreadHook>,
        on_thread_stop: Option<ThreadHook>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            worker_count,
            queue: Mutex::new(VecDeque::new()),
            queue_len: AtomicUsize::new(0),
            wait_cv: Condvar::new(),
            outstanding: Arc::new(AtomicUsize::new(0)),
            shutdown_requested: AtomicBool::new(false),
            resumed_total: AtomicU64::new(0),
            on_thread_start,
            on_thread_stop,
        }
    }

    pub(crate) fn is_shutting_down(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    /// Flip the shutdown flag. Returns `true` only for the first caller.
    pub(crate) fn request_shutdown(&self) -> bool {
        if self.shutdown_requested.swap(true, Ordering::AcqRel) {
            return false;
        }
        // Notify under the lock so no worker misses it between its check and its wait.
        let _queue = self.queue.lock();
        self.wait_cv.notify_all();
        true
    }

    /// Count `units` of work as admitted, unless the pool is shutting down.
    pub(crate) fn admit(&self, units: usize) -> Result<(), PoolError> {
        self.outstanding.fetch_add(units, Ordering::Release);
        if self.is_shutting_down() {
            self.release(units);
            warn!(pool_id = %self.id, units, "rejected work submitted after shutdown");
            return Err(PoolError::ShuttingDown);
        }
        Ok(())
    }

    pub(crate) fn release(&self, units: usize) {
        self.outstanding.fetch_sub(units, Ordering::Release);
    }

    pub(crate) fn schedule(self: &Arc<Self>) -> Result<ScheduleOperation, PoolError> {
        self.admit(1)?;
        Ok(ScheduleOperation::new(Arc::clone(self)))
    }

    /// Append an admitted handle to the ready queue and wake one worker.
    pub(crate) fn enqueue(&self, handle: Handle) {
        let mut queue = self.queue.lock();
        queue.push_back(handle);
        self.queue_len.store(queue.len(), Ordering::Release);
        self.wait_cv.notify_one();
        trace!(pool_id = %self.id, queued = queue.len(), "handle enqueued");
    }

    /// Append admitted handles as one contiguous block. Returns how many were
    /// enqueued; `None` entries are discarded and released.
    pub(crate) fn enqueue_batch(&self, handles: Vec<Option<Handle>>) -> usize {
        let requested = handles.len();
        let mut enqueued = 0;
        {
            let mut queue = self.queue.lock();
            for handle in handles.into_iter().flatten() {
                queue.push_back(handle);
                enqueued += 1;
            }
            self.queue_len.store(queue.len(), Ordering::Release);
        }

        let discarded = requested - enqueued;
        if discarded > 0 {
            self.release(discarded);
        }

        if enqueued >= self.worker_count {
            self.wait_cv.notify_all();
        } else {
            for _ in 0..enqueued {
                self.wait_cv.notify_one();
            }
        }
        trace!(pool_id = %self.id, enqueued, discarded, "batch enqueued");
        enqueued
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    pub(crate) fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Acquire)
    }

    pub(crate) fn stats(&self) -> PoolStats {
        PoolStats {
            worker_count: self.worker_count,
            outstanding: self.outstanding(),
            queued: self.queue_len(),
            resumed_total: self.resumed_total.load(Ordering::Relaxed),
            shutdown_requested: self.is_shutting_down(),
        }
    }

    fn pop(&self, queue: &mut MutexGuard<'_, VecDeque<Handle>>) -> Option<Handle> {
        let handle = queue.pop_front();
        self.queue_len.store(queue.len(), Ordering::Release);
        handle
    }

    fn run(&self, handle: &Handle) {
        handle.resume();
        self.resumed_total.fetch_add(1, Ordering::Relaxed);
        self.release(1);
    }

    /// Body of every worker thread.
    ///
    /// Until shutdown is requested the worker sleeps on the condvar between
    /// items. Afterwards it keeps draining the queue while any admitted work is
    /// outstanding, and exits once the queue is empty.
    pub(crate) fn worker_loop(&self, worker_id: usize) {
        if let Some(hook) = &self.on_thread_start {
            hook(worker_id);
        }
        debug!(pool_id = %self.id, worker_id, "worker started");

        while !self.is_shutting_down() {
            let mut queue = self.queue.lock();
            self.wait_cv
                .wait_while(&mut queue, |queue| queue.is_empty() && !self.is_shutting_down());

            let Some(handle) = self.pop(&mut queue) else {
                continue;
            };
            drop(queue);
            self.run(&handle);
        }

        while self.outstanding() != 0 {
            let mut queue = self.queue.lock();
            // Other workers may still be running items that enqueue more work; they
            // drain it themselves once they finish.
            let Some(handle) = self.pop(&mut queue) else {
                break;
            };
            drop(queue);
            self.run(&handle);
        }

        debug!(pool_id = %self.id, worker_id, outstanding = self.outstanding(), "worker stopped");
        if let Some(hook) = &self.on_thread_stop {
            hook(worker_id);
        }
    }
}
