//! Scheduler-owned wrapper for detached tasks.
//!
//! A [`SelfOwningTask`] is created by [`WorkerPool::spawn`]. The caller gives up
//! the task; from then on the only owners are the ready-queue entry and, while the
//! task is suspended, the continuation slot of the task's frame. When the wrapped
//! task finishes, the wrapper releases it exactly once and decrements the pool's
//! outstanding counter.
//!
//! A failure of a detached task has no observer. It is logged at `debug` level
//! and otherwise dropped.
//!
//! [`WorkerPool::spawn`]: crate::core::WorkerPool::spawn

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::handle::{Handle, Resumable};
use super::task::Task;

/// Detached task driven by the scheduler. Never awaited, never handed out.
pub(crate) struct SelfOwningTask {
    task: Mutex<Option<Task<()>>>,
    outstanding: Option<Arc<AtomicUsize>>,
}

impl SelfOwningTask {
    /// Wrap `task`; `outstanding` is decremented once when it finishes.
    pub(crate) fn new(task: Task<()>, outstanding: Option<Arc<AtomicUsize>>) -> Arc<Self> {
        Arc::new(Self {
            task: Mutex::new(Some(task)),
            outstanding,
        })
    }

    fn finish(&self, task: Task<()>) {
        if let Err(err) = task.into_result() {
            debug!(error = %err, "detached task failed; failure discarded");
        }
        if let Some(outstanding) = &self.outstanding {
            outstanding.fetch_sub(1, Ordering::Release);
        }
    }
}

impl Resumable for SelfOwningTask {
    fn resume(self: Arc<Self>) -> bool {
        let mut slot = self.task.lock();
        let Some(task) = slot.as_ref() else {
            return false;
        };

        let me = Handle::new(Arc::clone(&self));
        if !task.await_from(&me) {
            // Linked as the continuation; the task's final step resumes us.
            return true;
        }

        let finished = slot.take();
        drop(slot);
        if let Some(task) = finished {
            self.finish(task);
        }
        false
    }

    fn is_done(&self) -> bool {
        self.task.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::task::suspend;

    #[test]
    fn test_finishes_inline_and_decrements_once() {
        let outstanding = Arc::new(AtomicUsize::new(1));
        let wrapper = SelfOwningTask::new(Task::new(async { Ok(()) }), Some(Arc::clone(&outstanding)));
        let handle = Handle::new(Arc::clone(&wrapper));

        assert!(!handle.is_done());
        assert!(!handle.resume());
        assert!(handle.is_done());
        assert_eq!(outstanding.load(Ordering::Acquire), 0);

        // Resuming a finished wrapper does not touch the counter again.
        assert!(!handle.resume());
        assert_eq!(outstanding.load(Ordering::Acquire), 0);
    }

    #[test]
    fn test_suspended_task_completes_through_continuation() {
        let outstanding = Arc::new(AtomicUsize::new(1));
        let task = Task::new(async {
            suspend().await;
            Ok(())
        });
        let inner = task.handle().unwrap();
        let wrapper = SelfOwningTask::new(task, Some(Arc::clone(&outstanding)));
        let handle = Handle::new(Arc::clone(&wrapper));

        assert!(handle.resume());
        assert_eq!(outstanding.load(Ordering::Acquire), 1);

        // Resuming the wrapped frame directly finishes it and fires the wrapper.
        assert!(!inner.resume());
        assert!(handle.is_done());
        assert!(inner.is_done());
        assert_eq!(outstanding.load(Ordering::Acquire), 0);
    }

    #[test]
    fn test_failure_is_swallowed() {
        let wrapper = SelfOwningTask::new(
            Task::new(async { Err(anyhow::anyhow!("nobody is listening")) }),
            None,
        );
        assert!(!Handle::new(wrapper).resume());
    }
}
