//! Blocking bridge from a plain thread into a task.
//!
//! [`sync_wait`] starts the task inline on the calling thread. If the task
//! suspends (typically because it scheduled itself onto a [`WorkerPool`]), a
//! latch is linked as its continuation and the caller sleeps on a condition
//! variable until the task's final step opens it.
//!
//! A task that suspends with nothing lined up to resume it never completes, and
//! neither does the wait.
//!
//! [`WorkerPool`]: crate::core::WorkerPool

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::core::{Handle, Resumable, ResultRef, Task, TaskError};

#[derive(Default)]
struct Latch {
    open: Mutex<bool>,
    cv: Condvar,
}

impl Latch {
    fn wait(&self) {
        let mut open = self.open.lock();
        self.cv.wait_while(&mut open, |open| !*open);
    }
}

impl Resumable for Latch {
    fn resume(self: Arc<Self>) -> bool {
        *self.open.lock() = true;
        self.cv.notify_all();
        false
    }

    fn is_done(&self) -> bool {
        *self.open.lock()
    }
}

fn wait_until_finished<R: Send + Sync + 'static>(task: &Task<R>) {
    let latch = Arc::new(Latch::default());
    let continuation = Handle::new(Arc::clone(&latch));
    if !task.await_from(&continuation) {
        latch.wait();
    }
}

/// Run `task` to completion, blocking the calling thread, and return its result.
///
/// # Errors
///
/// The task's failure, or [`TaskError::NotReady`] if it was destroyed.
pub fn sync_wait<R: Send + Sync + 'static>(task: Task<R>) -> Result<R, TaskError> {
    wait_until_finished(&task);
    task.into_result()
}

/// Run `task` to completion, blocking the calling thread, and read its result in
/// place.
///
/// # Errors
///
/// Same as [`sync_wait`].
pub fn sync_wait_ref<R: Send + Sync + 'static>(task: &Task<R>) -> Result<ResultRef<'_, R>, TaskError> {
    wait_until_finished(task);
    task.result()
}
