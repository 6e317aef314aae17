//! Deferred, single-result computations with explicit suspend/resume.
//!
//! A [`Task`] owns a frame: the body future, a [`ResultCell`] and a continuation
//! slot. Nothing runs on construction; every step happens inside [`Task::resume`]
//! (or a resume of one of its [`Handle`]s, e.g. by a pool worker).
//!
//! # Frame life cycle
//!
//! ```text
//! Unstarted ──resume──▶ Running ──Pending──▶ Suspended ──resume──▶ Running ...
//!                          │
//!                          └──Ready──▶ Done (result written, continuation invoked)
//!
//! any state ──destroy──▶ Destroyed (no continuation is invoked)
//! ```
//!
//! A frame is polled by at most one thread at a time. A resume that arrives while
//! the frame is running is recorded and the running thread polls again before
//! suspending, so no wake-up is lost.
//!
//! # Awaiting
//!
//! Awaiting a task from another task (`task.await` or `(&task).await`) drives the
//! awaited frame inline on the first poll. If it suspends, the awaiting frame is
//! installed as its continuation and suspends too; it is resumed by the awaited
//! frame's final step. Later polls of the same await only refresh that link, so
//! a frame that was handed to a pool worker stays with the worker.

use std::any::Any;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::ops::Deref;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

use parking_lot::{MappedRwLockReadGuard, Mutex, RwLock, RwLockReadGuard};

use super::error::TaskError;
use super::handle::{self, Deferred, Handle, Resumable};
use super::result_cell::ResultCell;

type Body<R> = Pin<Box<dyn Future<Output = anyhow::Result<R>> + Send>>;

/// Observable state of a task frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Created but never resumed.
    Unstarted,
    /// Being polled on some thread right now.
    Running,
    /// Parked at a suspension point.
    Suspended,
    /// The body finished and its outcome is stored.
    Done,
    /// Torn down, or the owning task no longer holds a frame.
    Destroyed,
}

struct Control {
    state: TaskState,
    /// Set when a resume arrives while the frame is running.
    notified: bool,
    continuation: Option<Handle>,
}

pub(crate) struct Frame<R> {
    control: Mutex<Control>,
    body: Mutex<Option<Body<R>>>,
    result: RwLock<ResultCell<R>>,
}

impl<R> Frame<R> {
    fn new(body: Body<R>) -> Self {
        Self {
            control: Mutex::new(Control {
                state: TaskState::Unstarted,
                notified: false,
                continuation: None,
            }),
            body: Mutex::new(Some(body)),
            result: RwLock::new(ResultCell::Empty),
        }
    }

    fn state(&self) -> TaskState {
        self.control.lock().state
    }

    fn is_finished(&self) -> bool {
        matches!(self.state(), TaskState::Done | TaskState::Destroyed)
    }

    fn destroy(&self) {
        {
            let mut control = self.control.lock();
            control.state = TaskState::Destroyed;
            control.continuation = None;
        }
        // Waits for an in-flight poll on another thread to return.
        let body = self.body.lock().take();
        drop(body);
        let result = std::mem::take(&mut *self.result.write());
        drop(result);
    }
}

impl<R: Send + Sync + 'static> Frame<R> {
    /// Drive the frame until it suspends or completes. Returns whether it is
    /// still unfinished.
    ///
    /// When the frame is already running elsewhere the call only records a
    /// notification if `notify_if_running` is set.
    fn run(self: &Arc<Self>, notify_if_running: bool) -> bool {
        {
            let mut control = self.control.lock();
            match control.state {
                TaskState::Done | TaskState::Destroyed => return false,
                TaskState::Running => {
                    control.notified |= notify_if_running;
                    return true;
                }
                TaskState::Unstarted | TaskState::Suspended => control.state = TaskState::Running,
            }
        }

        let handle = Handle::new(Arc::clone(self));
        let waker = Waker::from(Arc::clone(self));
        loop {
            let (poll, deferred) = self.poll_body(&handle, &waker);
            if let Poll::Ready(outcome) = poll {
                self.complete(outcome);
                run_deferred(deferred);
                return false;
            }

            let still_pending = {
                let mut control = self.control.lock();
                if control.state == TaskState::Destroyed {
                    false
                } else if control.notified && deferred.is_empty() {
                    control.notified = false;
                    continue;
                } else {
                    // Deferred actions hand the frame to a pool worker, which polls it
                    // again; a notification that raced with this poll is served there.
                    control.state = TaskState::Suspended;
                    control.notified = false;
                    true
                }
            };
            run_deferred(deferred);
            return still_pending;
        }
    }

    fn poll_body(&self, handle: &Handle, waker: &Waker) -> (Poll<anyhow::Result<R>>, Vec<Deferred>) {
        let mut body = self.body.lock();
        let Some(future) = body.as_mut() else {
            return (Poll::Pending, Vec::new());
        };

        let running = handle::enter(handle.clone(), waker);
        let mut cx = Context::from_waker(waker);
        let poll = panic::catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(&mut cx)))
            .unwrap_or_else(|payload| {
                Poll::Ready(Err(anyhow::anyhow!(
                    "computation panicked: {}",
                    panic_message(payload.as_ref())
                )))
            });
        (poll, running.take_deferred())
    }

    fn complete(&self, outcome: anyhow::Result<R>) {
        self.result.write().write(outcome);
        // Release whatever the body captured, nested tasks included.
        drop(self.body.lock().take());

        let continuation = {
            let mut control = self.control.lock();
            if control.state == TaskState::Destroyed {
                None
            } else {
                control.state = TaskState::Done;
                control.notified = false;
                control.continuation.take()
            }
        };
        if let Some(next) = continuation {
            next.resume();
        }
    }

    /// Await protocol: drive the frame inline, then either report completion or
    /// install `awaiter` as the continuation. Returns whether the frame is finished.
    pub(crate) fn await_from(self: &Arc<Self>, awaiter: &Handle) -> bool {
        let runnable = {
            let mut control = self.control.lock();
            // A link left by an earlier poll must not fire while the awaiter itself
            // drives the frame.
            control.continuation = None;
            matches!(control.state, TaskState::Unstarted | TaskState::Suspended)
        };
        if runnable {
            self.run(false);
        }
        self.link(awaiter)
    }

    /// Report completion or (re)install `awaiter` as the continuation, without
    /// driving the frame.
    pub(crate) fn link(&self, awaiter: &Handle) -> bool {
        let mut control = self.control.lock();
        match control.state {
            TaskState::Done | TaskState::Destroyed => true,
            _ => {
                control.continuation = Some(awaiter.clone());
                false
            }
        }
    }
}

impl<R: Send + Sync + 'static> Resumable for Frame<R> {
    fn resume(self: Arc<Self>) -> bool {
        self.run(true)
    }

    fn is_done(&self) -> bool {
        self.is_finished()
    }
}

impl<R: Send + Sync + 'static> Wake for Frame<R> {
    fn wake(self: Arc<Self>) {
        self.run(true);
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.run(true);
    }
}

fn run_deferred(deferred: Vec<Deferred>) {
    for action in deferred {
        action();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|msg| (*msg).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// A move-only handle to a suspendable unit of work producing one `R`.
///
/// The body is an `async` block returning [`anyhow::Result<R>`]; an `Err` or a
/// panic is stored as the task's failure and re-raised by every read.
///
/// Dropping a task that still owns a frame destroys it: the body is discarded
/// without notifying anything awaiting it.
///
/// # Examples
///
/// ```
/// use prometheus_coro::core::Task;
///
/// let task = Task::new(async { Ok(40 + 2) });
/// assert!(task.result().is_err());
///
/// task.resume();
/// assert!(task.is_ready());
/// assert_eq!(*task.result().unwrap(), 42);
/// ```
#[must_use = "tasks do nothing unless resumed, scheduled or awaited"]
pub struct Task<R> {
    frame: Option<Arc<Frame<R>>>,
}

impl<R: Send + Sync + 'static> Task<R> {
    /// Create a suspended task. The body does not run until the first resume.
    pub fn new<F>(body: F) -> Self
    where
        F: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        Self {
            frame: Some(Arc::new(Frame::new(Box::pin(body)))),
        }
    }

    /// A task whose body immediately yields `value` once resumed.
    pub fn from_value(value: R) -> Self {
        Self::new(async move { Ok(value) })
    }

    /// Drive the task one step. Returns whether it is still unfinished.
    ///
    /// Resuming a finished or destroyed task is a no-op returning `false`.
    pub fn resume(&self) -> bool {
        self.frame.as_ref().is_some_and(|frame| frame.run(true))
    }

    /// True if the task holds no frame or its frame has finished.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.frame.as_ref().is_none_or(|frame| frame.is_finished())
    }

    /// Current state of the frame.
    #[must_use]
    pub fn state(&self) -> TaskState {
        self.frame
            .as_ref()
            .map_or(TaskState::Destroyed, |frame| frame.state())
    }

    /// Tear the frame down early. Returns whether there was a frame to destroy;
    /// later calls are no-ops returning `false`.
    pub fn destroy(&mut self) -> bool {
        self.frame.take().is_some_and(|frame| {
            frame.destroy();
            true
        })
    }

    /// The frame's resumption point, e.g. for [`WorkerPool::resume`].
    ///
    /// [`WorkerPool::resume`]: crate::core::WorkerPool::resume
    #[must_use]
    pub fn handle(&self) -> Option<Handle> {
        self.frame
            .as_ref()
            .map(|frame| Handle::new(Arc::clone(frame)))
    }

    /// Read the result without consuming it. Repeatable.
    ///
    /// Any number of views may be held at once, on one thread or several.
    ///
    /// # Errors
    ///
    /// [`TaskError::NotReady`] before the task has completed,
    /// [`TaskError::Failed`] with the same failure on every read if it failed.
    pub fn result(&self) -> Result<ResultRef<'_, R>, TaskError> {
        let Some(frame) = &self.frame else {
            return Err(TaskError::NotReady);
        };
        RwLockReadGuard::try_map(frame.result.read_recursive(), ResultCell::value)
            .map(|guard| ResultRef { guard })
            .map_err(|cell| cell.failure())
    }

    /// Move the result out, leaving `R::default()` behind.
    ///
    /// A later [`Task::result`] observes the default, not an error.
    ///
    /// # Errors
    ///
    /// Same as [`Task::result`].
    pub fn take_result(&mut self) -> Result<R, TaskError>
    where
        R: Default,
    {
        self.frame
            .as_ref()
            .map_or(Err(TaskError::NotReady), |frame| frame.result.write().take())
    }

    /// Consume the task and return its result.
    ///
    /// # Errors
    ///
    /// Same as [`Task::result`].
    pub fn into_result(mut self) -> Result<R, TaskError> {
        self.take_outcome()
    }

    fn take_outcome(&mut self) -> Result<R, TaskError> {
        let Some(frame) = self.frame.take() else {
            return Err(TaskError::NotReady);
        };
        let cell = std::mem::take(&mut *frame.result.write());
        frame.destroy();
        cell.into_inner()
    }

    pub(crate) fn await_from(&self, awaiter: &Handle) -> bool {
        self.frame
            .as_ref()
            .is_none_or(|frame| frame.await_from(awaiter))
    }

    pub(crate) fn link(&self, awaiter: &Handle) -> bool {
        self.frame.as_ref().is_none_or(|frame| frame.link(awaiter))
    }
}

impl<R> Drop for Task<R> {
    fn drop(&mut self) {
        if let Some(frame) = self.frame.take() {
            frame.destroy();
        }
    }
}

impl<R> fmt::Debug for Task<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self
            .frame
            .as_ref()
            .map_or(TaskState::Destroyed, |frame| frame.state());
        f.debug_struct("Task").field("state", &state).finish()
    }
}

/// Read-only view of a completed task's value.
pub struct ResultRef<'a, R> {
    guard: MappedRwLockReadGuard<'a, R>,
}

impl<R> Deref for ResultRef<'_, R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.guard
    }
}

impl<R: fmt::Debug> fmt::Debug for ResultRef<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

/// Future returned by awaiting a task by value; yields the moved-out result.
#[must_use = "futures do nothing unless polled"]
pub struct TaskFuture<R> {
    task: Task<R>,
    started: bool,
}

impl<R: Send + Sync + 'static> Future for TaskFuture<R> {
    type Output = Result<R, TaskError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let awaiter = handle::current_or_waker(cx.waker());
        let finished = if this.started {
            this.task.link(&awaiter)
        } else {
            this.started = true;
            this.task.await_from(&awaiter)
        };
        if finished {
            Poll::Ready(this.task.take_outcome())
        } else {
            Poll::Pending
        }
    }
}

impl<R: Send + Sync + 'static> IntoFuture for Task<R> {
    type Output = Result<R, TaskError>;
    type IntoFuture = TaskFuture<R>;

    fn into_future(self) -> TaskFuture<R> {
        TaskFuture {
            task: self,
            started: false,
        }
    }
}

/// Future returned by awaiting a task by reference; yields a clone of the result.
#[must_use = "futures do nothing unless polled"]
pub struct TaskRefFuture<'a, R> {
    task: &'a Task<R>,
    started: bool,
}

impl<R: Clone + Send + Sync + 'static> Future for TaskRefFuture<'_, R> {
    type Output = Result<R, TaskError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let awaiter = handle::current_or_waker(cx.waker());
        let finished = if this.started {
            this.task.link(&awaiter)
        } else {
            this.started = true;
            this.task.await_from(&awaiter)
        };
        if finished {
            Poll::Ready(this.task.result().map(|value| (*value).clone()))
        } else {
            Poll::Pending
        }
    }
}

impl<'a, R: Clone + Send + Sync + 'static> IntoFuture for &'a Task<R> {
    type Output = Result<R, TaskError>;
    type IntoFuture = TaskRefFuture<'a, R>;

    fn into_future(self) -> TaskRefFuture<'a, R> {
        TaskRefFuture {
            task: self,
            started: false,
        }
    }
}

/// Suspend the current task once.
///
/// The task stays parked until something resumes it (its owner, a pool worker,
/// a stored [`Handle`]). No waker is registered, so inside a foreign executor the
/// future only completes if that executor polls it again.
pub const fn suspend() -> Suspend {
    Suspend { suspended: false }
}

/// Future returned by [`suspend`].
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct Suspend {
    suspended: bool,
}

impl Future for Suspend {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.suspended {
            Poll::Ready(())
        } else {
            self.suspended = true;
            Poll::Pending
        }
    }
}
