//! Type-erased resumption points.
//!
//! A [`Handle`] is what the ready queue stores and what a finished task invokes
//! as its continuation: something that can be resumed and can tell whether it
//! has already finished. Handles never own the work they resume beyond keeping
//! its allocation alive.

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use std::task::Waker;

/// Something the runtime can resume.
pub trait Resumable: Send + Sync + 'static {
    /// Drive the target one step. Returns whether it is still unfinished.
    fn resume(self: Arc<Self>) -> bool;

    /// Whether the target has finished (or was torn down) and must not be resumed.
    fn is_done(&self) -> bool;
}

/// A cloneable resumption point.
#[derive(Clone)]
pub struct Handle {
    inner: Arc<dyn Resumable>,
}

impl Handle {
    /// Wrap a resumable target.
    pub fn new<T: Resumable>(target: Arc<T>) -> Self {
        Self { inner: target }
    }

    /// A handle that resumes by waking `waker`.
    ///
    /// Used when a task is awaited from outside any task frame, for example from a
    /// foreign executor. Such a handle never reports itself as done.
    #[must_use]
    pub fn from_waker(waker: &Waker) -> Self {
        Self::new(Arc::new(WakerHandle {
            waker: waker.clone(),
        }))
    }

    /// Drive the target one step. Returns whether it is still unfinished.
    pub fn resume(&self) -> bool {
        Arc::clone(&self.inner).resume()
    }

    /// Whether the target has finished.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.inner.is_done()
    }

    /// Whether both handles resume the same target.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("target", &Arc::as_ptr(&self.inner).cast::<()>())
            .field("done", &self.is_done())
            .finish()
    }
}

struct WakerHandle {
    waker: Waker,
}

impl Resumable for WakerHandle {
    fn resume(self: Arc<Self>) -> bool {
        self.waker.wake_by_ref();
        true
    }

    fn is_done(&self) -> bool {
        false
    }
}

/// Work to run once the polled frame has parked itself.
pub(crate) type Deferred = Box<dyn FnOnce() + Send>;

/// The frame being polled on a thread, with the waker it was polled with.
struct Running {
    handle: Handle,
    waker: Waker,
    after_suspend: Vec<Deferred>,
}

thread_local! {
    static CURRENT: RefCell<Option<Running>> = const { RefCell::new(None) };
}

/// Restores the previously running frame when dropped.
pub(crate) struct CurrentGuard {
    prev: Option<Running>,
}

impl CurrentGuard {
    /// Actions registered through [`after_suspend`] during this poll.
    pub(crate) fn take_deferred(&self) -> Vec<Deferred> {
        CURRENT.with(|slot| {
            slot.borrow_mut()
                .as_mut()
                .map(|running| std::mem::take(&mut running.after_suspend))
                .unwrap_or_default()
        })
    }
}

impl Drop for CurrentGuard {
    fn drop(&mut self) {
        let prev = self.prev.take();
        CURRENT.with(|slot| *slot.borrow_mut() = prev);
    }
}

/// Mark `handle` as the frame being polled on this thread until the guard drops.
pub(crate) fn enter(handle: Handle, waker: &Waker) -> CurrentGuard {
    let running = Running {
        handle,
        waker: waker.clone(),
        after_suspend: Vec::new(),
    };
    let prev = CURRENT.with(|slot| slot.borrow_mut().replace(running));
    CurrentGuard { prev }
}

/// The frame currently being polled on this thread, if any.
#[cfg(test)]
pub(crate) fn current() -> Option<Handle> {
    CURRENT.with(|slot| slot.borrow().as_ref().map(|running| running.handle.clone()))
}

/// The handle a suspending future should hand out for the context it is polled in.
///
/// That is the running frame when the future is polled directly by it, and a
/// waker-backed handle otherwise (foreign executors, or combinators that poll
/// their children with their own wakers).
pub(crate) fn current_or_waker(waker: &Waker) -> Handle {
    CURRENT
        .with(|slot| {
            slot.borrow()
                .as_ref()
                .filter(|running| running.waker.will_wake(waker))
                .map(|running| running.handle.clone())
        })
        .unwrap_or_else(|| Handle::from_waker(waker))
}

/// Run `action` after the frame polled with `waker` has suspended.
///
/// This is how a suspending future publishes its frame (e.g. to a ready queue)
/// without another thread resuming the frame before it has parked. When no
/// such frame is being polled on this thread the action is handed back so the
/// caller can run it right away.
pub(crate) fn after_suspend<F>(waker: &Waker, action: F) -> Result<(), F>
where
    F: FnOnce() + Send + 'static,
{
    CURRENT.with(|slot| {
        let mut slot = slot.borrow_mut();
        match slot.as_mut().filter(|running| running.waker.will_wake(waker)) {
            Some(running) => {
                running.after_suspend.push(Box::new(action));
                Ok(())
            }
            None => Err(action),
        }
    })
}
