//! The awaitable returned by [`WorkerPool::schedule`].
//!
//! [`WorkerPool::schedule`]: crate::core::WorkerPool::schedule

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

use super::shared::Shared;
use crate::core::handle::{self, Handle, Resumable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Counted as outstanding, not yet awaited.
    Admitted,
    /// The ticket sits in the ready queue.
    Enqueued,
    /// A worker resumed the ticket.
    Resumed,
}

struct Entry {
    target: Handle,
    resumed: bool,
}

/// Ready-queue entry for one schedule operation. Resuming it marks the operation
/// as done and forwards to whoever polled it last.
struct Ticket {
    entry: Mutex<Entry>,
}

impl Ticket {
    fn new(target: Handle) -> Arc<Self> {
        Arc::new(Self {
            entry: Mutex::new(Entry {
                target,
                resumed: false,
            }),
        })
    }

    /// Whether a worker resumed the ticket. If not, the current poller becomes
    /// the target of that resume.
    fn poll_resumed(&self, waker: &Waker) -> bool {
        let mut entry = self.entry.lock();
        if !entry.resumed {
            entry.target = handle::current_or_waker(waker);
        }
        entry.resumed
    }
}

impl Resumable for Ticket {
    fn resume(self: Arc<Self>) -> bool {
        let target = {
            let mut entry = self.entry.lock();
            entry.resumed = true;
            entry.target.clone()
        };
        target.resume()
    }

    fn is_done(&self) -> bool {
        self.entry.lock().target.is_done()
    }
}

/// One-shot awaitable that moves the awaiting task onto a pool worker.
///
/// Awaiting it always suspends. A ticket is appended to the pool's FIFO ready
/// queue once the task has parked, and the operation completes only after a
/// worker has popped and resumed that ticket, so the task continues on that
/// worker. Polls before then stay pending, whoever makes them. The unit of work
/// was already counted as outstanding when the operation was created; dropping
/// the operation without awaiting it releases that count again.
#[must_use = "a schedule operation does nothing unless awaited"]
pub struct ScheduleOperation {
    shared: Arc<Shared>,
    stage: Stage,
    ticket: Option<Arc<Ticket>>,
}

impl ScheduleOperation {
    pub(crate) const fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            stage: Stage::Admitted,
            ticket: None,
        }
    }
}

impl Future for ScheduleOperation {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        match this.stage {
            Stage::Admitted => {
                let ticket = Ticket::new(handle::current_or_waker(cx.waker()));
                let shared = Arc::clone(&this.shared);
                let queued = Handle::new(Arc::clone(&ticket));
                let enqueue = move || shared.enqueue(queued);
                if let Err(enqueue) = handle::after_suspend(cx.waker(), enqueue) {
                    enqueue();
                }
                this.ticket = Some(ticket);
                this.stage = Stage::Enqueued;
                Poll::Pending
            }
            Stage::Enqueued => {
                let resumed = this
                    .ticket
                    .as_ref()
                    .is_none_or(|ticket| ticket.poll_resumed(cx.waker()));
                if resumed {
                    this.stage = Stage::Resumed;
                    Poll::Ready(())
                } else {
                    Poll::Pending
                }
            }
            Stage::Resumed => Poll::Ready(()),
        }
    }
}

impl Drop for ScheduleOperation {
    fn drop(&mut self) {
        if self.stage == Stage::Admitted {
            self.shared.release(1);
        }
    }
}

impl fmt::Debug for ScheduleOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleOperation")
            .field("pool_id", &self.shared.id)
            .field("stage", &self.stage)
            .finish()
    }
}
