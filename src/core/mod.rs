//! Core task and scheduling abstractions.

pub mod error;
pub mod handle;
pub mod result_cell;
pub mod task;
mod self_owning;
pub mod worker_pool;

pub use error::{AppResult, PoolError, TaskError};
pub use handle::{Handle, Resumable};
pub use result_cell::ResultCell;
pub use task::{suspend, ResultRef, Suspend, Task, TaskFuture, TaskRefFuture, TaskState};
pub use worker_pool::{Options, PoolStats, ScheduleOperation, ThreadHook, WorkerPool};
