//! Error types for tasks and the worker pool.

use std::sync::Arc;

use thiserror::Error;

/// Errors observed when reading the outcome of a [`Task`](crate::core::Task).
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// The task never produced an outcome (it was never run to completion).
    #[error("the return value was never set, did you execute the task?")]
    NotReady,
    /// The task body failed; every read observes the same failure.
    #[error("task failed: {0:#}")]
    Failed(Arc<anyhow::Error>),
}

impl TaskError {
    /// The failure stored by the task body, if this is a failure.
    #[must_use]
    pub fn failure(&self) -> Option<&anyhow::Error> {
        match self {
            Self::NotReady => None,
            Self::Failed(err) => Some(err),
        }
    }

    /// Whether two errors carry the very same stored failure.
    #[must_use]
    pub fn same_failure(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Failed(a), Self::Failed(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Errors produced by the worker pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool has been asked to shut down and accepts no new work.
    #[error("thread pool is shutting down, unable to schedule new tasks")]
    ShuttingDown,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// An OS worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),
}

/// Application-facing result using anyhow, the error type of task bodies.
pub type AppResult<T> = Result<T, anyhow::Error>;
