//! Write-once storage for the outcome of a task.

use std::sync::Arc;

use super::error::TaskError;

/// Tri-state outcome slot owned by every task frame.
///
/// The owning frame writes exactly one outcome when its body finishes. A second
/// write is a contract violation: it is only checked in debug builds, and in
/// release builds the later outcome replaces the earlier one.
///
/// Reference results (`ResultCell<&T>`, `ResultCell<&mut T>`) store the reference
/// itself, never a copy of the referent.
#[derive(Debug)]
pub enum ResultCell<R> {
    /// No outcome has been written yet.
    Empty,
    /// The body produced a value.
    Value(R),
    /// The body failed. The failure is shared so every read re-raises the same one.
    Error(Arc<anyhow::Error>),
}

impl<R> Default for ResultCell<R> {
    fn default() -> Self {
        Self::Empty
    }
}

impl<R> ResultCell<R> {
    /// Store the outcome of a finished body.
    pub fn write(&mut self, outcome: anyhow::Result<R>) {
        debug_assert!(self.is_empty(), "task outcome written twice");
        *self = match outcome {
            Ok(value) => Self::Value(value),
            Err(err) => Self::Error(Arc::new(err)),
        };
    }

    /// Whether no outcome has been written.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Repeatable, non-destructive read.
    ///
    /// # Errors
    ///
    /// [`TaskError::NotReady`] if nothing was written, [`TaskError::Failed`] if the
    /// body failed.
    pub fn get(&self) -> Result<&R, TaskError> {
        match self {
            Self::Value(value) => Ok(value),
            _ => Err(self.failure()),
        }
    }

    /// The stored value, if there is one.
    #[must_use]
    pub const fn value(&self) -> Option<&R> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Move the value out, leaving `R::default()` in its place.
    ///
    /// Repeating the call yields the default again rather than an error, the same
    /// way a moved-from value remains readable.
    ///
    /// # Errors
    ///
    /// Same as [`ResultCell::get`].
    pub fn take(&mut self) -> Result<R, TaskError>
    where
        R: Default,
    {
        match self {
            Self::Value(value) => Ok(std::mem::take(value)),
            _ => Err(self.failure()),
        }
    }

    /// Consume the cell and return its value.
    ///
    /// # Errors
    ///
    /// Same as [`ResultCell::get`].
    pub fn into_inner(self) -> Result<R, TaskError> {
        match self {
            Self::Value(value) => Ok(value),
            Self::Error(err) => Err(TaskError::Failed(err)),
            Self::Empty => Err(TaskError::NotReady),
        }
    }

    /// The error a read of a non-value cell reports.
    pub(crate) fn failure(&self) -> TaskError {
        match self {
            Self::Error(err) => TaskError::Failed(Arc::clone(err)),
            _ => TaskError::NotReady,
        }
    }
}
