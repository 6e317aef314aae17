//! Tests for error types

use prometheus_coro::core::{PoolError, TaskError};
use std::sync::Arc;

#[test]
fn test_not_ready_error() {
    let err = TaskError::NotReady;
    assert_eq!(
        format!("{}", err),
        "the return value was never set, did you execute the task?"
    );
}

#[test]
fn test_failed_error() {
    let err = TaskError::Failed(Arc::new(anyhow::anyhow!("disk on fire")));
    assert_eq!(format!("{}", err), "task failed: disk on fire");
}

#[test]
fn test_failed_error_shows_context_chain() {
    let source = anyhow::anyhow!("permission denied").context("opening model file");
    let err = TaskError::Failed(Arc::new(source));
    assert_eq!(
        format!("{}", err),
        "task failed: opening model file: permission denied"
    );
}

#[test]
fn test_shutting_down_error() {
    let err = PoolError::ShuttingDown;
    assert_eq!(
        format!("{}", err),
        "thread pool is shutting down, unable to schedule new tasks"
    );
}

#[test]
fn test_invalid_config_error() {
    let err = PoolError::InvalidConfig("worker_count must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: worker_count must be greater than 0"
    );
}

#[test]
fn test_thread_spawn_error_from_io() {
    let err: PoolError = std::io::Error::other("out of threads").into();
    assert!(matches!(err, PoolError::ThreadSpawn(_)));
    assert_eq!(format!("{}", err), "failed to spawn worker thread: out of threads");
}

#[test]
fn test_errors_convert_into_anyhow() {
    fn schedule() -> prometheus_coro::core::AppResult<()> {
        Err(PoolError::ShuttingDown.into())
    }
    let err = schedule().unwrap_err();
    assert!(err.downcast_ref::<PoolError>().is_some());
}
