//! Tests for builder modules

use prometheus_coro::builders::WorkerPoolBuilder;
use prometheus_coro::config::WorkerPoolConfig;
use prometheus_coro::core::PoolError;

#[test]
fn test_pool_builder_defaults() {
    let options = WorkerPoolBuilder::new().options();
    assert_eq!(options.config, WorkerPoolConfig::default());
    assert!(options.on_thread_start.is_none());
    assert!(options.on_thread_stop.is_none());
}

#[test]
fn test_pool_builder_overrides() {
    let options = WorkerPoolBuilder::from_config(WorkerPoolConfig::new().with_worker_count(8))
        .worker_count(2)
        .thread_name_prefix("gpu")
        .thread_stack_size(512 * 1024)
        .on_thread_start(|_| {})
        .options();

    assert_eq!(options.config.worker_count, 2);
    assert_eq!(options.config.thread_name_prefix, "gpu");
    assert_eq!(options.config.thread_stack_size, Some(512 * 1024));
    assert!(options.on_thread_start.is_some());
}

#[test]
fn test_pool_builder_builds_pool() {
    let pool = WorkerPoolBuilder::new().worker_count(2).build().unwrap();
    assert_eq!(pool.thread_count(), 2);
    assert_eq!(pool.stats().worker_count, 2);
    pool.shutdown();
}

#[test]
fn test_pool_builder_rejects_invalid_config() {
    let err = WorkerPoolBuilder::new().worker_count(0).build().unwrap_err();
    assert!(matches!(err, PoolError::InvalidConfig(_)));
}
