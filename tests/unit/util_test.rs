//! Tests for utility functions

use prometheus_coro::builders::WorkerPoolBuilder;
use prometheus_coro::util::init_tracing;

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::info!("tracing initialized twice without panicking");
}

#[test]
fn test_pool_lifecycle_logs_under_installed_subscriber() {
    init_tracing();
    assert!(tracing::dispatcher::has_been_set());

    let pool = WorkerPoolBuilder::new()
        .worker_count(1)
        .thread_name_prefix("log-worker")
        .build()
        .unwrap();
    pool.shutdown();
    assert!(pool.is_empty());
}
