//! Tests for configuration validation

use prometheus_coro::config::WorkerPoolConfig;

#[test]
fn test_worker_pool_config_defaults() {
    let cfg = WorkerPoolConfig::default();
    assert!(cfg.worker_count >= 1);
    assert_eq!(cfg.thread_name_prefix, "coro-worker");
    assert_eq!(cfg.thread_stack_size, None);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_worker_pool_config_builder_methods() {
    let cfg = WorkerPoolConfig::new()
        .with_worker_count(6)
        .with_thread_name_prefix("infer")
        .with_thread_stack_size(4 * 1024 * 1024);
    assert_eq!(cfg.worker_count, 6);
    assert_eq!(cfg.thread_name_prefix, "infer");
    assert_eq!(cfg.thread_stack_size, Some(4 * 1024 * 1024));
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_worker_pool_config_invalid_worker_count() {
    let invalid = WorkerPoolConfig::new().with_worker_count(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_worker_pool_config_invalid_prefix() {
    let invalid = WorkerPoolConfig::new().with_thread_name_prefix("");
    assert!(invalid.validate().is_err());
}

#[test]
fn test_worker_pool_config_invalid_stack_size() {
    let invalid = WorkerPoolConfig::new().with_thread_stack_size(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "worker_count": 3,
        "thread_name_prefix": "json-worker",
        "thread_stack_size": 1048576
    }"#;

    let cfg = WorkerPoolConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.worker_count, 3);
    assert_eq!(cfg.thread_name_prefix, "json-worker");
    assert_eq!(cfg.thread_stack_size, Some(1_048_576));
}

#[test]
fn test_config_from_json_fills_defaults() {
    let cfg = WorkerPoolConfig::from_json_str(r#"{ "worker_count": 2 }"#).unwrap();
    assert_eq!(cfg.worker_count, 2);
    assert_eq!(cfg.thread_name_prefix, "coro-worker");
}

#[test]
fn test_config_from_json_invalid() {
    assert!(WorkerPoolConfig::from_json_str(r#"{ "worker_count": 0 }"#).is_err());
    assert!(WorkerPoolConfig::from_json_str("not json").is_err());
}

#[test]
fn test_config_round_trips_through_json() {
    let cfg = WorkerPoolConfig::new().with_worker_count(5);
    let json = serde_json::to_string(&cfg).unwrap();
    assert_eq!(WorkerPoolConfig::from_json_str(&json).unwrap(), cfg);
}
