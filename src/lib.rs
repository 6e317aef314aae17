//! # Prometheus Coro
//!
//! Deferred, single-result computations and a FIFO worker thread pool that
//! resumes them.
//!
//! A [`Task`](core::Task) wraps an `async` body that produces exactly one value or
//! one failure. Nothing runs when a task is created: it is driven step by step with
//! [`Task::resume`](core::Task::resume), by awaiting it from another task, or by a
//! [`WorkerPool`](core::WorkerPool) worker after the task scheduled itself.
//!
//! ## Key Features
//!
//! - **Lazy tasks**: bodies start on the first resume, never at construction
//! - **Continuations**: awaiting a suspended task links the awaiter as its
//!   continuation; the awaited task's final step resumes it
//! - **Worker pool**: fixed OS threads, one FIFO ready queue, an atomic count of
//!   outstanding work
//! - **Graceful shutdown**: admitted work, and whatever it enqueues, finishes
//!   before the workers are joined
//! - **Detached tasks**: `spawn` hands a task to the pool, which releases it once
//!   it finishes
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use prometheus_coro::builders::WorkerPoolBuilder;
//! use prometheus_coro::core::Task;
//! use prometheus_coro::runtime::sync_wait;
//!
//! let pool = WorkerPoolBuilder::new().worker_count(4).build()?;
//!
//! let tasks: Vec<Task<u64>> = (0..8)
//!     .map(|i| {
//!         let pool = Arc::clone(&pool);
//!         Task::new(async move {
//!             pool.schedule()?.await;
//!             Ok(i * i)
//!         })
//!     })
//!     .collect();
//!
//! let mut total = 0;
//! for task in tasks {
//!     total += sync_wait(task)?;
//! }
//! assert_eq!(total, 140);
//!
//! pool.shutdown();
//! assert!(pool.is_empty());
//! # Ok::<(), anyhow::Error>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Tasks, resumption handles and the worker pool.
pub mod core;
/// Configuration models for worker pools.
pub mod config;
/// Builders to construct worker pools from configuration.
pub mod builders;
/// Driving tasks from ordinary threads.
pub mod runtime;
/// Shared utilities.
pub mod util;
