//! Logging setup for the task runtime.
//!
//! The crate emits `tracing` events with targets under `prometheus_coro`. Pool
//! events carry the pool's `pool_id`:
//!
//! - `info`: pool started (with worker count) and pool shut down.
//! - `debug`: worker started/stopped (`worker_id`), failures swallowed by
//!   detached tasks, `shutdown` invoked from a worker thread.
//! - `warn`: work rejected after shutdown, a worker that failed to start or
//!   panicked.
//! - `trace`: every enqueue and batch enqueue, with queue depth.

/// Install a `fmt` subscriber filtered by `RUST_LOG`, unless a global subscriber
/// is already set.
///
/// Workers are named `<prefix>-<index>` and thread names are printed, so each
/// event shows which worker produced it. `RUST_LOG=prometheus_coro=debug` shows
/// the worker life cycle.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_thread_names(true)
        .try_init();
}
