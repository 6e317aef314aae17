//! Driving tasks from ordinary threads.

pub mod sync_wait;

pub use sync_wait::{sync_wait, sync_wait_ref};
