//! # Hook contract consumed by the worker lifecycle.
//!
//! All hooks run sequentially on the worker's own task, so `stop_imminent`
//! and `do_stop` never overlap `do_periodic_check`.
//!
//! ```text
//! do_start ──► (tick) do_periodic_check ──► ... ──► [cohort consensus] stop_imminent ──► do_stop
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HookError;

/// Shared handle to a hooks implementation.
pub type HooksRef = Arc<dyn WorkerHooks>;

/// # Worker-specific behaviour.
///
/// Hooks take `&self`; keep mutable state behind interior mutability.
/// A hook that never returns hangs `Worker::stop` unless a join grace is configured.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tunnelvisor::{HookError, WorkerHooks};
///
/// struct Heartbeat;
///
/// #[async_trait]
/// impl WorkerHooks for Heartbeat {
///     fn name(&self) -> &str { "heartbeat" }
///
///     async fn do_start(&self) -> Result<bool, HookError> { Ok(true) }
///
///     async fn do_periodic_check(&self) -> Result<bool, HookError> { Ok(true) }
///
///     async fn do_stop(&self) {}
/// }
/// ```
#[async_trait]
pub trait WorkerHooks: Send + Sync + 'static {
    /// Stable, human-readable worker name.
    fn name(&self) -> &str;

    /// Performs setup.
    ///
    /// `Ok(false)` stops the worker at once without signalling "started".
    /// `Err` is a fault and ends the worker uncleanly.
    async fn do_start(&self) -> Result<bool, HookError>;

    /// Called once per tick while running. `Ok(false)` requests a self-initiated stop.
    async fn do_periodic_check(&self) -> Result<bool, HookError>;

    /// Last chance for clean state changes.
    ///
    /// Runs once, only when every cohort member stopped cleanly, before `do_stop`.
    async fn stop_imminent(&self) {}

    /// Unconditional cleanup.
    ///
    /// Runs exactly once per spawned worker task, on every exit path: clean,
    /// unclean, or aborted before `do_start`. It does not run when `start`
    /// returns early because stop was already requested, since no task is spawned.
    async fn do_stop(&self);
}
