//! # tunnelvisor
//!
//! **Tunnelvisor** is a cooperative worker lifecycle and coordinated-shutdown
//! framework for tunnel clients.
//!
//! It runs independent background workers (e.g. transport connections), starts
//! them with deterministic "ready" signalling, and shuts a whole cohort down
//! through a two-phase barrier so that teardown is never partial.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ WorkerHooks  │   │ WorkerHooks  │   │ WorkerHooks  │
//!     │   (ssh)      │   │   (vpn)      │   │   (...)      │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Cohort (controller)                                              │
//! │  - external stop token (CancellationToken)                        │
//! │  - Synchronizer (two-phase barrier)                               │
//! │  - Bus + SubscriberSet (lifecycle events)                         │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │    Worker    │   │    Worker    │   │    Worker    │
//!     │ (trampoline) │   │ (trampoline) │   │ (trampoline) │
//!     └──────────────┘   └──────────────┘   └──────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! Worker::start(&stop, synch)
//!   ├─ stop already set ─► Ok(false), no hook runs
//!   └─ spawn trampoline, wait for "started" or "stopped"
//!
//! trampoline:
//!   synch.thread_starting()
//!   do_start() ─► started
//!   loop every tick {
//!     ├─ stop-signal set     ─► clean vote
//!     └─ do_periodic_check() ─► false/err/panic ─► unclean vote
//!   }
//!   synch vote ─► all clean? ─► stop_imminent() ─► ready barrier
//!   do_stop() ─► stopped
//! ```
//!
//! ## Features
//! | Area              | Description                                             | Key types                              |
//! |-------------------|---------------------------------------------------------|----------------------------------------|
//! | **Workers**       | Start/stop/is-running with hooks                        | [`Worker`], [`WorkerHooks`]            |
//! | **Cohorts**       | Shared barrier and collective shutdown                  | [`Cohort`], [`Synchronizer`]           |
//! | **Signals**       | Stop-signal set and latches                             | [`StopSignals`], [`Latch`]             |
//! | **Events**        | Lifecycle events and fan-out subscribers                | [`Event`], [`Subscribe`]               |
//! | **Errors**        | Typed errors for lifecycle, cohort and hooks            | [`WorkerError`], [`CohortError`], [`HookError`] |
//! | **Session**       | Handshake response record                               | [`SessionInfo`]                        |
//! | **Configuration** | Tick, join grace, bus capacity                          | [`WorkerConfig`]                       |
//!
//! ## Optional features
//! - `logging`: exports a `tracing`-backed [`LogWriter`] subscriber.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use tunnelvisor::{Cohort, HookError, WorkerConfig, WorkerHooks};
//!
//! struct Link(&'static str);
//!
//! #[async_trait]
//! impl WorkerHooks for Link {
//!     fn name(&self) -> &str { self.0 }
//!     async fn do_start(&self) -> Result<bool, HookError> { Ok(true) }
//!     async fn do_periodic_check(&self) -> Result<bool, HookError> { Ok(true) }
//!     async fn stop_imminent(&self) { println!("{}: winding down", self.0); }
//!     async fn do_stop(&self) {}
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = WorkerConfig { tick: Duration::from_millis(10), ..WorkerConfig::default() };
//!     let mut cohort = Cohort::builder(cfg)
//!         .with_worker(Arc::new(Link("ssh")))
//!         .with_worker(Arc::new(Link("vpn")))
//!         .build();
//!
//!     assert_eq!(cohort.start().await?, 2);
//!     cohort.request_stop();
//!     cohort.stop().await?;
//!     cohort.reset();
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod events;
mod hooks;
mod session;
mod subscribers;

// ---- Public re-exports ----

pub use core::{
    Cohort, CohortBuilder, DEFAULT_TICK, Latch, StopSignals, SyncSnapshot, Synchronizer, Worker,
    WorkerConfig, wait_for_termination,
};
pub use error::{CohortError, HookError, WorkerError};
pub use events::{Bus, Event, EventKind};
pub use hooks::{HooksRef, WorkerHooks};
pub use session::{ServerEntry, SessionError, SessionInfo};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
