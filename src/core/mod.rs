//! Runtime core: worker lifecycle and cohort coordination.
//!
//! Internal modules:
//! - [`signals`]: stop-signal set and started/stopped latches;
//! - [`worker`]: `Start`/`Stop`/`IsRunning` of a single worker;
//! - [`trampoline`]: the body of a spawned worker task;
//! - [`synch`]: two-phase shutdown barrier shared by a cohort;
//! - [`cohort`]: controller that starts and stops a cohort together;
//! - [`shutdown`]: cross-platform termination signal handling.

mod builder;
mod cohort;
mod config;
mod shutdown;
mod signals;
mod synch;
mod trampoline;
mod worker;

pub use builder::CohortBuilder;
pub use cohort::Cohort;
pub use config::{DEFAULT_TICK, WorkerConfig};
pub use shutdown::wait_for_termination;
pub use signals::{Latch, StopSignals};
pub use synch::{SyncSnapshot, Synchronizer};
pub use worker::Worker;

pub(crate) use trampoline::panic_message;
