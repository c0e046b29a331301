//! # Worker extension hooks.
//!
//! - [`WorkerHooks`] - the four points where transport-specific logic plugs into a worker
//! - [`HooksRef`] - shared handle (`Arc<dyn WorkerHooks>`)

mod contract;

pub use contract::{HooksRef, WorkerHooks};
