//! Lifecycle events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: worker trampolines, `Worker::stop`, `Cohort`, `SubscriberSet`
//!   workers (overflow/panic).
//! - **Consumers**: the cohort listener, which fans out to its `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
