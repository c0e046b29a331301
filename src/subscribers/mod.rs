//! # Event subscribers.
//!
//! ```text
//! Worker trampoline ── publish(Event) ──► Bus ──► cohort listener ──► SubscriberSet::emit
//!                                                                   ┌────────┼────────┐
//!                                                                   ▼        ▼        ▼
//!                                                               LogWriter  Metrics  Custom
//! ```
//!
//! - [`Subscribe`] - extension trait
//! - [`SubscriberSet`] - bounded, panic-isolated fan-out
//! - `LogWriter` - `tracing` printer (feature `logging`)

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
