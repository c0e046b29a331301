//! # Handshake session record.
//!
//! The handshake response is parsed once into an immutable [`SessionInfo`] that a
//! worker's `do_start` consumes as configuration. The lifecycle core treats it as
//! opaque.

mod info;

pub use info::{ServerEntry, SessionError, SessionInfo};
