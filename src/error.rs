//! Error types used by workers, cohorts and worker hooks.
//!
//! This module defines three error enums:
//!
//! - [`WorkerError`] - failures of the lifecycle machinery itself (spawn, signal wait, join grace).
//! - [`CohortError`] - failures observed while driving a whole cohort.
//! - [`HookError`] - faults raised by worker-specific hooks.
//!
//! `WorkerError` and `CohortError` provide helper methods (`as_label`, `as_message`)
//! for logging/metrics, mirroring each other.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the worker lifecycle.
///
/// Cooperative stops are never errors. Only failures to acquire the execution
/// unit or its signals, and an exceeded join grace, surface to the controller.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WorkerError {
    /// The execution task could not be spawned (no runtime available).
    #[error("worker {worker}: spawn failed ({error})")]
    Spawn {
        /// Name of the worker that failed to start.
        worker: String,
        /// Underlying diagnostic message.
        error: String,
    },

    /// Waiting on a lifecycle signal failed.
    #[error("worker {worker}: signal wait failed ({error})")]
    Signal {
        /// Name of the worker.
        worker: String,
        /// Underlying diagnostic message.
        error: String,
    },

    /// The worker task did not exit within the configured join grace and was abandoned.
    #[error("worker {worker}: join grace {grace:?} exceeded; task abandoned")]
    GraceExceeded {
        /// Name of the worker.
        worker: String,
        /// The configured grace duration.
        grace: Duration,
    },
}

impl WorkerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tunnelvisor::WorkerError;
    ///
    /// let err = WorkerError::Spawn { worker: "ssh".into(), error: "no runtime".into() };
    /// assert_eq!(err.as_label(), "worker_spawn_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Spawn { .. } => "worker_spawn_failed",
            WorkerError::Signal { .. } => "worker_signal_failed",
            WorkerError::GraceExceeded { .. } => "worker_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            WorkerError::Spawn { worker, error } => format!("spawn {worker}: {error}"),
            WorkerError::Signal { worker, error } => format!("signal {worker}: {error}"),
            WorkerError::GraceExceeded { worker, grace } => {
                format!("grace exceeded for {worker} after {grace:?}")
            }
        }
    }
}

/// # Errors produced while driving a cohort.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CohortError {
    /// Some workers did not stop within the join grace and were abandoned.
    #[error("cohort stop grace {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of the workers that were abandoned.
        stuck: Vec<String>,
    },

    /// A worker failed to start or stop.
    #[error(transparent)]
    Worker(#[from] WorkerError),
}

impl CohortError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            CohortError::GraceExceeded { .. } => "cohort_grace_exceeded",
            CohortError::Worker(e) => e.as_label(),
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            CohortError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck workers={stuck:?}")
            }
            CohortError::Worker(e) => e.as_message(),
        }
    }
}

/// # Faults raised by worker hooks.
///
/// Any `Err` returned from [`WorkerHooks::do_start`](crate::WorkerHooks::do_start) or
/// [`WorkerHooks::do_periodic_check`](crate::WorkerHooks::do_periodic_check) ends the
/// worker with an unclean stop. It never reaches the controller directly.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HookError {
    /// Worker-specific failure.
    #[error("hook failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Transport I/O failure.
    #[error("hook i/o: {0}")]
    Io(#[from] std::io::Error),
}

impl HookError {
    /// Shorthand for [`HookError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        HookError::Fail {
            error: error.into(),
        }
    }
}
