//! # Lifecycle events emitted by workers and cohorts.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Start events**: a worker entering or declining the running state
//! - **Stop events**: why a worker left its polling loop
//! - **Cohort events**: votes and barrier outcomes of a shared [`Synchronizer`](crate::Synchronizer)
//! - **Plumbing events**: subscriber overflow/panic, OS shutdown requests
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use tunnelvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::VoteCast)
//!     .with_worker("ssh")
//!     .with_clean(true);
//!
//! assert_eq!(ev.kind, EventKind::VoteCast);
//! assert_eq!(ev.worker.as_deref(), Some("ssh"));
//! assert_eq!(ev.clean, Some(true));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Start events ===
    /// Worker task spawned; `do_start` is about to run.
    ///
    /// Sets: `worker`
    WorkerStarting,

    /// `do_start` returned `true`; the "started" latch is set.
    ///
    /// Sets: `worker`
    WorkerStarted,

    /// Stop was already requested before any hook ran.
    ///
    /// Sets: `worker`
    WorkerAborted,

    /// `do_start` returned `false`.
    ///
    /// Sets: `worker`
    StartDeclined,

    // === Stop events ===
    /// The stop-signal set was observed (clean stop).
    ///
    /// Sets: `worker`
    StopRequested,

    /// `do_periodic_check` returned `false` (self-initiated, unclean stop).
    ///
    /// Sets: `worker`
    SelfStopRequested,

    /// `do_start` or `do_periodic_check` returned an error or panicked (unclean stop).
    ///
    /// Never published after `CohortClean`.
    ///
    /// Sets: `worker`, `reason`
    HookFault,

    /// Worker ran `do_stop` and latched "stopped".
    ///
    /// Sets: `worker`, `clean`
    WorkerStopped,

    /// `Stop()` exceeded the join grace; the task was abandoned.
    ///
    /// Sets: `worker`, `grace_ms`
    GraceExceeded,

    // === Cohort events ===
    /// Worker recorded its clean/unclean vote.
    ///
    /// Sets: `worker`, `clean`
    VoteCast,

    /// Every cohort member voted clean; graceful wind-down proceeds.
    ///
    /// Sets: `worker`
    CohortClean,

    /// At least one cohort member voted unclean; wind-down is skipped.
    ///
    /// Sets: `worker`
    CohortUnclean,

    /// `stop_imminent` is about to run.
    ///
    /// Sets: `worker`
    StopImminent,

    // === Plumbing events ===
    /// OS termination signal observed by a cohort.
    ShutdownRequested,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `worker` (subscriber name), `reason`
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets: `worker` (subscriber name), `reason`
    SubscriberPanicked,
}

/// Lifecycle event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the worker (or subscriber), if applicable.
    pub worker: Option<Arc<str>>,
    /// Human-readable reason (fault details, overflow reason, etc.).
    pub reason: Option<Arc<str>>,
    /// Clean/unclean flag for votes and stop outcomes.
    pub clean: Option<bool>,
    /// Join grace in milliseconds (compact).
    pub grace_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            reason: None,
            clean: None,
            grace_ms: None,
        }
    }

    /// Attaches a worker name.
    #[inline]
    pub fn with_worker(mut self, worker: impl Into<Arc<str>>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a clean/unclean flag.
    #[inline]
    pub fn with_clean(mut self, clean: bool) -> Self {
        self.clean = Some(clean);
        self
    }

    /// Attaches a grace duration (stored as milliseconds).
    #[inline]
    pub fn with_grace(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.grace_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_worker(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_worker(subscriber)
            .with_reason(info)
    }
}
