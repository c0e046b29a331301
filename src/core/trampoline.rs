//! # Trampoline: the body of a spawned worker task.
//!
//! Sequences hook calls, the polling loop and cohort barrier participation.
//!
//! ## Flow
//! ```text
//! synch.thread_starting()
//! ├─ stop already requested ─────────────────────────► clean = false (abort)
//! ├─ do_start() ── Ok(true) ─► started.set()
//! │             └─ Ok(false) / Err / panic ──────────► clean = false
//! └─ loop every tick:
//!      ├─ stop-signal set ───────────────────────────► clean = true
//!      └─ do_periodic_check() ── Ok(false) / Err / panic ─► clean = false
//!
//! synch.thread_stopping_cleanly(clean)
//! if synch.block_until_all_threads_stopping_cleanly():
//!      stop_imminent(); synch.thread_ready_for_stop(); synch.block_until_all_threads_ready_to_stop()
//! do_stop()
//! stopped.set()
//! ```
//!
//! ## Rules
//! - No panic escapes the task; `do_start`/`do_periodic_check` panics become unclean stops
//! - `stop_imminent`/`do_stop` panics are logged only, the vote is already cast
//! - "stopped" is latched on every exit path, including abandonment (drop guard)
//! - A cohort member always votes, so peers never wait on it forever

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time;
use tracing::{debug, warn};

use crate::{
    core::{
        signals::{Latch, StopSignals},
        synch::Synchronizer,
    },
    events::{Bus, Event, EventKind},
    hooks::HooksRef,
};

/// Everything a worker task needs, moved onto the task at spawn time.
pub(crate) struct Trampoline {
    pub hooks: HooksRef,
    pub signals: StopSignals,
    pub synch: Option<Arc<Synchronizer>>,
    pub started: Latch,
    pub stopped: Latch,
    pub tick: Duration,
    pub bus: Bus,
}

/// Sets "stopped" when dropped, whether the task finished or was aborted.
struct StoppedGuard(Latch);

impl Drop for StoppedGuard {
    fn drop(&mut self) {
        self.0.set();
    }
}

impl Trampoline {
    /// Runs the worker to completion.
    pub async fn run(self) {
        let stopped = StoppedGuard(self.stopped.clone());
        let name: Arc<str> = Arc::from(self.hooks.name());

        if let Some(synch) = &self.synch {
            synch.thread_starting();
        }

        let clean = match AssertUnwindSafe(self.drive(&name)).catch_unwind().await {
            Ok(clean) => clean,
            Err(panic) => {
                self.fault(&name, panic_message(panic));
                false
            }
        };

        if let Some(synch) = &self.synch {
            self.rendezvous(synch, &name, clean).await;
        }

        if let Err(panic) = AssertUnwindSafe(self.hooks.do_stop()).catch_unwind().await {
            warn!(worker = %name, info = %panic_message(panic), "do_stop panicked");
        }

        drop(stopped);
        self.publish(EventKind::WorkerStopped, &name, |ev| ev.with_clean(clean));
    }

    /// Start hook plus polling loop. Returns whether the stop was clean.
    async fn drive(&self, name: &Arc<str>) -> bool {
        if self.signals.is_set() {
            debug!(worker = %name, "stop requested before start; aborting");
            self.publish(EventKind::WorkerAborted, name, |ev| ev);
            return false;
        }

        self.publish(EventKind::WorkerStarting, name, |ev| ev);
        match self.hooks.do_start().await {
            Ok(true) => {
                self.started.set();
                self.publish(EventKind::WorkerStarted, name, |ev| ev);
            }
            Ok(false) => {
                debug!(worker = %name, "do_start returned false");
                self.publish(EventKind::StartDeclined, name, |ev| ev);
                return false;
            }
            Err(e) => {
                self.fault(name, e.to_string());
                return false;
            }
        }

        loop {
            tokio::select! {
                _ = time::sleep(self.tick) => {}
                _ = self.signals.cancelled() => {}
            }

            if self.signals.is_set() {
                debug!(worker = %name, "stop signal observed");
                self.publish(EventKind::StopRequested, name, |ev| ev);
                return true;
            }

            match self.hooks.do_periodic_check().await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(worker = %name, "do_periodic_check returned false");
                    self.publish(EventKind::SelfStopRequested, name, |ev| ev);
                    return false;
                }
                Err(e) => {
                    self.fault(name, e.to_string());
                    return false;
                }
            }
        }
    }

    /// Votes, then takes part in the two barrier phases if the cohort is clean.
    async fn rendezvous(&self, synch: &Synchronizer, name: &Arc<str>, clean: bool) {
        synch.thread_stopping_cleanly(clean);
        self.publish(EventKind::VoteCast, name, |ev| ev.with_clean(clean));

        debug!(worker = %name, "waiting for all workers to indicate clean stop");
        if !synch.block_until_all_threads_stopping_cleanly().await {
            debug!(worker = %name, "cohort has an unclean stop; skipping wind-down");
            self.publish(EventKind::CohortUnclean, name, |ev| ev);
            return;
        }
        self.publish(EventKind::CohortClean, name, |ev| ev);

        self.publish(EventKind::StopImminent, name, |ev| ev);
        // HookFault is never published after CohortClean
        if let Err(panic) = AssertUnwindSafe(self.hooks.stop_imminent())
            .catch_unwind()
            .await
        {
            warn!(worker = %name, info = %panic_message(panic), "stop_imminent panicked");
        }

        debug!(worker = %name, "waiting for all workers to indicate ready to stop");
        synch.thread_ready_for_stop();
        synch.block_until_all_threads_ready_to_stop().await;
    }

    fn fault(&self, name: &Arc<str>, reason: String) {
        warn!(worker = %name, %reason, "hook fault");
        self.publish(EventKind::HookFault, name, |ev| ev.with_reason(reason));
    }

    fn publish(&self, kind: EventKind, name: &Arc<str>, f: impl FnOnce(Event) -> Event) {
        self.bus
            .publish(f(Event::new(kind).with_worker(Arc::clone(name))));
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
