//! # Worker: one background task with a managed start/stop lifecycle.
//!
//! A [`Worker`] owns its task handle, the "started"/"stopped" latches and the
//! stop-signal set. Worker-specific logic plugs in through [`WorkerHooks`].
//!
//! ## States
//! ```text
//!            start() ──► running ──► stop() ──► idle
//!   idle ──┤
//!            start() ──► failed (declined / aborted) ──► idle
//! ```
//!
//! ## Rules
//! - `start` must not be called while a task handle is held (programming error)
//! - `stop` is idempotent and safe on a worker that never started
//! - after `start` returns, "started" and "stopped" are never both unset
//! - the stop-signal set holds the internal flag and the external flag given to `start`

use std::sync::Arc;
use std::time::Duration;

use tokio::{runtime::Handle, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    core::{
        config::WorkerConfig,
        signals::{Latch, StopSignals},
        synch::Synchronizer,
        trampoline::Trampoline,
    },
    error::WorkerError,
    events::{Bus, Event, EventKind},
    hooks::{HooksRef, WorkerHooks},
};

/// Managed background worker.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use tunnelvisor::{HookError, Worker, WorkerConfig, WorkerHooks};
///
/// struct Idle;
///
/// #[async_trait]
/// impl WorkerHooks for Idle {
///     fn name(&self) -> &str { "idle" }
///     async fn do_start(&self) -> Result<bool, HookError> { Ok(true) }
///     async fn do_periodic_check(&self) -> Result<bool, HookError> { Ok(true) }
///     async fn do_stop(&self) {}
/// }
///
/// # async fn demo() -> Result<(), tunnelvisor::WorkerError> {
/// let stop = CancellationToken::new();
/// let mut worker = Worker::new(Arc::new(Idle), WorkerConfig::default());
///
/// assert!(worker.start(&stop, None).await?);
/// assert!(worker.is_running());
///
/// stop.cancel();
/// worker.stop().await?;
/// assert!(!worker.is_running());
/// # Ok(())
/// # }
/// ```
pub struct Worker {
    hooks: HooksRef,
    cfg: WorkerConfig,
    bus: Bus,
    started: Latch,
    stopped: Latch,
    signals: Option<StopSignals>,
    synch: Option<Arc<Synchronizer>>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Creates an idle worker with a private event bus.
    pub fn new(hooks: HooksRef, cfg: WorkerConfig) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Self::with_bus(hooks, cfg, bus)
    }

    /// Creates an idle worker publishing lifecycle events to `bus`.
    pub fn with_bus(hooks: HooksRef, cfg: WorkerConfig, bus: Bus) -> Self {
        Self {
            hooks,
            cfg,
            bus,
            started: Latch::new(false),
            stopped: Latch::new(true),
            signals: None,
            synch: None,
            handle: None,
        }
    }

    /// Worker name, as reported by its hooks.
    pub fn name(&self) -> &str {
        self.hooks.name()
    }

    /// The hooks this worker drives.
    pub fn hooks(&self) -> &Arc<dyn WorkerHooks> {
        &self.hooks
    }

    /// Starts the worker task.
    ///
    /// Returns `Ok(true)` once `do_start` succeeded, `Ok(false)` if the worker
    /// stopped first (declined, faulted, or stop already requested). In the
    /// `Ok(false)` and `Err` cases the worker has been stopped again and is idle.
    ///
    /// # Panics
    /// If the worker is already running.
    pub async fn start(
        &mut self,
        external: &CancellationToken,
        synch: Option<Arc<Synchronizer>>,
    ) -> Result<bool, WorkerError> {
        assert!(
            self.handle.is_none(),
            "Worker::start called while worker {} is running",
            self.name()
        );

        self.started.reset();
        self.stopped.reset();

        let signals = StopSignals::new(Some(external.clone()));
        self.signals = Some(signals.clone());
        self.synch = synch.clone();

        if signals.is_set() {
            debug!(worker = %self.name(), "stop requested before spawn; aborting start");
            self.bus
                .publish(Event::new(EventKind::WorkerAborted).with_worker(self.name()));
            self.stopped.set();
            self.stop().await?;
            return Ok(false);
        }

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                self.stopped.set();
                self.stop().await?;
                return Err(WorkerError::Spawn {
                    worker: self.name().to_string(),
                    error: e.to_string(),
                });
            }
        };

        let trampoline = Trampoline {
            hooks: Arc::clone(&self.hooks),
            signals,
            synch,
            started: self.started.clone(),
            stopped: self.stopped.clone(),
            tick: self.cfg.tick_clamped(),
            bus: self.bus.clone(),
        };
        self.handle = Some(runtime.spawn(trampoline.run()));

        let outcome = tokio::select! {
            res = self.started.wait() => res,
            res = self.stopped.wait() => res,
        };
        if let Err(e) = outcome {
            self.stop().await?;
            return Err(WorkerError::Signal {
                worker: self.name().to_string(),
                error: e.to_string(),
            });
        }

        // both may be set by now; "started" wins, as it fired first
        let started = self.started.is_set();
        if !started {
            self.stop().await?;
        }
        Ok(started)
    }

    /// Stops the worker and waits for its task to exit.
    ///
    /// Idempotent. With a non-zero [`WorkerConfig::join_grace`] the wait is
    /// bounded; on expiry the task is abandoned and
    /// [`WorkerError::GraceExceeded`] is returned.
    pub async fn stop(&mut self) -> Result<(), WorkerError> {
        if let Some(signals) = &self.signals {
            signals.request_stop();
        }

        let res = match self.handle.take() {
            Some(handle) => self.join(handle).await,
            None => Ok(()),
        };
        if matches!(res, Err(WorkerError::GraceExceeded { .. })) {
            // the abandoned task still holds the old latches
            self.started = Latch::new(false);
            self.stopped = Latch::new(true);
        }

        self.signals = None;
        self.synch = None;
        res
    }

    /// `true` iff "started" fired and "stopped" has not. A snapshot only.
    pub fn is_running(&self) -> bool {
        self.started.is_set() && !self.stopped.is_set()
    }

    /// `true` when no task handle is held (never started, or fully stopped).
    pub fn is_idle(&self) -> bool {
        self.handle.is_none()
    }

    /// The "stopped" latch, for waiting on several workers at once.
    pub fn stopped_signal(&self) -> Latch {
        self.stopped.clone()
    }

    /// The "started" latch.
    pub fn started_signal(&self) -> Latch {
        self.started.clone()
    }

    async fn join(&self, mut handle: JoinHandle<()>) -> Result<(), WorkerError> {
        let Some(grace) = self.cfg.join_grace() else {
            if let Err(e) = handle.await {
                warn!(worker = %self.name(), error = %e, "worker task ended abnormally");
            }
            return Ok(());
        };

        match time::timeout(grace, &mut handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!(worker = %self.name(), error = %e, "worker task ended abnormally");
                Ok(())
            }
            Err(_elapsed) => {
                handle.abort();
                self.stopped.set();
                self.publish_grace_exceeded(grace);
                Err(WorkerError::GraceExceeded {
                    worker: self.name().to_string(),
                    grace,
                })
            }
        }
    }

    fn publish_grace_exceeded(&self, grace: Duration) {
        warn!(worker = %self.name(), ?grace, "join grace exceeded; abandoning worker task");
        self.bus.publish(
            Event::new(EventKind::GraceExceeded)
                .with_worker(self.name())
                .with_grace(grace),
        );
    }
}

impl Drop for Worker {
    /// Requests stop without joining; the task winds down on its own.
    fn drop(&mut self) {
        if self.handle.is_some() {
            if let Some(signals) = &self.signals {
                signals.request_stop();
            }
            warn!(worker = %self.name(), "worker dropped while running; stop requested without join");
        }
    }
}
