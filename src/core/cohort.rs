//! # Cohort: workers that start together and shut down together.
//!
//! A [`Cohort`] owns the external stop flag, one shared [`Synchronizer`], the
//! event bus and the subscriber fan-out. It is the controller side of the
//! worker lifecycle.
//!
//! ## Architecture
//! ```text
//! Cohort::start()
//!   └─► for each worker: Worker::start(&stop, Some(synch))
//!
//! Cohort::run_until_shutdown()
//!   ├─ OS termination signal ──┐
//!   └─ any worker stopped ─────┴─► request_stop() ─► stop() ─► Worker::stop() for each
//!
//! Event flow:
//!   trampolines ── publish ──► Bus ──► listener ──► SubscriberSet::emit
//!   (the listener ends when the cohort is dropped)
//!
//! Between generations:
//!   Cohort::reset() ─► Synchronizer::reset() + fresh stop token
//! ```

use std::sync::Arc;

use futures::future::select_all;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{
    core::{
        builder::CohortBuilder, config::WorkerConfig, shutdown, synch::Synchronizer,
        worker::Worker,
    },
    error::{CohortError, WorkerError},
    events::{Bus, Event, EventKind},
    hooks::HooksRef,
    subscribers::SubscriberSet,
};

/// Controller for one cohort of workers.
pub struct Cohort {
    cfg: WorkerConfig,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    synch: Arc<Synchronizer>,
    stop: CancellationToken,
    listener: CancellationToken,
    workers: Vec<Worker>,
}

impl Cohort {
    /// Returns a builder for a cohort using `cfg`.
    pub fn builder(cfg: WorkerConfig) -> CohortBuilder {
        CohortBuilder::new(cfg)
    }

    pub(crate) fn new_internal(cfg: WorkerConfig, bus: Bus, subs: Arc<SubscriberSet>) -> Self {
        let cohort = Self {
            cfg,
            bus,
            subs,
            synch: Arc::new(Synchronizer::new()),
            stop: CancellationToken::new(),
            listener: CancellationToken::new(),
            workers: Vec::new(),
        };
        cohort.subscriber_listener();
        cohort
    }

    /// Forwards bus events to the subscriber set until the cohort is dropped.
    fn subscriber_listener(&self) {
        if self.subs.is_empty() {
            return;
        }
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        let done = self.listener.clone();
        tokio::spawn(async move {
            use tokio::sync::broadcast::error::RecvError;
            loop {
                tokio::select! {
                    _ = done.cancelled() => break,
                    res = rx.recv() => match res {
                        Ok(ev) => set.emit(&ev),
                        Err(RecvError::Lagged(n)) => warn!(skipped = n, "event listener lagged"),
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        });
    }

    /// Adds a worker. Only valid while the cohort is idle.
    pub fn add(&mut self, hooks: HooksRef) {
        let worker = Worker::with_bus(hooks, self.cfg.clone(), self.bus.clone());
        self.workers.push(worker);
    }

    /// The event bus shared by every worker.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// The shared synchronizer.
    pub fn synchronizer(&self) -> &Arc<Synchronizer> {
        &self.synch
    }

    /// The external stop flag handed to every worker.
    pub fn stop_token(&self) -> &CancellationToken {
        &self.stop
    }

    /// The workers, in insertion order.
    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    /// Starts every worker with the shared synchronizer.
    ///
    /// Returns how many workers reported started. A worker that declines or
    /// aborts stays idle (and its unclean vote makes the cohort skip the
    /// graceful wind-down). A spawn or signal failure stops the whole cohort and
    /// is returned.
    pub async fn start(&mut self) -> Result<usize, CohortError> {
        let mut started = 0;
        for i in 0..self.workers.len() {
            let synch = Some(Arc::clone(&self.synch));
            match self.workers[i].start(&self.stop, synch).await {
                Ok(true) => started += 1,
                Ok(false) => {}
                Err(e) => {
                    self.request_stop();
                    if let Err(stop_err) = self.stop().await {
                        warn!(error = %stop_err, "cohort stop after failed start");
                    }
                    return Err(e.into());
                }
            }
        }
        Ok(started)
    }

    /// Sets the external stop flag. Workers notice it within one tick.
    pub fn request_stop(&self) {
        self.stop.cancel();
    }

    /// Returns the number of workers currently running.
    pub fn running(&self) -> usize {
        self.workers.iter().filter(|w| w.is_running()).count()
    }

    /// Completes when any worker latches "stopped". Immediate if there are none.
    pub async fn wait_any_stopped(&self) {
        if self.workers.is_empty() {
            return;
        }
        let latches: Vec<_> = self.workers.iter().map(Worker::stopped_signal).collect();
        let waits = latches.iter().map(|latch| Box::pin(latch.wait()));
        let _ = select_all(waits).await;
    }

    /// Runs until an OS termination signal arrives or any worker stops, then
    /// stops the whole cohort.
    pub async fn run_until_shutdown(&mut self) -> Result<(), CohortError> {
        tokio::select! {
            res = shutdown::wait_for_termination() => {
                if let Err(e) = res {
                    warn!(error = %e, "signal registration failed; stopping cohort");
                }
                self.bus.publish(Event::new(EventKind::ShutdownRequested));
            }
            _ = self.wait_any_stopped() => {}
        }
        self.request_stop();
        self.stop().await
    }

    /// Stops every worker.
    ///
    /// Workers that exceed the join grace are abandoned and reported together.
    pub async fn stop(&mut self) -> Result<(), CohortError> {
        let mut stuck = Vec::new();
        let mut first_err = None;

        for worker in &mut self.workers {
            match worker.stop().await {
                Ok(()) => {}
                Err(WorkerError::GraceExceeded { worker, .. }) => stuck.push(worker),
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }

        if !stuck.is_empty() {
            return Err(CohortError::GraceExceeded {
                grace: self.cfg.join_grace,
                stuck,
            });
        }
        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Prepares the cohort for its next generation.
    ///
    /// # Panics
    /// If any worker has not been stopped.
    pub fn reset(&mut self) {
        assert!(
            self.workers.iter().all(Worker::is_idle),
            "Cohort::reset called before every worker was stopped"
        );
        self.synch.reset();
        self.stop = CancellationToken::new();
    }
}

impl Drop for Cohort {
    /// Ends the subscriber listener; subscriber tasks exit once their queues close.
    fn drop(&mut self) {
        self.listener.cancel();
    }
}
