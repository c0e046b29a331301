use std::sync::Arc;

use crate::{
    core::{cohort::Cohort, config::WorkerConfig},
    events::Bus,
    hooks::HooksRef,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Cohort`].
pub struct CohortBuilder {
    cfg: WorkerConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    workers: Vec<HooksRef>,
}

impl CohortBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: WorkerConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            workers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds a worker to the cohort.
    pub fn with_worker(mut self, hooks: HooksRef) -> Self {
        self.workers.push(hooks);
        self
    }

    /// Builds the cohort: event bus, subscriber tasks and idle workers.
    ///
    /// Must be called inside a tokio runtime.
    pub fn build(self) -> Cohort {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));

        let mut cohort = Cohort::new_internal(self.cfg, bus, subs);
        for hooks in self.workers {
            cohort.add(hooks);
        }
        cohort
    }
}
