//! # LogWriter - event printer backed by `tracing`
//!
//! ## Example output
//! ```text
//! INFO tunnelvisor: [started] worker="ssh"
//! INFO tunnelvisor: [vote] worker="ssh" clean=true
//! INFO tunnelvisor: [cohort-clean] worker="ssh"
//! INFO tunnelvisor: [stopped] worker="ssh" clean=true
//! WARN tunnelvisor: [fault] worker="vpn" reason="connection refused"
//! ```

use async_trait::async_trait;
use tracing::{info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let worker = e.worker.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::WorkerStarting => info!("[starting] worker={worker:?}"),
            EventKind::WorkerStarted => info!("[started] worker={worker:?}"),
            EventKind::WorkerAborted => info!("[aborted] worker={worker:?}"),
            EventKind::StartDeclined => info!("[start-declined] worker={worker:?}"),
            EventKind::StopRequested => info!("[stop-requested] worker={worker:?}"),
            EventKind::SelfStopRequested => info!("[self-stop] worker={worker:?}"),
            EventKind::HookFault => {
                warn!("[fault] worker={worker:?} reason={:?}", e.reason);
            }
            EventKind::VoteCast => info!("[vote] worker={worker:?} clean={:?}", e.clean),
            EventKind::CohortClean => info!("[cohort-clean] worker={worker:?}"),
            EventKind::CohortUnclean => info!("[cohort-unclean] worker={worker:?}"),
            EventKind::StopImminent => info!("[stop-imminent] worker={worker:?}"),
            EventKind::WorkerStopped => info!("[stopped] worker={worker:?} clean={:?}", e.clean),
            EventKind::GraceExceeded => {
                warn!("[grace-exceeded] worker={worker:?} grace_ms={:?}", e.grace_ms);
            }
            EventKind::ShutdownRequested => info!("[shutdown-requested]"),
            EventKind::SubscriberOverflow => {
                warn!("[subscriber-overflow] subscriber={worker} reason={:?}", e.reason);
            }
            EventKind::SubscriberPanicked => {
                warn!("[subscriber-panicked] subscriber={worker} info={:?}", e.reason);
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
