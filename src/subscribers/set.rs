//! # Non-blocking event fan-out to multiple subscribers.
//!
//! ```text
//! emit(event)
//!     ├──► [queue 1] ──► task 1 ──► subscriber1.on_event()
//!     │    (bounded)        └─────► panic → error! + SubscriberPanicked
//!     └──► [queue N] ──► task N ──► subscriberN.on_event()
//! ```
//!
//! ## Rules
//! - **Per-subscriber FIFO**, no cross-subscriber ordering
//! - **Overflow**: event dropped for that subscriber only, `SubscriberOverflow` published
//! - **Non-blocking**: `emit()` uses `try_send`
//! - **Isolation**: a panicking subscriber keeps processing later events
//! - **No feedback loop**: a panic raised on a `SubscriberPanicked` event is logged, not re-published

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::error;

use crate::core::panic_message;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

struct Channel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for event subscribers.
pub struct SubscriberSet {
    channels: Vec<Channel>,
    tasks: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates the set and spawns one delivery task per subscriber.
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut tasks = Vec::with_capacity(subs.len());

        for sub in subs {
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
            let name = sub.name();
            let bus_for_task = bus.clone();

            tasks.push(tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(panic) = AssertUnwindSafe(fut).catch_unwind().await {
                        let info = panic_message(panic);
                        error!(subscriber = sub.name(), %info, "subscriber panicked");
                        // a panic while handling a panic report is only logged
                        if ev.kind != EventKind::SubscriberPanicked {
                            bus_for_task.publish(Event::subscriber_panicked(sub.name(), info));
                        }
                    }
                }
            }));
            channels.push(Channel { name, sender: tx });
        }
        Self {
            channels,
            tasks,
            bus,
        }
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// `true` if there are no subscribers.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Emits an event to every subscriber without waiting.
    pub fn emit(&self, event: &Event) {
        let event = Arc::new(event.clone());
        let is_overflow = matches!(event.kind, EventKind::SubscriberOverflow);

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            // never re-publish an overflow about an overflow
            if !is_overflow {
                self.bus
                    .publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Closes every queue and waits for the delivery tasks to drain.
    pub async fn shutdown(self) {
        drop(self.channels);
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            if ev.kind == EventKind::WorkerStopped {
                panic!("recorder refuses stops");
            }
            self.seen.lock().expect("lock").push(ev.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[tokio::test]
    async fn test_fan_out_survives_subscriber_panic() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let recorder = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![recorder.clone() as Arc<dyn Subscribe>], bus);
        assert_eq!(set.len(), 1);

        set.emit(&Event::new(EventKind::WorkerStarted));
        set.emit(&Event::new(EventKind::WorkerStopped));
        set.emit(&Event::new(EventKind::VoteCast));
        set.shutdown().await;

        assert_eq!(
            *recorder.seen.lock().expect("lock"),
            vec![EventKind::WorkerStarted, EventKind::VoteCast]
        );
        let ev = rx.recv().await.expect("panic event");
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.reason.as_deref(), Some("recorder refuses stops"));
    }

    struct AlwaysPanics;

    #[async_trait]
    impl Subscribe for AlwaysPanics {
        async fn on_event(&self, _ev: &Event) {
            panic!("always");
        }

        fn name(&self) -> &'static str {
            "always-panics"
        }
    }

    #[tokio::test]
    async fn test_panic_report_is_not_fed_back_into_a_panicking_subscriber() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(AlwaysPanics) as Arc<dyn Subscribe>], bus);

        set.emit(&Event::new(EventKind::ShutdownRequested));
        let report = tokio::time::timeout(std::time::Duration::from_secs(1), rx.recv())
            .await
            .expect("reported")
            .expect("panic event");
        assert_eq!(report.kind, EventKind::SubscriberPanicked);

        // what a cohort listener does with everything on the bus
        set.emit(&report);
        set.shutdown().await;

        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
    }
}
