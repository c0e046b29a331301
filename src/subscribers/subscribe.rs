//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for observing worker lifecycle events.
//! Each subscriber is driven by a dedicated task fed by a bounded queue owned
//! by the [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow; they never block workers or other subscribers.
//! - On queue overflow, events for that subscriber are **dropped** and a
//!   `SubscriberOverflow` event is published.

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tunnelvisor::{Event, EventKind, Subscribe};
///
/// struct FaultCounter;
///
/// #[async_trait]
/// impl Subscribe for FaultCounter {
///     async fn on_event(&self, ev: &Event) {
///         if ev.kind == EventKind::HookFault {
///             // bump a counter...
///         }
///     }
///     fn name(&self) -> &'static str { "fault-counter" }
/// }
/// ```
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles a single event.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
