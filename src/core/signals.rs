//! # Stop-signal set and lifecycle latches.
//!
//! [`StopSignals`] is the ordered set of cancellation tokens whose disjunction
//! means "this worker must stop":
//! ```text
//! [0] internal  (owned by the worker, cancelled by Worker::stop)
//! [1] external  (owned by the controller, optional)
//! ```
//!
//! [`Latch`] is a manual-reset boolean observable from any task, used for the
//! "started" and "stopped" signals of a worker.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Ordered set of stop flags: the worker's own flag first, then the controller's.
#[derive(Clone, Debug)]
pub struct StopSignals {
    internal: CancellationToken,
    external: Option<CancellationToken>,
}

impl StopSignals {
    /// Creates a set with a fresh internal flag and an optional external one.
    pub fn new(external: Option<CancellationToken>) -> Self {
        Self {
            internal: CancellationToken::new(),
            external,
        }
    }

    /// Sets the internal flag. Only the owning worker calls this.
    pub fn request_stop(&self) {
        self.internal.cancel();
    }

    /// Returns `true` if any flag in the set is set.
    pub fn is_set(&self) -> bool {
        self.flags().any(CancellationToken::is_cancelled)
    }

    /// Completes as soon as any flag in the set is set.
    pub async fn cancelled(&self) {
        match &self.external {
            Some(external) => {
                tokio::select! {
                    _ = self.internal.cancelled() => {}
                    _ = external.cancelled() => {}
                }
            }
            None => self.internal.cancelled().await,
        }
    }

    /// Iterates over the flags in order (internal first).
    pub fn flags(&self) -> impl Iterator<Item = &CancellationToken> {
        std::iter::once(&self.internal).chain(self.external.as_ref())
    }

    /// Number of flags in the set (1 or 2).
    pub fn len(&self) -> usize {
        1 + usize::from(self.external.is_some())
    }

    /// Always `false`: the internal flag is always present.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Manual-reset latch.
///
/// Cloning yields another handle to the same latch.
#[derive(Clone, Debug)]
pub struct Latch {
    tx: Arc<watch::Sender<bool>>,
}

impl Latch {
    /// Creates a latch in the given initial state.
    pub fn new(initial: bool) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Sets the latch, waking every waiter.
    pub fn set(&self) {
        self.tx.send_replace(true);
    }

    /// Clears the latch.
    pub fn reset(&self) {
        self.tx.send_replace(false);
    }

    /// Snapshot of the latch state.
    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Waits until the latch is set. Returns immediately if it already is.
    pub async fn wait(&self) -> Result<(), watch::error::RecvError> {
        let mut rx = self.tx.subscribe();
        rx.wait_for(|set| *set).await?;
        Ok(())
    }
}
