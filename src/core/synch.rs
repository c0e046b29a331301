//! # Cohort synchronizer: a two-phase shutdown barrier.
//!
//! Workers sharing one [`Synchronizer`] either all wind down gracefully together,
//! or, if even one of them cannot stop cleanly, all skip straight to cleanup.
//!
//! ## Flow
//! ```text
//! thread_starting()                         started += 1
//!        ...worker loop...
//! thread_stopping_cleanly(vote)             votes.push(vote)
//! block_until_all_threads_stopping_cleanly()
//!   ├─ any vote == false ──► false          (early exit, wakes every waiter)
//!   └─ votes.len() == started ──► true
//!        │
//!        ├─► stop_imminent()
//!        ├─► thread_ready_for_stop()        ready += 1
//!        └─► block_until_all_threads_ready_to_stop()
//!               └─ ready == started ──► release
//! ```
//!
//! ## Rules
//! - `votes.len() <= started` and `ready_to_stop <= started` at all times
//! - Every mutation happens under the state lock and broadcasts to waiters,
//!   so an unclean vote releases the "all clean" barrier immediately
//! - `reset()` is only valid between cohort generations

use tokio::sync::watch;
use tracing::error;

/// Observable state of a [`Synchronizer`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncSnapshot {
    /// Number of workers that registered with `thread_starting`.
    pub started: usize,
    /// Number of workers that reported `thread_ready_for_stop`.
    pub ready_to_stop: usize,
    /// Clean/unclean votes in arrival order.
    pub votes: Vec<bool>,
}

impl SyncSnapshot {
    fn any_unclean(&self) -> bool {
        self.votes.iter().any(|clean| !clean)
    }
}

/// Shared barrier for one cohort of workers.
///
/// Share it as `Arc<Synchronizer>` and hand it to every worker at start time.
#[derive(Debug)]
pub struct Synchronizer {
    state: watch::Sender<SyncSnapshot>,
}

impl Synchronizer {
    /// Creates an empty synchronizer.
    pub fn new() -> Self {
        let (state, _rx) = watch::channel(SyncSnapshot::default());
        Self { state }
    }

    /// Clears all counters and votes for the next cohort generation.
    pub fn reset(&self) {
        self.state.send_replace(SyncSnapshot::default());
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> SyncSnapshot {
        self.state.borrow().clone()
    }

    /// Registers one more running worker.
    pub fn thread_starting(&self) {
        self.state.send_modify(|s| s.started += 1);
    }

    /// Records a worker's clean/unclean vote.
    ///
    /// Recording more votes than started workers is a programming error.
    pub fn thread_stopping_cleanly(&self, clean: bool) {
        let accepted = self.state.send_if_modified(|s| {
            if s.votes.len() >= s.started {
                return false;
            }
            s.votes.push(clean);
            true
        });
        if !accepted {
            error!(clean, "cohort invariant violated: more votes than started workers");
        }
        debug_assert!(accepted, "more votes than started workers");
    }

    /// Waits until every started worker voted, or until any vote is unclean.
    ///
    /// Returns `true` only if all recorded votes are clean.
    pub async fn block_until_all_threads_stopping_cleanly(&self) -> bool {
        let mut rx = self.state.subscribe();
        match rx
            .wait_for(|s| s.any_unclean() || s.votes.len() == s.started)
            .await
        {
            Ok(s) => !s.any_unclean(),
            Err(_) => false,
        }
    }

    /// Records that a worker finished its graceful wind-down.
    ///
    /// Reporting more than the started count is a programming error.
    pub fn thread_ready_for_stop(&self) {
        let accepted = self.state.send_if_modified(|s| {
            if s.ready_to_stop >= s.started {
                return false;
            }
            s.ready_to_stop += 1;
            true
        });
        if !accepted {
            error!("cohort invariant violated: more ready reports than started workers");
        }
        debug_assert!(accepted, "more ready reports than started workers");
    }

    /// Waits until every started worker reported ready. No early exit.
    pub async fn block_until_all_threads_ready_to_stop(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|s| s.ready_to_stop == s.started).await;
    }
}

impl Default for Synchronizer {
    fn default() -> Self {
        Self::new()
    }
}
