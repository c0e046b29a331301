//! # Worker runtime configuration.
//!
//! Provides [`WorkerConfig`] shared settings for workers and cohorts.
//!
//! ## Sentinel values
//! - `join_grace = 0s` → `Stop()` waits for the worker task without bound
//! - `tick` below 1ms is clamped to 1ms
//! - `bus_capacity` below 1 is clamped to 1

use std::time::Duration;

/// Default polling interval of the worker loop.
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Configuration for workers and cohorts.
///
/// ## Field semantics
/// - `tick`: polling interval of the worker loop (default 100ms)
/// - `join_grace`: bound on the join performed by `Stop()` (`0s` = unbounded)
/// - `bus_capacity`: event bus ring buffer size (min 1)
///
/// ## Notes
/// All fields are public. Prefer the accessors to avoid sprinkling sentinel
/// checks across the codebase.
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Interval between stop-signal checks and `do_periodic_check` calls.
    pub tick: Duration,

    /// Maximum time `Stop()` waits for the worker task to exit.
    ///
    /// - `Duration::ZERO` = wait forever (a hook that never returns hangs `Stop()`)
    /// - `> 0` = on expiry the task is aborted, "stopped" is latched and
    ///   `WorkerError::GraceExceeded` is returned. `do_stop` is not run in that case.
    pub join_grace: Duration,

    /// Capacity of the event bus broadcast channel.
    pub bus_capacity: usize,
}

impl WorkerConfig {
    /// Returns the polling interval, clamped to at least 1ms.
    #[inline]
    pub fn tick_clamped(&self) -> Duration {
        self.tick.max(Duration::from_millis(1))
    }

    /// Returns the join grace as an `Option`.
    ///
    /// - `None` → unbounded join
    /// - `Some(d)` → bounded join with forced abandon
    #[inline]
    pub fn join_grace(&self) -> Option<Duration> {
        if self.join_grace == Duration::ZERO {
            None
        } else {
            Some(self.join_grace)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for WorkerConfig {
    /// Default configuration:
    ///
    /// - `tick = 100ms`
    /// - `join_grace = 0s` (unbounded)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            join_grace: Duration::ZERO,
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = WorkerConfig::default();
        assert_eq!(cfg.tick_clamped(), Duration::from_millis(100));
        assert_eq!(cfg.join_grace(), None);
        assert_eq!(cfg.bus_capacity_clamped(), 1024);
    }

    #[test]
    fn test_sentinels_are_clamped() {
        let cfg = WorkerConfig {
            tick: Duration::ZERO,
            join_grace: Duration::from_millis(250),
            bus_capacity: 0,
        };
        assert_eq!(cfg.tick_clamped(), Duration::from_millis(1));
        assert_eq!(cfg.join_grace(), Some(Duration::from_millis(250)));
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
