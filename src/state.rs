//! The breaker's immutable per-state bundle, swapped atomically on transition.

use crate::counter::{EventCounter, NoOpCounter, SlidingWindowCounter};
use std::fmt;
use std::sync::Arc;

/// Which of the three states a breaker is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation: all requests pass through, outcomes are counted.
    Closed,
    /// Tripped: all requests fail fast until the open window elapses.
    Open,
    /// Probationary: one probe at a time is admitted to detect recovery.
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
            CircuitState::Open => write!(f, "OPEN"),
        }
    }
}

/// An immutable snapshot of the breaker's current state. Never mutated in place — a
/// transition constructs a new `State` and the breaker atomically replaces its single
/// reference to the old one, so every reader always observes a fully consistent
/// `(kind, counter, start_millis, timeout_millis)` tuple.
pub(crate) struct State {
    pub(crate) kind: CircuitState,
    pub(crate) counter: Arc<dyn EventCounter>,
    pub(crate) start_millis: i64,
    pub(crate) timeout_millis: i64,
}

impl State {
    pub(crate) fn closed(now_millis: i64, clock: Arc<dyn crate::clock::Clock>, window: std::time::Duration, update_interval: std::time::Duration) -> Self {
        Self {
            kind: CircuitState::Closed,
            counter: Arc::new(SlidingWindowCounter::new(clock, window, update_interval)),
            start_millis: now_millis,
            timeout_millis: 0,
        }
    }

    pub(crate) fn open(now_millis: i64, circuit_open_window_millis: i64) -> Self {
        Self {
            kind: CircuitState::Open,
            counter: NoOpCounter::shared(),
            start_millis: now_millis,
            timeout_millis: circuit_open_window_millis,
        }
    }

    pub(crate) fn half_open(now_millis: i64, trial_request_interval_millis: i64) -> Self {
        Self {
            kind: CircuitState::HalfOpen,
            counter: NoOpCounter::shared(),
            start_millis: now_millis,
            timeout_millis: trial_request_interval_millis,
        }
    }

    /// Whether a promotion out of this (timed) state is due at `now`.
    pub(crate) fn timed_out(&self, now_millis: i64) -> bool {
        self.timeout_millis > 0 && self.start_millis + self.timeout_millis <= now_millis
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("kind", &self.kind)
            .field("start_millis", &self.start_millis)
            .field("timeout_millis", &self.timeout_millis)
            .finish()
    }
}
