//! The state machine: `can_request` / `on_success` / `on_failure`, all non-blocking.

use crate::clock::Clock;
use crate::config::BreakerSettings;
use crate::event_count::EventCount;
use crate::listener::{Listener, NoOpListener};
use crate::state::{CircuitState, State};
use arc_swap::ArcSwap;
use std::sync::Arc;

/// A single circuit breaker guarding one service (or one service/method pair, under
/// [`Scope::PerMethod`](crate::config::Scope::PerMethod)).
///
/// All three operations are non-blocking: state is read from, and transitions written
/// to, a single atomic reference. A transition replaces that reference with a freshly
/// built, immutable [`State`] — readers never observe a partially-updated breaker.
pub struct CircuitBreaker {
    settings: BreakerSettings,
    state: ArcSwap<State>,
    clock: Arc<dyn Clock>,
    listener: Arc<dyn Listener>,
}

impl CircuitBreaker {
    pub(crate) fn new(settings: BreakerSettings, clock: Arc<dyn Clock>, listener: Arc<dyn Listener>) -> Self {
        let now = clock.now_millis();
        let initial = State::closed(
            now,
            Arc::clone(&clock),
            settings.counter_sliding_window,
            settings.counter_update_interval,
        );
        Self {
            settings,
            state: ArcSwap::from_pointee(initial),
            clock,
            listener,
        }
    }

    pub fn remote_service_name(&self) -> &str {
        &self.settings.remote_service_name
    }

    /// The breaker's current state. Exposed for observability; never drives logic
    /// outside of `can_request`/`on_success`/`on_failure` themselves.
    pub fn state(&self) -> CircuitState {
        self.state.load().kind
    }

    pub fn is_closed(&self) -> bool {
        self.state() == CircuitState::Closed
    }

    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    pub fn is_half_open(&self) -> bool {
        self.state() == CircuitState::HalfOpen
    }

    /// The accumulated event count for the current state, or `EventCount::ZERO` in
    /// `Open`/`HalfOpen` where counting is meaningless.
    pub fn event_count(&self) -> EventCount {
        self.state.load().counter.get_count()
    }

    /// Whether a new request should be admitted. In `Closed`, always `true`. In
    /// `Open`/`HalfOpen`, only once the state's timeout has elapsed — and then only for
    /// exactly one caller, the one that wins the compare-and-swap into a fresh
    /// `HalfOpen` state.
    pub fn can_request(&self) -> bool {
        let now = self.clock.now_millis();
        let current = self.state.load_full();

        if current.kind == CircuitState::Closed {
            return true;
        }

        if !current.timed_out(now) {
            return false;
        }

        let next = Arc::new(State::half_open(now, self.settings.trial_request_interval.as_millis() as i64));
        let prev = self.state.compare_and_swap(&current, next);
        let won = Arc::ptr_eq(&prev, &current);
        if won {
            self.announce(current.kind, CircuitState::HalfOpen, None);
        }
        won
    }

    /// Record a successful call.
    pub fn on_success(&self) {
        let current = self.state.load_full();
        match current.kind {
            CircuitState::Closed => current.counter.on_success(),
            CircuitState::HalfOpen => {
                let now = self.clock.now_millis();
                let next = Arc::new(State::closed(
                    now,
                    Arc::clone(&self.clock),
                    self.settings.counter_sliding_window,
                    self.settings.counter_update_interval,
                ));
                let prev = self.state.compare_and_swap(&current, next);
                if Arc::ptr_eq(&prev, &current) {
                    self.announce(CircuitState::HalfOpen, CircuitState::Closed, None);
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed call. Trips `Closed -> Open` once both `total >=
    /// minimum_request_threshold` and `failure_rate > failure_rate_threshold` — the
    /// rate comparison is strict, so a rate exactly at the threshold does not trip.
    pub fn on_failure(&self) {
        let current = self.state.load_full();
        match current.kind {
            CircuitState::Closed => {
                current.counter.on_failure();
                let count = current.counter.get_count();
                let should_trip = self.settings.minimum_request_threshold <= count.total()
                    && self.settings.failure_rate_threshold < count.failure_rate();
                if should_trip {
                    let now = self.clock.now_millis();
                    let next = Arc::new(State::open(now, self.settings.circuit_open_window.as_millis() as i64));
                    let prev = self.state.compare_and_swap(&current, next);
                    if Arc::ptr_eq(&prev, &current) {
                        self.announce(CircuitState::Closed, CircuitState::Open, Some(count));
                    }
                }
            }
            CircuitState::HalfOpen => {
                let now = self.clock.now_millis();
                let next = Arc::new(State::open(now, self.settings.circuit_open_window.as_millis() as i64));
                let prev = self.state.compare_and_swap(&current, next);
                if Arc::ptr_eq(&prev, &current) {
                    self.announce(CircuitState::HalfOpen, CircuitState::Open, None);
                }
            }
            CircuitState::Open => {}
        }
    }

    fn announce(&self, from: CircuitState, to: CircuitState, count: Option<EventCount>) {
        self.listener
            .on_state_change(&self.settings.remote_service_name, from, to, count);
        log_transition(&self.settings.remote_service_name, to, count);
        #[cfg(feature = "metrics")]
        crate::metrics::record_transition(&self.settings.remote_service_name, from, to);
    }
}

fn log_transition(remote_service_name: &str, to: CircuitState, count: Option<EventCount>) {
    let (fail, total) = match count {
        Some(c) => (c.failure().to_string(), c.total().to_string()),
        None => ("-".to_string(), "-".to_string()),
    };
    #[cfg(feature = "tracing")]
    tracing::info!(
        "name:{} state:{} fail:{} total:{}",
        remote_service_name,
        to,
        fail,
        total
    );
    #[cfg(not(feature = "tracing"))]
    {
        let _ = (remote_service_name, to, fail, total);
    }
}

pub(crate) fn new_breaker(settings: BreakerSettings, clock: Arc<dyn Clock>) -> CircuitBreaker {
    CircuitBreaker::new(settings, clock, Arc::new(NoOpListener))
}
