//! Optional `metrics`-crate instrumentation, enabled by the `metrics` feature.
//!
//! Mirrors how this codebase's other reliability middleware exposes counters and
//! gauges: zero runtime cost when the feature is off, a handful of labeled
//! counters/gauges when it's on.

use crate::state::CircuitState;

fn state_label(state: CircuitState) -> &'static str {
    match state {
        CircuitState::Closed => "closed",
        CircuitState::Open => "open",
        CircuitState::HalfOpen => "half_open",
    }
}

/// Records a committed state transition: a transitions counter plus a gauge pinning
/// the service's current state.
pub(crate) fn record_transition(remote_service_name: &str, from: CircuitState, to: CircuitState) {
    let service = remote_service_name.to_string();
    metrics::counter!(
        "circuit_breaker_transitions_total",
        "service" => service.clone(),
        "from" => state_label(from),
        "to" => state_label(to),
    )
    .increment(1);

    metrics::gauge!("circuit_breaker_state", "service" => service, "state" => state_label(to))
        .set(1.0);
}

/// Records a call outcome as observed by the decorator: `"success"`, `"failure"`, or
/// `"fail_fast"`.
pub(crate) fn record_outcome(remote_service_name: &str, outcome: &'static str) {
    metrics::counter!(
        "circuit_breaker_calls_total",
        "service" => remote_service_name.to_string(),
        "outcome" => outcome,
    )
    .increment(1);
}
