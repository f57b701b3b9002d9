//! Ambient observer for breaker state transitions, independent of the logging sink.

use crate::event_count::EventCount;
use crate::state::CircuitState;

/// Notified synchronously after a transition's compare-and-swap has already
/// succeeded, just before the transition's log line is emitted. Transitions into a
/// state with no associated count (`Closed` after recovery, `Open` from `HalfOpen`)
/// pass `None`.
pub trait Listener: Send + Sync {
    fn on_state_change(
        &self,
        remote_service_name: &str,
        from: CircuitState,
        to: CircuitState,
        count: Option<EventCount>,
    );
}

/// Does nothing. The default for a breaker built without an explicit listener.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpListener;

impl Listener for NoOpListener {
    fn on_state_change(
        &self,
        _remote_service_name: &str,
        _from: CircuitState,
        _to: CircuitState,
        _count: Option<EventCount>,
    ) {
    }
}

impl<F> Listener for F
where
    F: Fn(&str, CircuitState, CircuitState, Option<EventCount>) + Send + Sync,
{
    fn on_state_change(
        &self,
        remote_service_name: &str,
        from: CircuitState,
        to: CircuitState,
        count: Option<EventCount>,
    ) {
        self(remote_service_name, from, to, count)
    }
}
