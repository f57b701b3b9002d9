use super::EventCounter;
use crate::event_count::EventCount;
use std::sync::{Arc, OnceLock};

/// An [`EventCounter`] that discards every event and always reports `EventCount::ZERO`.
///
/// Used for the `Open` and `HalfOpen` states, where accumulating counts would be
/// meaningless — those states decide transitions purely from elapsed time, not from a
/// failure rate.
#[derive(Debug, Default)]
pub struct NoOpCounter;

impl NoOpCounter {
    /// A process-wide shared instance, since the counter carries no state and every
    /// `Open`/`HalfOpen` breaker state can safely point at the same one.
    pub fn shared() -> Arc<dyn EventCounter> {
        static INSTANCE: OnceLock<Arc<NoOpCounter>> = OnceLock::new();
        INSTANCE.get_or_init(|| Arc::new(NoOpCounter)).clone()
    }
}

impl EventCounter for NoOpCounter {
    fn on_success(&self) {}
    fn on_failure(&self) {}
    fn get_count(&self) -> EventCount {
        EventCount::ZERO
    }
}
