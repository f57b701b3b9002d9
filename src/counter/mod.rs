//! Event counters feeding the CLOSED-state trip decision.

mod noop;
mod sliding_window;
mod striped;

pub use noop::NoOpCounter;
pub use sliding_window::SlidingWindowCounter;

use crate::event_count::EventCount;
use std::fmt::Debug;

/// Something that can accumulate success/failure outcomes and report a running count.
///
/// Implementations must be safe to call from many threads concurrently and must not
/// block: `on_success`/`on_failure` are called from completion callbacks, `get_count`
/// is called from `CircuitBreaker::on_failure` while deciding whether to trip.
pub trait EventCounter: Debug + Send + Sync {
    fn on_success(&self);
    fn on_failure(&self);
    fn get_count(&self) -> EventCount;
}
