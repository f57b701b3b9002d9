//! Error types this crate produces. Two categories, matching the two failure modes a
//! breaker can surface: a programmer error at build time, and a recoverable runtime
//! fail-fast.

use thiserror::Error;

/// A builder-time configuration mistake. These are programmer errors: surface them
/// immediately, never recover from them at runtime.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("failure_rate_threshold must be in (0.0, 1.0], got {0}")]
    InvalidFailureRateThreshold(String),

    #[error("trial_request_interval must be greater than zero")]
    InvalidTrialRequestInterval,

    #[error("circuit_open_window must be greater than zero")]
    InvalidCircuitOpenWindow,

    #[error("counter_sliding_window must be greater than zero")]
    InvalidSlidingWindow,

    #[error("counter_update_interval must be greater than zero")]
    InvalidUpdateInterval,

    #[error("counter_sliding_window ({window_ms}ms) must be greater than counter_update_interval ({update_ms}ms)")]
    SlidingWindowNotLargerThanUpdateInterval { window_ms: u128, update_ms: u128 },

    #[error("remote_service_name must not be empty")]
    EmptyServiceName,
}

/// The sentinel failure surfaced when a call is short-circuited because the breaker is
/// open (or half-open with a probe already in flight). Recoverable: callers typically
/// fall back to a cached value or a degraded response.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("circuit breaker is open for service '{remote_service_name}' method '{method_name}'")]
pub struct FailFastError {
    pub remote_service_name: String,
    pub method_name: String,
}

/// The error surfaced by [`CircuitBreakerInvoker::invoke`](crate::decorator::CircuitBreakerInvoker::invoke):
/// either the call was fast-failed locally, or the delegate itself failed.
#[derive(Debug, Error)]
pub enum InvokeError<E> {
    #[error(transparent)]
    FailFast(#[from] FailFastError),

    #[error("delegate invocation failed: {0}")]
    Delegate(E),
}
