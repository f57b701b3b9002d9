//! Validated, immutable circuit breaker configuration and its fluent builder.

use crate::error::ConfigError;
use crate::failure_filter::{AcceptAll, FailureFilter};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// How many [`CircuitBreaker`](crate::breaker::CircuitBreaker) instances a single
/// decorator maintains for one wrapped service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    /// One breaker for the whole service, shared across every method.
    Service,
    /// One breaker per `service#method` pair, created lazily on first use.
    PerMethod,
}

/// Validated circuit breaker configuration. Construct via [`CircuitBreakerConfig::builder`].
#[derive(Clone)]
pub struct CircuitBreakerConfig<E = Box<dyn std::error::Error + Send + Sync>> {
    pub(crate) remote_service_name: String,
    pub(crate) failure_rate_threshold: f64,
    pub(crate) minimum_request_threshold: u64,
    pub(crate) trial_request_interval: Duration,
    pub(crate) circuit_open_window: Duration,
    pub(crate) counter_sliding_window: Duration,
    pub(crate) counter_update_interval: Duration,
    pub(crate) scope: Scope,
    pub(crate) failure_filter: Arc<dyn FailureFilter<E>>,
}

impl<E> fmt::Debug for CircuitBreakerConfig<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreakerConfig")
            .field("remote_service_name", &self.remote_service_name)
            .field("failure_rate_threshold", &self.failure_rate_threshold)
            .field("minimum_request_threshold", &self.minimum_request_threshold)
            .field("trial_request_interval", &self.trial_request_interval)
            .field("circuit_open_window", &self.circuit_open_window)
            .field("counter_sliding_window", &self.counter_sliding_window)
            .field("counter_update_interval", &self.counter_update_interval)
            .field("scope", &self.scope)
            .finish()
    }
}

impl<E> CircuitBreakerConfig<E> {
    pub fn builder(remote_service_name: impl Into<String>) -> CircuitBreakerConfigBuilder<E> {
        CircuitBreakerConfigBuilder::new(remote_service_name)
    }

    pub fn remote_service_name(&self) -> &str {
        &self.remote_service_name
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn failure_rate_threshold(&self) -> f64 {
        self.failure_rate_threshold
    }

    pub fn minimum_request_threshold(&self) -> u64 {
        self.minimum_request_threshold
    }

    pub fn trial_request_interval(&self) -> Duration {
        self.trial_request_interval
    }

    pub fn circuit_open_window(&self) -> Duration {
        self.circuit_open_window
    }

    pub fn counter_sliding_window(&self) -> Duration {
        self.counter_sliding_window
    }

    pub fn counter_update_interval(&self) -> Duration {
        self.counter_update_interval
    }

    pub fn failure_filter(&self) -> &Arc<dyn FailureFilter<E>> {
        &self.failure_filter
    }

    /// The subset of configuration the state machine itself needs, stripped of the
    /// failure-filter's error type so [`CircuitBreaker`](crate::breaker::CircuitBreaker)
    /// and [`BreakerRegistry`](crate::registry::BreakerRegistry) don't have to be
    /// generic over it — only the decorator layer, which actually sees the delegate's
    /// error type, needs that.
    pub(crate) fn settings(&self) -> BreakerSettings {
        BreakerSettings {
            remote_service_name: self.remote_service_name.clone(),
            failure_rate_threshold: self.failure_rate_threshold,
            minimum_request_threshold: self.minimum_request_threshold,
            trial_request_interval: self.trial_request_interval,
            circuit_open_window: self.circuit_open_window,
            counter_sliding_window: self.counter_sliding_window,
            counter_update_interval: self.counter_update_interval,
            scope: self.scope,
        }
    }
}

/// Non-generic projection of [`CircuitBreakerConfig`] used by the breaker and registry.
#[derive(Debug, Clone)]
pub(crate) struct BreakerSettings {
    pub(crate) remote_service_name: String,
    pub(crate) failure_rate_threshold: f64,
    pub(crate) minimum_request_threshold: u64,
    pub(crate) trial_request_interval: Duration,
    pub(crate) circuit_open_window: Duration,
    pub(crate) counter_sliding_window: Duration,
    pub(crate) counter_update_interval: Duration,
    pub(crate) scope: Scope,
}

/// Fluent builder for [`CircuitBreakerConfig`]. Defaults match the values this crate's
/// breaker has always shipped with: an 80% failure rate threshold sampled over a 20s
/// window in 1s buckets, a 10s open window, a 3s trial interval, and a minimum of 10
/// requests before a trip is even considered.
pub struct CircuitBreakerConfigBuilder<E> {
    remote_service_name: String,
    failure_rate_threshold: f64,
    minimum_request_threshold: u64,
    trial_request_interval: Duration,
    circuit_open_window: Duration,
    counter_sliding_window: Duration,
    counter_update_interval: Duration,
    scope: Scope,
    failure_filter: Arc<dyn FailureFilter<E>>,
}

impl<E> CircuitBreakerConfigBuilder<E> {
    pub fn new(remote_service_name: impl Into<String>) -> Self {
        Self {
            remote_service_name: remote_service_name.into(),
            failure_rate_threshold: 0.8,
            minimum_request_threshold: 10,
            trial_request_interval: Duration::from_secs(3),
            circuit_open_window: Duration::from_secs(10),
            counter_sliding_window: Duration::from_secs(20),
            counter_update_interval: Duration::from_secs(1),
            scope: Scope::Service,
            failure_filter: Arc::new(AcceptAll),
        }
    }

    pub fn failure_rate_threshold(mut self, threshold: f64) -> Self {
        self.failure_rate_threshold = threshold;
        self
    }

    pub fn minimum_request_threshold(mut self, threshold: u64) -> Self {
        self.minimum_request_threshold = threshold;
        self
    }

    pub fn trial_request_interval(mut self, interval: Duration) -> Self {
        self.trial_request_interval = interval;
        self
    }

    pub fn circuit_open_window(mut self, window: Duration) -> Self {
        self.circuit_open_window = window;
        self
    }

    pub fn counter_sliding_window(mut self, window: Duration) -> Self {
        self.counter_sliding_window = window;
        self
    }

    pub fn counter_update_interval(mut self, interval: Duration) -> Self {
        self.counter_update_interval = interval;
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn failure_filter(mut self, filter: impl FailureFilter<E> + 'static) -> Self {
        self.failure_filter = Arc::new(filter);
        self
    }

    pub fn build(self) -> Result<CircuitBreakerConfig<E>, ConfigError> {
        if self.remote_service_name.trim().is_empty() {
            return Err(ConfigError::EmptyServiceName);
        }
        if !(self.failure_rate_threshold > 0.0 && self.failure_rate_threshold <= 1.0) {
            return Err(ConfigError::InvalidFailureRateThreshold(
                self.failure_rate_threshold.to_string(),
            ));
        }
        if self.trial_request_interval.is_zero() {
            return Err(ConfigError::InvalidTrialRequestInterval);
        }
        if self.circuit_open_window.is_zero() {
            return Err(ConfigError::InvalidCircuitOpenWindow);
        }
        if self.counter_sliding_window.is_zero() {
            return Err(ConfigError::InvalidSlidingWindow);
        }
        if self.counter_update_interval.is_zero() {
            return Err(ConfigError::InvalidUpdateInterval);
        }
        if self.counter_sliding_window <= self.counter_update_interval {
            return Err(ConfigError::SlidingWindowNotLargerThanUpdateInterval {
                window_ms: self.counter_sliding_window.as_millis(),
                update_ms: self.counter_update_interval.as_millis(),
            });
        }

        Ok(CircuitBreakerConfig {
            remote_service_name: self.remote_service_name,
            failure_rate_threshold: self.failure_rate_threshold,
            minimum_request_threshold: self.minimum_request_threshold,
            trial_request_interval: self.trial_request_interval,
            circuit_open_window: self.circuit_open_window,
            counter_sliding_window: self.counter_sliding_window,
            counter_update_interval: self.counter_update_interval,
            scope: self.scope,
            failure_filter: self.failure_filter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = CircuitBreakerConfig::<String>::builder("payments").build().unwrap();
        assert_eq!(cfg.remote_service_name(), "payments");
        assert_eq!(cfg.failure_rate_threshold(), 0.8);
        assert_eq!(cfg.minimum_request_threshold(), 10);
        assert_eq!(cfg.scope(), Scope::Service);
    }

    #[test]
    fn rejects_empty_service_name() {
        let err = CircuitBreakerConfig::<String>::builder("  ").build().unwrap_err();
        assert_eq!(err, ConfigError::EmptyServiceName);
    }

    #[test]
    fn rejects_failure_rate_threshold_out_of_range() {
        assert!(
            CircuitBreakerConfig::<String>::builder("svc")
                .failure_rate_threshold(0.0)
                .build()
                .is_err()
        );
        assert!(
            CircuitBreakerConfig::<String>::builder("svc")
                .failure_rate_threshold(1.5)
                .build()
                .is_err()
        );
        assert!(
            CircuitBreakerConfig::<String>::builder("svc")
                .failure_rate_threshold(1.0)
                .build()
                .is_ok()
        );
    }

    #[test]
    fn rejects_sliding_window_not_larger_than_update_interval() {
        let err = CircuitBreakerConfig::<String>::builder("svc")
            .counter_sliding_window(Duration::from_secs(1))
            .counter_update_interval(Duration::from_secs(1))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::SlidingWindowNotLargerThanUpdateInterval { .. }
        ));
    }

    #[test]
    fn scope_round_trips_through_json() {
        // Scope derives Serialize/Deserialize so a CircuitBreakerConfig's scope can be
        // embedded in a host application's own (de)serialized configuration.
        let json = serde_json::to_string(&Scope::PerMethod).unwrap();
        assert_eq!(json, "\"PerMethod\"");
        assert_eq!(serde_json::from_str::<Scope>(&json).unwrap(), Scope::PerMethod);

        let json = serde_json::to_string(&Scope::Service).unwrap();
        assert_eq!(serde_json::from_str::<Scope>(&json).unwrap(), Scope::Service);
    }

    #[test]
    fn rejects_zero_durations() {
        assert_eq!(
            CircuitBreakerConfig::<String>::builder("svc")
                .trial_request_interval(Duration::ZERO)
                .build()
                .unwrap_err(),
            ConfigError::InvalidTrialRequestInterval
        );
        assert_eq!(
            CircuitBreakerConfig::<String>::builder("svc")
                .circuit_open_window(Duration::ZERO)
                .build()
                .unwrap_err(),
            ConfigError::InvalidCircuitOpenWindow
        );
    }
}
