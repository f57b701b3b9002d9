//! Maps a configuration's [`Scope`] onto one or many [`CircuitBreaker`] instances.

use crate::breaker::{new_breaker, CircuitBreaker};
use crate::clock::Clock;
use crate::config::{BreakerSettings, Scope};
use dashmap::DashMap;
use std::sync::Arc;

/// Owns the breaker(s) for a single decorated service.
///
/// Under [`Scope::Service`] this is a thin wrapper around one breaker built eagerly at
/// construction. Under [`Scope::PerMethod`] it's a concurrent get-or-create map keyed by
/// `service#method`, so concurrent first calls to distinct methods never block each
/// other, and concurrent first calls to the *same* method still produce exactly one
/// breaker — the losing side of the race discards its candidate and reuses the winner's.
pub(crate) struct BreakerRegistry {
    settings: BreakerSettings,
    clock: Arc<dyn Clock>,
    service_wide: Option<Arc<CircuitBreaker>>,
    per_method: DashMap<String, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    pub(crate) fn new(settings: BreakerSettings, clock: Arc<dyn Clock>) -> Self {
        let service_wide = match settings.scope {
            Scope::Service => Some(Arc::new(new_breaker(settings.clone(), Arc::clone(&clock)))),
            Scope::PerMethod => None,
        };
        Self {
            settings,
            clock,
            service_wide,
            per_method: DashMap::new(),
        }
    }

    /// The breaker that should guard a call to `method_name`. Under [`Scope::Service`],
    /// `method_name` is ignored and the single shared breaker is returned. Under
    /// [`Scope::PerMethod`], a breaker named `service#method_name` is created on first
    /// use and reused for every subsequent call to that method.
    pub(crate) fn breaker_for(&self, method_name: &str) -> Arc<CircuitBreaker> {
        match &self.service_wide {
            Some(breaker) => Arc::clone(breaker),
            None => {
                if let Some(existing) = self.per_method.get(method_name) {
                    return Arc::clone(existing.value());
                }
                let full_name = format!("{}#{}", self.settings.remote_service_name, method_name);
                let mut settings = self.settings.clone();
                settings.remote_service_name = full_name;
                let candidate = Arc::new(new_breaker(settings, Arc::clone(&self.clock)));
                Arc::clone(
                    self.per_method
                        .entry(method_name.to_string())
                        .or_insert(candidate)
                        .value(),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::CircuitBreakerConfig;

    fn settings(scope: Scope) -> BreakerSettings {
        CircuitBreakerConfig::<String>::builder("payments")
            .scope(scope)
            .build()
            .unwrap()
            .settings()
    }

    #[test]
    fn service_scope_returns_the_same_breaker_regardless_of_method() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let registry = BreakerRegistry::new(settings(Scope::Service), clock);
        let a = registry.breaker_for("charge");
        let b = registry.breaker_for("refund");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.remote_service_name(), "payments");
    }

    #[test]
    fn per_method_scope_creates_distinct_breakers_named_by_method() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let registry = BreakerRegistry::new(settings(Scope::PerMethod), clock);
        let charge = registry.breaker_for("charge");
        let refund = registry.breaker_for("refund");
        assert!(!Arc::ptr_eq(&charge, &refund));
        assert_eq!(charge.remote_service_name(), "payments#charge");
        assert_eq!(refund.remote_service_name(), "payments#refund");
    }

    #[test]
    fn per_method_scope_reuses_the_breaker_for_repeated_lookups() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let registry = BreakerRegistry::new(settings(Scope::PerMethod), clock);
        let first = registry.breaker_for("charge");
        first.on_failure();
        let second = registry.breaker_for("charge");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn per_method_breakers_trip_independently() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let registry = BreakerRegistry::new(
            CircuitBreakerConfig::<String>::builder("payments")
                .scope(Scope::PerMethod)
                .minimum_request_threshold(0)
                .failure_rate_threshold(0.5)
                .build()
                .unwrap()
                .settings(),
            clock,
        );
        let charge = registry.breaker_for("charge");
        let refund = registry.breaker_for("refund");
        charge.on_failure();
        assert!(charge.is_open());
        assert!(refund.is_closed());
    }
}
