//! Wraps a remote invoker so every call is gated by a [`CircuitBreaker`], resolved
//! through a [`BreakerRegistry`] per the configured [`Scope`](crate::config::Scope).

use crate::breaker::CircuitBreaker;
use crate::clock::{Clock, SystemClock};
use crate::config::CircuitBreakerConfig;
use crate::error::{FailFastError, InvokeError};
use crate::failure_filter::FailureFilter;
use crate::registry::BreakerRegistry;
use futures::future::{self, BoxFuture};
use pin_project::pin_project;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// A remote call site this crate can protect: given a method name and its arguments,
/// produce a future resolving to the delegate's own `Result`. An owned `BoxFuture`
/// rather than an `async fn` so the future never borrows from `&self` — it can outlive
/// the call that created it, which `CircuitBreakerInvoker::invoke` relies on.
pub trait Invoker<Args, Res, E>: Send + Sync {
    fn invoke(&self, method: &str, args: Args) -> BoxFuture<'static, Result<Res, E>>;
}

/// A hook run before every call, on both the fast-failed and delegated paths — e.g. to
/// stamp a request ID or attach tracing context. Most callers don't need one; see
/// [`NoOpCodec`].
pub trait Codec<Args>: Send + Sync {
    fn prepare_request(&self, method: &str, args: &Args);
}

/// Does nothing. The default codec for a decorator that has no request preparation to
/// perform.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpCodec;

impl<Args> Codec<Args> for NoOpCodec {
    fn prepare_request(&self, _method: &str, _args: &Args) {}
}

/// Decorates an [`Invoker`] with circuit-breaker admission control.
///
/// Every call resolves a breaker from the registry (one per service, or one per
/// `service#method` — see [`Scope`](crate::config::Scope)), fast-fails without touching
/// the delegate when that breaker refuses admission, and otherwise forwards the
/// delegate's outcome unchanged while reporting it to the breaker.
pub struct CircuitBreakerInvoker<I, C, Args, Res, E>
where
    I: Invoker<Args, Res, E>,
    C: Codec<Args>,
{
    remote_service_name: String,
    delegate: I,
    codec: C,
    failure_filter: Arc<dyn FailureFilter<E>>,
    registry: BreakerRegistry,
    _marker: PhantomData<fn(Args) -> Res>,
}

impl<I, C, Args, Res, E> CircuitBreakerInvoker<I, C, Args, Res, E>
where
    I: Invoker<Args, Res, E>,
    C: Codec<Args>,
    Args: Send + 'static,
    Res: Send + 'static,
    E: Send + 'static,
{
    /// Builds a decorator backed by the wall clock.
    pub fn new(config: CircuitBreakerConfig<E>, delegate: I, codec: C) -> Self {
        Self::with_clock(config, delegate, codec, Arc::new(SystemClock))
    }

    /// Builds a decorator backed by an explicit [`Clock`] — the hook tests use to drive
    /// breaker timeouts deterministically.
    pub fn with_clock(config: CircuitBreakerConfig<E>, delegate: I, codec: C, clock: Arc<dyn Clock>) -> Self {
        let remote_service_name = config.remote_service_name().to_string();
        let failure_filter = Arc::clone(config.failure_filter());
        let settings = config.settings();
        Self {
            remote_service_name,
            delegate,
            codec,
            failure_filter,
            registry: BreakerRegistry::new(settings, clock),
            _marker: PhantomData,
        }
    }

    pub fn remote_service_name(&self) -> &str {
        &self.remote_service_name
    }

    /// Returns the breaker guarding `method`, mainly so tests and observability code
    /// can inspect its state without going through a call.
    pub fn breaker_for(&self, method: &str) -> Arc<CircuitBreaker> {
        self.registry.breaker_for(method)
    }

    /// Invokes `method` with `args`, fast-failing if the resolved breaker refuses
    /// admission. `codec.prepare_request` always runs first, regardless of which path
    /// is taken.
    pub fn invoke(&self, method: &str, args: Args) -> BoxFuture<'static, Result<Res, InvokeError<E>>> {
        self.codec.prepare_request(method, &args);
        let breaker = self.registry.breaker_for(method);

        if !breaker.can_request() {
            let err = FailFastError {
                remote_service_name: self.remote_service_name.clone(),
                method_name: method.to_string(),
            };
            #[cfg(feature = "metrics")]
            crate::metrics::record_outcome(&self.remote_service_name, "fail_fast");
            return Box::pin(future::ready(Err(InvokeError::FailFast(err))));
        }

        let inner = self.delegate.invoke(method, args);
        Box::pin(Observed {
            inner,
            breaker,
            failure_filter: Arc::clone(&self.failure_filter),
            remote_service_name: self.remote_service_name.clone(),
        })
    }
}

/// Forwards the delegate's poll unchanged, reporting the outcome to the breaker the
/// instant it resolves. The delegate's `Result` is never altered — only wrapped.
#[pin_project]
struct Observed<F, E> {
    #[pin]
    inner: F,
    breaker: Arc<CircuitBreaker>,
    failure_filter: Arc<dyn FailureFilter<E>>,
    remote_service_name: String,
}

impl<F, Res, E> Future for Observed<F, E>
where
    F: Future<Output = Result<Res, E>>,
{
    type Output = Result<Res, InvokeError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match this.inner.poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(res)) => {
                this.breaker.on_success();
                #[cfg(feature = "metrics")]
                crate::metrics::record_outcome(this.remote_service_name, "success");
                Poll::Ready(Ok(res))
            }
            Poll::Ready(Err(err)) => {
                if this.failure_filter.should_deal_with(&err) {
                    this.breaker.on_failure();
                }
                #[cfg(feature = "metrics")]
                crate::metrics::record_outcome(this.remote_service_name, "failure");
                Poll::Ready(Err(InvokeError::Delegate(err)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::Scope;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingInvoker {
        calls: Arc<AtomicUsize>,
        result: fn(&str) -> Result<String, String>,
    }

    impl Invoker<String, String, String> for CountingInvoker {
        fn invoke(&self, method: &str, args: String) -> BoxFuture<'static, Result<String, String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let outcome = (self.result)(method);
            Box::pin(async move {
                let _ = args;
                outcome
            })
        }
    }

    fn decorator(
        scope: Scope,
        min_requests: u64,
        clock: Arc<ManualClock>,
        result: fn(&str) -> Result<String, String>,
    ) -> (
        CircuitBreakerInvoker<CountingInvoker, NoOpCodec, String, String, String>,
        Arc<AtomicUsize>,
    ) {
        let calls = Arc::new(AtomicUsize::new(0));
        let config = CircuitBreakerConfig::<String>::builder("payments")
            .scope(scope)
            .minimum_request_threshold(min_requests)
            .failure_rate_threshold(0.5)
            .counter_update_interval(Duration::from_millis(1_000))
            .counter_sliding_window(Duration::from_secs(60))
            .circuit_open_window(Duration::from_secs(10))
            .build()
            .unwrap();
        let delegate = CountingInvoker {
            calls: Arc::clone(&calls),
            result,
        };
        let invoker = CircuitBreakerInvoker::with_clock(config, delegate, NoOpCodec, clock as Arc<dyn Clock>);
        (invoker, calls)
    }

    #[tokio::test]
    async fn successful_call_is_forwarded_unchanged() {
        let clock = Arc::new(ManualClock::new(0));
        let (invoker, calls) = decorator(Scope::Service, 10, clock, |_| Ok("ok".to_string()));
        let result = invoker.invoke("charge", "args".to_string()).await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fail_fast_never_touches_the_delegate() {
        let clock = Arc::new(ManualClock::new(0));
        let (invoker, calls) = decorator(Scope::Service, 0, clock.clone(), |_| Err("boom".to_string()));
        // The first failure is recorded but, per the sliding window's bucket-rotation
        // contract, only becomes visible to the trip check once a later call rotates it
        // out — so the clock has to move past `counter_update_interval` in between.
        let _ = invoker.invoke("charge", "a".to_string()).await;
        clock.advance(1_000);
        let _ = invoker.invoke("charge", "b".to_string()).await;
        assert!(invoker.breaker_for("charge").is_open());

        let result = invoker.invoke("charge", "c".to_string()).await;
        assert!(matches!(result, Err(InvokeError::FailFast(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2, "fast-failed call must not reach the delegate");
    }

    #[tokio::test]
    async fn failure_filter_excludes_ignored_causes() {
        let clock = Arc::new(ManualClock::new(0));
        let config = CircuitBreakerConfig::<String>::builder("payments")
            .minimum_request_threshold(0)
            .failure_rate_threshold(0.5)
            .counter_update_interval(Duration::from_millis(1_000))
            .counter_sliding_window(Duration::from_secs(60))
            .failure_filter(|cause: &String| cause != "not_found")
            .build()
            .unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let delegate = CountingInvoker {
            calls: Arc::clone(&calls),
            result: |_| Err("not_found".to_string()),
        };
        let invoker = CircuitBreakerInvoker::with_clock(config, delegate, NoOpCodec, clock.clone() as Arc<dyn Clock>);

        let _ = invoker.invoke("lookup", "a".to_string()).await;
        clock.advance(1_000);
        let _ = invoker.invoke("lookup", "b".to_string()).await;

        assert!(invoker.breaker_for("lookup").is_closed(), "ignored causes must never trip the breaker");
    }

    #[tokio::test]
    async fn per_method_scope_isolates_breakers() {
        let clock = Arc::new(ManualClock::new(0));
        let (invoker, _calls) = decorator(Scope::PerMethod, 0, clock.clone(), |method| {
            if method == "charge" {
                Err("boom".to_string())
            } else {
                Ok("ok".to_string())
            }
        });

        let _ = invoker.invoke("charge", "a".to_string()).await;
        clock.advance(1_000);
        let _ = invoker.invoke("charge", "b".to_string()).await;

        assert!(invoker.breaker_for("charge").is_open());
        assert!(invoker.breaker_for("refund").is_closed());

        let result = invoker.invoke("refund", "c".to_string()).await;
        assert_eq!(result.unwrap(), "ok");
    }
}
