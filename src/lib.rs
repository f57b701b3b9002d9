// Copyright (c) 2025 Circuitry Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # circuitry
//!
//! A non-blocking, client-side circuit breaker for protecting callers from cascading
//! failures in a remote dependency.
//!
//! - [`CircuitBreakerConfig`] / [`CircuitBreakerConfigBuilder`] build a validated,
//!   immutable configuration.
//! - [`CircuitBreakerInvoker`] decorates any [`Invoker`] implementation, resolving a
//!   [`CircuitBreaker`] per call from a registry according to the configured [`Scope`].
//! - The breaker is driven by a sliding-window event counter while `CLOSED`, and admits
//!   exactly one probe at a time while `HALF_OPEN`.
//!
//! ```
//! use circuitry::{CircuitBreakerConfig, Scope};
//!
//! let config = CircuitBreakerConfig::<std::io::Error>::builder("payments-service")
//!     .failure_rate_threshold(0.5)
//!     .minimum_request_threshold(20)
//!     .scope(Scope::PerMethod)
//!     .build()
//!     .expect("valid configuration");
//! assert_eq!(config.remote_service_name(), "payments-service");
//! ```

mod breaker;
mod clock;
mod config;
mod counter;
mod decorator;
mod error;
mod event_count;
mod failure_filter;
mod listener;
#[cfg(feature = "metrics")]
mod metrics;
mod registry;
mod state;

pub use breaker::CircuitBreaker;
pub use clock::{Clock, SystemClock};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder, Scope};
pub use decorator::{CircuitBreakerInvoker, Codec, Invoker, NoOpCodec};
pub use error::{ConfigError, FailFastError, InvokeError};
pub use event_count::EventCount;
pub use failure_filter::{AcceptAll, FailureFilter};
pub use listener::{Listener, NoOpListener};
pub use state::CircuitState;
