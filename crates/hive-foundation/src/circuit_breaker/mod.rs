//! Circuit Breaker
//!
//! Per-service failure isolation used by the integration layer.
//!
//! ```text
//!            failures >= threshold
//!   Closed ─────────────────────────▶ Open
//!     ▲                                 │ elapsed since last failure
//!     │ success                         │ >= recovery timeout
//!     │                                 ▼
//!     └──────────────────────────── HalfOpen
//!                 failure ──▶ Open (timer restarts)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use hive_foundation::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
//!
//! let mut breaker = CircuitBreaker::new("weather", CircuitBreakerConfig::default());
//! breaker.try_acquire()?;
//! match call_weather().await {
//!     Ok(_) => breaker.record_success(),
//!     Err(_) => breaker.record_failure(),
//! }
//! ```

pub mod config;
pub mod metrics;
pub mod state;

pub use self::config::CircuitBreakerConfig;
pub use self::metrics::{CircuitBreakerMetrics, CircuitBreakerSnapshot, StateTransition};
pub use self::state::{CircuitBreaker, CircuitBreakerError, State};
