//! # Resilience Module
//!
//! Per-dependency circuit breakers for the bridge's outbound operations.
//!
//! ## Architecture
//!
//! - **State Manager**: owns one dependency's state, statistics and admission decision
//! - **Circuit Breaker**: wraps a single async operation with timeout and fallback
//! - **Manager**: registry of breakers keyed by dependency name
//! - **Retry Policy**: exponential backoff with jitter per dependency
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bridge_resilience::resilience::{CircuitBreaker, CircuitBreakerConfig, ExecutionContext};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let breaker = CircuitBreaker::new(CircuitBreakerConfig::for_telegram());
//!
//! let result = breaker
//!     .execute_with_fallback(
//!         || async { Ok::<_, String>("delivered via webhook") },
//!         || async { Ok("queued to file tier") },
//!         ExecutionContext::new("sendEvent").with_timeout(Duration::from_secs(10)),
//!     )
//!     .await;
//!
//! println!("{:?} via fallback: {}", result.value(), result.executed_via_fallback);
//! # }
//! ```

pub mod circuit_breaker;
pub mod config;
pub mod manager;
pub mod metrics;
pub mod retry;
pub mod state;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerCallbacks, CircuitBreakerError, ExecutionContext,
    ExecutionResult,
};
pub use config::CircuitBreakerConfig;
pub use manager::CircuitBreakerManager;
pub use metrics::{CircuitBreakerMetrics, CircuitBreakerSnapshot, SystemCircuitBreakerMetrics};
pub use retry::RetryPolicy;
pub use state::{CircuitBreakerStateManager, CircuitState, StateChangeCallback, StateTransition};
