#![allow(clippy::doc_markdown)] // Allow technical terms like SIGTERM, TOML in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Bridge Resilience
//!
//! Fault-tolerance core of the development-event message bridge.
//!
//! ## Overview
//!
//! The bridge relays development events (task completions, build results,
//! alerts) to a remote messaging channel through a webhook tier, an internal
//! tier and a durable file-based tier. Each tier depends on something that can
//! fail on its own. This crate decides, for every outbound operation, whether
//! to attempt it, how to retry it, when to stop calling a failing dependency
//! and how to recover once conditions improve.
//!
//! ## Module Organization
//!
//! - [`errors`] - Error taxonomy carrying category, severity and recovery plan
//! - [`resilience`] - Per-dependency circuit breakers, registry and retry policy
//! - [`recovery`] - Recovery sessions, escalation and backup strategies
//! - [`monitoring`] - Metrics series, threshold violations and exporters
//! - [`config`] - Resilience configuration, validation and layered loading
//! - [`logging`] - Structured logging initialisation
//! - [`constants`] - Shared capacities, defaults and metric names
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bridge_resilience::config::ResilienceConfig;
//! use bridge_resilience::recovery::RecoveryManager;
//! use bridge_resilience::resilience::{CircuitBreakerManager, ExecutionContext};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! bridge_resilience::logging::init_structured_logging();
//!
//! let config = Arc::new(ResilienceConfig::for_environment("production"));
//! let breakers = CircuitBreakerManager::from_config(Arc::clone(&config));
//! let recovery = RecoveryManager::new(config.recovery.clone())
//!     .with_circuit_breakers(breakers.clone());
//!
//! let telegram = breakers.get_circuit_breaker("telegram").await;
//! let result = telegram
//!     .execute(
//!         || async { Err::<(), _>("connection refused".to_string()) },
//!         ExecutionContext::new("sendEvent").with_timeout(config.operation_timeout("sendEvent")),
//!     )
//!     .await;
//!
//! if let Some(error) = result.error() {
//!     let session = recovery
//!         .initiate_recovery(error.to_resilience_error("telegram"))
//!         .await;
//!     println!("recovery ended {}", session.status);
//! }
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit, integration and property tests
//! ```

pub mod config;
pub mod constants;
pub mod errors;
pub mod logging;
pub mod monitoring;
pub mod recovery;
pub mod resilience;

pub use config::{ConfigManager, ConfigurationError, ResilienceConfig};
pub use constants::HealthStatus;
pub use errors::{
    ErrorCategory, ErrorContext, ErrorSeverity, RecoveryStrategy, ResilienceError, Result,
};
pub use monitoring::{MetricsCollector, ThresholdViolation};
pub use recovery::{RecoveryManager, RecoverySession, SessionStatus};
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerManager,
    CircuitState, ExecutionContext, ExecutionResult,
};
