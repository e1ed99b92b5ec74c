//! # Recovery Module
//!
//! Automatic recovery for failures handed over by callers as
//! [`ResilienceError`](crate::errors::ResilienceError)s.
//!
//! - **Session**: one bounded attempt sequence per error occurrence
//! - **Backup**: condition-gated plans tried after primary exhaustion
//! - **Actions**: pluggable side effects and health signals
//! - **Manager**: runs sessions, escalates and shuts down gracefully
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bridge_resilience::config::RecoveryConfig;
//! use bridge_resilience::errors::ResilienceError;
//! use bridge_resilience::recovery::RecoveryManager;
//!
//! # async fn example() {
//! let manager = RecoveryManager::new(RecoveryConfig::default());
//! let session = manager
//!     .initiate_recovery(ResilienceError::bridge("bridge process exited"))
//!     .await;
//! println!("{} after {} attempts", session.status, session.attempts.len());
//! # }
//! ```

pub mod actions;
pub mod backup;
pub mod manager;
pub mod session;

pub use actions::{HealthSignals, NoHealthSignals, NoopRecoveryActions, RecoveryActions};
pub use backup::{applicable_strategies, conditions_for_error, BackupCondition, BackupStrategy};
pub use manager::{RecoveryManager, RecoveryStatistics, ShutdownOutcome};
pub use session::{AttemptStatus, RecoveryAttempt, RecoverySession, SessionStatus};
