//! # Retry Policy
//!
//! Per-dependency exponential backoff with optional jitter and error-code
//! allow/deny lists.

use crate::errors::{RecoveryStrategy, ResilienceError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Fraction of the computed delay applied as random jitter in either direction
const JITTER_FRACTION: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Dependency the policy applies to
    pub name: String,

    /// Total attempts, the first call included
    pub max_attempts: u32,

    pub base_delay: Duration,
    pub max_delay: Duration,
    pub exponential_base: f64,
    pub jitter: bool,

    /// Codes always retried (unless also listed as non-retryable)
    pub retryable_errors: Vec<String>,

    /// Codes never retried
    pub non_retryable_errors: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
            exponential_base: 2.0,
            jitter: true,
            retryable_errors: Vec::new(),
            non_retryable_errors: Vec::new(),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based), without jitter
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let millis = self.base_delay.as_millis() as f64 * self.exponential_base.powi(exponent);
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }

    /// Backoff before retry number `attempt`, jittered when enabled, never above `max_delay`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.base_delay_for(attempt);
        if !self.jitter || delay.is_zero() {
            return delay;
        }

        let factor = 1.0 + rand::thread_rng().gen_range(-JITTER_FRACTION..=JITTER_FRACTION);
        let jittered = Duration::from_secs_f64(delay.as_secs_f64() * factor);
        jittered.min(self.max_delay)
    }

    /// Explicit non-retryable codes win, then explicit retryable codes, then the error's flag
    pub fn is_retryable(&self, error: &ResilienceError) -> bool {
        if self.non_retryable_errors.iter().any(|code| *code == error.code) {
            return false;
        }
        if self.retryable_errors.iter().any(|code| *code == error.code) {
            return true;
        }
        error.retryable
    }

    /// Whether another attempt may follow attempt number `attempt`
    pub fn should_retry(&self, error: &ResilienceError, attempt: u32) -> bool {
        attempt < self.max_attempts && self.is_retryable(error)
    }

    /// Run `operation` until it succeeds, a non-retryable error occurs or attempts run out
    ///
    /// A `retry_after` hint on the error raises the wait to at least that long.
    /// Failed attempts are appended to the returned error's recovery ledger.
    pub async fn retry<F, Fut, T>(&self, mut operation: F) -> Result<T, ResilienceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ResilienceError>>,
    {
        let mut ledger: Vec<(Duration, String)> = Vec::new();
        let mut attempt = 1;

        loop {
            let started = tokio::time::Instant::now();
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(policy = %self.name, attempt = attempt, "🔄 Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(mut error) => {
                    ledger.push((started.elapsed(), error.message.clone()));

                    if !self.should_retry(&error, attempt) {
                        warn!(
                            policy = %self.name,
                            attempt = attempt,
                            code = %error.code,
                            "Retry budget exhausted or error not retryable"
                        );
                        for (duration, message) in ledger {
                            error.record_recovery_attempt(
                                RecoveryStrategy::Retry,
                                false,
                                duration,
                                Some(message),
                            );
                        }
                        return Err(error);
                    }

                    let mut delay = self.delay_for(attempt);
                    if let Some(hint) = error.retry_after() {
                        delay = delay.max(hint);
                    }
                    debug!(
                        policy = %self.name,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        code = %error.code,
                        "Retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            name: "telegram".to_string(),
            max_attempts: 4,
            jitter: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let policy = RetryPolicy {
            max_delay: Duration::from_millis(5000),
            ..policy()
        };
        assert_eq!(policy.base_delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.base_delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.base_delay_for(3), Duration::from_millis(4000));
        assert_eq!(policy.base_delay_for(4), Duration::from_millis(5000));
        assert_eq!(policy.base_delay_for(60), Duration::from_millis(5000));
    }

    #[test]
    fn test_jitter_stays_within_ten_percent() {
        let policy = RetryPolicy {
            jitter: true,
            ..policy()
        };
        for _ in 0..200 {
            let delay = policy.delay_for(2).as_millis();
            assert!((1800..=2200).contains(&delay), "delay {delay} out of range");
        }
    }

    #[test]
    fn test_code_lists_take_precedence() {
        let policy = RetryPolicy {
            retryable_errors: vec!["VALIDATION_ERROR".to_string(), "NETWORK_ERROR".to_string()],
            non_retryable_errors: vec!["NETWORK_ERROR".to_string()],
            ..policy()
        };

        // Listed as both: non-retryable wins
        assert!(!policy.is_retryable(&ResilienceError::network("down")));
        // Explicitly retryable overrides the error's own flag
        assert!(policy.is_retryable(&ResilienceError::validation("chat_id", "bad")));
        // Unlisted falls back to the error
        assert!(policy.is_retryable(&ResilienceError::telegram("502")));
        assert!(!policy.is_retryable(&ResilienceError::security("leak")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&calls);

        let result = policy()
            .retry(|| {
                let seen = Arc::clone(&seen);
                async move {
                    if seen.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ResilienceError::network("flaky"))
                    } else {
                        Ok("sent")
                    }
                }
            })
            .await;

        assert_eq!(result, Ok("sent"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_records_ledger() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&calls);

        let error = policy()
            .retry(|| {
                seen.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(ResilienceError::network("down")) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(error.recovery.attempts.len(), 4);
        assert!(error
            .recovery
            .attempts
            .iter()
            .all(|a| a.strategy == RecoveryStrategy::Retry && !a.success));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_fails_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&calls);

        let result = policy()
            .retry(|| {
                seen.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(ResilienceError::validation("chat_id", "missing")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
