//! # Circuit Breaker Implementation
//!
//! Wraps a single asynchronous operation with admission control, an optional
//! per-call timeout and an optional fallback path. Every call, whether it
//! succeeds, fails, falls back or is rejected, yields exactly one
//! [`ExecutionResult`].
//!
//! A timed-out operation future is dropped, which cancels it at its next
//! suspension point. Work the operation spawned on its own keeps running.

use crate::constants::circuit_breaker::DEFAULT_FALLBACK_TIMEOUT;
use crate::constants::HealthStatus;
use crate::errors::{ErrorCategory, ErrorSeverity, RecoveryStrategy, ResilienceError};
use crate::resilience::{
    CircuitBreakerConfig, CircuitBreakerMetrics, CircuitBreakerSnapshot,
    CircuitBreakerStateManager, CircuitState, StateChangeCallback, StateTransition,
};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Errors that can occur during circuit breaker operation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open, rejecting calls
    #[error("Circuit breaker is open for {component}")]
    CircuitOpen { component: String },

    /// Operation exceeded its per-call timeout
    #[error("Operation timed out after {}ms for {component}", .timeout.as_millis())]
    Timeout { component: String, timeout: Duration },

    /// Operation failed and was recorded
    #[error("Operation failed: {0}")]
    OperationFailed(E),

    /// Fallback ran after a rejection and did not produce a value
    #[error("Fallback failed for {component}: {message}")]
    FallbackFailed { component: String, message: String },
}

impl<E: fmt::Display> CircuitBreakerError<E> {
    /// Whether the operation itself never ran
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            CircuitBreakerError::CircuitOpen { .. } | CircuitBreakerError::FallbackFailed { .. }
        )
    }

    /// Convert into a taxonomy error suitable for the recovery manager
    pub fn to_resilience_error(&self, component: &str) -> ResilienceError {
        match self {
            CircuitBreakerError::CircuitOpen { component } => ResilienceError::new(
                "CIRCUIT_BREAKER_OPEN",
                self.to_string(),
                category_for_component(component),
                ErrorSeverity::High,
            )
            .with_component(component.clone())
            .with_strategy(RecoveryStrategy::CircuitBreaker),
            CircuitBreakerError::Timeout { component, timeout } => {
                ResilienceError::timeout(component.clone(), *timeout).with_component(component.clone())
            }
            CircuitBreakerError::OperationFailed(err) => {
                ResilienceError::from_message(err.to_string()).with_component(component)
            }
            CircuitBreakerError::FallbackFailed { component, .. } => ResilienceError::new(
                "CIRCUIT_BREAKER_FALLBACK_FAILED",
                self.to_string(),
                category_for_component(component),
                ErrorSeverity::High,
            )
            .with_component(component.clone())
            .with_strategy(RecoveryStrategy::CircuitBreaker),
        }
    }
}

impl From<CircuitBreakerError<ResilienceError>> for ResilienceError {
    fn from(err: CircuitBreakerError<ResilienceError>) -> Self {
        match err {
            CircuitBreakerError::OperationFailed(inner) => inner,
            CircuitBreakerError::CircuitOpen { ref component }
            | CircuitBreakerError::Timeout { ref component, .. }
            | CircuitBreakerError::FallbackFailed { ref component, .. } => {
                err.to_resilience_error(component)
            }
        }
    }
}

fn category_for_component(component: &str) -> ErrorCategory {
    match component {
        "bridge" => ErrorCategory::Bridge,
        "telegram" => ErrorCategory::Telegram,
        "filesystem" => ErrorCategory::Filesystem,
        _ => ErrorCategory::Network,
    }
}

/// Caller-supplied context for one protected call
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// Operation key, e.g. `sendEvent`
    pub operation: Option<String>,

    /// Per-call timeout; overrides the breaker's `request_timeout`
    pub timeout: Option<Duration>,

    pub correlation_id: Option<String>,

    pub metadata: HashMap<String, Value>,
}

impl ExecutionContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Outcome of one protected call
#[derive(Debug)]
pub struct ExecutionResult<T, E> {
    pub outcome: Result<T, CircuitBreakerError<E>>,
    pub duration: Duration,

    /// Breaker state after the call
    pub circuit_state: CircuitState,

    pub executed_via_fallback: bool,

    /// Request id, breaker name and caller context
    pub metadata: HashMap<String, Value>,
}

impl<T, E> ExecutionResult<T, E> {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn value(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&CircuitBreakerError<E>> {
        self.outcome.as_ref().err()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.metadata.get("request_id").and_then(Value::as_str)
    }

    pub fn into_result(self) -> Result<T, CircuitBreakerError<E>> {
        self.outcome
    }
}

pub type RequestRejectedCallback = Arc<dyn Fn(&str) + Send + Sync>;
pub type RequestSuccessCallback = Arc<dyn Fn(&str, Duration) + Send + Sync>;
pub type RequestFailureCallback = Arc<dyn Fn(&str, Duration, &str) + Send + Sync>;

/// Hooks invoked inline with the protected call; they must not block
#[derive(Clone, Default)]
pub struct CircuitBreakerCallbacks {
    pub on_state_change: Option<StateChangeCallback>,
    pub on_request_rejected: Option<RequestRejectedCallback>,
    pub on_request_success: Option<RequestSuccessCallback>,
    pub on_request_failure: Option<RequestFailureCallback>,
}

impl CircuitBreakerCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_state_change<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &StateTransition) + Send + Sync + 'static,
    {
        self.on_state_change = Some(Arc::new(f));
        self
    }

    pub fn on_request_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_request_rejected = Some(Arc::new(f));
        self
    }

    pub fn on_request_success<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Duration) + Send + Sync + 'static,
    {
        self.on_request_success = Some(Arc::new(f));
        self
    }

    pub fn on_request_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Duration, &str) + Send + Sync + 'static,
    {
        self.on_request_failure = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for CircuitBreakerCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreakerCallbacks")
            .field("on_state_change", &self.on_state_change.is_some())
            .field("on_request_rejected", &self.on_request_rejected.is_some())
            .field("on_request_success", &self.on_request_success.is_some())
            .field("on_request_failure", &self.on_request_failure.is_some())
            .finish()
    }
}

enum Attempt<T, E> {
    Completed(T),
    Failed(E),
    TimedOut(Duration),
}

type NoFallback<T, E> = fn() -> std::future::Ready<Result<T, E>>;

/// Circuit breaker protecting one named dependency
#[derive(Debug)]
pub struct CircuitBreaker {
    state: CircuitBreakerStateManager,
    callbacks: CircuitBreakerCallbacks,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self::with_callbacks(config, CircuitBreakerCallbacks::default())
    }

    pub fn with_callbacks(config: CircuitBreakerConfig, callbacks: CircuitBreakerCallbacks) -> Self {
        info!(
            component = %config.name,
            failure_threshold = config.failure_threshold,
            success_threshold = config.success_threshold,
            timeout_ms = config.timeout.as_millis() as u64,
            "🛡️ Circuit breaker initialized"
        );

        let state = match &callbacks.on_state_change {
            Some(callback) => {
                CircuitBreakerStateManager::with_state_change_callback(config, Arc::clone(callback))
            }
            None => CircuitBreakerStateManager::new(config),
        };

        Self { state, callbacks }
    }

    pub fn name(&self) -> &str {
        self.state.name()
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        self.state.config()
    }

    pub fn state(&self) -> CircuitState {
        self.state.state()
    }

    pub fn state_manager(&self) -> &CircuitBreakerStateManager {
        &self.state
    }

    pub fn metrics(&self) -> CircuitBreakerMetrics {
        self.state.metrics()
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        self.state.snapshot()
    }

    pub fn health_status(&self) -> HealthStatus {
        self.state.health_status()
    }

    pub fn state_history(&self) -> Vec<StateTransition> {
        self.state.state_history()
    }

    /// Execute an operation, returning its value or the breaker error
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.execute(operation, ExecutionContext::default())
            .await
            .into_result()
    }

    /// Execute an operation with circuit breaker protection
    pub async fn execute<F, Fut, T, E>(
        &self,
        operation: F,
        context: ExecutionContext,
    ) -> ExecutionResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.run(operation, None::<NoFallback<T, E>>, context).await
    }

    /// Execute an operation, using `fallback` when rejected or after a failure
    pub async fn execute_with_fallback<F, Fut, FB, FbFut, T, E>(
        &self,
        operation: F,
        fallback: FB,
        context: ExecutionContext,
    ) -> ExecutionResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        FB: FnOnce() -> FbFut,
        FbFut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.run(operation, Some(fallback), context).await
    }

    async fn run<F, Fut, FB, FbFut, T, E>(
        &self,
        operation: F,
        fallback: Option<FB>,
        context: ExecutionContext,
    ) -> ExecutionResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        FB: FnOnce() -> FbFut,
        FbFut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let started = Instant::now();
        let mut metadata = self.base_metadata(&context);

        if !self.state.try_acquire() {
            return self.reject(fallback, &context, metadata, started).await;
        }

        let attempt = match context.timeout.or(self.config().request_timeout) {
            Some(limit) => match tokio::time::timeout(limit, operation()).await {
                Ok(Ok(value)) => Attempt::Completed(value),
                Ok(Err(err)) => Attempt::Failed(err),
                Err(_) => Attempt::TimedOut(limit),
            },
            None => match operation().await {
                Ok(value) => Attempt::Completed(value),
                Err(err) => Attempt::Failed(err),
            },
        };
        let duration = started.elapsed();

        let error = match attempt {
            Attempt::Completed(value) => {
                self.state.record_success(duration);
                if let Some(callback) = &self.callbacks.on_request_success {
                    callback(self.name(), duration);
                }
                return self.finish(Ok(value), started, false, metadata);
            }
            Attempt::TimedOut(limit) => {
                self.state.record_timeout(duration);
                CircuitBreakerError::Timeout {
                    component: self.name().to_string(),
                    timeout: limit,
                }
            }
            Attempt::Failed(err) => {
                if is_timeout_message(&err.to_string()) {
                    self.state.record_timeout(duration);
                } else {
                    self.state.record_failure(duration, Some(&err.to_string()));
                }
                CircuitBreakerError::OperationFailed(err)
            }
        };

        let message = error.to_string();
        warn!(
            component = %self.name(),
            operation = context.operation.as_deref().unwrap_or("unknown"),
            duration_ms = duration.as_millis() as u64,
            error = %message,
            "⚠️ Protected operation failed"
        );
        if let Some(callback) = &self.callbacks.on_request_failure {
            callback(self.name(), duration, &message);
        }

        let Some(fallback) = fallback else {
            return self.finish(Err(error), started, false, metadata);
        };

        let limit = self.fallback_timeout(&context);
        match tokio::time::timeout(limit, fallback()).await {
            Ok(Ok(value)) => {
                debug!(component = %self.name(), "🔄 Fallback succeeded after failure");
                metadata.insert("fallback_reason".into(), "fallback_after_failure".into());
                metadata.insert("original_error".into(), message.into());
                self.finish(Ok(value), started, true, metadata)
            }
            Ok(Err(fallback_err)) => {
                warn!(component = %self.name(), error = %fallback_err, "Fallback after failure also failed");
                metadata.insert("fallback_error".into(), fallback_err.to_string().into());
                self.finish(Err(error), started, false, metadata)
            }
            Err(_) => {
                warn!(component = %self.name(), timeout_ms = limit.as_millis() as u64, "Fallback after failure timed out");
                metadata.insert(
                    "fallback_error".into(),
                    format!("fallback timed out after {}ms", limit.as_millis()).into(),
                );
                self.finish(Err(error), started, false, metadata)
            }
        }
    }

    async fn reject<FB, FbFut, T, E>(
        &self,
        fallback: Option<FB>,
        context: &ExecutionContext,
        mut metadata: HashMap<String, Value>,
        started: Instant,
    ) -> ExecutionResult<T, E>
    where
        FB: FnOnce() -> FbFut,
        FbFut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.state.record_rejection();
        debug!(
            component = %self.name(),
            state = %self.state(),
            operation = context.operation.as_deref().unwrap_or("unknown"),
            "⚡ Request rejected by circuit breaker"
        );
        if let Some(callback) = &self.callbacks.on_request_rejected {
            callback(self.name());
        }
        metadata.insert("rejected".into(), true.into());

        let Some(fallback) = fallback else {
            let error = CircuitBreakerError::CircuitOpen {
                component: self.name().to_string(),
            };
            return self.finish(Err(error), started, false, metadata);
        };

        metadata.insert("fallback_reason".into(), "circuit_open".into());
        let limit = self.fallback_timeout(context);
        let outcome = match tokio::time::timeout(limit, fallback()).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(CircuitBreakerError::FallbackFailed {
                component: self.name().to_string(),
                message: err.to_string(),
            }),
            Err(_) => Err(CircuitBreakerError::FallbackFailed {
                component: self.name().to_string(),
                message: format!("fallback timed out after {}ms", limit.as_millis()),
            }),
        };

        if let Err(err) = &outcome {
            warn!(component = %self.name(), error = %err, "Fallback for rejected request failed");
        }
        let executed_via_fallback = outcome.is_ok();
        self.finish(outcome, started, executed_via_fallback, metadata)
    }

    fn finish<T, E>(
        &self,
        outcome: Result<T, CircuitBreakerError<E>>,
        started: Instant,
        executed_via_fallback: bool,
        metadata: HashMap<String, Value>,
    ) -> ExecutionResult<T, E> {
        ExecutionResult {
            outcome,
            duration: started.elapsed(),
            circuit_state: self.state(),
            executed_via_fallback,
            metadata,
        }
    }

    fn base_metadata(&self, context: &ExecutionContext) -> HashMap<String, Value> {
        let mut metadata = context.metadata.clone();
        metadata.insert("request_id".into(), Uuid::new_v4().to_string().into());
        metadata.insert("circuit_breaker".into(), self.name().into());
        if let Some(operation) = &context.operation {
            metadata.insert("operation".into(), operation.clone().into());
        }
        if let Some(correlation_id) = &context.correlation_id {
            metadata.insert("correlation_id".into(), correlation_id.clone().into());
        }
        metadata
    }

    fn fallback_timeout(&self, context: &ExecutionContext) -> Duration {
        context
            .timeout
            .or(self.config().request_timeout)
            .unwrap_or(DEFAULT_FALLBACK_TIMEOUT)
    }

    /// Force circuit to open state (for emergency situations)
    pub fn force_open(&self) {
        self.state.force_state(CircuitState::Open, "forced open");
    }

    /// Force circuit to closed state (for recovery situations)
    pub fn force_closed(&self) {
        self.state.force_state(CircuitState::Closed, "forced closed");
    }

    /// Force circuit to half-open so the next call probes the dependency
    pub fn force_half_open(&self) {
        self.state.force_state(CircuitState::HalfOpen, "forced half-open");
    }

    pub fn reset(&self) {
        self.state.reset();
    }
}

fn is_timeout_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("timeout") || lower.contains("timed out")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn breaker(failure_threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            name: "telegram".to_string(),
            failure_threshold,
            success_threshold: 1,
            timeout: Duration::from_secs(1),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_successful_execution() {
        let cb = breaker(3);
        let result = cb
            .execute(|| async { Ok::<_, String>(42) }, ExecutionContext::new("sendEvent"))
            .await;

        assert!(result.is_success());
        assert_eq!(result.value(), Some(&42));
        assert_eq!(result.circuit_state, CircuitState::Closed);
        assert!(!result.executed_via_fallback);
        assert_eq!(result.metadata["circuit_breaker"], "telegram");
        assert_eq!(result.metadata["operation"], "sendEvent");
        assert!(result.request_id().is_some());
        assert_eq!(cb.metrics().successful_requests, 1);
        assert_eq!(cb.metrics().active_requests, 0);
    }

    #[tokio::test]
    async fn test_rejection_never_invokes_operation() {
        let cb = breaker(1);
        cb.force_open();

        let invoked = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&invoked);
        let result = cb
            .execute(
                move || async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(())
                },
                ExecutionContext::default(),
            )
            .await;

        assert_eq!(invoked.load(Ordering::SeqCst), 0);
        assert!(matches!(
            result.error(),
            Some(CircuitBreakerError::CircuitOpen { .. })
        ));
        assert_eq!(result.circuit_state, CircuitState::Open);
        assert_eq!(cb.metrics().rejected_requests, 1);
    }

    #[tokio::test]
    async fn test_rejection_uses_fallback() {
        let cb = breaker(1);
        cb.force_open();

        let result = cb
            .execute_with_fallback(
                || async { Ok::<_, String>("live") },
                || async { Ok("cached") },
                ExecutionContext::default(),
            )
            .await;

        assert_eq!(result.value(), Some(&"cached"));
        assert!(result.executed_via_fallback);
        assert_eq!(result.metadata["fallback_reason"], "circuit_open");
    }

    #[tokio::test]
    async fn test_rejected_fallback_failure_is_breaker_error() {
        let cb = breaker(1);
        cb.force_open();

        let result = cb
            .execute_with_fallback(
                || async { Ok::<u8, String>(1) },
                || async { Err("cache empty".to_string()) },
                ExecutionContext::default(),
            )
            .await;

        let err = result.error().expect("fallback failure");
        assert!(err.is_rejection());
        assert!(err.to_string().contains("cache empty"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_recorded() {
        let cb = breaker(5);
        let result = cb
            .execute(
                || async {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    Ok::<_, String>(())
                },
                ExecutionContext::new("sendEvent").with_timeout(Duration::from_millis(100)),
            )
            .await;

        assert!(matches!(
            result.error(),
            Some(CircuitBreakerError::Timeout { .. })
        ));
        let metrics = cb.metrics();
        assert_eq!(metrics.timeout_requests, 1);
        assert_eq!(metrics.failed_requests, 1);
        assert_eq!(metrics.active_requests, 0);
    }

    #[tokio::test]
    async fn test_timeout_message_is_classified_as_timeout() {
        let cb = breaker(5);
        let _ = cb
            .call(|| async { Err::<(), _>("upstream timed out".to_string()) })
            .await;
        assert_eq!(cb.metrics().timeout_requests, 1);

        let _ = cb
            .call(|| async { Err::<(), _>("connection refused".to_string()) })
            .await;
        assert_eq!(cb.metrics().timeout_requests, 1);
        assert_eq!(cb.metrics().failed_requests, 2);
    }

    #[tokio::test]
    async fn test_fallback_after_failure_keeps_original_error_when_it_fails() {
        let cb = breaker(5);

        let recovered = cb
            .execute_with_fallback(
                || async { Err::<&str, _>("webhook down".to_string()) },
                || async { Ok("file tier") },
                ExecutionContext::default(),
            )
            .await;
        assert_eq!(recovered.value(), Some(&"file tier"));
        assert!(recovered.executed_via_fallback);
        assert_eq!(recovered.metadata["fallback_reason"], "fallback_after_failure");

        let failed = cb
            .execute_with_fallback(
                || async { Err::<&str, _>("webhook down".to_string()) },
                || async { Err("disk full".to_string()) },
                ExecutionContext::default(),
            )
            .await;
        assert_eq!(
            failed.error(),
            Some(&CircuitBreakerError::OperationFailed("webhook down".to_string()))
        );
        assert_eq!(failed.metadata["fallback_error"], "disk full");
    }

    #[tokio::test]
    async fn test_failures_trip_breaker_and_report_state_after_call() {
        let cb = breaker(2);
        for _ in 0..2 {
            let result = cb
                .execute(|| async { Err::<(), _>("boom".to_string()) }, ExecutionContext::default())
                .await;
            assert!(!result.is_success());
        }
        assert_eq!(cb.state(), CircuitState::Open);

        let result = cb
            .execute(|| async { Ok::<_, String>(()) }, ExecutionContext::default())
            .await;
        assert_eq!(result.circuit_state, CircuitState::Open);
    }

    #[tokio::test]
    async fn test_callbacks_fire_inline() {
        let events = Arc::new(parking_lot::Mutex::new(Vec::<String>::new()));
        let (a, b, c, d) = (
            Arc::clone(&events),
            Arc::clone(&events),
            Arc::clone(&events),
            Arc::clone(&events),
        );
        let callbacks = CircuitBreakerCallbacks::new()
            .on_state_change(move |_, t| a.lock().push(format!("state:{}", t.to)))
            .on_request_success(move |_, _| b.lock().push("success".into()))
            .on_request_failure(move |_, _, _| c.lock().push("failure".into()))
            .on_request_rejected(move |_| d.lock().push("rejected".into()));

        let cb = CircuitBreaker::with_callbacks(
            CircuitBreakerConfig {
                failure_threshold: 1,
                ..Default::default()
            },
            callbacks,
        );

        let _ = cb.call(|| async { Ok::<_, String>(()) }).await;
        let _ = cb.call(|| async { Err::<(), _>("boom".to_string()) }).await;
        let _ = cb.call(|| async { Ok::<_, String>(()) }).await;

        assert_eq!(
            *events.lock(),
            vec!["success", "state:open", "failure", "rejected"]
        );
    }

    #[test]
    fn test_breaker_errors_convert_to_taxonomy() {
        let open: CircuitBreakerError<String> = CircuitBreakerError::CircuitOpen {
            component: "bridge".to_string(),
        };
        let error = open.to_resilience_error("bridge");
        assert_eq!(error.code, "CIRCUIT_BREAKER_OPEN");
        assert_eq!(error.category, ErrorCategory::Bridge);
        assert_eq!(error.recovery.strategy, RecoveryStrategy::CircuitBreaker);

        let failed: CircuitBreakerError<String> =
            CircuitBreakerError::OperationFailed("connection refused".to_string());
        let error = failed.to_resilience_error("network");
        assert_eq!(error.category, ErrorCategory::Network);
        assert_eq!(error.context.component.as_deref(), Some("network"));

        let inner = ResilienceError::telegram("bad gateway");
        let wrapped = CircuitBreakerError::OperationFailed(inner.clone());
        assert_eq!(ResilienceError::from(wrapped), inner);
    }
}
