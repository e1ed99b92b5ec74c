//! # Error Taxonomy
//!
//! Every failure handled by the fault-tolerance core is represented as a
//! [`ResilienceError`]: a typed record carrying category, severity, a retryable
//! flag, free-form context and an embedded recovery ledger. The category and
//! severity pick the default recovery strategy and attempt budget; the ledger is
//! only ever appended to through [`ResilienceError::record_recovery_attempt`] and
//! [`ResilienceError::escalate`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, ResilienceError>;

/// Broad failure domain, used to pick default recovery behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Network,
    Filesystem,
    Bridge,
    Telegram,
    Validation,
    Security,
    System,
    Configuration,
    Timeout,
    RateLimit,
    Resource,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Filesystem => "filesystem",
            ErrorCategory::Bridge => "bridge",
            ErrorCategory::Telegram => "telegram",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Security => "security",
            ErrorCategory::System => "system",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::RateLimit => "rate_limit",
            ErrorCategory::Resource => "resource",
            ErrorCategory::Unknown => "unknown",
        }
    }

    /// Whether failures in this category are worth retrying by default
    pub fn is_retryable_by_default(&self) -> bool {
        !matches!(
            self,
            ErrorCategory::Validation | ErrorCategory::Security | ErrorCategory::Configuration
        )
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Impact level; ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Low => "low",
            ErrorSeverity::Medium => "medium",
            ErrorSeverity::High => "high",
            ErrorSeverity::Critical => "critical",
        }
    }

    /// Default recovery attempt budget for this severity
    pub fn default_max_attempts(&self) -> u32 {
        match self {
            ErrorSeverity::Critical => 5,
            ErrorSeverity::High => 3,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::Low => 1,
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recovery strategies, from least to most drastic along the escalation chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    Retry,
    CircuitBreaker,
    Restart,
    Fallback,
    GracefulDegradation,
    Escalate,
    Ignore,
    Manual,
}

impl RecoveryStrategy {
    pub const ALL: [RecoveryStrategy; 8] = [
        RecoveryStrategy::Retry,
        RecoveryStrategy::CircuitBreaker,
        RecoveryStrategy::Restart,
        RecoveryStrategy::Fallback,
        RecoveryStrategy::GracefulDegradation,
        RecoveryStrategy::Escalate,
        RecoveryStrategy::Ignore,
        RecoveryStrategy::Manual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryStrategy::Retry => "retry",
            RecoveryStrategy::CircuitBreaker => "circuit_breaker",
            RecoveryStrategy::Restart => "restart",
            RecoveryStrategy::Fallback => "fallback",
            RecoveryStrategy::GracefulDegradation => "graceful_degradation",
            RecoveryStrategy::Escalate => "escalate",
            RecoveryStrategy::Ignore => "ignore",
            RecoveryStrategy::Manual => "manual",
        }
    }

    /// Next strategy in the escalation chain
    ///
    /// `retry → circuit_breaker → restart → graceful_degradation → escalate → manual`,
    /// with `manual` escalating to itself, `fallback` joining the chain at `restart`
    /// and `ignore` starting over at `retry`.
    pub fn escalate(self) -> RecoveryStrategy {
        match self {
            RecoveryStrategy::Retry => RecoveryStrategy::CircuitBreaker,
            RecoveryStrategy::CircuitBreaker => RecoveryStrategy::Restart,
            RecoveryStrategy::Restart => RecoveryStrategy::GracefulDegradation,
            RecoveryStrategy::Fallback => RecoveryStrategy::Restart,
            RecoveryStrategy::GracefulDegradation => RecoveryStrategy::Escalate,
            RecoveryStrategy::Escalate => RecoveryStrategy::Manual,
            RecoveryStrategy::Ignore => RecoveryStrategy::Retry,
            RecoveryStrategy::Manual => RecoveryStrategy::Manual,
        }
    }

    /// Default strategy for a failure of the given shape
    pub fn default_for(category: ErrorCategory, severity: ErrorSeverity, retryable: bool) -> Self {
        if !retryable {
            return if severity == ErrorSeverity::Critical {
                RecoveryStrategy::Escalate
            } else {
                RecoveryStrategy::Ignore
            };
        }

        match category {
            ErrorCategory::Network | ErrorCategory::Timeout => RecoveryStrategy::Retry,
            ErrorCategory::RateLimit => RecoveryStrategy::CircuitBreaker,
            ErrorCategory::Bridge => RecoveryStrategy::Restart,
            ErrorCategory::Security | ErrorCategory::Validation => RecoveryStrategy::Escalate,
            ErrorCategory::System | ErrorCategory::Resource => {
                RecoveryStrategy::GracefulDegradation
            }
            _ => RecoveryStrategy::Retry,
        }
    }
}

impl fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and when a failure happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub operation: Option<String>,
    pub component: Option<String>,
    pub correlation_id: String,
    pub environment: Option<String>,
    pub version: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            operation: None,
            component: None,
            correlation_id: Uuid::new_v4().to_string(),
            environment: std::env::var("BRIDGE_ENV").ok(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }
}

/// One entry of the append-only recovery ledger carried by an error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryAttemptRecord {
    pub strategy: RecoveryStrategy,
    pub attempt: u32,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub duration: Duration,
    pub error: Option<String>,
}

/// Recovery plan and history embedded in every [`ResilienceError`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryInfo {
    pub strategy: RecoveryStrategy,
    pub max_attempts: u32,
    pub current_attempt: u32,
    pub escalation_level: u32,
    pub attempts: Vec<RecoveryAttemptRecord>,
}

impl RecoveryInfo {
    fn planned(strategy: RecoveryStrategy, max_attempts: u32) -> Self {
        Self {
            strategy,
            max_attempts,
            current_attempt: 0,
            escalation_level: 0,
            attempts: Vec::new(),
        }
    }
}

/// Typed failure record consumed by breakers, the recovery manager and metrics
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("[{code}] {message}")]
pub struct ResilienceError {
    pub code: String,
    pub message: String,
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub retryable: bool,
    pub context: ErrorContext,
    pub recovery: RecoveryInfo,
    /// Rendered underlying cause, when the failure wraps a foreign error
    pub cause: Option<String>,
}

impl ResilienceError {
    /// Create an error whose retryability, strategy and attempt budget follow
    /// the category and severity defaults
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        category: ErrorCategory,
        severity: ErrorSeverity,
    ) -> Self {
        let retryable = category.is_retryable_by_default();
        Self {
            code: code.into(),
            message: message.into(),
            category,
            severity,
            retryable,
            context: ErrorContext::default(),
            recovery: RecoveryInfo::planned(
                RecoveryStrategy::default_for(category, severity, retryable),
                severity.default_max_attempts(),
            ),
            cause: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new("NETWORK_ERROR", message, ErrorCategory::Network, ErrorSeverity::Medium)
    }

    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        let operation = operation.into();
        Self::new(
            "TIMEOUT_ERROR",
            format!("Operation '{operation}' timed out after {}ms", after.as_millis()),
            ErrorCategory::Timeout,
            ErrorSeverity::Medium,
        )
        .with_operation(operation)
        .with_metadata("timeout_ms", after.as_millis() as u64)
    }

    pub fn rate_limit(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        let error = Self::new(
            "RATE_LIMIT_EXCEEDED",
            message,
            ErrorCategory::RateLimit,
            ErrorSeverity::Medium,
        );
        match retry_after {
            Some(delay) => error.with_metadata("retry_after_ms", delay.as_millis() as u64),
            None => error,
        }
    }

    pub fn bridge(message: impl Into<String>) -> Self {
        Self::new("BRIDGE_ERROR", message, ErrorCategory::Bridge, ErrorSeverity::High)
            .with_component("bridge")
    }

    pub fn telegram(message: impl Into<String>) -> Self {
        Self::new(
            "TELEGRAM_API_ERROR",
            message,
            ErrorCategory::Telegram,
            ErrorSeverity::Medium,
        )
        .with_component("telegram")
    }

    pub fn filesystem(message: impl Into<String>) -> Self {
        Self::new(
            "FILESYSTEM_ERROR",
            message,
            ErrorCategory::Filesystem,
            ErrorSeverity::Medium,
        )
        .with_component("filesystem")
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            "VALIDATION_ERROR",
            message,
            ErrorCategory::Validation,
            ErrorSeverity::Low,
        )
        .with_metadata("field", field.into())
    }

    pub fn security(message: impl Into<String>) -> Self {
        Self::new(
            "SECURITY_VIOLATION",
            message,
            ErrorCategory::Security,
            ErrorSeverity::Critical,
        )
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(
            "CONFIGURATION_ERROR",
            message,
            ErrorCategory::Configuration,
            ErrorSeverity::High,
        )
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new("SYSTEM_ERROR", message, ErrorCategory::System, ErrorSeverity::High)
    }

    pub fn resource(message: impl Into<String>) -> Self {
        Self::new(
            "RESOURCE_EXHAUSTED",
            message,
            ErrorCategory::Resource,
            ErrorSeverity::High,
        )
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new("UNKNOWN_ERROR", message, ErrorCategory::Unknown, ErrorSeverity::Medium)
    }

    /// Build an error from a free-form failure message, classifying it first
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        match Self::classify(&message) {
            ErrorCategory::Network => Self::network(message),
            ErrorCategory::Timeout => Self::new(
                "TIMEOUT_ERROR",
                message,
                ErrorCategory::Timeout,
                ErrorSeverity::Medium,
            ),
            ErrorCategory::RateLimit => Self::rate_limit(message, None),
            ErrorCategory::Filesystem => Self::filesystem(message),
            ErrorCategory::Security => Self::security(message),
            ErrorCategory::Validation => Self::validation("unknown", message),
            ErrorCategory::Configuration => Self::configuration(message),
            ErrorCategory::Resource => Self::resource(message),
            ErrorCategory::Bridge => Self::bridge(message),
            ErrorCategory::Telegram => Self::telegram(message),
            ErrorCategory::System => Self::system(message),
            ErrorCategory::Unknown => Self::unknown(message),
        }
    }

    /// Map a failure message onto a category by well-known patterns
    pub fn classify(message: &str) -> ErrorCategory {
        let lower = message.to_lowercase();
        let has = |patterns: &[&str]| patterns.iter().any(|p| lower.contains(p));

        if has(&["timeout", "timed out", "deadline exceeded"]) {
            ErrorCategory::Timeout
        } else if has(&["rate limit", "too many requests", "429", "retry after"]) {
            ErrorCategory::RateLimit
        } else if has(&["permission denied", "unauthorized", "forbidden", "403", "401"]) {
            ErrorCategory::Security
        } else if has(&[
            "connection refused",
            "connection reset",
            "econnrefused",
            "econnreset",
            "dns",
            "network",
            "unreachable",
            "socket",
        ]) {
            ErrorCategory::Network
        } else if has(&["no such file", "enoent", "disk full", "enospc", "file", "directory"]) {
            ErrorCategory::Filesystem
        } else if has(&["out of memory", "too many open files", "exhausted", "capacity"]) {
            ErrorCategory::Resource
        } else if has(&["invalid", "validation", "malformed", "parse"]) {
            ErrorCategory::Validation
        } else if has(&["config"]) {
            ErrorCategory::Configuration
        } else if has(&["telegram", "bot api"]) {
            ErrorCategory::Telegram
        } else if has(&["bridge"]) {
            ErrorCategory::Bridge
        } else {
            ErrorCategory::Unknown
        }
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.context.component = Some(component.into());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.context.correlation_id = correlation_id.into();
        self
    }

    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.context.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self.replan();
        self
    }

    /// Override retryability; the default strategy is re-derived
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self.replan();
        self
    }

    pub fn with_strategy(mut self, strategy: RecoveryStrategy) -> Self {
        self.recovery.strategy = strategy;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.recovery.max_attempts = max_attempts;
        self
    }

    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    fn replan(&mut self) {
        if self.recovery.attempts.is_empty() {
            self.recovery.strategy =
                RecoveryStrategy::default_for(self.category, self.severity, self.retryable);
            self.recovery.max_attempts = self.severity.default_max_attempts();
        }
    }

    /// Append an attempt to the recovery ledger
    pub fn record_recovery_attempt(
        &mut self,
        strategy: RecoveryStrategy,
        success: bool,
        duration: Duration,
        error: Option<String>,
    ) {
        self.recovery.current_attempt += 1;
        self.recovery.attempts.push(RecoveryAttemptRecord {
            strategy,
            attempt: self.recovery.current_attempt,
            timestamp: Utc::now(),
            success,
            duration,
            error,
        });
    }

    /// Move one step up the escalation chain, returning the new strategy
    pub fn escalate(&mut self) -> RecoveryStrategy {
        self.recovery.escalation_level += 1;
        self.recovery.strategy = self.recovery.strategy.escalate();
        self.recovery.strategy
    }

    /// Whether another recovery attempt is allowed for this error
    pub fn can_retry(&self) -> bool {
        self.retryable && self.recovery.current_attempt < self.recovery.max_attempts
    }

    pub fn attempts_remaining(&self) -> u32 {
        self.recovery
            .max_attempts
            .saturating_sub(self.recovery.current_attempt)
    }

    /// Suggested wait before retrying, when the failure carried one
    pub fn retry_after(&self) -> Option<Duration> {
        self.context
            .metadata
            .get("retry_after_ms")
            .and_then(serde_json::Value::as_u64)
            .map(Duration::from_millis)
    }

    /// Flattened record for the structured logging sink
    pub fn to_log_fields(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code,
            "message": self.message,
            "category": self.category.as_str(),
            "severity": self.severity.as_str(),
            "retryable": self.retryable,
            "operation": self.context.operation,
            "component": self.context.component,
            "correlation_id": self.context.correlation_id,
            "environment": self.context.environment,
            "version": self.context.version,
            "strategy": self.recovery.strategy.as_str(),
            "current_attempt": self.recovery.current_attempt,
            "max_attempts": self.recovery.max_attempts,
            "escalation_level": self.recovery.escalation_level,
            "metadata": self.context.metadata,
            "cause": self.cause,
        })
    }

    /// Emit this error to the logging sink at a level matching its severity
    pub fn log(&self) {
        let fields = self.to_log_fields();
        match self.severity {
            ErrorSeverity::Low => tracing::info!(
                code = %self.code,
                category = %self.category,
                severity = %self.severity,
                context = %fields,
                "⚠️ {}", self.message
            ),
            ErrorSeverity::Medium => tracing::warn!(
                code = %self.code,
                category = %self.category,
                severity = %self.severity,
                context = %fields,
                "⚠️ {}", self.message
            ),
            ErrorSeverity::High | ErrorSeverity::Critical => tracing::error!(
                code = %self.code,
                category = %self.category,
                severity = %self.severity,
                context = %fields,
                "❌ {}", self.message
            ),
        }
    }
}

impl From<std::io::Error> for ResilienceError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let base = match err.kind() {
            ErrorKind::TimedOut => Self::new(
                "TIMEOUT_ERROR",
                err.to_string(),
                ErrorCategory::Timeout,
                ErrorSeverity::Medium,
            ),
            ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::AddrNotAvailable
            | ErrorKind::BrokenPipe => Self::network(err.to_string()),
            ErrorKind::PermissionDenied => Self::security(err.to_string()),
            _ => Self::filesystem(err.to_string()),
        };
        base.with_cause(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_defaults_pick_strategy() {
        assert_eq!(
            ResilienceError::network("down").recovery.strategy,
            RecoveryStrategy::Retry
        );
        assert_eq!(
            ResilienceError::rate_limit("slow down", None).recovery.strategy,
            RecoveryStrategy::CircuitBreaker
        );
        assert_eq!(
            ResilienceError::bridge("crashed").recovery.strategy,
            RecoveryStrategy::Restart
        );
        assert_eq!(
            ResilienceError::system("overloaded").recovery.strategy,
            RecoveryStrategy::GracefulDegradation
        );
        assert_eq!(
            ResilienceError::unknown("?").recovery.strategy,
            RecoveryStrategy::Retry
        );
    }

    #[test]
    fn test_non_retryable_errors_escalate_or_ignore() {
        // Security is critical and not retryable by default
        let security = ResilienceError::security("token leaked");
        assert!(!security.retryable);
        assert_eq!(security.recovery.strategy, RecoveryStrategy::Escalate);

        let validation = ResilienceError::validation("chat_id", "missing");
        assert!(!validation.retryable);
        assert_eq!(validation.recovery.strategy, RecoveryStrategy::Ignore);

        let network = ResilienceError::network("flaky").with_retryable(false);
        assert_eq!(network.recovery.strategy, RecoveryStrategy::Ignore);
    }

    #[test]
    fn test_severity_sets_attempt_budget() {
        assert_eq!(ErrorSeverity::Critical.default_max_attempts(), 5);
        assert_eq!(ErrorSeverity::High.default_max_attempts(), 3);
        assert_eq!(ErrorSeverity::Medium.default_max_attempts(), 2);
        assert_eq!(ErrorSeverity::Low.default_max_attempts(), 1);

        let error = ResilienceError::network("down").with_severity(ErrorSeverity::High);
        assert_eq!(error.recovery.max_attempts, 3);
    }

    #[test]
    fn test_escalation_chain_is_total() {
        use RecoveryStrategy::*;
        assert_eq!(Retry.escalate(), CircuitBreaker);
        assert_eq!(CircuitBreaker.escalate(), Restart);
        assert_eq!(Restart.escalate(), GracefulDegradation);
        assert_eq!(GracefulDegradation.escalate(), Escalate);
        assert_eq!(Escalate.escalate(), Manual);
        assert_eq!(Manual.escalate(), Manual);
        assert_eq!(Fallback.escalate(), Restart);
        assert_eq!(Ignore.escalate(), Retry);
    }

    #[test]
    fn test_recovery_ledger_is_append_only() {
        let mut error = ResilienceError::network("down").with_severity(ErrorSeverity::High);
        assert!(error.can_retry());

        error.record_recovery_attempt(
            RecoveryStrategy::Retry,
            false,
            Duration::from_millis(10),
            Some("still down".to_string()),
        );
        error.record_recovery_attempt(RecoveryStrategy::Retry, false, Duration::ZERO, None);
        assert_eq!(error.recovery.current_attempt, 2);
        assert_eq!(error.recovery.attempts[1].attempt, 2);
        assert_eq!(error.attempts_remaining(), 1);

        assert_eq!(error.escalate(), RecoveryStrategy::CircuitBreaker);
        assert_eq!(error.recovery.escalation_level, 1);

        error.record_recovery_attempt(RecoveryStrategy::CircuitBreaker, true, Duration::ZERO, None);
        assert!(!error.can_retry());
        // Replanning is frozen once attempts exist
        let error = error.with_severity(ErrorSeverity::Critical);
        assert_eq!(error.recovery.strategy, RecoveryStrategy::CircuitBreaker);
    }

    #[test]
    fn test_classify_messages() {
        assert_eq!(ResilienceError::classify("request timed out"), ErrorCategory::Timeout);
        assert_eq!(
            ResilienceError::classify("HTTP 429 Too Many Requests"),
            ErrorCategory::RateLimit
        );
        assert_eq!(
            ResilienceError::classify("connect ECONNREFUSED 127.0.0.1:8080"),
            ErrorCategory::Network
        );
        assert_eq!(
            ResilienceError::classify("ENOENT: no such file or directory"),
            ErrorCategory::Filesystem
        );
        assert_eq!(ResilienceError::classify("something odd"), ErrorCategory::Unknown);
    }

    #[test]
    fn test_display_and_log_fields() {
        let error = ResilienceError::timeout("sendEvent", Duration::from_millis(1500))
            .with_component("telegram")
            .with_correlation_id("corr-1");

        assert_eq!(
            error.to_string(),
            "[TIMEOUT_ERROR] Operation 'sendEvent' timed out after 1500ms"
        );

        let fields = error.to_log_fields();
        assert_eq!(fields["category"], "timeout");
        assert_eq!(fields["operation"], "sendEvent");
        assert_eq!(fields["component"], "telegram");
        assert_eq!(fields["correlation_id"], "corr-1");
        assert_eq!(fields["metadata"]["timeout_ms"], 1500);
    }

    #[test]
    fn test_io_error_conversion() {
        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let error = ResilienceError::from(refused);
        assert_eq!(error.category, ErrorCategory::Network);
        assert_eq!(error.cause.as_deref(), Some("refused"));

        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(ResilienceError::from(missing).category, ErrorCategory::Filesystem);
    }

    #[test]
    fn test_rate_limit_retry_after() {
        let error = ResilienceError::rate_limit("slow down", Some(Duration::from_secs(3)));
        assert_eq!(error.retry_after(), Some(Duration::from_secs(3)));
        assert_eq!(ResilienceError::network("x").retry_after(), None);
    }
}
