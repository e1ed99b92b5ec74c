//! # Resilience Configuration
//!
//! Static policy consumed by every fault-tolerance component: per-dependency
//! breaker and retry settings, health-check endpoints, recovery and monitoring
//! blocks, and overrides keyed by operation name and event type.
//!
//! Files express durations as `*_ms` integers; the accessors below return
//! [`Duration`]s. Values are layered by [`ConfigManager`]: environment defaults,
//! then an optional TOML file, then `BRIDGE_RESILIENCE__*` variables.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bridge_resilience::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load_from("config/resilience.toml", "production")?;
//!
//! let telegram = manager.config().circuit_breaker_for("telegram");
//! let send_timeout = manager.config().operation_timeout("sendEvent");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants::dependencies;
use crate::monitoring::{AlertThresholds, ExporterKind};
use crate::recovery::{BackupCondition, BackupStrategy};
use crate::resilience::{CircuitBreakerConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Timeout used when neither an operation override nor the network block sets one
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// One value per protected dependency class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencySettings<T> {
    pub bridge: T,
    pub telegram: T,
    pub filesystem: T,
    pub network: T,
}

impl<T> DependencySettings<T> {
    pub fn get(&self, dependency: &str) -> Option<&T> {
        match dependency {
            dependencies::BRIDGE => Some(&self.bridge),
            dependencies::TELEGRAM => Some(&self.telegram),
            dependencies::FILESYSTEM => Some(&self.filesystem),
            dependencies::NETWORK => Some(&self.network),
            _ => None,
        }
    }

    /// Unknown dependencies use the network block
    pub fn get_or_network(&self, dependency: &str) -> &T {
        self.get(dependency).unwrap_or(&self.network)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &T)> {
        [
            (dependencies::BRIDGE, &self.bridge),
            (dependencies::TELEGRAM, &self.telegram),
            (dependencies::FILESYSTEM, &self.filesystem),
            (dependencies::NETWORK, &self.network),
        ]
        .into_iter()
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        [
            &mut self.bridge,
            &mut self.telegram,
            &mut self.filesystem,
            &mut self.network,
        ]
        .into_iter()
    }
}

/// Breaker settings as written in configuration files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub timeout_ms: u64,
    pub monitoring_window_ms: u64,
    #[serde(default)]
    pub max_concurrent_requests: Option<u32>,
    #[serde(default)]
    pub volume_threshold: Option<u32>,
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

impl CircuitBreakerSettings {
    pub fn to_config(&self, name: &str) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            name: name.to_string(),
            failure_threshold: self.failure_threshold,
            success_threshold: self.success_threshold,
            timeout: Duration::from_millis(self.timeout_ms),
            monitoring_window: Duration::from_millis(self.monitoring_window_ms),
            max_concurrent_requests: self.max_concurrent_requests,
            volume_threshold: self.volume_threshold,
            request_timeout: self.request_timeout_ms.map(Duration::from_millis),
        }
    }
}

impl From<&CircuitBreakerConfig> for CircuitBreakerSettings {
    fn from(config: &CircuitBreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            success_threshold: config.success_threshold,
            timeout_ms: config.timeout.as_millis() as u64,
            monitoring_window_ms: config.monitoring_window.as_millis() as u64,
            max_concurrent_requests: config.max_concurrent_requests,
            volume_threshold: config.volume_threshold,
            request_timeout_ms: config.request_timeout.map(|t| t.as_millis() as u64),
        }
    }
}

/// Retry settings as written in configuration files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_base: f64,
    pub jitter: bool,
    #[serde(default)]
    pub retryable_errors: Vec<String>,
    #[serde(default)]
    pub non_retryable_errors: Vec<String>,
}

impl RetrySettings {
    pub fn to_policy(&self, name: &str) -> RetryPolicy {
        RetryPolicy {
            name: name.to_string(),
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            exponential_base: self.exponential_base,
            jitter: self.jitter,
            retryable_errors: self.retryable_errors.clone(),
            non_retryable_errors: self.non_retryable_errors.clone(),
        }
    }

    fn validate(&self, prefix: &str) -> ConfigResult<()> {
        positive(format!("{prefix}.max_attempts"), u64::from(self.max_attempts))?;
        positive(format!("{prefix}.base_delay_ms"), self.base_delay_ms)?;
        positive(format!("{prefix}.max_delay_ms"), self.max_delay_ms)?;

        if self.max_delay_ms < self.base_delay_ms {
            return Err(ConfigurationError::invalid_value(
                format!("{prefix}.max_delay_ms"),
                self.max_delay_ms.to_string(),
                format!("max_delay_ms must be >= base_delay_ms ({})", self.base_delay_ms),
            ));
        }

        if self.exponential_base <= 1.0 || !self.exponential_base.is_finite() {
            return Err(ConfigurationError::invalid_value(
                format!("{prefix}.exponential_base"),
                self.exponential_base.to_string(),
                "exponential_base must be greater than 1",
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthEndpoint {
    pub name: String,
    pub url: String,
    #[serde(default = "default_http_method")]
    pub method: String,
    pub timeout_ms: u64,
    pub retries: u32,
    #[serde(default)]
    pub critical: bool,
}

fn default_http_method() -> String {
    "GET".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    pub enabled: bool,
    pub interval_ms: u64,
    pub timeout_ms: u64,

    /// Consecutive passing checks before an endpoint counts as healthy
    pub healthy_threshold: u32,

    /// Consecutive failing checks before an endpoint counts as unhealthy
    pub unhealthy_threshold: u32,

    #[serde(default)]
    pub endpoints: Vec<HealthEndpoint>,
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Endpoints whose failure marks the bridge unhealthy
    pub fn critical_endpoints(&self) -> impl Iterator<Item = &HealthEndpoint> {
        self.endpoints.iter().filter(|endpoint| endpoint.critical)
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 30_000,
            timeout_ms: 5_000,
            healthy_threshold: 2,
            unhealthy_threshold: 3,
            endpoints: vec![
                HealthEndpoint {
                    name: "bridge-health".to_string(),
                    url: "http://localhost:8080/health".to_string(),
                    method: default_http_method(),
                    timeout_ms: 5_000,
                    retries: 3,
                    critical: true,
                },
                HealthEndpoint {
                    name: "telegram-api".to_string(),
                    url: "https://api.telegram.org".to_string(),
                    method: default_http_method(),
                    timeout_ms: 10_000,
                    retries: 2,
                    critical: false,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Run sessions immediately from `initiate_recovery`
    pub auto_recovery_enabled: bool,

    /// Upper bound on primary attempts per session
    pub max_recovery_attempts: u32,

    /// Wait between failed attempts
    pub recovery_delay_ms: u64,

    /// Attempts at one strategy before moving up the escalation chain
    pub escalation_threshold: u32,

    /// Overall bound on graceful shutdown
    pub graceful_shutdown_timeout_ms: u64,

    /// Longest a single in-flight session is awaited during shutdown
    pub session_shutdown_timeout_ms: u64,

    pub max_session_history: usize,

    #[serde(default)]
    pub backup_strategies: Vec<BackupStrategy>,
}

impl RecoveryConfig {
    pub fn recovery_delay(&self) -> Duration {
        Duration::from_millis(self.recovery_delay_ms)
    }

    pub fn graceful_shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.graceful_shutdown_timeout_ms)
    }

    pub fn session_shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.session_shutdown_timeout_ms)
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            auto_recovery_enabled: true,
            max_recovery_attempts: 3,
            recovery_delay_ms: 5_000,
            escalation_threshold: 2,
            graceful_shutdown_timeout_ms: 30_000,
            session_shutdown_timeout_ms: crate::constants::recovery::SESSION_SHUTDOWN_TIMEOUT
                .as_millis() as u64,
            max_session_history: crate::constants::recovery::MAX_SESSION_HISTORY,
            backup_strategies: vec![
                BackupStrategy::new(
                    "bridge-restart",
                    1,
                    vec![BackupCondition::BridgeDown, BackupCondition::BridgeCrashed],
                ),
                BackupStrategy::new(
                    "process-restart",
                    2,
                    vec![
                        BackupCondition::BridgeUnresponsive,
                        BackupCondition::BridgeUnhealthy,
                    ],
                ),
                BackupStrategy::new("fallback-mode", 3, vec![BackupCondition::AllRecoveryFailed]),
            ],
        }
    }
}

/// Retention per metric family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionConfig {
    pub system_ms: u64,
    pub application_ms: u64,
    pub resilience_ms: u64,
}

impl RetentionConfig {
    /// Retention for a series, chosen by its `system.`/`app.`/`resilience.` prefix
    pub fn for_metric(&self, name: &str) -> Duration {
        let millis = if name.starts_with("system.") {
            self.system_ms
        } else if name.starts_with("resilience.") {
            self.resilience_ms
        } else {
            self.application_ms
        };
        Duration::from_millis(millis)
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            system_ms: 3_600_000,
            application_ms: 3_600_000,
            resilience_ms: 86_400_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExporterConfig {
    pub kind: ExporterKind,
    pub interval_ms: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Destination for Prometheus text; logged when absent
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

impl ExporterConfig {
    pub fn new(kind: ExporterKind, interval_ms: u64) -> Self {
        Self {
            kind,
            interval_ms,
            enabled: true,
            output_path: None,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub metrics_interval_ms: u64,
    pub alert_thresholds: AlertThresholds,
    pub retention: RetentionConfig,
    #[serde(default)]
    pub exporters: Vec<ExporterConfig>,
}

impl MonitoringConfig {
    pub fn metrics_interval(&self) -> Duration {
        Duration::from_millis(self.metrics_interval_ms)
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            metrics_interval_ms: 10_000,
            alert_thresholds: AlertThresholds::default(),
            retention: RetentionConfig::default(),
            exporters: vec![
                ExporterConfig::new(ExporterKind::Log, 60_000),
                ExporterConfig::new(ExporterKind::ViolationCheck, 30_000),
                ExporterConfig::new(ExporterKind::Prometheus, 15_000),
            ],
        }
    }
}

/// Priority tier for operations and event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-operation overrides, keyed by operation name (e.g. `sendEvent`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationOverride {
    pub priority: Priority,
    pub timeout_ms: u64,
    #[serde(default)]
    pub circuit_breaker: Option<CircuitBreakerSettings>,
    #[serde(default)]
    pub retry: Option<RetrySettings>,
}

/// Per-event-type overrides, keyed by event type (e.g. `task_completion`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTypeOverride {
    pub priority: Priority,
    pub timeout_ms: u64,
}

/// Complete resilience policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResilienceConfig {
    pub circuit_breakers: DependencySettings<CircuitBreakerSettings>,
    pub retry: DependencySettings<RetrySettings>,
    pub health_check: HealthCheckConfig,
    pub recovery: RecoveryConfig,
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub operations: HashMap<String, OperationOverride>,
    #[serde(default)]
    pub event_types: HashMap<String, EventTypeOverride>,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            circuit_breakers: DependencySettings {
                bridge: (&CircuitBreakerConfig::for_bridge()).into(),
                telegram: (&CircuitBreakerConfig::for_telegram()).into(),
                filesystem: (&CircuitBreakerConfig::for_filesystem()).into(),
                network: (&CircuitBreakerConfig::for_network()).into(),
            },
            retry: DependencySettings {
                bridge: RetrySettings {
                    max_attempts: 3,
                    base_delay_ms: 1_000,
                    max_delay_ms: 10_000,
                    exponential_base: 2.0,
                    jitter: true,
                    retryable_errors: codes(&["NETWORK_ERROR", "TIMEOUT_ERROR", "BRIDGE_ERROR"]),
                    non_retryable_errors: codes(&["VALIDATION_ERROR", "SECURITY_VIOLATION"]),
                },
                telegram: RetrySettings {
                    max_attempts: 5,
                    base_delay_ms: 1_000,
                    max_delay_ms: 30_000,
                    exponential_base: 2.0,
                    jitter: true,
                    retryable_errors: codes(&[
                        "NETWORK_ERROR",
                        "TIMEOUT_ERROR",
                        "RATE_LIMIT_EXCEEDED",
                        "TELEGRAM_API_ERROR",
                    ]),
                    non_retryable_errors: codes(&["VALIDATION_ERROR", "SECURITY_VIOLATION"]),
                },
                filesystem: RetrySettings {
                    max_attempts: 3,
                    base_delay_ms: 100,
                    max_delay_ms: 2_000,
                    exponential_base: 2.0,
                    jitter: false,
                    retryable_errors: codes(&["FILESYSTEM_ERROR"]),
                    non_retryable_errors: codes(&["SECURITY_VIOLATION"]),
                },
                network: RetrySettings {
                    max_attempts: 4,
                    base_delay_ms: 500,
                    max_delay_ms: 15_000,
                    exponential_base: 2.0,
                    jitter: true,
                    retryable_errors: codes(&["NETWORK_ERROR", "TIMEOUT_ERROR"]),
                    non_retryable_errors: Vec::new(),
                },
            },
            health_check: HealthCheckConfig::default(),
            recovery: RecoveryConfig::default(),
            monitoring: MonitoringConfig::default(),
            operations: HashMap::from([
                operation("sendEvent", Priority::High, 10_000),
                operation("startBridge", Priority::Critical, 30_000),
                operation("healthCheck", Priority::Normal, 5_000),
            ]),
            event_types: HashMap::from([
                event_type("task_completion", Priority::High, 10_000),
                event_type("build_completed", Priority::Normal, 15_000),
                event_type("security_alert", Priority::Critical, 5_000),
                event_type("approval_request", Priority::High, 30_000),
            ]),
        }
    }
}

fn codes(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn operation(name: &str, priority: Priority, timeout_ms: u64) -> (String, OperationOverride) {
    (
        name.to_string(),
        OperationOverride {
            priority,
            timeout_ms,
            circuit_breaker: None,
            retry: None,
        },
    )
}

fn event_type(name: &str, priority: Priority, timeout_ms: u64) -> (String, EventTypeOverride) {
    (
        name.to_string(),
        EventTypeOverride {
            priority,
            timeout_ms,
        },
    )
}

fn positive(field: String, value: u64) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigurationError::invalid_value(
            field,
            "0",
            "value must be greater than 0",
        ));
    }
    Ok(())
}

impl ResilienceConfig {
    /// Environment variant of the defaults
    ///
    /// `production` widens monitoring windows and allows more recovery attempts,
    /// `development` shortens breaker timeouts, `test` shrinks every delay so
    /// suites run quickly. Unknown environments get the plain defaults.
    pub fn for_environment(environment: &str) -> Self {
        let mut config = Self::default();

        match environment {
            "production" => {
                for breaker in config.circuit_breakers.iter_mut() {
                    breaker.monitoring_window_ms *= 2;
                }
                config.recovery.max_recovery_attempts = 5;
                config.monitoring.metrics_interval_ms = 30_000;
            }
            "development" => {
                for breaker in config.circuit_breakers.iter_mut() {
                    breaker.timeout_ms = (breaker.timeout_ms / 2).max(1);
                }
                config.recovery.recovery_delay_ms = 1_000;
            }
            "test" => {
                for breaker in config.circuit_breakers.iter_mut() {
                    breaker.timeout_ms = 100;
                    breaker.monitoring_window_ms = 1_000;
                }
                for retry in config.retry.iter_mut() {
                    retry.base_delay_ms = 10;
                    retry.max_delay_ms = 100;
                    retry.jitter = false;
                }
                config.recovery.recovery_delay_ms = 10;
                config.recovery.graceful_shutdown_timeout_ms = 1_000;
                config.recovery.session_shutdown_timeout_ms = 500;
                config.monitoring.metrics_interval_ms = 100;
                for exporter in &mut config.monitoring.exporters {
                    exporter.interval_ms = 100;
                }
            }
            _ => {}
        }

        config
    }

    /// Breaker configuration for a dependency; unknown names use the network block
    pub fn circuit_breaker_for(&self, dependency: &str) -> CircuitBreakerConfig {
        self.circuit_breakers
            .get_or_network(dependency)
            .to_config(dependency)
    }

    /// Retry policy for a dependency; unknown names use the network block
    pub fn retry_for(&self, dependency: &str) -> RetryPolicy {
        self.retry.get_or_network(dependency).to_policy(dependency)
    }

    /// Breaker override configured for an operation, if any
    pub fn operation_circuit_breaker(&self, operation: &str) -> Option<CircuitBreakerConfig> {
        self.operations
            .get(operation)
            .and_then(|o| o.circuit_breaker.as_ref())
            .map(|settings| settings.to_config(operation))
    }

    /// Retry override configured for an operation, if any
    pub fn operation_retry(&self, operation: &str) -> Option<RetryPolicy> {
        self.operations
            .get(operation)
            .and_then(|o| o.retry.as_ref())
            .map(|settings| settings.to_policy(operation))
    }

    pub fn operation_timeout(&self, operation: &str) -> Duration {
        self.operations
            .get(operation)
            .map(|o| Duration::from_millis(o.timeout_ms))
            .unwrap_or_else(|| self.default_timeout())
    }

    pub fn operation_priority(&self, operation: &str) -> Priority {
        self.operations
            .get(operation)
            .map(|o| o.priority)
            .unwrap_or(Priority::Normal)
    }

    pub fn event_type_timeout(&self, event_type: &str) -> Duration {
        self.event_types
            .get(event_type)
            .map(|e| Duration::from_millis(e.timeout_ms))
            .unwrap_or_else(|| self.default_timeout())
    }

    pub fn event_type_priority(&self, event_type: &str) -> Priority {
        self.event_types
            .get(event_type)
            .map(|e| e.priority)
            .unwrap_or(Priority::Normal)
    }

    fn default_timeout(&self) -> Duration {
        self.circuit_breakers
            .network
            .request_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_OPERATION_TIMEOUT)
    }

    /// Validate every block
    pub fn validate(&self) -> ConfigResult<()> {
        for (name, settings) in self.circuit_breakers.iter() {
            settings.to_config(name).validate()?;
        }

        for (name, settings) in self.retry.iter() {
            settings.validate(&format!("retry.{name}"))?;
        }

        let health = &self.health_check;
        positive("health_check.interval_ms".into(), health.interval_ms)?;
        positive("health_check.timeout_ms".into(), health.timeout_ms)?;
        positive(
            "health_check.healthy_threshold".into(),
            u64::from(health.healthy_threshold),
        )?;
        positive(
            "health_check.unhealthy_threshold".into(),
            u64::from(health.unhealthy_threshold),
        )?;
        for endpoint in &health.endpoints {
            if endpoint.name.is_empty() {
                return Err(ConfigurationError::missing_required_field(
                    "name",
                    "health_check.endpoints",
                ));
            }
            positive(
                format!("health_check.endpoints.{}.timeout_ms", endpoint.name),
                endpoint.timeout_ms,
            )?;
        }

        let recovery = &self.recovery;
        positive(
            "recovery.max_recovery_attempts".into(),
            u64::from(recovery.max_recovery_attempts),
        )?;
        positive("recovery.recovery_delay_ms".into(), recovery.recovery_delay_ms)?;
        positive(
            "recovery.escalation_threshold".into(),
            u64::from(recovery.escalation_threshold),
        )?;
        positive(
            "recovery.graceful_shutdown_timeout_ms".into(),
            recovery.graceful_shutdown_timeout_ms,
        )?;
        positive(
            "recovery.session_shutdown_timeout_ms".into(),
            recovery.session_shutdown_timeout_ms,
        )?;
        positive(
            "recovery.max_session_history".into(),
            recovery.max_session_history as u64,
        )?;
        for strategy in &recovery.backup_strategies {
            if strategy.name.is_empty() {
                return Err(ConfigurationError::missing_required_field(
                    "name",
                    "recovery.backup_strategies",
                ));
            }
            if strategy.conditions.is_empty() {
                return Err(ConfigurationError::missing_required_field(
                    format!("recovery.backup_strategies.{}.conditions", strategy.name),
                    "backup strategy",
                ));
            }
        }

        let monitoring = &self.monitoring;
        positive(
            "monitoring.metrics_interval_ms".into(),
            monitoring.metrics_interval_ms,
        )?;
        monitoring.alert_thresholds.validate()?;
        positive(
            "monitoring.retention.system_ms".into(),
            monitoring.retention.system_ms,
        )?;
        positive(
            "monitoring.retention.application_ms".into(),
            monitoring.retention.application_ms,
        )?;
        positive(
            "monitoring.retention.resilience_ms".into(),
            monitoring.retention.resilience_ms,
        )?;
        for exporter in &monitoring.exporters {
            positive(
                format!("monitoring.exporters.{}.interval_ms", exporter.kind),
                exporter.interval_ms,
            )?;
        }

        for (name, operation) in &self.operations {
            positive(format!("operations.{name}.timeout_ms"), operation.timeout_ms)?;
            if let Some(breaker) = &operation.circuit_breaker {
                breaker.to_config(name).validate()?;
            }
            if let Some(retry) = &operation.retry {
                retry.validate(&format!("operations.{name}.retry"))?;
            }
        }

        for (name, event_type) in &self.event_types {
            positive(format!("event_types.{name}.timeout_ms"), event_type.timeout_ms)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        for environment in ["production", "development", "test", "staging"] {
            let config = ResilienceConfig::for_environment(environment);
            assert!(
                config.validate().is_ok(),
                "{environment} defaults invalid: {:?}",
                config.validate()
            );
        }
    }

    #[test]
    fn test_dependency_lookups_fall_back_to_network() {
        let config = ResilienceConfig::default();

        let telegram = config.circuit_breaker_for("telegram");
        assert_eq!(telegram.name, "telegram");
        assert_eq!(telegram.failure_threshold, 3);

        let unknown = config.circuit_breaker_for("webhook");
        assert_eq!(unknown.name, "webhook");
        assert_eq!(
            unknown.failure_threshold,
            config.circuit_breakers.network.failure_threshold
        );

        assert_eq!(config.retry_for("telegram").max_attempts, 5);
        assert_eq!(config.retry_for("webhook").max_attempts, 4);
    }

    #[test]
    fn test_operation_and_event_type_overrides() {
        let mut config = ResilienceConfig::default();
        assert_eq!(config.operation_timeout("sendEvent"), Duration::from_secs(10));
        assert_eq!(config.operation_priority("startBridge"), Priority::Critical);
        assert_eq!(config.operation_priority("unknownOp"), Priority::Normal);
        assert_eq!(config.operation_timeout("unknownOp"), Duration::from_secs(10));
        assert_eq!(config.event_type_timeout("security_alert"), Duration::from_secs(5));
        assert_eq!(config.event_type_priority("build_completed"), Priority::Normal);

        assert!(config.operation_circuit_breaker("sendEvent").is_none());
        if let Some(send) = config.operations.get_mut("sendEvent") {
            send.circuit_breaker = Some(config.circuit_breakers.telegram.clone());
        }
        let breaker = config.operation_circuit_breaker("sendEvent").unwrap();
        assert_eq!(breaker.name, "sendEvent");
        assert_eq!(breaker.failure_threshold, 3);
    }

    #[test]
    fn test_operation_retry_and_critical_endpoints() {
        let mut config = ResilienceConfig::default();
        assert!(config.operation_retry("sendEvent").is_none());

        if let Some(send) = config.operations.get_mut("sendEvent") {
            send.retry = Some(config.retry.telegram.clone());
        }
        let policy = config.operation_retry("sendEvent").unwrap();
        assert_eq!(policy.name, "sendEvent");
        assert_eq!(policy.max_attempts, config.retry.telegram.max_attempts);

        let critical: Vec<_> = config
            .health_check
            .critical_endpoints()
            .map(|endpoint| endpoint.name.as_str())
            .collect();
        assert_eq!(critical, vec!["bridge-health"]);
    }

    #[test]
    fn test_environment_variants() {
        let base = ResilienceConfig::default();
        let production = ResilienceConfig::for_environment("production");
        let test = ResilienceConfig::for_environment("test");

        assert_eq!(
            production.circuit_breakers.telegram.monitoring_window_ms,
            base.circuit_breakers.telegram.monitoring_window_ms * 2
        );
        assert_eq!(production.recovery.max_recovery_attempts, 5);
        assert_eq!(test.recovery.recovery_delay_ms, 10);
        assert_eq!(test.retry.telegram.max_delay_ms, 100);
    }

    #[test]
    fn test_validation_rejects_bad_retry() {
        let mut config = ResilienceConfig::default();
        config.retry.telegram.max_delay_ms = 10;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("retry.telegram.max_delay_ms"));

        let mut config = ResilienceConfig::default();
        config.retry.bridge.exponential_base = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_error_rate() {
        let mut config = ResilienceConfig::default();
        config.monitoring.alert_thresholds.error_rate = 1.5;
        assert!(config.validate().is_err());

        let mut config = ResilienceConfig::default();
        config.monitoring.alert_thresholds.error_rate = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let mut config = ResilienceConfig::default();
        config.recovery.escalation_threshold = 0;
        assert!(config.validate().is_err());

        let mut config = ResilienceConfig::default();
        config.circuit_breakers.filesystem.success_threshold = 0;
        assert!(config.validate().is_err());

        let mut config = ResilienceConfig::default();
        config
            .event_types
            .insert("noisy".to_string(), EventTypeOverride { priority: Priority::Low, timeout_ms: 0 });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retention_by_metric_family() {
        let retention = RetentionConfig::default();
        assert_eq!(retention.for_metric("system.cpu_usage"), Duration::from_secs(3600));
        assert_eq!(
            retention.for_metric("resilience.circuit_breaker_trips"),
            Duration::from_secs(86_400)
        );
        assert_eq!(retention.for_metric("app.requests"), Duration::from_secs(3600));
    }
}
