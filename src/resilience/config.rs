//! # Circuit Breaker Configuration
//!
//! Per-dependency breaker settings and their validation. System-wide policy
//! (four dependency classes, overrides by operation name) lives in
//! `crate::config::ResilienceConfig`, which produces these values.

use crate::config::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a single circuit breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Dependency name the breaker protects
    pub name: String,

    /// Consecutive failures before opening (also scaled into a windowed rate)
    pub failure_threshold: u32,

    /// Consecutive half-open successes required to close
    pub success_threshold: u32,

    /// Time to stay open before admitting a probe
    pub timeout: Duration,

    /// Span over which the failure rate is computed
    pub monitoring_window: Duration,

    /// Cap on in-flight requests admitted through the breaker
    pub max_concurrent_requests: Option<u32>,

    /// Minimum total requests before the breaker is allowed to trip
    pub volume_threshold: Option<u32>,

    /// Default per-call timeout applied to protected operations
    pub request_timeout: Option<Duration>,
}

impl CircuitBreakerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create configuration for the bridge process tier
    pub fn for_bridge() -> Self {
        Self {
            name: "bridge".to_string(),
            failure_threshold: 5,
            success_threshold: 3,
            timeout: Duration::from_secs(30),
            monitoring_window: Duration::from_secs(60),
            max_concurrent_requests: Some(10),
            volume_threshold: Some(10),
            request_timeout: Some(Duration::from_secs(10)),
        }
    }

    /// Create configuration for Telegram API calls
    pub fn for_telegram() -> Self {
        Self {
            name: "telegram".to_string(),
            failure_threshold: 3,
            success_threshold: 2,
            timeout: Duration::from_secs(60),
            monitoring_window: Duration::from_secs(120),
            max_concurrent_requests: Some(5),
            volume_threshold: Some(5),
            request_timeout: Some(Duration::from_secs(15)),
        }
    }

    /// Create configuration for the durable file tier
    pub fn for_filesystem() -> Self {
        Self {
            name: "filesystem".to_string(),
            failure_threshold: 10,
            success_threshold: 5,
            timeout: Duration::from_secs(10),
            monitoring_window: Duration::from_secs(30),
            max_concurrent_requests: Some(20),
            volume_threshold: Some(20),
            request_timeout: Some(Duration::from_secs(5)),
        }
    }

    /// Create configuration for generic network calls
    pub fn for_network() -> Self {
        Self {
            name: "network".to_string(),
            failure_threshold: 5,
            success_threshold: 3,
            timeout: Duration::from_secs(30),
            monitoring_window: Duration::from_secs(60),
            max_concurrent_requests: Some(15),
            volume_threshold: Some(10),
            request_timeout: Some(Duration::from_secs(10)),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let field = |suffix: &str| format!("circuit_breakers.{}.{suffix}", self.name);

        if self.name.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "name",
                "circuit breaker configuration",
            ));
        }

        if self.failure_threshold == 0 {
            return Err(ConfigurationError::invalid_value(
                field("failure_threshold"),
                "0",
                "failure_threshold must be greater than 0",
            ));
        }

        if self.success_threshold == 0 {
            return Err(ConfigurationError::invalid_value(
                field("success_threshold"),
                "0",
                "success_threshold must be greater than 0",
            ));
        }

        if self.timeout.is_zero() {
            return Err(ConfigurationError::invalid_value(
                field("timeout"),
                "0",
                "timeout must be greater than 0",
            ));
        }

        if self.monitoring_window.is_zero() {
            return Err(ConfigurationError::invalid_value(
                field("monitoring_window"),
                "0",
                "monitoring_window must be greater than 0",
            ));
        }

        if self.max_concurrent_requests == Some(0) {
            return Err(ConfigurationError::invalid_value(
                field("max_concurrent_requests"),
                "0",
                "max_concurrent_requests must be greater than 0 when set",
            ));
        }

        if self.volume_threshold == Some(0) {
            return Err(ConfigurationError::invalid_value(
                field("volume_threshold"),
                "0",
                "volume_threshold must be greater than 0 when set",
            ));
        }

        if self.request_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigurationError::invalid_value(
                field("request_timeout"),
                "0",
                "request_timeout must be greater than 0 when set",
            ));
        }

        Ok(())
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_secs(30),
            monitoring_window: Duration::from_secs(60),
            max_concurrent_requests: None,
            volume_threshold: None,
            request_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_breaker_config_validation() {
        // Valid config should pass
        let valid_config = CircuitBreakerConfig::default();
        assert!(valid_config.validate().is_ok());

        // Invalid failure threshold
        let mut invalid_config = CircuitBreakerConfig {
            failure_threshold: 0,
            ..Default::default()
        };
        assert!(invalid_config.validate().is_err());

        // Invalid timeout
        invalid_config = CircuitBreakerConfig {
            timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(invalid_config.validate().is_err());

        // Invalid success threshold
        invalid_config = CircuitBreakerConfig {
            success_threshold: 0,
            ..Default::default()
        };
        assert!(invalid_config.validate().is_err());

        invalid_config = CircuitBreakerConfig {
            max_concurrent_requests: Some(0),
            ..Default::default()
        };
        assert!(invalid_config.validate().is_err());
    }

    #[test]
    fn test_preset_configurations() {
        for config in [
            CircuitBreakerConfig::for_bridge(),
            CircuitBreakerConfig::for_telegram(),
            CircuitBreakerConfig::for_filesystem(),
            CircuitBreakerConfig::for_network(),
        ] {
            assert!(config.validate().is_ok(), "{} preset invalid", config.name);
        }

        assert_eq!(CircuitBreakerConfig::for_telegram().failure_threshold, 3);
        assert_eq!(
            CircuitBreakerConfig::for_bridge().with_name("bridge-webhook").name,
            "bridge-webhook"
        );
    }

    #[test]
    fn test_validation_error_names_field() {
        let config = CircuitBreakerConfig {
            name: "telegram".to_string(),
            monitoring_window: Duration::ZERO,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("circuit_breakers.telegram.monitoring_window"));
    }
}
