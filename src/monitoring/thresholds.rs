//! # Threshold Violations
//!
//! Compares current aggregated values against configured alert thresholds.
//! A value above its threshold produces a violation with the fixed severity
//! of its metric: CPU and memory are high, response time is medium and the
//! error rate is critical.

use crate::config::{ConfigResult, ConfigurationError};
use crate::constants::metrics as names;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Percent
    pub cpu_usage: f64,
    /// Percent of total memory
    pub memory_usage: f64,
    /// Average response time
    pub response_time_ms: u64,
    /// Fraction of requests that failed, `0 ≤ error_rate ≤ 1`
    pub error_rate: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            cpu_usage: 80.0,
            memory_usage: 85.0,
            response_time_ms: 5_000,
            error_rate: 0.05,
        }
    }
}

impl AlertThresholds {
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, value) in [
            ("cpu_usage", self.cpu_usage),
            ("memory_usage", self.memory_usage),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigurationError::invalid_value(
                    format!("monitoring.alert_thresholds.{field}"),
                    value.to_string(),
                    "must be a positive percentage",
                ));
            }
        }
        if self.response_time_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "monitoring.alert_thresholds.response_time_ms",
                "0",
                "must be greater than 0",
            ));
        }
        if !(0.0..=1.0).contains(&self.error_rate) {
            return Err(ConfigurationError::invalid_value(
                "monitoring.alert_thresholds.error_rate",
                self.error_rate.to_string(),
                "must be between 0 and 1",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Medium,
    High,
    Critical,
}

impl ViolationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationSeverity::Medium => "medium",
            ViolationSeverity::High => "high",
            ViolationSeverity::Critical => "critical",
        }
    }

    /// Severity reported when `metric` crosses its threshold
    pub fn for_metric(metric: &str) -> Self {
        match metric {
            names::APP_ERROR_RATE => ViolationSeverity::Critical,
            names::SYSTEM_CPU_USAGE | names::SYSTEM_MEMORY_USAGE => ViolationSeverity::High,
            _ => ViolationSeverity::Medium,
        }
    }
}

impl fmt::Display for ViolationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Degradation alert produced by the metrics collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdViolation {
    pub metric: String,
    pub value: f64,
    pub threshold: f64,
    pub severity: ViolationSeverity,
    pub timestamp: DateTime<Utc>,
}

/// Current values checked against [`AlertThresholds`]; `None` skips a check
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ThresholdInputs {
    pub cpu_usage: Option<f64>,
    pub memory_usage: Option<f64>,
    pub avg_response_time_ms: Option<f64>,
    pub requests: u64,
    pub errors: u64,
}

impl ThresholdInputs {
    /// `errors / requests`, absent until a request has been seen
    pub fn error_rate(&self) -> Option<f64> {
        (self.requests > 0).then(|| self.errors as f64 / self.requests as f64)
    }
}

pub fn detect_violations(
    thresholds: &AlertThresholds,
    inputs: &ThresholdInputs,
    timestamp: DateTime<Utc>,
) -> Vec<ThresholdViolation> {
    let checks = [
        (names::SYSTEM_CPU_USAGE, inputs.cpu_usage, thresholds.cpu_usage),
        (
            names::SYSTEM_MEMORY_USAGE,
            inputs.memory_usage,
            thresholds.memory_usage,
        ),
        (
            names::APP_RESPONSE_TIME,
            inputs.avg_response_time_ms,
            thresholds.response_time_ms as f64,
        ),
        (names::APP_ERROR_RATE, inputs.error_rate(), thresholds.error_rate),
    ];

    checks
        .into_iter()
        .filter_map(|(metric, value, threshold)| {
            let value = value?;
            (value > threshold).then(|| ThresholdViolation {
                metric: metric.to_string(),
                value,
                threshold,
                severity: ViolationSeverity::for_metric(metric),
                timestamp,
            })
        })
        .collect()
}
