//! # System Constants
//!
//! Core constants and shared enums that define the operational boundaries of the
//! bridge fault-tolerance core: ring capacities, default timings and the health
//! classification shared by breakers and the metrics collector.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Health classification reported by circuit breakers and the metrics collector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }

    /// Check if this health status indicates a problem
    pub fn is_problematic(&self) -> bool {
        matches!(self, HealthStatus::Unhealthy)
    }

    /// Check if this health status still admits normal operation
    pub fn is_operational(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Circuit breaker capacities and defaults
pub mod circuit_breaker {
    use std::time::Duration;

    /// State transitions kept per breaker (oldest dropped first)
    pub const MAX_STATE_HISTORY: usize = 100;

    /// Individual outcomes kept for windowed failure-rate calculation
    pub const MAX_RECENT_OUTCOMES: usize = 1000;

    /// Fallback timeout when neither the call nor the breaker configures one
    pub const DEFAULT_FALLBACK_TIMEOUT: Duration = Duration::from_secs(5);

    /// Failure rate below which a closed breaker is healthy
    pub const HEALTHY_FAILURE_RATE: f64 = 0.1;

    /// Failure rate below which a closed breaker is only degraded
    pub const DEGRADED_FAILURE_RATE: f64 = 0.5;

    /// Divisor turning an integer failure threshold into a fractional rate
    pub const FAILURE_RATE_DIVISOR: f64 = 10.0;
}

/// Recovery manager capacities and defaults
pub mod recovery {
    use std::time::Duration;

    /// Completed sessions retained in history
    pub const MAX_SESSION_HISTORY: usize = 100;

    /// Longest a single in-flight session is awaited during shutdown
    pub const SESSION_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

    /// Components the restart strategy knows how to restart
    pub const RESTARTABLE_COMPONENTS: &[&str] = &["bridge", "telegram-bridge", "process"];
}

/// Metrics collector names and defaults
pub mod metrics {
    /// Prefix applied to every series in Prometheus exposition
    pub const PROMETHEUS_PREFIX: &str = "bridge";

    /// Violations retained for health reporting
    pub const MAX_VIOLATIONS: usize = 500;

    pub const SYSTEM_CPU_USAGE: &str = "system.cpu_usage";
    pub const SYSTEM_MEMORY_USAGE: &str = "system.memory_usage";
    pub const SYSTEM_MEMORY_USED_BYTES: &str = "system.memory_used_bytes";
    pub const SYSTEM_NETWORK_RX_BYTES: &str = "system.network_rx_bytes";
    pub const SYSTEM_NETWORK_TX_BYTES: &str = "system.network_tx_bytes";

    pub const APP_REQUESTS: &str = "app.requests";
    pub const APP_ERRORS: &str = "app.errors";
    pub const APP_RESPONSE_TIME: &str = "app.response_time";
    pub const APP_ERROR_RATE: &str = "app.error_rate";

    pub const RESILIENCE_CIRCUIT_BREAKER_TRIPS: &str = "resilience.circuit_breaker_trips";
    pub const RESILIENCE_RECOVERY_ATTEMPTS: &str = "resilience.recovery_attempts";
}

/// Dependency classes the bridge protects with dedicated breakers
pub mod dependencies {
    pub const BRIDGE: &str = "bridge";
    pub const TELEGRAM: &str = "telegram";
    pub const FILESYSTEM: &str = "filesystem";
    pub const NETWORK: &str = "network";

    pub const ALL: &[&str] = &[BRIDGE, TELEGRAM, FILESYSTEM, NETWORK];
}
