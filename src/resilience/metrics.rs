//! # Circuit Breaker Metrics
//!
//! Per-breaker statistics and the system-wide aggregation used for health
//! reporting and the registry's health score.

use crate::constants::HealthStatus;
use crate::resilience::CircuitState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Statistics owned by a single breaker's state manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerMetrics {
    /// Requests admitted and started
    pub total_requests: u64,

    pub successful_requests: u64,

    /// Failed requests, timeouts included
    pub failed_requests: u64,

    pub rejected_requests: u64,

    pub timeout_requests: u64,

    /// Requests started but not yet completed
    pub active_requests: u64,

    /// Running average over completed requests
    pub average_response_time: Duration,

    pub consecutive_successes: u64,
    pub consecutive_failures: u64,

    pub last_success_time: Option<DateTime<Utc>>,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub last_rejection_time: Option<DateTime<Utc>>,
}

impl CircuitBreakerMetrics {
    /// Create new metrics instance with zero values
    pub fn new() -> Self {
        Self {
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            rejected_requests: 0,
            timeout_requests: 0,
            active_requests: 0,
            average_response_time: Duration::ZERO,
            consecutive_successes: 0,
            consecutive_failures: 0,
            last_success_time: None,
            last_failure_time: None,
            last_rejection_time: None,
        }
    }

    /// Completed requests (successes plus failures)
    pub fn completed_requests(&self) -> u64 {
        self.successful_requests + self.failed_requests
    }

    /// Lifetime failure rate over completed requests
    pub fn lifetime_failure_rate(&self) -> f64 {
        match self.completed_requests() {
            0 => 0.0,
            completed => self.failed_requests as f64 / completed as f64,
        }
    }
}

impl Default for CircuitBreakerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of one breaker for reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub health: HealthStatus,

    /// Failure rate inside the monitoring window
    pub failure_rate: f64,

    /// Mean response time inside the monitoring window
    pub window_response_time: Duration,

    pub last_state_change: DateTime<Utc>,
    pub metrics: CircuitBreakerMetrics,
}

impl CircuitBreakerSnapshot {
    /// Check if the snapshot indicates healthy operation
    pub fn is_healthy(&self) -> bool {
        self.health == HealthStatus::Healthy
    }

    /// Get human-readable state description
    pub fn state_description(&self) -> &'static str {
        match self.state {
            CircuitState::Closed => "Healthy - Normal operation",
            CircuitState::Open => "Failing - Rejecting all calls",
            CircuitState::HalfOpen => "Recovering - Testing dependency health",
        }
    }

    /// Format metrics for logging
    pub fn format_summary(&self) -> String {
        format!(
            "{}: {} | Requests: {} | Failure rate: {:.1}% | Rejected: {} | Avg: {}ms",
            self.name,
            self.state_description(),
            self.metrics.total_requests,
            self.failure_rate * 100.0,
            self.metrics.rejected_requests,
            self.metrics.average_response_time.as_millis()
        )
    }
}

/// System-wide circuit breaker metrics aggregator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemCircuitBreakerMetrics {
    /// Snapshots for individual circuit breakers by name
    pub circuit_breakers: HashMap<String, CircuitBreakerSnapshot>,

    /// Timestamp of last metrics collection
    pub collected_at: DateTime<Utc>,
}

impl SystemCircuitBreakerMetrics {
    pub fn new() -> Self {
        Self {
            circuit_breakers: HashMap::new(),
            collected_at: Utc::now(),
        }
    }

    pub fn add_circuit_breaker(&mut self, snapshot: CircuitBreakerSnapshot) {
        self.circuit_breakers.insert(snapshot.name.clone(), snapshot);
        self.collected_at = Utc::now();
    }

    /// Get count of circuit breakers by state
    pub fn count_by_state(&self) -> HashMap<CircuitState, usize> {
        let mut counts = HashMap::new();
        for snapshot in self.circuit_breakers.values() {
            *counts.entry(snapshot.state).or_insert(0) += 1;
        }
        counts
    }

    /// Get list of circuit breakers that are not healthy
    pub fn unhealthy_circuits(&self) -> Vec<&CircuitBreakerSnapshot> {
        self.circuit_breakers
            .values()
            .filter(|snapshot| !snapshot.is_healthy())
            .collect()
    }

    /// Calculate system-wide health score (0.0 to 1.0)
    pub fn health_score(&self) -> f64 {
        if self.circuit_breakers.is_empty() {
            return 1.0;
        }

        let healthy_count = self
            .circuit_breakers
            .values()
            .filter(|snapshot| snapshot.is_healthy())
            .count();

        healthy_count as f64 / self.circuit_breakers.len() as f64
    }

    pub fn total_requests(&self) -> u64 {
        self.circuit_breakers
            .values()
            .map(|snapshot| snapshot.metrics.total_requests)
            .sum()
    }

    pub fn total_failures(&self) -> u64 {
        self.circuit_breakers
            .values()
            .map(|snapshot| snapshot.metrics.failed_requests)
            .sum()
    }

    pub fn total_rejections(&self) -> u64 {
        self.circuit_breakers
            .values()
            .map(|snapshot| snapshot.metrics.rejected_requests)
            .sum()
    }

    /// Get system-wide failure rate
    pub fn system_failure_rate(&self) -> f64 {
        let completed: u64 = self
            .circuit_breakers
            .values()
            .map(|snapshot| snapshot.metrics.completed_requests())
            .sum();
        if completed == 0 {
            return 0.0;
        }

        self.total_failures() as f64 / completed as f64
    }

    /// Format summary for logging
    pub fn format_summary(&self) -> String {
        let state_counts = self.count_by_state();
        let count = |state| state_counts.get(&state).copied().unwrap_or(0);

        format!(
            "Circuit Breakers: {} total | {} closed | {} open | {} half-open | Health: {:.1}% | System failure rate: {:.2}%",
            self.circuit_breakers.len(),
            count(CircuitState::Closed),
            count(CircuitState::Open),
            count(CircuitState::HalfOpen),
            self.health_score() * 100.0,
            self.system_failure_rate() * 100.0
        )
    }
}

impl Default for SystemCircuitBreakerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
