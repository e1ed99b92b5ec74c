//! Shared fixtures for integration tests

use async_trait::async_trait;
use bridge_resilience::config::{MonitoringConfig, RecoveryConfig};
use bridge_resilience::errors::ResilienceError;
use bridge_resilience::monitoring::{MetricsCollector, StaticSampler, SystemSample};
use bridge_resilience::recovery::{BackupCondition, BackupStrategy, RecoveryActions, RecoverySession};
use bridge_resilience::resilience::{CircuitBreaker, CircuitBreakerConfig};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Breaker with failure threshold 3, success threshold 2 and a one second open timeout
pub fn test_breaker_config(name: &str) -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        name: name.to_string(),
        failure_threshold: 3,
        success_threshold: 2,
        timeout: Duration::from_millis(1000),
        ..CircuitBreakerConfig::default()
    }
}

pub fn test_breaker(name: &str) -> CircuitBreaker {
    CircuitBreaker::new(test_breaker_config(name))
}

/// Recovery config with short delays and the given backups
pub fn recovery_config(max_attempts: u32, backups: Vec<BackupStrategy>) -> RecoveryConfig {
    RecoveryConfig {
        max_recovery_attempts: max_attempts,
        recovery_delay_ms: 50,
        escalation_threshold: 2,
        backup_strategies: backups,
        ..RecoveryConfig::default()
    }
}

pub fn fallback_mode_only() -> Vec<BackupStrategy> {
    vec![BackupStrategy::new(
        "fallback-mode",
        3,
        [BackupCondition::AllRecoveryFailed],
    )]
}

/// Collector with a fixed host sample and background exporters disabled
pub fn static_collector(cpu_usage: f64, memory_usage: f64) -> Arc<MetricsCollector> {
    let config = MonitoringConfig {
        exporters: Vec::new(),
        ..MonitoringConfig::default()
    };
    let sample = SystemSample {
        cpu_usage,
        memory_usage,
        memory_used_bytes: 1 << 30,
        network_rx_bytes: 4096,
        network_tx_bytes: 2048,
    };
    Arc::new(MetricsCollector::with_sampler(
        config,
        Arc::new(StaticSampler(sample)),
    ))
}

/// Actions whose primary strategies all fail, counting each call
#[derive(Debug, Default)]
pub struct FailingActions {
    pub retries: AtomicU32,
    pub restarts: AtomicU32,
    pub backups: AtomicU32,
    pub notifications: AtomicU32,
}

impl FailingActions {
    pub fn retries(&self) -> u32 {
        self.retries.load(Ordering::SeqCst)
    }

    pub fn notifications(&self) -> u32 {
        self.notifications.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecoveryActions for FailingActions {
    async fn retry_operation(&self, _error: &ResilienceError) -> anyhow::Result<bool> {
        self.retries.fetch_add(1, Ordering::SeqCst);
        Ok(false)
    }

    async fn restart_component(&self, component: &str) -> anyhow::Result<bool> {
        self.restarts.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("{component} did not come back")
    }

    async fn execute_backup(
        &self,
        strategy: &BackupStrategy,
        _session: &RecoverySession,
        _error: &ResilienceError,
    ) -> anyhow::Result<bool> {
        self.backups.fetch_add(1, Ordering::SeqCst);
        Ok(strategy.name == "fallback-mode")
    }

    async fn notify_operators(
        &self,
        _session: &RecoverySession,
        _error: &ResilienceError,
    ) -> anyhow::Result<()> {
        self.notifications.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
