//! # Recovery Actions
//!
//! Side effects the recovery manager delegates to the integration layer.
//! Re-invoking a failed operation, restarting a process or switching to a
//! cached data path all live outside this crate; implementors plug them in
//! through [`RecoveryActions`]. Conditions observed by an external health
//! source reach backup-strategy selection through [`HealthSignals`].

use super::backup::{BackupCondition, BackupStrategy};
use super::session::RecoverySession;
use crate::errors::ResilienceError;
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{error, info};

/// Pluggable outcomes for the recovery strategies
///
/// Every method reports whether the action succeeded. `Err` is treated as a
/// failed attempt and its message is recorded on the attempt.
#[async_trait]
pub trait RecoveryActions: Send + Sync {
    /// Re-attempt the operation that produced `error`
    async fn retry_operation(&self, _error: &ResilienceError) -> anyhow::Result<bool> {
        Ok(false)
    }

    /// Switch to an alternate implementation or cached data path
    async fn activate_fallback(&self, _error: &ResilienceError) -> anyhow::Result<bool> {
        Ok(false)
    }

    /// Restart a restartable component such as the bridge process
    async fn restart_component(&self, _component: &str) -> anyhow::Result<bool> {
        Ok(false)
    }

    /// Reduce functionality of `component` while keeping core delivery alive
    async fn degrade(&self, component: &str) -> anyhow::Result<()> {
        info!(component = component, "📉 Operating in degraded mode");
        Ok(())
    }

    /// Tell operators a session could not be recovered automatically
    async fn notify_operators(
        &self,
        session: &RecoverySession,
        error: &ResilienceError,
    ) -> anyhow::Result<()> {
        error!(
            session_id = %session.id,
            code = %error.code,
            category = %error.category,
            severity = %error.severity,
            escalation_level = session.escalation_level,
            "🚨 Operator intervention required: {}",
            error.message
        );
        Ok(())
    }

    /// Run a named backup strategy
    ///
    /// `fallback-mode` only switches delivery to the durable file tier and
    /// always succeeds; restart strategies delegate to [`Self::restart_component`].
    async fn execute_backup(
        &self,
        strategy: &BackupStrategy,
        _session: &RecoverySession,
        _error: &ResilienceError,
    ) -> anyhow::Result<bool> {
        match strategy.name.as_str() {
            "fallback-mode" => {
                info!("📁 Switching delivery to file-based fallback mode");
                Ok(true)
            }
            "bridge-restart" => self.restart_component("bridge").await,
            "process-restart" => self.restart_component("process").await,
            _ => Ok(false),
        }
    }
}

/// Actions for deployments without an integration layer: nothing can be
/// re-invoked or restarted, degradation and backups behave as default
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecoveryActions;

#[async_trait]
impl RecoveryActions for NoopRecoveryActions {}

/// Source of externally observed bridge health conditions
#[async_trait]
pub trait HealthSignals: Send + Sync {
    async fn active_conditions(&self) -> HashSet<BackupCondition>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoHealthSignals;

#[async_trait]
impl HealthSignals for NoHealthSignals {
    async fn active_conditions(&self) -> HashSet<BackupCondition> {
        HashSet::new()
    }
}

/// Fixed set of conditions, useful when health is polled elsewhere
#[async_trait]
impl HealthSignals for HashSet<BackupCondition> {
    async fn active_conditions(&self) -> HashSet<BackupCondition> {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_actions_report_failure() {
        let actions = NoopRecoveryActions;
        let error = ResilienceError::network("refused");
        assert!(!actions.retry_operation(&error).await.unwrap());
        assert!(!actions.activate_fallback(&error).await.unwrap());
        assert!(!actions.restart_component("bridge").await.unwrap());
        assert!(actions.degrade("bridge").await.is_ok());
    }

    #[tokio::test]
    async fn test_default_backup_dispatch() {
        let actions = NoopRecoveryActions;
        let error = ResilienceError::bridge("down");
        let session = RecoverySession::from_error(&error);

        let fallback = BackupStrategy::new("fallback-mode", 3, [BackupCondition::AllRecoveryFailed]);
        assert!(actions.execute_backup(&fallback, &session, &error).await.unwrap());

        let restart = BackupStrategy::new("bridge-restart", 1, [BackupCondition::BridgeDown]);
        assert!(!actions.execute_backup(&restart, &session, &error).await.unwrap());

        let unknown = BackupStrategy::new("page-someone", 9, [BackupCondition::BridgeDown]);
        assert!(!actions.execute_backup(&unknown, &session, &error).await.unwrap());
    }

    #[tokio::test]
    async fn test_fixed_health_signals() {
        let signals = HashSet::from([BackupCondition::BridgeCrashed]);
        assert_eq!(
            signals.active_conditions().await,
            HashSet::from([BackupCondition::BridgeCrashed])
        );
        assert!(NoHealthSignals.active_conditions().await.is_empty());
    }
}
