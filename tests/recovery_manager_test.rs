//! Recovery sessions end to end: escalation, backups, metrics and shutdown

mod common;

use async_trait::async_trait;
use bridge_resilience::config::{RecoveryConfig, ResilienceConfig};
use bridge_resilience::errors::{ErrorSeverity, RecoveryStrategy, ResilienceError};
use bridge_resilience::recovery::{
    BackupStrategy, RecoveryActions, RecoveryManager, RecoverySession, SessionStatus,
};
use bridge_resilience::resilience::{CircuitBreakerManager, CircuitState};
use common::*;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

fn primary_strategies(session: &RecoverySession) -> Vec<RecoveryStrategy> {
    session.primary_attempts().map(|a| a.strategy).collect()
}

#[tokio::test(start_paused = true)]
async fn test_two_failed_retries_escalate_to_circuit_breaker() {
    let actions = Arc::new(FailingActions::default());
    let manager = RecoveryManager::new(recovery_config(3, Vec::new())).with_actions(actions.clone());

    let error = ResilienceError::network("ECONNRESET").with_severity(ErrorSeverity::High);
    assert_eq!(error.recovery.strategy, RecoveryStrategy::Retry);

    let session = manager.initiate_recovery(error).await;

    assert_eq!(
        primary_strategies(&session),
        vec![
            RecoveryStrategy::Retry,
            RecoveryStrategy::Retry,
            RecoveryStrategy::CircuitBreaker,
        ]
    );
    assert_eq!(session.current_strategy, RecoveryStrategy::CircuitBreaker);
    assert_eq!(session.escalation_level, 1);
    assert_eq!(session.status, SessionStatus::Escalated);
    assert_eq!(actions.retries(), 2);
    assert_eq!(actions.notifications(), 1);
    assert!(session.attempts.iter().all(|a| a.end_time.is_some()));
}

#[tokio::test(start_paused = true)]
async fn test_circuit_breaker_attempt_releases_the_registry_breaker() {
    let registry = CircuitBreakerManager::from_config(Arc::new(ResilienceConfig::default()));
    let telegram = registry.get_circuit_breaker("telegram").await;
    telegram.force_open();

    let manager = RecoveryManager::new(recovery_config(3, Vec::new()))
        .with_actions(Arc::new(FailingActions::default()))
        .with_circuit_breakers(registry);

    let error = ResilienceError::telegram("502 from webhook")
        .with_component("telegram")
        .with_strategy(RecoveryStrategy::CircuitBreaker);
    let session = manager.initiate_recovery(error).await;

    assert_eq!(session.status, SessionStatus::Succeeded);
    assert_eq!(session.attempts.len(), 1);
    assert_eq!(telegram.state(), CircuitState::HalfOpen);
}

/// Backups block until released, so the intermediate state is observable
#[derive(Default)]
struct GatedBackups {
    gate: Notify,
}

#[async_trait]
impl RecoveryActions for GatedBackups {
    async fn execute_backup(
        &self,
        strategy: &BackupStrategy,
        _session: &RecoverySession,
        _error: &ResilienceError,
    ) -> anyhow::Result<bool> {
        self.gate.notified().await;
        Ok(strategy.name == "fallback-mode")
    }
}

#[tokio::test(start_paused = true)]
async fn test_backup_turns_failed_session_into_success() {
    let actions = Arc::new(GatedBackups::default());
    let manager = Arc::new(
        RecoveryManager::new(recovery_config(3, fallback_mode_only())).with_actions(actions.clone()),
    );

    let session_id = manager.spawn_recovery(ResilienceError::network("host unreachable"));

    let mut observed_failed = false;
    for _ in 0..100 {
        if manager
            .get_session(session_id)
            .is_some_and(|s| s.status == SessionStatus::Failed)
        {
            observed_failed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(observed_failed, "session should pass through failed");

    actions.gate.notify_one();

    let mut finished = None;
    for _ in 0..100 {
        match manager.get_session(session_id) {
            Some(session) if session.status.is_terminal() => {
                finished = Some(session);
                break;
            }
            _ => tokio::time::sleep(Duration::from_millis(10)).await,
        }
    }
    let session = finished.expect("session should finish");
    assert_eq!(session.status, SessionStatus::Succeeded);
    assert_eq!(session.resolved_by_backup.as_deref(), Some("fallback-mode"));
    assert_eq!(session.primary_attempts().count(), 3);
    assert_eq!(session.backup_attempts().count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_attempts_are_counted_by_the_metrics_collector() {
    let collector = static_collector(5.0, 5.0);
    let manager = RecoveryManager::new(recovery_config(3, fallback_mode_only()))
        .with_actions(Arc::new(FailingActions::default()))
        .with_metrics(Arc::clone(&collector));

    let session = manager
        .initiate_recovery(ResilienceError::timeout("sendEvent", Duration::from_secs(10)))
        .await;
    assert_eq!(session.status, SessionStatus::Succeeded);

    let summary = collector.get_metrics_summary();
    assert_eq!(summary.recovery_attempts, 4);
    assert_eq!(summary.successful_recoveries, 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_sessions_are_independent() {
    let manager = RecoveryManager::new(RecoveryConfig {
        max_session_history: 50,
        ..recovery_config(2, fallback_mode_only())
    })
    .with_actions(Arc::new(FailingActions::default()));

    let errors = (0..10).map(|i| {
        ResilienceError::network(format!("peer {i} reset"))
            .with_correlation_id(format!("event-{i}"))
    });
    let sessions = join_all(errors.map(|error| manager.initiate_recovery(error))).await;

    assert_eq!(sessions.len(), 10);
    for (i, session) in sessions.iter().enumerate() {
        assert_eq!(session.status, SessionStatus::Succeeded);
        assert_eq!(session.correlation_id, format!("event-{i}"));
        assert_eq!(session.attempts.len(), 3);
    }

    let stats = manager.statistics();
    assert_eq!(stats.total_sessions, 10);
    assert_eq!(stats.active_sessions, 0);
    assert_eq!(stats.success_rate, 1.0);
    assert!(manager.active_sessions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_waits_for_running_sessions() {
    let manager = Arc::new(
        RecoveryManager::new(recovery_config(3, fallback_mode_only()))
            .with_actions(Arc::new(FailingActions::default())),
    );

    let ids: Vec<_> = (0..3)
        .map(|i| manager.spawn_recovery(ResilienceError::network(format!("drop {i}"))))
        .collect();

    let outcome = manager.graceful_shutdown().await;
    assert!(!outcome.timed_out);
    assert!(outcome.abandoned.is_empty());
    let mut completed = outcome.completed.clone();
    let mut expected = ids.clone();
    completed.sort();
    expected.sort();
    assert_eq!(completed, expected);

    for id in ids {
        assert_eq!(
            manager.get_session(id).map(|s| s.status),
            Some(SessionStatus::Succeeded)
        );
    }
}

async fn wait_for_status(manager: &RecoveryManager, session_id: uuid::Uuid, status: SessionStatus) {
    for _ in 0..100 {
        if manager.get_session(session_id).is_some_and(|s| s.status == status) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("session never reached {status}");
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_waits_for_sessions_running_backups() {
    let actions = Arc::new(GatedBackups::default());
    let manager = Arc::new(
        RecoveryManager::new(recovery_config(3, fallback_mode_only())).with_actions(actions.clone()),
    );

    let session_id = manager.spawn_recovery(ResilienceError::network("host unreachable"));
    wait_for_status(&manager, session_id, SessionStatus::Failed).await;

    let shutdown = tokio::spawn({
        let manager = Arc::clone(&manager);
        async move { manager.graceful_shutdown().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!shutdown.is_finished());

    actions.gate.notify_one();
    let outcome = shutdown.await.unwrap();

    assert!(!outcome.timed_out);
    assert_eq!(outcome.completed, vec![session_id]);
    assert!(outcome.abandoned.is_empty());
    assert_eq!(
        manager.get_session(session_id).map(|s| s.status),
        Some(SessionStatus::Succeeded)
    );
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_abandons_backups_that_never_finish() {
    let manager = Arc::new(
        RecoveryManager::new(RecoveryConfig {
            session_shutdown_timeout_ms: 200,
            ..recovery_config(3, fallback_mode_only())
        })
        .with_actions(Arc::new(GatedBackups::default())),
    );

    let session_id = manager.spawn_recovery(ResilienceError::network("host unreachable"));
    wait_for_status(&manager, session_id, SessionStatus::Failed).await;

    let outcome = manager.graceful_shutdown().await;
    assert!(outcome.completed.is_empty());
    assert_eq!(outcome.abandoned, vec![session_id]);
}
