//! # Recovery Manager
//!
//! Runs one bounded recovery session per error occurrence. Each session
//! executes its current strategy up to `max_recovery_attempts` times,
//! escalating along the fixed chain every `escalation_threshold` failures at
//! the same level. When every primary attempt fails, applicable backup
//! strategies run in priority order; if none succeeds the session ends
//! `escalated` and operators are notified.
//!
//! Sessions live in the active map while running and move to a bounded
//! history when they conclude. The session copy in the active map is
//! refreshed after every attempt, so readers always see a consistent
//! snapshot and no map guard is held across an await.

use super::actions::{HealthSignals, NoHealthSignals, NoopRecoveryActions, RecoveryActions};
use super::backup::{applicable_strategies, conditions_for_error};
use super::session::{RecoveryAttempt, RecoverySession, SessionStatus};
use crate::config::RecoveryConfig;
use crate::constants::recovery::RESTARTABLE_COMPONENTS;
use crate::errors::{ErrorCategory, ErrorSeverity, RecoveryStrategy, ResilienceError};
use crate::logging::{log_error, log_resilience_event};
use crate::monitoring::MetricsCollector;
use crate::resilience::{CircuitBreakerManager, CircuitState};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Aggregate view over active and archived sessions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryStatistics {
    pub total_sessions: usize,
    pub active_sessions: usize,
    pub by_status: HashMap<SessionStatus, usize>,
    pub by_category: HashMap<ErrorCategory, usize>,
    /// Mean wall-clock duration of archived sessions
    pub average_duration: Option<Duration>,
    /// Share of archived sessions that ended `succeeded`
    pub success_rate: f64,
}

/// Result of waiting for in-flight sessions during shutdown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownOutcome {
    pub completed: Vec<Uuid>,
    pub abandoned: Vec<Uuid>,
    /// The overall shutdown timeout elapsed before every session was awaited
    pub timed_out: bool,
}

pub struct RecoveryManager {
    config: RecoveryConfig,
    circuit_breakers: Option<CircuitBreakerManager>,
    actions: Arc<dyn RecoveryActions>,
    health: Arc<dyn HealthSignals>,
    metrics: Option<Arc<MetricsCollector>>,

    active: DashMap<Uuid, RecoverySession>,

    /// Errors of sessions registered while auto-recovery is disabled
    pending: DashMap<Uuid, ResilienceError>,

    history: Mutex<VecDeque<RecoverySession>>,

    /// Bumped whenever a session concludes
    finished: watch::Sender<u64>,

    shutting_down: AtomicBool,
}

impl std::fmt::Debug for RecoveryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryManager")
            .field("config", &self.config)
            .field("active_sessions", &self.active.len())
            .field("pending_sessions", &self.pending.len())
            .field("history", &self.history.lock().len())
            .field("shutting_down", &self.shutting_down.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl RecoveryManager {
    pub fn new(config: RecoveryConfig) -> Self {
        info!(
            auto_recovery = config.auto_recovery_enabled,
            max_recovery_attempts = config.max_recovery_attempts,
            escalation_threshold = config.escalation_threshold,
            backup_strategies = config.backup_strategies.len(),
            "Initializing recovery manager"
        );

        Self {
            config,
            circuit_breakers: None,
            actions: Arc::new(NoopRecoveryActions),
            health: Arc::new(NoHealthSignals),
            metrics: None,
            active: DashMap::new(),
            pending: DashMap::new(),
            history: Mutex::new(VecDeque::new()),
            finished: watch::channel(0).0,
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Breakers consulted and forced by the `circuit_breaker` strategy
    pub fn with_circuit_breakers(mut self, circuit_breakers: CircuitBreakerManager) -> Self {
        self.circuit_breakers = Some(circuit_breakers);
        self
    }

    pub fn with_actions(mut self, actions: Arc<dyn RecoveryActions>) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_health_signals(mut self, health: Arc<dyn HealthSignals>) -> Self {
        self.health = health;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// Open a session for `error`
    ///
    /// With auto-recovery enabled the session runs to completion and its
    /// final state is returned. Otherwise it is registered `in_progress` and
    /// waits for [`Self::execute_recovery`].
    pub async fn initiate_recovery(&self, error: ResilienceError) -> RecoverySession {
        let session = self.register(&error);
        if !self.config.auto_recovery_enabled {
            debug!(session_id = %session.id, "Auto-recovery disabled, session left pending");
            self.pending.insert(session.id, error);
            return session;
        }
        self.run_session(session, error).await
    }

    /// Non-blocking form of [`Self::initiate_recovery`]; re-fetch with [`Self::get_session`]
    pub fn spawn_recovery(self: &Arc<Self>, error: ResilienceError) -> Uuid {
        let session = self.register(&error);
        let session_id = session.id;

        if self.config.auto_recovery_enabled {
            let manager = Arc::clone(self);
            tokio::spawn(async move {
                manager.run_session(session, error).await;
            });
        } else {
            self.pending.insert(session_id, error);
        }
        session_id
    }

    /// Run a session left pending while auto-recovery was disabled
    pub async fn execute_recovery(&self, session_id: Uuid) -> crate::errors::Result<RecoverySession> {
        let not_found = || {
            ResilienceError::new(
                "RECOVERY_SESSION_NOT_FOUND",
                format!("No pending recovery session {session_id}"),
                ErrorCategory::Validation,
                ErrorSeverity::Low,
            )
            .with_component("recovery")
        };

        let (_, error) = self.pending.remove(&session_id).ok_or_else(not_found)?;
        let session = self
            .active
            .get(&session_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(not_found)?;

        Ok(self.run_session(session, error).await)
    }

    fn register(&self, error: &ResilienceError) -> RecoverySession {
        if self.shutting_down.load(Ordering::Acquire) {
            warn!(code = %error.code, "Recovery requested while shutting down");
        }

        let session = RecoverySession::from_error(error);
        info!(
            session_id = %session.id,
            code = %error.code,
            category = %error.category,
            severity = %error.severity,
            strategy = %session.current_strategy,
            component = session.component.as_deref().unwrap_or("unknown"),
            "🔧 Recovery session started"
        );
        self.active.insert(session.id, session.clone());
        session
    }

    async fn run_session(
        &self,
        mut session: RecoverySession,
        mut error: ResilienceError,
    ) -> RecoverySession {
        let max_attempts = self.config.max_recovery_attempts;
        let mut failures_at_level = 0;

        for attempt_number in 1..=max_attempts {
            let strategy = session.current_strategy;
            let mut attempt = RecoveryAttempt::start(strategy, attempt_number);
            let started = Instant::now();

            let outcome = self
                .execute_strategy(strategy, &session, &error, &mut attempt)
                .await;
            let success = self.record_attempt(&mut session, &mut error, attempt, outcome, started);

            if success {
                session.status = SessionStatus::Succeeded;
                info!(
                    session_id = %session.id,
                    strategy = %strategy,
                    attempts = attempt_number,
                    "✅ Recovery succeeded"
                );
                return self.conclude(session);
            }

            failures_at_level += 1;
            let more_attempts = attempt_number < max_attempts;
            if more_attempts && failures_at_level >= self.config.escalation_threshold {
                let next = error.escalate();
                session.current_strategy = next;
                session.escalation_level += 1;
                failures_at_level = 0;
                warn!(
                    session_id = %session.id,
                    from = %strategy,
                    to = %next,
                    escalation_level = session.escalation_level,
                    "⬆️ Escalating recovery strategy"
                );
            }
            self.publish(&session);

            if more_attempts {
                tokio::time::sleep(self.config.recovery_delay()).await;
            }
        }

        session.status = SessionStatus::Failed;
        self.publish(&session);
        warn!(
            session_id = %session.id,
            attempts = max_attempts,
            "Primary recovery attempts exhausted, trying backup strategies"
        );

        self.run_backups(session, error).await
    }

    async fn run_backups(
        &self,
        mut session: RecoverySession,
        mut error: ResilienceError,
    ) -> RecoverySession {
        let mut active_conditions = conditions_for_error(&error);
        active_conditions.extend(self.health.active_conditions().await);

        let strategies = applicable_strategies(&self.config.backup_strategies, &active_conditions);
        debug!(
            session_id = %session.id,
            conditions = ?active_conditions,
            applicable = strategies.len(),
            "Evaluating backup strategies"
        );

        for strategy in strategies {
            let attempt_number = session.attempts.len() as u32 + 1;
            let mut attempt = RecoveryAttempt::start_backup(&strategy.name, attempt_number);
            attempt
                .metadata
                .insert("priority".into(), strategy.priority.into());
            let started = Instant::now();

            let outcome = self.actions.execute_backup(strategy, &session, &error).await;
            let success = self.record_attempt(&mut session, &mut error, attempt, outcome, started);
            self.publish(&session);

            if success {
                session.status = SessionStatus::Succeeded;
                session.resolved_by_backup = Some(strategy.name.clone());
                info!(
                    session_id = %session.id,
                    backup_strategy = %strategy.name,
                    "✅ Recovery succeeded via backup strategy"
                );
                return self.conclude(session);
            }
        }

        session.status = SessionStatus::Escalated;
        error!(
            session_id = %session.id,
            code = %error.code,
            category = %error.category,
            attempts = session.attempts.len(),
            escalation_level = session.escalation_level,
            "🚨 Recovery exhausted, escalating to operators"
        );
        log_error(
            "recovery",
            session.operation.as_deref().unwrap_or("unknown"),
            &error.to_string(),
            Some(&session.id.to_string()),
        );
        if let Err(e) = self.actions.notify_operators(&session, &error).await {
            warn!(session_id = %session.id, error = %e, "Failed to notify operators");
        }

        self.conclude(session)
    }

    /// Finish `attempt` from a strategy outcome and record it everywhere
    fn record_attempt(
        &self,
        session: &mut RecoverySession,
        error: &mut ResilienceError,
        mut attempt: RecoveryAttempt,
        outcome: anyhow::Result<bool>,
        started: Instant,
    ) -> bool {
        let duration = started.elapsed();
        let (success, failure) = match outcome {
            Ok(success) => (success, None),
            Err(e) => (false, Some(format!("{e:#}"))),
        };
        attempt.finish(success, failure, duration);

        error.record_recovery_attempt(attempt.strategy, success, duration, attempt.error.clone());
        if let Some(metrics) = &self.metrics {
            metrics.record_recovery_attempt(attempt.strategy, success);
        }

        log_resilience_event(
            "recovery",
            attempt
                .backup_strategy
                .as_deref()
                .unwrap_or(attempt.strategy.as_str()),
            if success { "succeeded" } else { "failed" },
            &serde_json::json!({
                "session_id": session.id,
                "attempt": attempt.attempt_number,
                "duration_ms": duration.as_millis() as u64,
                "error": attempt.error,
                "metadata": attempt.metadata,
            }),
        );

        session.attempts.push(attempt);
        success
    }

    async fn execute_strategy(
        &self,
        strategy: RecoveryStrategy,
        session: &RecoverySession,
        error: &ResilienceError,
        attempt: &mut RecoveryAttempt,
    ) -> anyhow::Result<bool> {
        match strategy {
            RecoveryStrategy::Retry => self.actions.retry_operation(error).await,
            RecoveryStrategy::CircuitBreaker => Ok(self.release_circuit_breaker(error, attempt).await),
            RecoveryStrategy::Restart => {
                let component = error.context.component.as_deref().unwrap_or_default();
                if !RESTARTABLE_COMPONENTS.contains(&component) {
                    attempt
                        .metadata
                        .insert("reason".into(), "component is not restartable".into());
                    return Ok(false);
                }
                attempt.metadata.insert("component".into(), component.into());
                self.actions.restart_component(component).await
            }
            RecoveryStrategy::Fallback => self.actions.activate_fallback(error).await,
            RecoveryStrategy::GracefulDegradation => {
                let component = error.context.component.as_deref().unwrap_or("bridge");
                if let Err(e) = self.actions.degrade(component).await {
                    warn!(component = component, error = %e, "Degradation reported a problem");
                }
                attempt.metadata.insert("degraded".into(), component.into());
                Ok(true)
            }
            RecoveryStrategy::Escalate => {
                if let Err(e) = self.actions.notify_operators(session, error).await {
                    warn!(session_id = %session.id, error = %e, "Failed to notify operators");
                }
                attempt.metadata.insert("escalated".into(), true.into());
                Ok(true)
            }
            RecoveryStrategy::Ignore => {
                info!(session_id = %session.id, code = %error.code, "Ignoring error");
                Ok(true)
            }
            RecoveryStrategy::Manual => {
                attempt
                    .metadata
                    .insert("reason".into(), "requires manual intervention".into());
                Ok(false)
            }
        }
    }

    /// Move the component's breaker out of `open` so the next call probes
    async fn release_circuit_breaker(
        &self,
        error: &ResilienceError,
        attempt: &mut RecoveryAttempt,
    ) -> bool {
        let Some(component) = error.context.component.as_deref() else {
            attempt
                .metadata
                .insert("reason".into(), "error names no component".into());
            return false;
        };
        let breaker = match &self.circuit_breakers {
            Some(breakers) => breakers.find(component).await,
            None => None,
        };
        let Some(breaker) = breaker else {
            attempt
                .metadata
                .insert("reason".into(), "no circuit breaker for component".into());
            return false;
        };

        let before = breaker.state();
        if before == CircuitState::Open {
            breaker.force_half_open();
        }
        attempt
            .metadata
            .insert("circuit_state_before".into(), before.as_str().into());
        attempt
            .metadata
            .insert("circuit_state_after".into(), breaker.state().as_str().into());
        true
    }

    fn publish(&self, session: &RecoverySession) {
        self.active.insert(session.id, session.clone());
    }

    fn conclude(&self, mut session: RecoverySession) -> RecoverySession {
        session.end_time = Some(chrono::Utc::now());
        self.active.remove(&session.id);

        {
            let mut history = self.history.lock();
            history.push_back(session.clone());
            while history.len() > self.config.max_session_history {
                history.pop_front();
            }
        }

        self.finished.send_modify(|count| *count += 1);
        session
    }

    /// Session by id, active or archived
    pub fn get_session(&self, session_id: Uuid) -> Option<RecoverySession> {
        if let Some(session) = self.active.get(&session_id) {
            return Some(session.value().clone());
        }
        self.history
            .lock()
            .iter()
            .rev()
            .find(|session| session.id == session_id)
            .cloned()
    }

    pub fn active_sessions(&self) -> Vec<RecoverySession> {
        self.active.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Archived sessions, oldest first
    pub fn history(&self) -> Vec<RecoverySession> {
        self.history.lock().iter().cloned().collect()
    }

    pub fn statistics(&self) -> RecoveryStatistics {
        let history = self.history();
        let active = self.active_sessions();

        let mut by_status = HashMap::new();
        let mut by_category = HashMap::new();
        for session in history.iter().chain(active.iter()) {
            *by_status.entry(session.status).or_insert(0) += 1;
            *by_category.entry(session.error_category).or_insert(0) += 1;
        }

        let durations: Vec<Duration> = history.iter().filter_map(RecoverySession::duration).collect();
        let average_duration = (!durations.is_empty())
            .then(|| durations.iter().sum::<Duration>() / durations.len() as u32);

        let succeeded = history
            .iter()
            .filter(|session| session.status == SessionStatus::Succeeded)
            .count();
        let success_rate = if history.is_empty() {
            0.0
        } else {
            succeeded as f64 / history.len() as f64
        };

        RecoveryStatistics {
            total_sessions: history.len() + active.len(),
            active_sessions: active.len(),
            by_status,
            by_category,
            average_duration,
            success_rate,
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Wait for running sessions to conclude
    ///
    /// Each session is awaited for at most `session_shutdown_timeout`, and
    /// the whole wait is bounded by `graceful_shutdown_timeout`. Sessions
    /// left pending by disabled auto-recovery are abandoned immediately.
    pub async fn graceful_shutdown(&self) -> ShutdownOutcome {
        self.shutting_down.store(true, Ordering::Release);

        let mut outcome = ShutdownOutcome::default();
        let mut running = Vec::new();
        for entry in self.active.iter() {
            if self.pending.contains_key(entry.key()) {
                outcome.abandoned.push(*entry.key());
            } else if !entry.value().status.is_terminal() {
                running.push(*entry.key());
            }
        }

        info!(
            running = running.len(),
            pending = outcome.abandoned.len(),
            "🛑 Recovery manager shutting down"
        );

        let per_session = self.config.session_shutdown_timeout();
        let mut awaited = 0;
        let wait_all = async {
            for session_id in &running {
                match tokio::time::timeout(per_session, self.wait_for_session(*session_id)).await {
                    Ok(()) => outcome.completed.push(*session_id),
                    Err(_) => {
                        warn!(session_id = %session_id, "Recovery session did not finish before shutdown");
                        outcome.abandoned.push(*session_id);
                    }
                }
                awaited += 1;
            }
        };
        let timed_out = tokio::time::timeout(self.config.graceful_shutdown_timeout(), wait_all)
            .await
            .is_err();
        outcome.timed_out = timed_out;

        if outcome.timed_out {
            outcome.abandoned.extend(running.iter().skip(awaited).copied());
            error!(
                abandoned = outcome.abandoned.len(),
                "Graceful shutdown timed out with recovery sessions still running"
            );
        } else {
            info!(
                completed = outcome.completed.len(),
                abandoned = outcome.abandoned.len(),
                "✅ Recovery manager shutdown complete"
            );
        }
        outcome
    }

    async fn wait_for_session(&self, session_id: Uuid) {
        let mut finished = self.finished.subscribe();
        loop {
            let running = self
                .active
                .get(&session_id)
                .is_some_and(|session| !session.status.is_terminal());
            if !running || finished.changed().await.is_err() {
                return;
            }
        }
    }

    /// Wait for Ctrl+C or SIGTERM, then shut down gracefully
    ///
    /// Exits the process with a failure status when the overall shutdown
    /// timeout elapses, rather than hanging on stuck sessions.
    pub async fn shutdown_on_signal(&self) -> ShutdownOutcome {
        shutdown_signal().await;
        info!("🛑 Shutdown signal received, initiating graceful shutdown...");

        let outcome = self.graceful_shutdown().await;
        if outcome.timed_out {
            error!("Forcing exit after graceful shutdown timeout");
            std::process::exit(1);
        }
        outcome
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received SIGTERM");
        },
    }
}
