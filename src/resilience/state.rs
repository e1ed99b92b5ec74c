//! # Circuit Breaker State Manager
//!
//! Single source of truth for one dependency's health and admission decisions.
//! All bookkeeping (counters, the recent-outcome ring, transitions) happens under
//! one short-lived lock that is never held across an await point; state-change
//! callbacks run after the lock is released.

use crate::constants::circuit_breaker::{
    DEGRADED_FAILURE_RATE, FAILURE_RATE_DIVISOR, HEALTHY_FAILURE_RATE, MAX_RECENT_OUTCOMES,
    MAX_STATE_HISTORY,
};
use crate::constants::HealthStatus;
use crate::resilience::{CircuitBreakerConfig, CircuitBreakerMetrics, CircuitBreakerSnapshot};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    /// Normal operation - calls are admitted
    Closed,
    /// Failure mode - calls fail fast without executing
    Open,
    /// Testing recovery - a single probe at a time
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half-open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded state change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: CircuitState,
    pub to: CircuitState,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl StateTransition {
    /// Whether the transition was forced (`force_state`/`reset`) rather than earned
    pub fn is_manual(&self) -> bool {
        self.metadata
            .get("manual")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}

/// Callback invoked with the breaker name after every state transition
pub type StateChangeCallback = Arc<dyn Fn(&str, &StateTransition) + Send + Sync>;

#[derive(Debug, Clone, Copy)]
struct RequestOutcome {
    at: Instant,
    success: bool,
    duration: Duration,
}

#[derive(Debug)]
struct StateInner {
    state: CircuitState,
    last_transition_at: Instant,
    last_transition_time: DateTime<Utc>,
    metrics: CircuitBreakerMetrics,
    recent: VecDeque<RequestOutcome>,
    history: VecDeque<StateTransition>,
}

impl StateInner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            last_transition_at: Instant::now(),
            last_transition_time: Utc::now(),
            metrics: CircuitBreakerMetrics::new(),
            recent: VecDeque::new(),
            history: VecDeque::new(),
        }
    }

    fn concurrency_available(&self, config: &CircuitBreakerConfig) -> bool {
        match config.max_concurrent_requests {
            Some(max) => self.metrics.active_requests < u64::from(max),
            None => true,
        }
    }

    fn prune(&mut self, window: Duration, now: Instant) {
        while self.recent.len() > MAX_RECENT_OUTCOMES {
            self.recent.pop_front();
        }
        while let Some(front) = self.recent.front() {
            if now.saturating_duration_since(front.at) > window {
                self.recent.pop_front();
            } else {
                break;
            }
        }
    }

    /// (samples, failures) within the monitoring window
    fn window_counts(&mut self, window: Duration) -> (usize, usize) {
        self.prune(window, Instant::now());
        let failures = self.recent.iter().filter(|o| !o.success).count();
        (self.recent.len(), failures)
    }

    /// Mean duration of the outcomes still inside the monitoring window
    fn window_response_time(&mut self, window: Duration) -> Duration {
        self.prune(window, Instant::now());
        let samples = self.recent.len() as u32;
        if samples == 0 {
            return Duration::ZERO;
        }
        self.recent.iter().map(|o| o.duration).sum::<Duration>() / samples
    }

    fn failure_rate(&mut self, window: Duration) -> f64 {
        match self.window_counts(window) {
            (0, _) => 0.0,
            (samples, failures) => failures as f64 / samples as f64,
        }
    }

    fn complete_request(&mut self, duration: Duration, success: bool, window: Duration) {
        let now = Instant::now();
        let metrics = &mut self.metrics;
        metrics.active_requests = metrics.active_requests.saturating_sub(1);

        if success {
            metrics.successful_requests += 1;
            metrics.consecutive_successes += 1;
            metrics.consecutive_failures = 0;
            metrics.last_success_time = Some(Utc::now());
        } else {
            metrics.failed_requests += 1;
            metrics.consecutive_failures += 1;
            metrics.consecutive_successes = 0;
            metrics.last_failure_time = Some(Utc::now());
        }

        let completed = metrics.successful_requests + metrics.failed_requests;
        let previous_total = metrics.average_response_time.as_secs_f64() * (completed - 1) as f64;
        metrics.average_response_time =
            Duration::from_secs_f64((previous_total + duration.as_secs_f64()) / completed as f64);

        self.recent.push_back(RequestOutcome {
            at: now,
            success,
            duration,
        });
        self.prune(window, now);
    }

    fn should_open(&mut self, config: &CircuitBreakerConfig) -> bool {
        if let Some(volume) = config.volume_threshold {
            if self.metrics.total_requests < u64::from(volume) {
                return false;
            }
        }

        if self.metrics.consecutive_failures >= u64::from(config.failure_threshold) {
            return true;
        }

        // A rate is only trusted once the window holds as many samples as the count rule needs
        let (samples, failures) = self.window_counts(config.monitoring_window);
        if samples < config.failure_threshold as usize {
            return false;
        }

        let failure_rate = failures as f64 / samples as f64;
        failure_rate >= f64::from(config.failure_threshold) / FAILURE_RATE_DIVISOR
    }

    fn transition(
        &mut self,
        name: &str,
        to: CircuitState,
        reason: &str,
        manual: bool,
    ) -> StateTransition {
        let from = self.state;
        let now = Utc::now();

        let mut metadata = HashMap::new();
        if manual {
            metadata.insert("manual".to_string(), serde_json::Value::Bool(true));
        }
        metadata.insert(
            "consecutive_failures".to_string(),
            self.metrics.consecutive_failures.into(),
        );
        metadata.insert(
            "consecutive_successes".to_string(),
            self.metrics.consecutive_successes.into(),
        );

        self.state = to;
        self.last_transition_at = Instant::now();
        self.last_transition_time = now;

        match to {
            CircuitState::Open => {
                self.metrics.consecutive_successes = 0;
            }
            CircuitState::HalfOpen => {
                self.metrics.consecutive_successes = 0;
                self.metrics.consecutive_failures = 0;
            }
            CircuitState::Closed => {
                self.metrics.consecutive_failures = 0;
            }
        }

        let record = StateTransition {
            from,
            to,
            timestamp: now,
            reason: reason.to_string(),
            metadata,
        };

        self.history.push_back(record.clone());
        while self.history.len() > MAX_STATE_HISTORY {
            self.history.pop_front();
        }

        let icon = match to {
            CircuitState::Closed => "🟢",
            CircuitState::Open => "🔴",
            CircuitState::HalfOpen => "🟡",
        };
        info!(
            component = %name,
            from = %from,
            to = %to,
            reason = %reason,
            manual = manual,
            "{icon} Circuit breaker state transition"
        );

        record
    }
}

fn classify_health(state: CircuitState, failure_rate: f64) -> HealthStatus {
    match state {
        CircuitState::Closed if failure_rate < HEALTHY_FAILURE_RATE => HealthStatus::Healthy,
        CircuitState::HalfOpen => HealthStatus::Degraded,
        CircuitState::Closed if failure_rate < DEGRADED_FAILURE_RATE => HealthStatus::Degraded,
        _ => HealthStatus::Unhealthy,
    }
}

/// Owns one dependency's breaker state and statistics
pub struct CircuitBreakerStateManager {
    config: CircuitBreakerConfig,
    inner: Mutex<StateInner>,
    on_state_change: Option<StateChangeCallback>,
}

impl CircuitBreakerStateManager {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(StateInner::new()),
            on_state_change: None,
        }
    }

    /// Create a manager that reports every transition to `callback`
    pub fn with_state_change_callback(
        config: CircuitBreakerConfig,
        callback: StateChangeCallback,
    ) -> Self {
        Self {
            on_state_change: Some(callback),
            ..Self::new(config)
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state without side effects (an elapsed open timeout is not applied)
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Admission decision; may move an open breaker to half-open once its timeout elapsed
    pub fn can_execute(&self) -> bool {
        let (allowed, transition) = {
            let mut inner = self.inner.lock();
            self.admission(&mut inner)
        };
        self.notify(transition);
        allowed
    }

    /// Admission and request start under a single lock
    ///
    /// Prevents two callers from both taking the single half-open probe slot.
    pub fn try_acquire(&self) -> bool {
        let (allowed, transition) = {
            let mut inner = self.inner.lock();
            let (allowed, transition) = self.admission(&mut inner);
            if allowed {
                inner.metrics.active_requests += 1;
                inner.metrics.total_requests += 1;
            }
            (allowed, transition)
        };
        self.notify(transition);
        allowed
    }

    fn admission(&self, inner: &mut StateInner) -> (bool, Option<StateTransition>) {
        let mut transition = None;

        if inner.state == CircuitState::Open {
            if inner.last_transition_at.elapsed() < self.config.timeout {
                return (false, None);
            }
            transition = Some(inner.transition(
                &self.config.name,
                CircuitState::HalfOpen,
                "open timeout elapsed",
                false,
            ));
        }

        let allowed = match inner.state {
            CircuitState::Closed => inner.concurrency_available(&self.config),
            CircuitState::HalfOpen => {
                inner.concurrency_available(&self.config) && inner.metrics.active_requests == 0
            }
            CircuitState::Open => false,
        };

        (allowed, transition)
    }

    pub fn record_request_start(&self) {
        let mut inner = self.inner.lock();
        inner.metrics.active_requests += 1;
        inner.metrics.total_requests += 1;
    }

    pub fn record_success(&self, duration: Duration) {
        let transition = {
            let mut inner = self.inner.lock();
            inner.complete_request(duration, true, self.config.monitoring_window);

            match inner.state {
                CircuitState::HalfOpen
                    if inner.metrics.consecutive_successes
                        >= u64::from(self.config.success_threshold) =>
                {
                    Some(inner.transition(
                        &self.config.name,
                        CircuitState::Closed,
                        "success threshold reached in half-open",
                        false,
                    ))
                }
                CircuitState::Open => {
                    warn!(component = %self.config.name, "Success recorded while circuit is open");
                    None
                }
                _ => None,
            }
        };
        self.notify(transition);
    }

    pub fn record_failure(&self, duration: Duration, error: Option<&str>) {
        self.fail(duration, error, "failure")
    }

    /// Record a timed-out call; counts as a failure and as a timeout
    pub fn record_timeout(&self, duration: Duration) {
        self.inner.lock().metrics.timeout_requests += 1;
        self.fail(duration, Some("operation timed out"), "timeout")
    }

    fn fail(&self, duration: Duration, error: Option<&str>, kind: &str) {
        let transition = {
            let mut inner = self.inner.lock();
            inner.complete_request(duration, false, self.config.monitoring_window);

            debug!(
                component = %self.config.name,
                kind = kind,
                error = error.unwrap_or("unknown"),
                consecutive_failures = inner.metrics.consecutive_failures,
                "Failure recorded"
            );

            let state = inner.state;
            match state {
                CircuitState::Closed if inner.should_open(&self.config) => {
                    let reason = if kind == "timeout" {
                        "failure threshold exceeded (timeout)"
                    } else {
                        "failure threshold exceeded"
                    };
                    Some(inner.transition(&self.config.name, CircuitState::Open, reason, false))
                }
                CircuitState::HalfOpen => {
                    let reason = if kind == "timeout" {
                        "probe timed out in half-open"
                    } else {
                        "probe failed in half-open"
                    };
                    Some(inner.transition(&self.config.name, CircuitState::Open, reason, false))
                }
                _ => None,
            }
        };
        self.notify(transition);
    }

    /// Count a rejected call; never changes state
    pub fn record_rejection(&self) {
        let mut inner = self.inner.lock();
        inner.metrics.rejected_requests += 1;
        inner.metrics.last_rejection_time = Some(Utc::now());
    }

    /// Whether the current evidence is enough to trip a closed breaker
    pub fn should_open_circuit(&self) -> bool {
        self.inner.lock().should_open(&self.config)
    }

    /// Failure rate over the monitoring window (0.0 when empty)
    pub fn failure_rate(&self) -> f64 {
        self.inner.lock().failure_rate(self.config.monitoring_window)
    }

    pub fn health_status(&self) -> HealthStatus {
        let mut inner = self.inner.lock();
        let rate = inner.failure_rate(self.config.monitoring_window);
        classify_health(inner.state, rate)
    }

    /// Consistent view of state, health and statistics taken under one lock
    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let mut inner = self.inner.lock();
        let failure_rate = inner.failure_rate(self.config.monitoring_window);
        CircuitBreakerSnapshot {
            name: self.config.name.clone(),
            state: inner.state,
            health: classify_health(inner.state, failure_rate),
            failure_rate,
            window_response_time: inner.window_response_time(self.config.monitoring_window),
            last_state_change: inner.last_transition_time,
            metrics: inner.metrics.clone(),
        }
    }

    /// Force a transition (operator or recovery action)
    pub fn force_state(&self, state: CircuitState, reason: &str) {
        warn!(component = %self.config.name, to = %state, reason = reason, "🚨 Circuit breaker state forced");
        let transition = self
            .inner
            .lock()
            .transition(&self.config.name, state, reason, true);
        self.notify(Some(transition));
    }

    /// Return to a fresh closed breaker while keeping the transition history
    pub fn reset(&self) {
        let transition = {
            let mut inner = self.inner.lock();
            inner.metrics = CircuitBreakerMetrics::new();
            inner.recent.clear();
            inner.transition(&self.config.name, CircuitState::Closed, "reset", true)
        };
        self.notify(Some(transition));
    }

    pub fn metrics(&self) -> CircuitBreakerMetrics {
        self.inner.lock().metrics.clone()
    }

    pub fn state_history(&self) -> Vec<StateTransition> {
        self.inner.lock().history.iter().cloned().collect()
    }

    pub fn last_state_change(&self) -> DateTime<Utc> {
        self.inner.lock().last_transition_time
    }

    /// Remaining open time before a probe is admitted, if open
    pub fn time_until_half_open(&self) -> Option<Duration> {
        let inner = self.inner.lock();
        (inner.state == CircuitState::Open).then(|| {
            self.config
                .timeout
                .saturating_sub(inner.last_transition_at.elapsed())
        })
    }

    fn notify(&self, transition: Option<StateTransition>) {
        if let (Some(transition), Some(callback)) = (transition, &self.on_state_change) {
            callback(&self.config.name, &transition);
        }
    }
}

impl fmt::Debug for CircuitBreakerStateManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreakerStateManager")
            .field("config", &self.config)
            .field("inner", &self.inner)
            .field("on_state_change", &self.on_state_change.is_some())
            .finish()
    }
}
