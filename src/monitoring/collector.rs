//! # Metrics Collector
//!
//! Samples system, application and resilience metrics on a fixed interval
//! into retention-bounded [`MetricSeries`], evaluates alert thresholds and
//! drives the configured exporters.
//!
//! ## Background tasks
//!
//! [`MetricsCollector::start`] spawns one collection loop plus one loop per
//! enabled exporter. Loops hold a weak reference, so dropping the last
//! `Arc<MetricsCollector>` ends them; [`MetricsCollector::stop`] aborts them
//! immediately.

use super::export::{render_prometheus, ExporterKind};
use super::sampler::{SysinfoSampler, SystemSampler};
use super::series::{Aggregations, MetricSeries, MetricValue};
use super::thresholds::{detect_violations, ThresholdInputs, ThresholdViolation, ViolationSeverity};
use crate::config::{ExporterConfig, MonitoringConfig};
use crate::constants::metrics as names;
use crate::constants::HealthStatus;
use crate::errors::{RecoveryStrategy, ResilienceError};
use crate::logging::log_resilience_event;
use crate::resilience::{CircuitBreakerCallbacks, CircuitState};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Point-in-time view of one series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub unit: Option<String>,
    pub latest: Option<f64>,
    pub aggregations: Aggregations,
}

/// Copy of the collector's state handed to readers and the log exporter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub timestamp: DateTime<Utc>,
    pub health: HealthStatus,
    pub total_requests: u64,
    pub total_errors: u64,
    pub error_rate: f64,
    pub circuit_breaker_trips: u64,
    pub recovery_attempts: u64,
    pub successful_recoveries: u64,
    pub series: HashMap<String, SeriesSummary>,
    pub active_violations: Vec<ThresholdViolation>,
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    errors: AtomicU64,
    circuit_breaker_trips: AtomicU64,
    recovery_attempts: AtomicU64,
    successful_recoveries: AtomicU64,
}

pub struct MetricsCollector {
    config: MonitoringConfig,
    series: RwLock<HashMap<String, MetricSeries>>,
    counters: Counters,

    /// Violations found by the most recent threshold check
    active_violations: RwLock<Vec<ThresholdViolation>>,

    /// Bounded log of every violation found, oldest first
    violation_log: Mutex<VecDeque<ThresholdViolation>>,

    sampler: Arc<dyn SystemSampler>,
    running: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for MetricsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsCollector")
            .field("enabled", &self.config.enabled)
            .field("series", &self.series.read().len())
            .field("counters", &self.counters)
            .field("running", &self.running.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl MetricsCollector {
    pub fn new(config: MonitoringConfig) -> Self {
        Self::with_sampler(config, Arc::new(SysinfoSampler::new()))
    }

    pub fn with_sampler(config: MonitoringConfig, sampler: Arc<dyn SystemSampler>) -> Self {
        Self {
            config,
            series: RwLock::new(HashMap::new()),
            counters: Counters::default(),
            active_violations: RwLock::new(Vec::new()),
            violation_log: Mutex::new(VecDeque::new()),
            sampler,
            running: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &MonitoringConfig {
        &self.config
    }

    /// Append a sample to the named series, creating it on first use
    pub fn record_metric(
        &self,
        name: &str,
        value: f64,
        timestamp: Option<DateTime<Utc>>,
        labels: Option<HashMap<String, String>>,
    ) {
        let sample = MetricValue {
            value,
            timestamp: timestamp.unwrap_or_else(Utc::now),
            labels: labels.unwrap_or_default(),
        };

        let mut series = self.series.write();
        series
            .entry(name.to_string())
            .or_insert_with(|| {
                let series = MetricSeries::new(name, self.config.retention.for_metric(name));
                match unit_for(name) {
                    Some(unit) => series.with_unit(unit),
                    None => series,
                }
            })
            .record(sample);
    }

    /// Count one completed request and its response time
    pub fn record_request(&self, response_time: Duration) {
        self.counters.requests.fetch_add(1, Ordering::Relaxed);
        self.record_metric(
            names::APP_RESPONSE_TIME,
            response_time.as_secs_f64() * 1000.0,
            None,
            None,
        );
    }

    pub fn record_error(&self, error: &ResilienceError) {
        self.counters.errors.fetch_add(1, Ordering::Relaxed);
        debug!(
            code = %error.code,
            category = %error.category,
            "Recorded application error"
        );
    }

    pub fn record_circuit_breaker_trip(&self, component: &str) {
        let trips = self.counters.circuit_breaker_trips.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(component = component, total_trips = trips, "Recorded circuit breaker trip");
    }

    pub fn record_recovery_attempt(&self, strategy: RecoveryStrategy, success: bool) {
        self.counters.recovery_attempts.fetch_add(1, Ordering::Relaxed);
        if success {
            self.counters
                .successful_recoveries
                .fetch_add(1, Ordering::Relaxed);
        }
        debug!(strategy = %strategy, success = success, "Recorded recovery attempt");
    }

    /// Breaker callbacks feeding this collector: completed requests, failures and trips
    pub fn circuit_breaker_callbacks(self: &Arc<Self>) -> CircuitBreakerCallbacks {
        let on_success = Arc::downgrade(self);
        let on_failure = Arc::downgrade(self);
        let on_trip = Arc::downgrade(self);

        CircuitBreakerCallbacks::new()
            .on_request_success(move |_, duration| {
                if let Some(collector) = on_success.upgrade() {
                    collector.record_request(duration);
                }
            })
            .on_request_failure(move |component, duration, message| {
                if let Some(collector) = on_failure.upgrade() {
                    collector.record_request(duration);
                    collector.record_error(
                        &ResilienceError::from_message(message).with_component(component),
                    );
                }
            })
            .on_state_change(move |component, transition| {
                if transition.to == CircuitState::Open {
                    if let Some(collector) = on_trip.upgrade() {
                        collector.record_circuit_breaker_trip(component);
                    }
                }
            })
    }

    /// One collection cycle: sample everything, then prune by retention
    pub fn collect(&self) {
        let now = Utc::now();
        let sample = self.sampler.sample();

        self.record_metric(names::SYSTEM_CPU_USAGE, sample.cpu_usage, Some(now), None);
        self.record_metric(names::SYSTEM_MEMORY_USAGE, sample.memory_usage, Some(now), None);
        self.record_metric(
            names::SYSTEM_MEMORY_USED_BYTES,
            sample.memory_used_bytes as f64,
            Some(now),
            None,
        );
        self.record_metric(
            names::SYSTEM_NETWORK_RX_BYTES,
            sample.network_rx_bytes as f64,
            Some(now),
            None,
        );
        self.record_metric(
            names::SYSTEM_NETWORK_TX_BYTES,
            sample.network_tx_bytes as f64,
            Some(now),
            None,
        );

        let requests = self.counters.requests.load(Ordering::Relaxed);
        let errors = self.counters.errors.load(Ordering::Relaxed);
        self.record_metric(names::APP_REQUESTS, requests as f64, Some(now), None);
        self.record_metric(names::APP_ERRORS, errors as f64, Some(now), None);
        if requests > 0 {
            self.record_metric(
                names::APP_ERROR_RATE,
                errors as f64 / requests as f64,
                Some(now),
                None,
            );
        }

        self.record_metric(
            names::RESILIENCE_CIRCUIT_BREAKER_TRIPS,
            self.counters.circuit_breaker_trips.load(Ordering::Relaxed) as f64,
            Some(now),
            None,
        );
        self.record_metric(
            names::RESILIENCE_RECOVERY_ATTEMPTS,
            self.counters.recovery_attempts.load(Ordering::Relaxed) as f64,
            Some(now),
            None,
        );

        self.cleanup(now);
    }

    /// Drop samples older than each series' retention
    pub fn cleanup(&self, now: DateTime<Utc>) -> usize {
        let mut series = self.series.write();
        series.values_mut().map(|s| s.cleanup(now)).sum()
    }

    /// Evaluate alert thresholds against current values
    ///
    /// The result replaces the active violation set and is appended to the
    /// bounded violation log.
    pub fn check_thresholds(&self) -> Vec<ThresholdViolation> {
        let inputs = {
            let series = self.series.read();
            let latest = |name: &str| series.get(name).and_then(|s| s.latest()).map(|v| v.value);
            ThresholdInputs {
                cpu_usage: latest(names::SYSTEM_CPU_USAGE),
                memory_usage: latest(names::SYSTEM_MEMORY_USAGE),
                avg_response_time_ms: series
                    .get(names::APP_RESPONSE_TIME)
                    .filter(|s| !s.is_empty())
                    .map(|s| s.aggregations().avg),
                requests: self.counters.requests.load(Ordering::Relaxed),
                errors: self.counters.errors.load(Ordering::Relaxed),
            }
        };

        let violations = detect_violations(&self.config.alert_thresholds, &inputs, Utc::now());

        for violation in &violations {
            match violation.severity {
                ViolationSeverity::Critical => error!(
                    metric = %violation.metric,
                    value = violation.value,
                    threshold = violation.threshold,
                    severity = %violation.severity,
                    "🚨 Metric threshold violated"
                ),
                _ => warn!(
                    metric = %violation.metric,
                    value = violation.value,
                    threshold = violation.threshold,
                    severity = %violation.severity,
                    "⚠️ Metric threshold violated"
                ),
            }
        }

        {
            let mut log = self.violation_log.lock();
            log.extend(violations.iter().cloned());
            while log.len() > names::MAX_VIOLATIONS {
                log.pop_front();
            }
        }
        *self.active_violations.write() = violations.clone();

        violations
    }

    /// `unhealthy` on any critical violation, `degraded` on any high one
    pub fn get_health_status(&self) -> HealthStatus {
        let violations = self.active_violations.read();
        if violations
            .iter()
            .any(|v| v.severity == ViolationSeverity::Critical)
        {
            HealthStatus::Unhealthy
        } else if violations
            .iter()
            .any(|v| v.severity == ViolationSeverity::High)
        {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    pub fn get_metrics_summary(&self) -> MetricsSummary {
        let total_requests = self.counters.requests.load(Ordering::Relaxed);
        let total_errors = self.counters.errors.load(Ordering::Relaxed);

        let series = self
            .series
            .read()
            .iter()
            .map(|(name, series)| {
                (
                    name.clone(),
                    SeriesSummary {
                        unit: series.unit.clone(),
                        latest: series.latest().map(|v| v.value),
                        aggregations: series.aggregations(),
                    },
                )
            })
            .collect();

        MetricsSummary {
            timestamp: Utc::now(),
            health: self.get_health_status(),
            total_requests,
            total_errors,
            error_rate: if total_requests == 0 {
                0.0
            } else {
                total_errors as f64 / total_requests as f64
            },
            circuit_breaker_trips: self.counters.circuit_breaker_trips.load(Ordering::Relaxed),
            recovery_attempts: self.counters.recovery_attempts.load(Ordering::Relaxed),
            successful_recoveries: self.counters.successful_recoveries.load(Ordering::Relaxed),
            series,
            active_violations: self.active_violations.read().clone(),
        }
    }

    /// Copy of one series
    pub fn get_metric(&self, name: &str) -> Option<MetricSeries> {
        self.series.read().get(name).cloned()
    }

    pub fn metric_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.series.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Every violation still in the bounded log, oldest first
    pub fn violations(&self) -> Vec<ThresholdViolation> {
        self.violation_log.lock().iter().cloned().collect()
    }

    pub fn render_prometheus(&self) -> String {
        render_prometheus(self.series.read().values())
    }

    /// Run one exporter pass
    pub async fn export(&self, exporter: &ExporterConfig) {
        match exporter.kind {
            ExporterKind::Log => {
                let summary = self.get_metrics_summary();
                info!(
                    health = %summary.health,
                    total_requests = summary.total_requests,
                    total_errors = summary.total_errors,
                    error_rate = summary.error_rate,
                    circuit_breaker_trips = summary.circuit_breaker_trips,
                    recovery_attempts = summary.recovery_attempts,
                    series = summary.series.len(),
                    "📊 Metrics summary"
                );
                match serde_json::to_value(&summary) {
                    Ok(details) => log_resilience_event(
                        "metrics",
                        "export",
                        summary.health.as_str(),
                        &details,
                    ),
                    Err(e) => warn!(error = %e, "Failed to serialize metrics summary"),
                }
            }
            ExporterKind::Prometheus => {
                let text = self.render_prometheus();
                match &exporter.output_path {
                    Some(path) => {
                        if let Err(e) = tokio::fs::write(path, text).await {
                            warn!(
                                path = %path.display(),
                                error = %e,
                                "Failed to write Prometheus metrics"
                            );
                        }
                    }
                    None => debug!(metrics = %text, "Prometheus exposition"),
                }
            }
            ExporterKind::ViolationCheck => {
                let violations = self.check_thresholds();
                log_resilience_event(
                    "metrics",
                    "violation_check",
                    self.get_health_status().as_str(),
                    &serde_json::json!({ "violations": violations.len() }),
                );
            }
        }
    }

    /// Spawn the collection loop and one loop per enabled exporter
    ///
    /// No-op when monitoring is disabled or the loops already run.
    pub fn start(self: &Arc<Self>) {
        if !self.config.enabled {
            info!("Metrics collection disabled");
            return;
        }
        if self.running.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut tasks = self.tasks.lock();

        let weak = Arc::downgrade(self);
        tasks.push(spawn_interval_loop(
            weak,
            self.config.metrics_interval(),
            |collector| async move { collector.collect() },
        ));

        for exporter in self.config.exporters.iter().filter(|e| e.enabled) {
            let weak = Arc::downgrade(self);
            let exporter = exporter.clone();
            tasks.push(spawn_interval_loop(weak, exporter.interval(), move |collector| {
                let exporter = exporter.clone();
                async move { collector.export(&exporter).await }
            }));
        }

        info!(
            interval_ms = self.config.metrics_interval_ms,
            exporters = tasks.len() - 1,
            "🚀 Metrics collection started"
        );
    }

    /// Abort every background loop
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        info!("🛑 Metrics collection stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for MetricsCollector {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}

fn spawn_interval_loop<F, Fut>(
    collector: Weak<MetricsCollector>,
    period: Duration,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut(Arc<MetricsCollector>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            let Some(collector) = collector.upgrade() else {
                break;
            };
            tick(collector).await;
        }
    })
}

fn unit_for(name: &str) -> Option<&'static str> {
    match name {
        names::SYSTEM_CPU_USAGE | names::SYSTEM_MEMORY_USAGE => Some("percent"),
        names::SYSTEM_MEMORY_USED_BYTES
        | names::SYSTEM_NETWORK_RX_BYTES
        | names::SYSTEM_NETWORK_TX_BYTES => Some("bytes"),
        names::APP_RESPONSE_TIME => Some("ms"),
        names::APP_ERROR_RATE => Some("ratio"),
        _ => None,
    }
}
