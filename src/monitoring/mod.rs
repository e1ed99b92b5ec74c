//! # Monitoring Module
//!
//! Metrics collection, alert thresholds and export for the bridge.
//!
//! - **Series**: retention-bounded samples with cached aggregations
//! - **Thresholds**: severity-tagged degradation alerts
//! - **Export**: log summary, Prometheus text and violation checks
//! - **Sampler**: host CPU, memory and network readings
//! - **Collector**: ties the above together on fixed intervals

pub mod collector;
pub mod export;
pub mod sampler;
pub mod series;
pub mod thresholds;

pub use collector::{MetricsCollector, MetricsSummary, SeriesSummary};
pub use export::{prometheus_name, render_prometheus, ExporterKind};
pub use sampler::{StaticSampler, SysinfoSampler, SystemSample, SystemSampler};
pub use series::{Aggregations, MetricSeries, MetricValue};
pub use thresholds::{
    detect_violations, AlertThresholds, ThresholdInputs, ThresholdViolation, ViolationSeverity,
};
