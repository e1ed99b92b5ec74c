//! # Metrics Export
//!
//! Exporter kinds and the Prometheus text rendering. Each configured
//! exporter runs on its own interval inside the collector.

use super::series::MetricSeries;
use crate::constants::metrics as names;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExporterKind {
    /// Structured log summary of every series
    Log,
    /// Prometheus text exposition, logged or written to a file
    Prometheus,
    /// Threshold evaluation producing violation events
    ViolationCheck,
}

impl ExporterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExporterKind::Log => "log",
            ExporterKind::Prometheus => "prometheus",
            ExporterKind::ViolationCheck => "violation_check",
        }
    }
}

impl fmt::Display for ExporterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prometheus metric name: prefixed, with every non `[a-zA-Z0-9_]` mapped to `_`
pub fn prometheus_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("{}_{}", names::PROMETHEUS_PREFIX, sanitized)
}

fn prometheus_type(name: &str) -> &'static str {
    match name {
        names::APP_REQUESTS
        | names::APP_ERRORS
        | names::SYSTEM_NETWORK_RX_BYTES
        | names::SYSTEM_NETWORK_TX_BYTES
        | names::RESILIENCE_CIRCUIT_BREAKER_TRIPS
        | names::RESILIENCE_RECOVERY_ATTEMPTS => "counter",
        _ => "gauge",
    }
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Render the latest sample of each series, sorted by name
pub fn render_prometheus<'a>(series: impl IntoIterator<Item = &'a MetricSeries>) -> String {
    let mut series: Vec<_> = series.into_iter().filter(|s| !s.is_empty()).collect();
    series.sort_by(|a, b| a.name.cmp(&b.name));

    let mut output = String::new();
    for series in series {
        let Some(latest) = series.latest() else {
            continue;
        };
        let name = prometheus_name(&series.name);

        let _ = writeln!(output, "# HELP {name} {}", series.name);
        let _ = writeln!(output, "# TYPE {name} {}", prometheus_type(&series.name));

        let mut labels: Vec<_> = series.labels.iter().chain(latest.labels.iter()).collect();
        labels.sort();
        labels.dedup_by(|a, b| a.0 == b.0);

        if labels.is_empty() {
            let _ = writeln!(output, "{name} {}", latest.value);
        } else {
            let rendered: Vec<_> = labels
                .iter()
                .map(|(key, value)| format!("{key}=\"{}\"", escape_label_value(value)))
                .collect();
            let _ = writeln!(output, "{name}{{{}}} {}", rendered.join(","), latest.value);
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::series::MetricValue;
    use chrono::Utc;
    use std::time::Duration;

    #[test]
    fn test_prometheus_name_sanitisation() {
        assert_eq!(prometheus_name("app.error_rate"), "bridge_app_error_rate");
        assert_eq!(prometheus_name("system.cpu-usage"), "bridge_system_cpu_usage");
    }

    #[test]
    fn test_render_prometheus() {
        let mut requests = MetricSeries::new(names::APP_REQUESTS, Duration::from_secs(60));
        requests.record(MetricValue::new(42.0, Utc::now()));

        let mut cpu = MetricSeries::new(names::SYSTEM_CPU_USAGE, Duration::from_secs(60));
        let mut sample = MetricValue::new(12.5, Utc::now());
        sample.labels.insert("host".into(), "dev\"box".into());
        cpu.record(sample);

        let empty = MetricSeries::new("app.unused", Duration::from_secs(60));

        let text = render_prometheus([&requests, &cpu, &empty]);
        assert!(text.contains("# TYPE bridge_app_requests counter\nbridge_app_requests 42\n"));
        assert!(text.contains("# TYPE bridge_system_cpu_usage gauge\n"));
        assert!(text.contains("bridge_system_cpu_usage{host=\"dev\\\"box\"} 12.5"));
        assert!(!text.contains("unused"));

        // Sorted by series name
        let app = text.find("bridge_app_requests").unwrap();
        let system = text.find("bridge_system_cpu_usage").unwrap();
        assert!(app < system);
    }

    #[test]
    fn test_exporter_kind_names() {
        assert_eq!(ExporterKind::ViolationCheck.to_string(), "violation_check");
        let kind: ExporterKind = serde_json::from_str("\"prometheus\"").unwrap();
        assert_eq!(kind, ExporterKind::Prometheus);
    }
}
