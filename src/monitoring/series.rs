//! Metric series with retention-bounded samples and cached aggregations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// One timestamped sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
}

impl MetricValue {
    pub fn new(value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            value,
            timestamp,
            labels: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Aggregations {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub count: usize,
}

impl Aggregations {
    pub fn compute<'a>(values: impl IntoIterator<Item = &'a MetricValue>) -> Self {
        let mut aggregations = Aggregations {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            ..Aggregations::default()
        };
        for sample in values {
            aggregations.sum += sample.value;
            aggregations.min = aggregations.min.min(sample.value);
            aggregations.max = aggregations.max.max(sample.value);
            aggregations.count += 1;
        }

        if aggregations.count == 0 {
            return Aggregations::default();
        }
        aggregations.avg = aggregations.sum / aggregations.count as f64;
        aggregations
    }
}

/// Named sequence of samples; cleanup by age is the only deletion path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub name: String,
    pub unit: Option<String>,
    pub labels: HashMap<String, String>,
    #[serde(with = "retention_ms")]
    pub retention: Duration,
    values: VecDeque<MetricValue>,
    aggregations: Aggregations,
}

impl MetricSeries {
    pub fn new(name: impl Into<String>, retention: Duration) -> Self {
        Self {
            name: name.into(),
            unit: None,
            labels: HashMap::new(),
            retention,
            values: VecDeque::new(),
            aggregations: Aggregations::default(),
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Append a sample, keeping samples ordered by timestamp
    pub fn record(&mut self, sample: MetricValue) {
        let position = self
            .values
            .iter()
            .rposition(|existing| existing.timestamp <= sample.timestamp)
            .map_or(0, |index| index + 1);
        self.values.insert(position, sample);
        self.recompute();
    }

    /// Drop samples older than the retention, measured back from `now`
    ///
    /// Returns the number of samples removed.
    pub fn cleanup(&mut self, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(self.retention)
            .ok()
            .and_then(|retention| now.checked_sub_signed(retention))
        else {
            return 0;
        };

        let before = self.values.len();
        while self.values.front().is_some_and(|sample| sample.timestamp < cutoff) {
            self.values.pop_front();
        }
        self.recompute();
        before - self.values.len()
    }

    fn recompute(&mut self) {
        self.aggregations = Aggregations::compute(&self.values);
    }

    pub fn aggregations(&self) -> Aggregations {
        self.aggregations
    }

    pub fn values(&self) -> impl Iterator<Item = &MetricValue> {
        self.values.iter()
    }

    pub fn latest(&self) -> Option<&MetricValue> {
        self.values.back()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

mod retention_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000 + seconds, 0).unwrap()
    }

    #[test]
    fn test_aggregations_follow_inserts() {
        let mut series = MetricSeries::new("app.response_time", Duration::from_secs(60)).with_unit("ms");
        assert_eq!(series.aggregations(), Aggregations::default());

        for (offset, value) in [(0, 10.0), (1, 30.0), (2, 20.0)] {
            series.record(MetricValue::new(value, at(offset)));
        }

        let aggregations = series.aggregations();
        assert_eq!(aggregations.count, 3);
        assert_eq!(aggregations.sum, 60.0);
        assert_eq!(aggregations.avg, 20.0);
        assert_eq!(aggregations.min, 10.0);
        assert_eq!(aggregations.max, 30.0);
        assert_eq!(series.latest().map(|v| v.value), Some(20.0));
    }

    #[test]
    fn test_cleanup_prunes_by_retention() {
        let mut series = MetricSeries::new("system.cpu.usage", Duration::from_secs(10));
        series.record(MetricValue::new(90.0, at(0)));
        series.record(MetricValue::new(50.0, at(5)));
        series.record(MetricValue::new(40.0, at(12)));

        assert_eq!(series.cleanup(at(14)), 1);
        let aggregations = series.aggregations();
        assert_eq!(aggregations.count, 2);
        assert_eq!(aggregations.max, 50.0);
        assert_eq!(aggregations.avg, 45.0);

        assert_eq!(series.cleanup(at(100)), 2);
        assert!(series.is_empty());
        assert_eq!(series.aggregations(), Aggregations::default());
    }

    #[test]
    fn test_out_of_order_samples_keep_time_order() {
        let mut series = MetricSeries::new("app.requests", Duration::from_secs(10));
        series.record(MetricValue::new(1.0, at(5)));
        series.record(MetricValue::new(2.0, at(1)));
        series.record(MetricValue::new(3.0, at(8)));

        let timestamps: Vec<_> = series.values().map(|v| v.timestamp).collect();
        assert_eq!(timestamps, vec![at(1), at(5), at(8)]);

        // The early sample is the first to age out
        series.cleanup(at(12));
        assert_eq!(series.values().map(|v| v.value).collect::<Vec<_>>(), vec![1.0, 3.0]);
    }
}
