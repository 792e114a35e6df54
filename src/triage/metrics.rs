//! Metric analysis: last-sample threshold breaches and co-occurrence "correlations".
//!
//! Nothing here is statistical. A metric is anomalous when its most recent
//! sample meets or exceeds its threshold, and a correlation is two such
//! breaches at the same time.

use serde::{Deserialize, Serialize};

use super::{MetricAnomaly, MetricEvent, MetricFinding};

pub const ERROR_RATE: &str = "error_rate";
pub const LATENCY_P95_MS: &str = "latency_p95_ms";
pub const CPU_PCT: &str = "cpu_pct";
pub const MEMORY_PCT: &str = "memory_pct";
pub const DB_WAIT_TIME_MS: &str = "db_wait_time_ms";
pub const QUEUE_DEPTH: &str = "queue_depth";

pub const CORR_ERROR_DB_WAIT: &str = "error_rate aligns with db_wait_time spike";
pub const CORR_ERROR_LATENCY: &str = "error_rate aligns with latency p95 spike";
pub const CORR_LATENCY_CPU: &str = "latency spike aligns with high CPU";

/// Per-metric anomaly thresholds. Missing keys in a config file fall back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub error_rate: f64,
    pub latency_p95_ms: f64,
    pub cpu_pct: f64,
    pub memory_pct: f64,
    pub db_wait_time_ms: f64,
    pub queue_depth: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            error_rate: 0.10,
            latency_p95_ms: 800.0,
            cpu_pct: 85.0,
            memory_pct: 90.0,
            db_wait_time_ms: 300.0,
            queue_depth: 100.0,
        }
    }
}

impl Thresholds {
    /// Tracked metrics with their thresholds, in reporting order.
    pub fn tracked(&self) -> [(&'static str, f64); 6] {
        [
            (ERROR_RATE, self.error_rate),
            (LATENCY_P95_MS, self.latency_p95_ms),
            (CPU_PCT, self.cpu_pct),
            (MEMORY_PCT, self.memory_pct),
            (DB_WAIT_TIME_MS, self.db_wait_time_ms),
            (QUEUE_DEPTH, self.queue_depth),
        ]
    }

    pub fn get(&self, metric: &str) -> Option<f64> {
        self.tracked()
            .into_iter()
            .find(|(name, _)| *name == metric)
            .map(|(_, threshold)| threshold)
    }
}

/// Pairwise co-occurrence rules: both metrics' last samples must breach.
const CORRELATION_RULES: &[(&str, &str, &str)] = &[
    (ERROR_RATE, DB_WAIT_TIME_MS, CORR_ERROR_DB_WAIT),
    (ERROR_RATE, LATENCY_P95_MS, CORR_ERROR_LATENCY),
    (LATENCY_P95_MS, CPU_PCT, CORR_LATENCY_CPU),
];

/// Most recent numeric sample of `metric` across the sequence.
fn last_sample(events: &[MetricEvent], metric: &str) -> Option<f64> {
    events.iter().rev().find_map(|ev| ev.value(metric))
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Analyze metric events in chronological order against `thresholds`.
pub fn analyze_metrics(events: &[MetricEvent], thresholds: &Thresholds) -> MetricFinding {
    let Some(last_event) = events.last() else {
        return MetricFinding::default();
    };

    let breached = |metric: &str| -> bool {
        match (last_sample(events, metric), thresholds.get(metric)) {
            (Some(value), Some(threshold)) => value >= threshold,
            _ => false,
        }
    };

    let anomalies = thresholds
        .tracked()
        .into_iter()
        .filter_map(|(metric, threshold)| {
            let last = last_sample(events, metric)?;
            (last >= threshold).then(|| MetricAnomaly {
                metric: metric.to_string(),
                last_value: round_to(last, 4),
                threshold,
                timestamp: last_event.ts.clone().unwrap_or_default(),
            })
        })
        .collect();

    let correlations = CORRELATION_RULES
        .iter()
        .filter(|(a, b, _)| breached(*a) && breached(*b))
        .map(|(_, _, text)| text.to_string())
        .collect();

    MetricFinding {
        anomalies,
        correlations,
    }
}
