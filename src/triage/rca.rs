//! Root-cause synthesis from log and metric findings.
//!
//! The rule chain is an ordered table of `(predicate, build)` pairs; the
//! first rule whose predicate holds produces the hypothesis. The last rule
//! always matches, so synthesis is total.

use super::metrics::{CORR_LATENCY_CPU, CPU_PCT, DB_WAIT_TIME_MS, LATENCY_P95_MS};
use super::{IncidentContext, LogFinding, MetricFinding, RcaHypothesis};

pub const POOL_EXHAUSTED: &str = "connection pool exhausted";
pub const DB_TIMEOUT: &str = "DB connection timed out";
pub const HTTP_500: &str = "HTTP 500";

pub const ROOT_CAUSE_DB_POOL: &str =
    "Database connection pool exhaustion / DB connectivity degradation";
pub const ROOT_CAUSE_CPU_LATENCY: &str =
    "CPU saturation leading to elevated latency (possible resource contention)";
pub const ROOT_CAUSE_HTTP_500: &str = "Application errors causing HTTP 500 responses";
pub const ROOT_CAUSE_INSUFFICIENT: &str = "Insufficient evidence";

/// Boolean view of the evidence the rules branch on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signals {
    pub pool_exhausted: bool,
    pub db_timeout: bool,
    pub http_500: bool,
    pub db_wait_anomaly: bool,
    pub latency_anomaly: bool,
    pub cpu_anomaly: bool,
    pub latency_cpu_correlated: bool,
}

impl Signals {
    pub fn gather(logs: &LogFinding, metrics: &MetricFinding) -> Self {
        Self {
            pool_exhausted: has_error(logs, POOL_EXHAUSTED),
            db_timeout: has_error(logs, DB_TIMEOUT),
            http_500: has_error(logs, HTTP_500),
            db_wait_anomaly: metrics.is_anomalous(DB_WAIT_TIME_MS),
            latency_anomaly: metrics.is_anomalous(LATENCY_P95_MS),
            cpu_anomaly: metrics.is_anomalous(CPU_PCT),
            latency_cpu_correlated: metrics.has_correlation(CORR_LATENCY_CPU),
        }
    }
}

/// Case-insensitive substring match against the top error patterns.
fn has_error(logs: &LogFinding, keyword: &str) -> bool {
    let keyword = keyword.to_lowercase();
    logs.top_errors
        .iter()
        .any(|e| e.pattern.to_lowercase().contains(&keyword))
}

pub struct RcaRule {
    pub name: &'static str,
    pub matches: fn(&Signals) -> bool,
    pub build: fn(&Signals) -> RcaHypothesis,
}

/// Root-cause rules in priority order.
pub const RULES: &[RcaRule] = &[
    RcaRule {
        name: "db_pool",
        matches: |s: &Signals| s.pool_exhausted || s.db_timeout,
        build: db_pool_hypothesis,
    },
    RcaRule {
        name: "cpu_latency",
        matches: |s: &Signals| s.latency_anomaly && s.cpu_anomaly,
        build: cpu_latency_hypothesis,
    },
    RcaRule {
        name: "http_500",
        matches: |s: &Signals| s.http_500,
        build: http_500_hypothesis,
    },
    RcaRule {
        name: "fallback",
        matches: |_: &Signals| true,
        build: fallback_hypothesis,
    },
];

fn hypothesis(root_cause: &str, confidence: f64, evidence: Vec<String>, alternatives: &[&str]) -> RcaHypothesis {
    RcaHypothesis {
        root_cause: root_cause.to_string(),
        confidence,
        evidence,
        alternatives: alternatives.iter().map(|a| a.to_string()).collect(),
    }
}

fn db_pool_hypothesis(s: &Signals) -> RcaHypothesis {
    let mut confidence = 0.75;
    let mut evidence = Vec::new();
    if s.pool_exhausted {
        evidence.push("Logs show 'connection pool exhausted'".to_string());
    }
    if s.db_timeout {
        evidence.push("Logs show repeated DB connection timeouts".to_string());
    }
    if s.db_wait_anomaly {
        confidence += 0.05;
        evidence.push("Metric anomaly: db_wait_time_ms threshold breach".to_string());
    }
    hypothesis(
        ROOT_CAUSE_DB_POOL,
        confidence,
        evidence,
        &["Network connectivity issues", "Slow queries causing pool saturation"],
    )
}

fn cpu_latency_hypothesis(s: &Signals) -> RcaHypothesis {
    let mut confidence = 0.70;
    let mut evidence = vec![
        "Metric anomaly: latency_p95_ms threshold breach".to_string(),
        "Metric anomaly: cpu_pct threshold breach".to_string(),
    ];
    if s.latency_cpu_correlated {
        confidence += 0.05;
        evidence.push(format!("Correlation: {}", CORR_LATENCY_CPU));
    }
    if s.http_500 {
        evidence.push("Logs show HTTP 500 errors during the window".to_string());
    }
    hypothesis(
        ROOT_CAUSE_CPU_LATENCY,
        confidence,
        evidence,
        &[
            "Downstream dependency slowness",
            "Inefficient code path introduced by deployment",
        ],
    )
}

fn http_500_hypothesis(_: &Signals) -> RcaHypothesis {
    hypothesis(
        ROOT_CAUSE_HTTP_500,
        0.55,
        vec!["Logs show frequent HTTP 500 Internal Server Error".to_string()],
        &["Dependency outage", "Database issues"],
    )
}

fn fallback_hypothesis(_: &Signals) -> RcaHypothesis {
    hypothesis(
        ROOT_CAUSE_INSUFFICIENT,
        0.35,
        vec!["No strong log or metric signature detected".to_string()],
        &["Database issue", "Dependency issue", "Deployment regression"],
    )
}

/// Clamp to [0, 1] and round to two decimals.
fn normalize_confidence(confidence: f64) -> f64 {
    let clamped = confidence.clamp(0.0, 1.0);
    (clamped * 100.0).round() / 100.0
}

/// Build a root-cause hypothesis. The context is accepted for future rules
/// but no current rule branches on it.
pub fn build_rca_hypothesis(
    _context: &IncidentContext,
    logs: &LogFinding,
    metrics: &MetricFinding,
) -> RcaHypothesis {
    let signals = Signals::gather(logs, metrics);
    let rule = RULES
        .iter()
        .find(|rule| (rule.matches)(&signals))
        .unwrap_or(&RULES[RULES.len() - 1]);

    tracing::debug!(rule = rule.name, ?signals, "root-cause rule matched");

    let mut hypothesis = (rule.build)(&signals);
    hypothesis.confidence = normalize_confidence(hypothesis.confidence);
    hypothesis
}
