//! Incident triage: alert context, evidence analysis, root cause, remediation and safety.
//!
//! Every stage is a pure function over value types defined here. The
//! [`pipeline`] module sequences them and hands the result to a
//! [`crate::storage::ReportSink`].

pub mod context;
pub mod logs;
pub mod metrics;
pub mod pipeline;
pub mod rca;
pub mod remediation;
pub mod safety;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use self::pipeline::TriagePipeline;

/// Smallest accepted triage window, in minutes.
pub const MIN_WINDOW_MINUTES: i64 = 5;
/// Largest accepted triage window, in minutes.
pub const MAX_WINDOW_MINUTES: i64 = 240;

#[derive(Debug, Error)]
pub enum TriageError {
    #[error("invalid alert payload: {0}")]
    InvalidAlert(String),
    #[error("time_window_minutes must be between {min} and {max}, got {got}")]
    InvalidOptions { min: i64, max: i64, got: i64 },
    #[error("failed to persist incident report: {0:#}")]
    Storage(#[source] anyhow::Error),
    #[error("triage task failed: {0}")]
    Internal(String),
}

impl TriageError {
    /// True for errors caused by the caller's input rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(self, TriageError::InvalidAlert(_) | TriageError::InvalidOptions { .. })
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Inbound alert payload.
///
/// Required fields default to empty so that a missing field surfaces as a
/// validation error from [`Alert::validate`] instead of a decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Alert {
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub timestamp: String,
    /// Signal snapshot: metric name to value. Non-numeric values are ignored.
    #[serde(default)]
    pub signals: Option<Map<String, Value>>,
}

impl Alert {
    pub fn validate(&self) -> Result<(), TriageError> {
        let missing: Vec<&str> = [
            ("service", &self.service),
            ("severity", &self.severity),
            ("timestamp", &self.timestamp),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(TriageError::InvalidAlert(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )))
        }
    }

    /// Numeric value of a signal, if present and a number.
    pub fn signal(&self, name: &str) -> Option<f64> {
        self.signals.as_ref()?.get(name)?.as_f64()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageOptions {
    #[serde(default = "default_window_minutes")]
    pub time_window_minutes: i64,
}

fn default_window_minutes() -> i64 {
    30
}

impl Default for TriageOptions {
    fn default() -> Self {
        Self {
            time_window_minutes: default_window_minutes(),
        }
    }
}

impl TriageOptions {
    pub fn validate(&self) -> Result<(), TriageError> {
        let got = self.time_window_minutes;
        if (MIN_WINDOW_MINUTES..=MAX_WINDOW_MINUTES).contains(&got) {
            Ok(())
        } else {
            Err(TriageError::InvalidOptions {
                min: MIN_WINDOW_MINUTES,
                max: MAX_WINDOW_MINUTES,
                got,
            })
        }
    }
}

/// One metric sample set as read from a metric source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricEvent {
    #[serde(default, deserialize_with = "lenient_ts")]
    pub ts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default)]
    pub metrics: Map<String, Value>,
}

/// Accept string or numeric (epoch) timestamps; numbers keep their JSON text.
fn lenient_ts<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl MetricEvent {
    pub fn value(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric)?.as_f64()
    }
}

// ---------------------------------------------------------------------------
// Alert context
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symptom {
    ErrorRateSpike,
    LatencySpikeP95,
    DbWaitSpike,
    NoClearSymptoms,
}

/// Closed set of incident categories. Unrecognised values decode as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    DbConnectivity,
    Latency,
    DeploymentIssue,
    Auth,
    DependencyDown,
    #[serde(other)]
    Unknown,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::DbConnectivity => "db_connectivity",
            Category::Latency => "latency",
            Category::DeploymentIssue => "deployment_issue",
            Category::Auth => "auth",
            Category::DependencyDown => "dependency_down",
            Category::Unknown => "unknown",
        }
    }

    /// Parse a category name, coercing anything outside the closed set to `Unknown`.
    pub fn parse_lossy(s: &str) -> Self {
        match s {
            "db_connectivity" => Category::DbConnectivity,
            "latency" => Category::Latency,
            "deployment_issue" => Category::DeploymentIssue,
            "auth" => Category::Auth,
            "dependency_down" => Category::DependencyDown,
            _ => Category::Unknown,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentContext {
    pub service: String,
    pub severity: String,
    pub time_window_minutes: i64,
    pub symptoms: Vec<Symptom>,
    pub category: Category,
    pub questions: Vec<String>,
}

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPattern {
    pub pattern: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogFinding {
    pub top_errors: Vec<ErrorPattern>,
    pub notable_trace: Option<String>,
    pub correlated_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricAnomaly {
    pub metric: String,
    pub last_value: f64,
    pub threshold: f64,
    /// Timestamp of the last event analyzed; empty when that event has none.
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricFinding {
    pub anomalies: Vec<MetricAnomaly>,
    pub correlations: Vec<String>,
}

impl MetricFinding {
    pub fn is_anomalous(&self, metric: &str) -> bool {
        self.anomalies.iter().any(|a| a.metric == metric)
    }

    pub fn has_correlation(&self, correlation: &str) -> bool {
        self.correlations.iter().any(|c| c == correlation)
    }
}

// ---------------------------------------------------------------------------
// Hypothesis, plan, verdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RcaHypothesis {
    pub root_cause: String,
    pub confidence: f64,
    pub evidence: Vec<String>,
    pub alternatives: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Risk {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationStep {
    pub step: String,
    pub risk: Risk,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationPlan {
    pub recommended_steps: Vec<RemediationStep>,
    pub validation: Vec<String>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub blocked: bool,
    pub notes: Vec<String>,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Everything the pipeline produces before the safety gate runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportBody {
    pub incident_id: String,
    pub trace_id: String,
    pub incident_context: IncidentContext,
    pub log_findings: LogFinding,
    pub metric_findings: MetricFinding,
    pub rca_hypothesis: RcaHypothesis,
    pub remediation_plan: RemediationPlan,
}

/// Final report: the body plus the safety verdict it was released under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentReport {
    #[serde(flatten)]
    pub body: ReportBody,
    pub safety: SafetyVerdict,
}

/// Persisted envelope around a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredIncident {
    pub incident_id: String,
    pub created_at: String,
    pub report: IncidentReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentSummary {
    pub incident_id: String,
    pub created_at: String,
}

/// Generate a fresh incident identifier (`inc_` + 8 hex chars).
pub fn new_incident_id() -> String {
    format!("inc_{}", &uuid::Uuid::new_v4().simple().to_string()[..8])
}

/// Generate a fresh trace identifier (`trace_` + 12 hex chars).
pub fn new_trace_id() -> String {
    format!("trace_{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
}
