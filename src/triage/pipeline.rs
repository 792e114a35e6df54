//! Triage orchestration: fetch evidence, run every stage, gate, persist.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::context::build_incident_context;
use super::logs::{analyze_logs, DEFAULT_TOP_N};
use super::metrics::{analyze_metrics, Thresholds};
use super::rca::build_rca_hypothesis;
use super::remediation::build_remediation_plan;
use super::safety::SafetyPolicy;
use super::{
    new_incident_id, new_trace_id, Alert, IncidentReport, LogFinding, MetricEvent, MetricFinding,
    RcaHypothesis, RemediationPlan, ReportBody, StoredIncident, TriageError, TriageOptions,
};
use crate::sources::{LogSource, MetricSource, DEFAULT_LOG_LIMIT, DEFAULT_METRIC_LIMIT};
use crate::storage::ReportSink;

pub const BLOCKED_ROOT_CAUSE: &str = "Blocked by safety policy";
pub const BLOCKED_NOTE: &str = "Output blocked due to safety policy.";

/// Raw evidence gathered for one triage run.
#[derive(Debug, Clone, Default)]
pub struct Evidence {
    pub logs: Vec<String>,
    pub metrics: Vec<MetricEvent>,
}

pub struct TriagePipeline {
    logs: Arc<dyn LogSource>,
    metrics: Arc<dyn MetricSource>,
    sink: Arc<dyn ReportSink>,
    thresholds: Thresholds,
    safety: SafetyPolicy,
    log_limit: usize,
    metric_limit: usize,
}

impl TriagePipeline {
    pub fn new(
        logs: Arc<dyn LogSource>,
        metrics: Arc<dyn MetricSource>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            logs,
            metrics,
            sink,
            thresholds: Thresholds::default(),
            safety: SafetyPolicy::default(),
            log_limit: DEFAULT_LOG_LIMIT,
            metric_limit: DEFAULT_METRIC_LIMIT,
        }
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_safety_policy(mut self, safety: SafetyPolicy) -> Self {
        self.safety = safety;
        self
    }

    pub fn with_limits(mut self, log_limit: usize, metric_limit: usize) -> Self {
        self.log_limit = log_limit;
        self.metric_limit = metric_limit;
        self
    }

    pub fn sink(&self) -> Arc<dyn ReportSink> {
        Arc::clone(&self.sink)
    }

    /// Run one triage and persist exactly one report.
    ///
    /// Invalid input is rejected before any evidence is read. Unavailable
    /// sources degrade to empty evidence; a safety block is not an error.
    pub async fn triage(
        &self,
        alert: &Alert,
        options: &TriageOptions,
    ) -> Result<StoredIncident, TriageError> {
        alert.validate()?;
        options.validate()?;

        let incident_id = new_incident_id();
        let trace_id = new_trace_id();
        info!(
            %trace_id,
            %incident_id,
            service = %alert.service,
            severity = %alert.severity,
            "triage request received"
        );

        let evidence = self.gather(&alert.service, &trace_id).await;
        let report = assemble_report(
            incident_id.clone(),
            trace_id.clone(),
            alert,
            options,
            &evidence,
            &self.thresholds,
            &self.safety,
        );

        let sink = Arc::clone(&self.sink);
        let id = incident_id.clone();
        let stored = tokio::task::spawn_blocking(move || sink.save(&id, &report))
            .await
            .map_err(|e| TriageError::Internal(e.to_string()))?
            .map_err(TriageError::Storage)?;

        info!(
            %trace_id,
            %incident_id,
            blocked = stored.report.safety.blocked,
            created_at = %stored.created_at,
            "report persisted"
        );
        Ok(stored)
    }

    async fn gather(&self, service: &str, trace_id: &str) -> Evidence {
        let (logs, metrics) = tokio::join!(
            self.logs.fetch_logs(service, self.log_limit),
            self.metrics.fetch_metrics(service, self.metric_limit),
        );

        let logs = logs.unwrap_or_else(|e| {
            warn!(%trace_id, %service, error = %e, "log source unavailable");
            Vec::new()
        });
        let metrics = metrics.unwrap_or_else(|e| {
            warn!(%trace_id, %service, error = %e, "metric source unavailable");
            Vec::new()
        });
        debug!(%trace_id, log_lines = logs.len(), metric_events = metrics.len(), "evidence gathered");

        Evidence { logs, metrics }
    }
}

/// Run every stage over already-gathered evidence. Pure apart from tracing.
pub fn assemble_report(
    incident_id: String,
    trace_id: String,
    alert: &Alert,
    options: &TriageOptions,
    evidence: &Evidence,
    thresholds: &Thresholds,
    safety: &SafetyPolicy,
) -> IncidentReport {
    let context = build_incident_context(alert, options.time_window_minutes);
    info!(
        %trace_id,
        category = %context.category,
        symptoms = ?context.symptoms,
        "alert context built"
    );

    let log_findings = analyze_logs(&evidence.logs, DEFAULT_TOP_N);
    info!(
        %trace_id,
        top_errors = log_findings.top_errors.len(),
        correlated_ids = log_findings.correlated_ids.len(),
        "logs analyzed"
    );

    let metric_findings = analyze_metrics(&evidence.metrics, thresholds);
    info!(
        %trace_id,
        anomalies = metric_findings.anomalies.len(),
        correlations = metric_findings.correlations.len(),
        "metrics analyzed"
    );

    let hypothesis = build_rca_hypothesis(&context, &log_findings, &metric_findings);
    info!(
        %trace_id,
        root_cause = %hypothesis.root_cause,
        confidence = hypothesis.confidence,
        "hypothesis built"
    );

    let plan = build_remediation_plan(&hypothesis, &context);
    info!(%trace_id, steps = plan.recommended_steps.len(), "remediation planned");

    let body = ReportBody {
        incident_id,
        trace_id,
        incident_context: context,
        log_findings,
        metric_findings,
        rca_hypothesis: hypothesis,
        remediation_plan: plan,
    };

    let verdict = safety.check_report(&body);
    if verdict.blocked {
        warn!(trace_id = %body.trace_id, notes = ?verdict.notes, "safety check blocked report");
        redacted_report(body, verdict)
    } else {
        info!(trace_id = %body.trace_id, "safety check passed");
        IncidentReport { body, safety: verdict }
    }
}

/// Replace everything derived from evidence with placeholders, keeping the
/// ids and the incident context.
pub fn redacted_report(body: ReportBody, verdict: super::SafetyVerdict) -> IncidentReport {
    IncidentReport {
        body: ReportBody {
            incident_id: body.incident_id,
            trace_id: body.trace_id,
            incident_context: body.incident_context,
            log_findings: LogFinding::default(),
            metric_findings: MetricFinding::default(),
            rca_hypothesis: RcaHypothesis {
                root_cause: BLOCKED_ROOT_CAUSE.to_string(),
                confidence: 0.0,
                evidence: Vec::new(),
                alternatives: Vec::new(),
            },
            remediation_plan: RemediationPlan {
                recommended_steps: Vec::new(),
                validation: Vec::new(),
                notes: vec![BLOCKED_NOTE.to_string()],
            },
        },
        safety: verdict,
    }
}
