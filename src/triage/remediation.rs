//! Advisory remediation plans. Nothing here executes anything.

use super::{IncidentContext, RcaHypothesis, RemediationPlan, RemediationStep, Risk};

pub const READ_ONLY_NOTE: &str = "Read-only: these are suggestions only; no commands are executed.";

const ROLLBACK_STEP: &str =
    "If regression confirmed, rollback last deployment for the affected service";

const BASE_VALIDATION: &[&str] = &[
    "Confirm error_rate returns to baseline",
    "Confirm latency_p95_ms returns to baseline",
    "Confirm no new ERROR patterns appear in logs",
];

struct PlanRule {
    name: &'static str,
    /// Lowercase substrings of the root cause that select this rule.
    keywords: &'static [&'static str],
    steps: &'static [(&'static str, Risk)],
    validation: &'static [&'static str],
}

/// Plan rules in priority order; a rule with no keywords matches anything.
const PLAN_RULES: &[PlanRule] = &[
    PlanRule {
        name: "database",
        keywords: &["connection pool", "db connectivity", "database"],
        steps: &[
            (
                "Check DB connection pool utilization and active connections (read-only query/metrics)",
                Risk::Low,
            ),
            (
                "Review recent deployments/config changes related to DB pool size, timeouts, retries",
                Risk::Low,
            ),
            (
                "Identify top slow queries (query logs / APM) and validate indexes/plan regressions",
                Risk::Medium,
            ),
            (
                "Temporarily increase DB pool limit or app-side max connections (if approved)",
                Risk::Medium,
            ),
            (ROLLBACK_STEP, Risk::High),
        ],
        validation: &["Confirm db_wait_time_ms normalizes", "Confirm queue_depth decreases"],
    },
    PlanRule {
        name: "cpu_latency",
        keywords: &["cpu saturation", "latency"],
        steps: &[
            (
                "Inspect CPU utilization and p95 latency per instance (read-only dashboards/metrics)",
                Risk::Low,
            ),
            (
                "Capture a CPU profile of the hottest endpoints (read-only)",
                Risk::Low,
            ),
            (
                "Review recent deployments for new or changed hot code paths",
                Risk::Low,
            ),
            (
                "Scale out the service or raise its CPU limits (if approved)",
                Risk::Medium,
            ),
            (ROLLBACK_STEP, Risk::High),
        ],
        validation: &["Confirm cpu_pct stays below threshold"],
    },
    PlanRule {
        name: "http_500",
        keywords: &["http 500"],
        steps: &[
            (
                "Inspect error traces for the correlated request ids (read-only log search)",
                Risk::Low,
            ),
            (
                "Check health and error rates of downstream dependencies",
                Risk::Low,
            ),
            (
                "Review recent deployments and config changes for the affected service",
                Risk::Low,
            ),
            (
                "Turn off the most recently enabled feature flag on the failing endpoint (if approved)",
                Risk::Medium,
            ),
            (ROLLBACK_STEP, Risk::High),
        ],
        validation: &["Confirm HTTP 5xx responses return to baseline"],
    },
    PlanRule {
        name: "investigate",
        keywords: &[],
        steps: &[
            (
                "Widen the log and metric window and re-run triage (read-only)",
                Risk::Low,
            ),
            (
                "Check dependency status pages and recent deployment history",
                Risk::Low,
            ),
            (
                "Compare current traffic volume against the same window last week",
                Risk::Low,
            ),
        ],
        validation: &[],
    },
];

impl PlanRule {
    fn matches(&self, root_cause: &str) -> bool {
        self.keywords.is_empty() || self.keywords.iter().any(|k| root_cause.contains(k))
    }
}

/// Map a hypothesis to a ranked, risk-tagged plan.
///
/// Low-evidence plans also carry the context's follow-up questions as notes.
pub fn build_remediation_plan(hypothesis: &RcaHypothesis, context: &IncidentContext) -> RemediationPlan {
    let root = hypothesis.root_cause.to_lowercase();
    let rule = PLAN_RULES
        .iter()
        .find(|rule| rule.matches(&root))
        .unwrap_or(&PLAN_RULES[PLAN_RULES.len() - 1]);

    tracing::debug!(rule = rule.name, root_cause = %hypothesis.root_cause, "remediation rule matched");

    let recommended_steps = rule
        .steps
        .iter()
        .map(|(step, risk)| RemediationStep {
            step: step.to_string(),
            risk: *risk,
        })
        .collect();

    let validation = BASE_VALIDATION
        .iter()
        .chain(rule.validation)
        .map(|v| v.to_string())
        .collect();

    let mut notes = vec![READ_ONLY_NOTE.to_string()];
    if rule.keywords.is_empty() {
        notes.extend(context.questions.iter().map(|q| format!("Open question: {}", q)));
    }

    RemediationPlan {
        recommended_steps,
        validation,
        notes,
    }
}
