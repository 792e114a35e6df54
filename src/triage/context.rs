//! Alert context builder: symptom tags, category and follow-up questions.

use super::{Alert, Category, IncidentContext, Symptom};

const ERROR_RATE_SPIKE: f64 = 0.10;
const LATENCY_P95_SPIKE_MS: f64 = 800.0;
const DB_WAIT_SPIKE_MS: f64 = 300.0;

const DEPLOYMENT_QUESTION: &str = "Did any deployments occur in the last 60 minutes?";
const DB_POOL_QUESTION: &str = "Are DB connection pool metrics available (utilization, timeouts)?";

/// Signal checks, each independent of the others.
const SYMPTOM_CHECKS: &[(&str, f64, Symptom)] = &[
    ("error_rate", ERROR_RATE_SPIKE, Symptom::ErrorRateSpike),
    ("latency_p95_ms", LATENCY_P95_SPIKE_MS, Symptom::LatencySpikeP95),
    ("db_wait_time_ms", DB_WAIT_SPIKE_MS, Symptom::DbWaitSpike),
];

type CategoryRule = (fn(&[Symptom]) -> bool, Category);

/// Category decision list. First match wins.
const CATEGORY_RULES: &[CategoryRule] = &[
    (|s: &[Symptom]| s.contains(&Symptom::DbWaitSpike), Category::DbConnectivity),
    (
        |s: &[Symptom]| s.contains(&Symptom::ErrorRateSpike) && s.contains(&Symptom::LatencySpikeP95),
        Category::DependencyDown,
    ),
    (|s: &[Symptom]| s.contains(&Symptom::LatencySpikeP95), Category::Latency),
    (|s: &[Symptom]| s.contains(&Symptom::ErrorRateSpike), Category::Unknown),
];

pub fn detect_symptoms(alert: &Alert) -> Vec<Symptom> {
    let mut symptoms: Vec<Symptom> = SYMPTOM_CHECKS
        .iter()
        .filter(|(metric, threshold, _)| alert.signal(metric).is_some_and(|v| v >= *threshold))
        .map(|(_, _, symptom)| *symptom)
        .collect();

    if symptoms.is_empty() {
        symptoms.push(Symptom::NoClearSymptoms);
    }
    symptoms
}

pub fn classify(symptoms: &[Symptom]) -> Category {
    CATEGORY_RULES
        .iter()
        .find(|(matches, _)| matches(symptoms))
        .map(|(_, category)| *category)
        .unwrap_or(Category::Unknown)
}

fn follow_up_questions(category: Category) -> Vec<String> {
    let mut questions = Vec::new();
    if matches!(category, Category::Unknown | Category::DependencyDown) {
        questions.push(DEPLOYMENT_QUESTION.to_string());
    }
    if category == Category::DbConnectivity {
        questions.push(DB_POOL_QUESTION.to_string());
    }
    questions
}

/// Build the incident context for an alert. Never fails; unusable signals are skipped.
pub fn build_incident_context(alert: &Alert, time_window_minutes: i64) -> IncidentContext {
    let symptoms = detect_symptoms(alert);
    let category = classify(&symptoms);

    IncidentContext {
        service: alert.service.clone(),
        severity: alert.severity.clone(),
        time_window_minutes,
        questions: follow_up_questions(category),
        symptoms,
        category,
    }
}
