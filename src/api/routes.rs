//! API route definitions.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use super::state::AppState;
use super::ApiError;
use crate::triage::{Alert, StoredIncident, TriageOptions};

const DEFAULT_LIST_LIMIT: usize = 20;
const MAX_LIST_LIMIT: usize = 500;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/incidents/triage", post(triage_incident))
        .route("/incidents", get(list_incidents))
        .route("/incidents/{incident_id}", get(get_incident))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
struct TriageRequest {
    #[serde(default)]
    alert: Alert,
    #[serde(default)]
    options: TriageOptions,
}

async fn triage_incident(
    State(state): State<AppState>,
    payload: Result<Json<TriageRequest>, JsonRejection>,
) -> Result<Json<StoredIncident>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let stored = state.pipeline.triage(&req.alert, &req.options).await?;
    Ok(Json(stored))
}

async fn get_incident(
    State(state): State<AppState>,
    Path(incident_id): Path<String>,
) -> Result<Json<StoredIncident>, ApiError> {
    let store = state.store.clone();
    let found = tokio::task::spawn_blocking(move || store.load(&incident_id))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    found
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Incident not found".to_string()))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    limit: Option<usize>,
}

async fn list_incidents(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);
    let store = state.store.clone();
    let incidents = tokio::task::spawn_blocking(move || store.list(limit))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(json!({ "incidents": incidents })))
}
