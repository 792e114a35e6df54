//! IncidentMind -- read-only incident triage for production services.
//!
//! This crate provides the core library for turning an alert plus recent
//! logs and metrics into a persisted, safety-audited incident report: the
//! triage stages, evidence sources, SQLite storage, configuration and the
//! HTTP API.

pub mod api;
pub mod config;
pub mod sources;
pub mod storage;
pub mod triage;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::IncidentMindConfig;
use crate::sources::FileSources;
use crate::storage::IncidentStore;
use crate::triage::safety::SafetyPolicy;
use crate::triage::TriagePipeline;

/// Open the configured store and sources and build a pipeline over them.
pub fn build_pipeline(config: &IncidentMindConfig) -> Result<TriagePipeline> {
    let db_path = config
        .storage
        .db_path
        .to_str()
        .context("database path is not valid UTF-8")?;
    tracing::info!(%db_path, "Initializing database");
    let store = IncidentStore::open(db_path)?;

    let sources = Arc::new(FileSources::new(
        config.sources.log_dir.clone(),
        config.sources.metrics_dir.clone(),
    ));

    Ok(TriagePipeline::new(sources.clone(), sources, Arc::new(store))
        .with_thresholds(config.thresholds.clone())
        .with_safety_policy(SafetyPolicy::with_extra(&config.safety.extra_denylist))
        .with_limits(config.sources.log_limit, config.sources.metric_limit))
}

/// Start the IncidentMind API server.
pub async fn serve(config: &IncidentMindConfig) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let app = api::router(api::state::AppState::new(pipeline));

    let addr: std::net::SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.server.bind))?;

    tracing::info!(%addr, "IncidentMind listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
