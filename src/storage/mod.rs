//! SQLite storage layer: the incident report sink.

pub mod schema;

use anyhow::{Context, Result};
use chrono::Utc;
use r2d2::Pool as R2D2Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};

use crate::triage::{IncidentReport, IncidentSummary, StoredIncident};

/// Connection Pool type
pub type Pool = R2D2Pool<SqliteConnectionManager>;

/// Open (or create) the SQLite database and return a connection pool.
pub fn open_pool(path: &str) -> Result<Pool> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create database directory {}", parent.display()))?;
        }
    }

    let manager = SqliteConnectionManager::file(path).with_init(|c| {
        c.execute_batch(
            "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA temp_store = MEMORY;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
        )
    });

    let pool = R2D2Pool::new(manager)?;

    // Run migrations on a single connection
    let conn = pool.get()?;
    schema::migrate(&conn)?;

    Ok(pool)
}

/// Where finished reports go. Implementations must keep writes for distinct
/// incident ids isolated from each other.
pub trait ReportSink: Send + Sync {
    fn save(&self, incident_id: &str, report: &IncidentReport) -> Result<StoredIncident>;
    fn load(&self, incident_id: &str) -> Result<Option<StoredIncident>>;
    /// Most recent first.
    fn list(&self, limit: usize) -> Result<Vec<IncidentSummary>>;
}

/// SQLite-backed [`ReportSink`].
#[derive(Clone)]
pub struct IncidentStore {
    pool: Pool,
}

impl IncidentStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn open(path: &str) -> Result<Self> {
        Ok(Self::new(open_pool(path)?))
    }
}

fn now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

impl ReportSink for IncidentStore {
    fn save(&self, incident_id: &str, report: &IncidentReport) -> Result<StoredIncident> {
        let conn = self.pool.get()?;
        let created_at = now_iso();
        let report_json = serde_json::to_string(report)?;

        // plain INSERT: an id collision fails instead of overwriting another report
        conn.execute(
            "INSERT INTO incidents (incident_id, trace_id, service, blocked, report_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                incident_id,
                report.body.trace_id,
                report.body.incident_context.service,
                report.safety.blocked,
                report_json,
                created_at
            ],
        )
        .with_context(|| format!("failed to insert incident {}", incident_id))?;

        Ok(StoredIncident {
            incident_id: incident_id.to_string(),
            created_at,
            report: report.clone(),
        })
    }

    fn load(&self, incident_id: &str) -> Result<Option<StoredIncident>> {
        let conn = self.pool.get()?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT report_json, created_at FROM incidents WHERE incident_id = ?1",
                [incident_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        row.map(|(report_json, created_at)| {
            let report: IncidentReport = serde_json::from_str(&report_json)
                .with_context(|| format!("corrupt report for incident {}", incident_id))?;
            Ok(StoredIncident {
                incident_id: incident_id.to_string(),
                created_at,
                report,
            })
        })
        .transpose()
    }

    fn list(&self, limit: usize) -> Result<Vec<IncidentSummary>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT incident_id, created_at FROM incidents
             ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            Ok(IncidentSummary {
                incident_id: row.get(0)?,
                created_at: row.get(1)?,
            })
        })?;

        let mut incidents = Vec::new();
        for r in rows {
            incidents.push(r?);
        }
        Ok(incidents)
    }
}
