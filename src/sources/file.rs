//! File-backed sources: `<log_dir>/<service>.log` and `<metrics_dir>/<service>.jsonl`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::{is_valid_service_name, LogSource, MetricSource};
use crate::triage::MetricEvent;

#[derive(Debug, Clone)]
pub struct FileSources {
    log_dir: PathBuf,
    metrics_dir: PathBuf,
}

impl FileSources {
    pub fn new(log_dir: impl Into<PathBuf>, metrics_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            metrics_dir: metrics_dir.into(),
        }
    }

    pub fn log_path(&self, service: &str) -> PathBuf {
        self.log_dir.join(format!("{}.log", service))
    }

    pub fn metrics_path(&self, service: &str) -> PathBuf {
        self.metrics_dir.join(format!("{}.jsonl", service))
    }
}

/// Read the last `limit` lines of a file; a missing file reads as empty.
/// Lines that are not valid UTF-8 are dropped one by one.
async fn tail_lines(path: &Path, limit: usize) -> Result<Vec<String>> {
    let content = match tokio::fs::read(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "evidence file not found");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()));
        }
    };

    let mut lines: Vec<&[u8]> = content.split(|b| *b == b'\n').collect();
    if lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    let start = lines.len().saturating_sub(limit);

    let mut out = Vec::with_capacity(lines.len() - start);
    let mut skipped = 0usize;
    for &raw in &lines[start..] {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        match std::str::from_utf8(raw) {
            Ok(line) => out.push(line.to_string()),
            Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(path = %path.display(), skipped, "skipped lines that are not valid UTF-8");
    }
    Ok(out)
}

#[async_trait::async_trait]
impl LogSource for FileSources {
    async fn fetch_logs(&self, service: &str, limit: usize) -> Result<Vec<String>> {
        if !is_valid_service_name(service) {
            warn!(%service, "refusing to read logs for unsafe service name");
            return Ok(Vec::new());
        }
        tail_lines(&self.log_path(service), limit).await
    }
}

#[async_trait::async_trait]
impl MetricSource for FileSources {
    async fn fetch_metrics(&self, service: &str, limit: usize) -> Result<Vec<MetricEvent>> {
        if !is_valid_service_name(service) {
            warn!(%service, "refusing to read metrics for unsafe service name");
            return Ok(Vec::new());
        }

        let lines = tail_lines(&self.metrics_path(service), limit).await?;
        let mut events = Vec::with_capacity(lines.len());
        let mut skipped = 0usize;
        for line in lines.iter().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str::<MetricEvent>(line) {
                Ok(ev) => events.push(ev),
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(%service, skipped, "skipped unparseable metric events");
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources(dir: &Path) -> FileSources {
        FileSources::new(dir.join("live_logs"), dir.join("live_metrics"))
    }

    #[tokio::test]
    async fn test_missing_files_are_empty() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let src = sources(dir.path());
        assert!(src.fetch_logs("orders-api", 500).await?.is_empty());
        assert!(src.fetch_metrics("orders-api", 120).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_logs_are_tailed() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let src = sources(dir.path());
        std::fs::create_dir_all(dir.path().join("live_logs"))?;
        let body: String = (0..10).map(|i| format!("line {}\n", i)).collect();
        std::fs::write(src.log_path("orders-api"), body)?;

        let lines = src.fetch_logs("orders-api", 3).await?;
        assert_eq!(lines, vec!["line 7", "line 8", "line 9"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_bad_metric_lines_are_skipped() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let src = sources(dir.path());
        std::fs::create_dir_all(dir.path().join("live_metrics"))?;
        std::fs::write(
            src.metrics_path("orders-api"),
            concat!(
                r#"{"ts":"t1","service":"orders-api","metrics":{"cpu_pct":40.0}}"#,
                "\n",
                "not json\n",
                "\n",
                r#"{"ts":"t2","metrics":{"cpu_pct":91.5}}"#,
                "\n",
            ),
        )?;

        let events = src.fetch_metrics("orders-api", 120).await?;
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].ts.as_deref(), Some("t2"));
        assert_eq!(events[1].value("cpu_pct"), Some(91.5));
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_utf8_lines_are_skipped() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let src = sources(dir.path());
        std::fs::create_dir_all(dir.path().join("live_logs"))?;
        std::fs::create_dir_all(dir.path().join("live_metrics"))?;

        let mut log = Vec::new();
        log.extend_from_slice(
            br#"t1 level=ERROR service=svc request_id=req-1 msg="psycopg2.OperationalError: connection pool exhausted""#,
        );
        log.extend_from_slice(b"\r\nbroken \xff line\n");
        std::fs::write(src.log_path("svc"), log)?;

        let mut metrics = Vec::new();
        metrics.extend_from_slice(br#"{"ts":"t1","metrics":{"db_wait_time_ms":450}}"#);
        metrics.extend_from_slice(b"\n\xff\xfe garbage\n");
        std::fs::write(src.metrics_path("svc"), metrics)?;

        let lines = src.fetch_logs("svc", 500).await?;
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("connection pool exhausted\""));

        let events = src.fetch_metrics("svc", 120).await?;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].value("db_wait_time_ms"), Some(450.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_path_traversal_is_refused() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let src = sources(dir.path());
        assert!(src.fetch_logs("../secrets", 10).await?.is_empty());
        Ok(())
    }
}
