//! Synthetic log and metric generators for demos and soak testing.
//!
//! Output matches what [`super::FileSources`] reads: logfmt-style lines with a
//! quoted `msg`, and one JSON metric event per line.

use std::path::Path;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::{json, Map, Value};
use tokio::io::AsyncWriteExt;

use crate::triage::metrics::{
    CPU_PCT, DB_WAIT_TIME_MS, ERROR_RATE, LATENCY_P95_MS, MEMORY_PCT, QUEUE_DEPTH,
};
use crate::triage::MetricEvent;

const ERRORS: &[&str] = &[
    "TimeoutError: DB connection timed out",
    "psycopg2.OperationalError: connection pool exhausted",
    "HTTP 500 Internal Server Error",
];
const WARNS: &[&str] = &[
    "Slow query detected duration_ms=1540",
    "Slow query detected duration_ms=1622",
];
const INFOS: &[&str] = &["GET /health 200", "Retry succeeded"];

const BURST_EVERY: u64 = 40;

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

/// Emits log lines: roughly 20% ERROR, 15% WARN, the rest INFO.
pub struct LogGenerator {
    service: String,
    next_request: u64,
    rng: StdRng,
}

impl LogGenerator {
    pub fn new(service: impl Into<String>, seed: Option<u64>) -> Self {
        Self {
            service: service.into(),
            next_request: 1000,
            rng: rng_from(seed),
        }
    }

    pub fn next_line(&mut self, ts: &str) -> String {
        self.next_request += 1;
        let p: f64 = self.rng.gen();
        let (level, msg) = if p < 0.20 {
            ("ERROR", pick(&mut self.rng, ERRORS))
        } else if p < 0.35 {
            ("WARN", pick(&mut self.rng, WARNS))
        } else {
            ("INFO", pick(&mut self.rng, INFOS))
        };
        format!(
            r#"{} level={} service={} request_id=req-{} msg="{}""#,
            ts, level, self.service, self.next_request, msg
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BurstKind {
    Db,
    Latency,
    Error,
}

/// Random-walk metric generator with a periodic incident burst.
pub struct MetricGenerator {
    service: String,
    rng: StdRng,
    tick: u64,
    burst: Option<(BurstKind, u32)>,
    cpu: f64,
    mem: f64,
    latency_p95: f64,
    error_rate: f64,
    db_wait: f64,
    queue_depth: f64,
}

impl MetricGenerator {
    pub fn new(service: impl Into<String>, seed: Option<u64>) -> Self {
        Self {
            service: service.into(),
            rng: rng_from(seed),
            tick: 0,
            burst: None,
            cpu: 35.0,
            mem: 55.0,
            latency_p95: 250.0,
            error_rate: 0.01,
            db_wait: 50.0,
            queue_depth: 10.0,
        }
    }

    fn apply_noise(&mut self) {
        let r = &mut self.rng;
        self.cpu = (self.cpu + r.gen_range(-2.0..2.0)).clamp(5.0, 95.0);
        self.mem = (self.mem + r.gen_range(-1.5..1.5)).clamp(10.0, 95.0);
        self.latency_p95 = (self.latency_p95 + r.gen_range(-30.0..30.0)).clamp(80.0, 2000.0);
        self.db_wait = (self.db_wait + r.gen_range(-10.0..10.0)).clamp(0.0, 1500.0);
        self.queue_depth = (self.queue_depth + r.gen_range(-2.0..2.0)).clamp(0.0, 500.0);
    }

    fn apply_burst(&mut self, kind: BurstKind) {
        let r = &mut self.rng;
        match kind {
            BurstKind::Db => {
                self.db_wait = (self.db_wait + r.gen_range(80.0..180.0)).clamp(0.0, 1500.0);
                self.error_rate = (self.error_rate + r.gen_range(0.01..0.03)).clamp(0.0, 1.0);
                self.latency_p95 = (self.latency_p95 + r.gen_range(50.0..120.0)).clamp(80.0, 2000.0);
            }
            BurstKind::Latency => {
                self.latency_p95 = (self.latency_p95 + r.gen_range(120.0..260.0)).clamp(80.0, 2000.0);
                self.cpu = (self.cpu + r.gen_range(5.0..12.0)).clamp(5.0, 95.0);
            }
            BurstKind::Error => {
                self.error_rate = (self.error_rate + r.gen_range(0.02..0.06)).clamp(0.0, 1.0);
                self.queue_depth = (self.queue_depth + r.gen_range(10.0..30.0)).clamp(0.0, 500.0);
            }
        }
    }

    fn snapshot(&self, ts: &str) -> MetricEvent {
        let round = |v: f64, places: i32| {
            let f = 10f64.powi(places);
            (v * f).round() / f
        };
        let metrics: Map<String, Value> = [
            (CPU_PCT, json!(round(self.cpu, 2))),
            (MEMORY_PCT, json!(round(self.mem, 2))),
            (LATENCY_P95_MS, json!(round(self.latency_p95, 2))),
            (ERROR_RATE, json!(round(self.error_rate, 4))),
            (DB_WAIT_TIME_MS, json!(round(self.db_wait, 2))),
            (QUEUE_DEPTH, json!(round(self.queue_depth, 2))),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        MetricEvent {
            ts: Some(ts.to_string()),
            service: Some(self.service.clone()),
            metrics,
        }
    }

    /// True while an incident burst is being emitted.
    pub fn in_burst(&self) -> bool {
        self.burst.is_some()
    }

    pub fn next_event(&mut self, ts: &str) -> MetricEvent {
        if let Some((kind, remaining)) = self.burst {
            self.apply_burst(kind);
            self.burst = (remaining > 1).then_some((kind, remaining - 1));
            return self.snapshot(ts);
        }

        self.tick += 1;
        self.apply_noise();

        if self.tick % BURST_EVERY == 0 {
            let kind = *[BurstKind::Db, BurstKind::Latency, BurstKind::Error]
                .choose(&mut self.rng)
                .unwrap_or(&BurstKind::Db);
            let len: u32 = self.rng.gen_range(10..=15);
            self.apply_burst(kind);
            self.burst = Some((kind, len - 1));
            return self.snapshot(ts);
        }

        // error rate decays back toward baseline between bursts
        self.error_rate = (self.error_rate * 0.95 + 0.01 * 0.05).clamp(0.0, 1.0);
        self.snapshot(ts)
    }
}

/// Append one line to `path`, creating parent directories as needed.
pub async fn append_line(path: &Path, line: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(format!("{}\n", line).as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::logs::{analyze_logs, DEFAULT_TOP_N};

    #[test]
    fn test_log_lines_parse_back() {
        let mut generator = LogGenerator::new("orders-api", Some(7));
        let lines: Vec<String> = (0..200).map(|_| generator.next_line("2026-01-20T12:00:00Z")).collect();
        assert!(lines[0].contains("request_id=req-1001"));
        assert!(lines[199].contains("request_id=req-1200"));

        let finding = analyze_logs(&lines, DEFAULT_TOP_N);
        assert!(!finding.top_errors.is_empty());
        assert!(finding
            .top_errors
            .iter()
            .all(|e| ERRORS.contains(&e.pattern.as_str())));
        assert_eq!(finding.correlated_ids.len(), 10);
    }

    #[test]
    fn test_seeded_generators_are_deterministic() {
        let mut a = LogGenerator::new("svc", Some(42));
        let mut b = LogGenerator::new("svc", Some(42));
        for _ in 0..20 {
            assert_eq!(a.next_line("t"), b.next_line("t"));
        }
    }

    #[test]
    fn test_metric_burst_starts_on_schedule() {
        let mut generator = MetricGenerator::new("orders-api", Some(3));
        for _ in 0..(BURST_EVERY - 1) {
            generator.next_event("t");
            assert!(!generator.in_burst());
        }
        generator.next_event("t");
        assert!(generator.in_burst());

        // a burst lasts 10..=15 events including the first
        let mut extra = 0;
        while generator.in_burst() {
            generator.next_event("t");
            extra += 1;
        }
        assert!((9..=14).contains(&extra));
    }

    #[test]
    fn test_metric_events_stay_in_range() {
        let mut generator = MetricGenerator::new("orders-api", Some(11));
        for _ in 0..300 {
            let ev = generator.next_event("t");
            assert_eq!(ev.metrics.len(), 6);
            let err = ev.value(ERROR_RATE).unwrap();
            assert!((0.0..=1.0).contains(&err));
            let cpu = ev.value(CPU_PCT).unwrap();
            assert!((5.0..=95.0).contains(&cpu));
        }
    }

    #[tokio::test]
    async fn test_append_line_creates_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("live_logs").join("svc.log");
        append_line(&path, "one").await?;
        append_line(&path, "two").await?;
        assert_eq!(std::fs::read_to_string(&path)?, "one\ntwo\n");
        Ok(())
    }
}
