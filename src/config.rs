//! TOML configuration for IncidentMind.
//!
//! Every section has defaults, so an empty file (or no file at all) gives a
//! working setup that reads evidence from `data/live_logs` and
//! `data/live_metrics` and stores reports in `data/incidentmind.db`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::sources::{DEFAULT_LOG_LIMIT, DEFAULT_METRIC_LIMIT};
use crate::triage::metrics::Thresholds;

/// Environment variable naming a config file to load.
pub const CONFIG_ENV: &str = "INCIDENTMIND_CONFIG";
/// Config file picked up from the working directory when present.
pub const LOCAL_CONFIG: &str = "incidentmind.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncidentMindConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl IncidentMindConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Try, in order: `$INCIDENTMIND_CONFIG`, `./incidentmind.toml`, defaults.
    pub fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "INCIDENTMIND_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let local = Path::new(LOCAL_CONFIG);
        if local.exists() {
            match Self::load(local) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %local.display(),
                        error = %e,
                        "local config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }

    /// An explicit path must load; otherwise fall back as in [`Self::load_or_default`].
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::load_or_default()),
        }
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address and port for the HTTP API.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file. Parent directories are created on open.
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/incidentmind.db"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Directory holding `<service>.log` files.
    pub log_dir: PathBuf,
    /// Directory holding `<service>.jsonl` metric files.
    pub metrics_dir: PathBuf,
    /// Most recent log lines read per triage.
    pub log_limit: usize,
    /// Most recent metric events read per triage.
    pub metric_limit: usize,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("data/live_logs"),
            metrics_dir: PathBuf::from("data/live_metrics"),
            log_limit: DEFAULT_LOG_LIMIT,
            metric_limit: DEFAULT_METRIC_LIMIT,
        }
    }
}

// ---------------------------------------------------------------------------
// Safety
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Keywords blocked in addition to the built-in denylist.
    pub extra_denylist: Vec<String>,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let cfg = IncidentMindConfig::default();

        assert_eq!(cfg.server.bind, "0.0.0.0:8080");
        assert_eq!(cfg.storage.db_path, PathBuf::from("data/incidentmind.db"));
        assert_eq!(cfg.sources.log_dir, PathBuf::from("data/live_logs"));
        assert_eq!(cfg.sources.metrics_dir, PathBuf::from("data/live_metrics"));
        assert_eq!(cfg.sources.log_limit, 500);
        assert_eq!(cfg.sources.metric_limit, 120);
        assert_eq!(cfg.thresholds, Thresholds::default());
        assert!(cfg.safety.extra_denylist.is_empty());
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[server]
bind = "127.0.0.1:9000"

[storage]
db_path = "/var/lib/incidentmind/reports.db"

[sources]
log_dir = "/var/log/live"
metrics_dir = "/var/lib/metrics"
log_limit = 1000
metric_limit = 60

[thresholds]
error_rate = 0.05
cpu_pct = 75.0

[safety]
extra_denylist = ["truncate table"]

[logging]
level = "debug"
format = "json"
"#;

        let cfg: IncidentMindConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(cfg.server.bind, "127.0.0.1:9000");
        assert_eq!(cfg.storage.db_path, PathBuf::from("/var/lib/incidentmind/reports.db"));
        assert_eq!(cfg.sources.log_dir, PathBuf::from("/var/log/live"));
        assert_eq!(cfg.sources.log_limit, 1000);
        assert_eq!(cfg.sources.metric_limit, 60);
        assert_eq!(cfg.thresholds.error_rate, 0.05);
        assert_eq!(cfg.thresholds.cpu_pct, 75.0);
        // unset thresholds keep their defaults
        assert_eq!(cfg.thresholds.latency_p95_ms, 800.0);
        assert_eq!(cfg.safety.extra_denylist, vec!["truncate table".to_string()]);
        assert_eq!(cfg.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let cfg: IncidentMindConfig = toml::from_str("").unwrap();
        let defaults = IncidentMindConfig::default();

        assert_eq!(cfg.server.bind, defaults.server.bind);
        assert_eq!(cfg.storage.db_path, defaults.storage.db_path);
        assert_eq!(cfg.sources.log_limit, defaults.sources.log_limit);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("incidentmind.toml");
        std::fs::write(&path, "[server]\nbind = \"0.0.0.0:9999\"\n").unwrap();

        let cfg = IncidentMindConfig::load(&path).unwrap();
        assert_eq!(cfg.server.bind, "0.0.0.0:9999");

        let resolved = IncidentMindConfig::resolve(Some(&path)).unwrap();
        assert_eq!(resolved.server.bind, "0.0.0.0:9999");
    }

    #[test]
    fn test_explicit_missing_file_errors() {
        assert!(IncidentMindConfig::load(Path::new("/nonexistent/incidentmind.toml")).is_err());
        assert!(IncidentMindConfig::resolve(Some(Path::new("/nonexistent/incidentmind.toml"))).is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let cfg = IncidentMindConfig::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let back: IncidentMindConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.sources.metrics_dir, cfg.sources.metrics_dir);
        assert_eq!(back.thresholds, cfg.thresholds);
    }
}
