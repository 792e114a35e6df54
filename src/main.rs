use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use incidentmind::config::{IncidentMindConfig, LogFormat, LoggingConfig};
use incidentmind::sources::synthetic::{append_line, LogGenerator, MetricGenerator};
use incidentmind::sources::{is_valid_service_name, FileSources};
use incidentmind::storage::{IncidentStore, ReportSink};
use incidentmind::triage::{Alert, TriageOptions};

#[derive(Parser)]
#[command(
    name = "incidentmind",
    about = "Read-only incident triage: alert context, log and metric analysis, root cause and remediation",
    version,
    long_about = None
)]
struct Cli {
    /// Config file (defaults to $INCIDENTMIND_CONFIG, then ./incidentmind.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Bind address (overrides [server] bind)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Triage an alert read from a JSON file and print the stored report
    Triage {
        /// Path to the alert JSON
        #[arg(long)]
        alert: PathBuf,

        /// Time window in minutes (5-240)
        #[arg(long, default_value = "30")]
        window: i64,
    },

    /// Print a stored incident report
    Show {
        /// Incident id (e.g. inc_1a2b3c4d)
        incident_id: String,
    },

    /// List recent incidents, most recent first
    List {
        /// Maximum number of incidents
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Append synthetic log lines for a service
    GenerateLogs {
        #[arg(long)]
        service: String,

        /// Number of lines to write
        #[arg(long, default_value = "200")]
        lines: u64,

        /// RNG seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Delay between lines
        #[arg(long, default_value = "0")]
        interval_ms: u64,
    },

    /// Append synthetic metric events for a service
    GenerateMetrics {
        #[arg(long)]
        service: String,

        /// Number of events to write
        #[arg(long, default_value = "120")]
        ticks: u64,

        /// RNG seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Delay between events
        #[arg(long, default_value = "0")]
        interval_ms: u64,
    },
}

/// Subscriber used while the config itself is being loaded.
fn bootstrap_subscriber() -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish()
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn now_ts() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn open_store(config: &IncidentMindConfig) -> Result<IncidentStore> {
    let db_path = config
        .storage
        .db_path
        .to_str()
        .context("database path is not valid UTF-8")?;
    IncidentStore::open(db_path)
}

fn check_service(service: &str) -> Result<()> {
    if !is_valid_service_name(service) {
        bail!("invalid service name: {:?}", service);
    }
    Ok(())
}

async fn pause(interval_ms: u64) {
    if interval_ms > 0 {
        tokio::time::sleep(Duration::from_millis(interval_ms)).await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = tracing::subscriber::with_default(bootstrap_subscriber(), || {
        IncidentMindConfig::resolve(cli.config.as_deref())
    })?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            tracing::info!(bind = %config.server.bind, "Starting IncidentMind API");
            incidentmind::serve(&config).await?;
        }
        Commands::Triage {
            alert: alert_path,
            window,
        } => {
            let raw = std::fs::read_to_string(&alert_path)
                .with_context(|| format!("failed to read alert file: {}", alert_path.display()))?;
            let alert: Alert = serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse alert file: {}", alert_path.display()))?;
            let options = TriageOptions {
                time_window_minutes: window,
            };

            let pipeline = incidentmind::build_pipeline(&config)?;
            let stored = pipeline.triage(&alert, &options).await?;
            println!("{}", serde_json::to_string_pretty(&stored)?);
        }
        Commands::Show { incident_id } => {
            let store = open_store(&config)?;
            match store.load(&incident_id)? {
                Some(stored) => println!("{}", serde_json::to_string_pretty(&stored)?),
                None => bail!("incident not found: {}", incident_id),
            }
        }
        Commands::List { limit } => {
            let store = open_store(&config)?;
            let incidents = store.list(limit)?;
            if incidents.is_empty() {
                println!("No incidents found.");
            } else {
                println!("{:<14} | Created", "Incident");
                println!("{:-<14}-|-{:-<20}", "", "");
                for inc in incidents {
                    println!("{:<14} | {}", inc.incident_id, inc.created_at);
                }
            }
        }
        Commands::GenerateLogs {
            service,
            lines,
            seed,
            interval_ms,
        } => {
            check_service(&service)?;
            let path = FileSources::new(config.sources.log_dir.clone(), config.sources.metrics_dir.clone())
                .log_path(&service);
            tracing::info!(%service, path = %path.display(), lines, "Generating logs");

            let mut generator = LogGenerator::new(service, seed);
            for _ in 0..lines {
                append_line(&path, &generator.next_line(&now_ts())).await?;
                pause(interval_ms).await;
            }
        }
        Commands::GenerateMetrics {
            service,
            ticks,
            seed,
            interval_ms,
        } => {
            check_service(&service)?;
            let path = FileSources::new(config.sources.log_dir.clone(), config.sources.metrics_dir.clone())
                .metrics_path(&service);
            tracing::info!(%service, path = %path.display(), ticks, "Generating metrics");

            let mut generator = MetricGenerator::new(service, seed);
            for _ in 0..ticks {
                let event = generator.next_event(&now_ts());
                append_line(&path, &serde_json::to_string(&event)?).await?;
                pause(interval_ms).await;
            }
        }
    }

    Ok(())
}
