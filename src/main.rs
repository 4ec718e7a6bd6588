use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use netvigil::config::{LogFormat, LoggingConfig, NetvigilConfig};
use netvigil::detect::report::{DeviceStatus, MonitorReport};
use netvigil::detect::{AnomalyEngine, DeviceReading};

#[derive(Parser)]
#[command(
    name = "netvigil",
    about = "Streaming per-device network telemetry anomaly detection",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file (overrides NETVIGIL_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon (anomaly engine + HTTP API)
    Serve {
        /// Bind address (defaults to [server] bind from config)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Classify a file of JSON-lines readings, one `{device_id, reading}` per line
    Classify {
        /// Input file, or `-` for stdin
        #[arg(long)]
        input: PathBuf,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },
}

/// Subscriber that covers config resolution, before the configured one can
/// be installed. Defaults to `warn` so fallback diagnostics are not lost.
fn bootstrap_subscriber() -> impl tracing::Subscriber + Send + Sync {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
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
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = tracing::subscriber::with_default(bootstrap_subscriber(), || {
        NetvigilConfig::resolve(cli.config.as_deref())
    })?;

    init_tracing(&config.logging);

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            tracing::info!(bind = %config.server.bind, "Starting netvigil daemon");
            netvigil::serve(config).await?;
        }
        Commands::Classify { input, json } => {
            let engine = AnomalyEngine::from_config(&config);
            let statuses = classify_file(&engine, &input)?;
            let report = MonitorReport::from_statuses(statuses);

            if json {
                for status in &report.devices {
                    println!("{}", serde_json::to_string(status)?);
                }
                println!("{}", serde_json::to_string(&report.stats)?);
            } else {
                println!(
                    "{:<16} | {:<8} | {:>4} | {:>9} | {:>6} | {:>6} | {:<22} | Recommendation",
                    "Device", "Severity", "Conf", "Latency", "Loss", "BW", "Issue"
                );
                println!(
                    "{:-<16}-|-{:-<8}-|-{:-<4}-|-{:-<9}-|-{:-<6}-|-{:-<6}-|-{:-<22}-|-{:-<30}",
                    "", "", "", "", "", "", "", ""
                );
                for DeviceStatus { record, reading } in &report.devices {
                    println!(
                        "{:<16} | {:<8} | {:>3}% | {:>7.1}ms | {:>5.2}% | {:>5.1}% | {:<22} | {}",
                        record.device_id,
                        record.severity,
                        record.confidence,
                        reading.latency,
                        reading.packet_loss,
                        reading.bandwidth,
                        record.issue.map(|i| i.label()).unwrap_or("-"),
                        record.recommendation.as_deref().unwrap_or("-"),
                    );
                }
                println!(
                    "\nhealthy: {}  warning: {}  critical: {}",
                    report.stats.healthy, report.stats.warning, report.stats.critical
                );
            }
        }
    }

    Ok(())
}

/// Feed every line of `input` through the engine in file order.
/// Lines that fail to parse or carry non-finite values are skipped.
fn classify_file(engine: &AnomalyEngine, input: &Path) -> Result<Vec<DeviceStatus>> {
    let reader: Box<dyn BufRead> = if input == Path::new("-") {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let file = std::fs::File::open(input)
            .with_context(|| format!("failed to open input: {}", input.display()))?;
        Box::new(BufReader::new(file))
    };

    let mut statuses = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let item: DeviceReading = match serde_json::from_str(&line) {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!(line = idx + 1, error = %e, "skipping malformed reading");
                continue;
            }
        };
        if let Err(e) = item.reading.validate() {
            tracing::warn!(line = idx + 1, device_id = %item.device_id, error = %e, "skipping invalid reading");
            continue;
        }
        statuses.push(DeviceStatus {
            record: engine.classify(&item.device_id, item.reading),
            reading: item.reading,
        });
    }
    Ok(statuses)
}
