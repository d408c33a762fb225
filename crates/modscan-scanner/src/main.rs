//! ModScan command-line scanner
//!
//! Runs a batch of text and image items through the moderation pipeline and
//! prints the ordered verdicts with the batch counters as JSON.
//!
//! Only the profanity lexicon ships with the binary; image predictors are
//! provided by embedding applications through the library API.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use modscan_classifiers::ModelRegistry;
use modscan_core::{Item, ItemKind, ModelSelection};
use modscan_scanner::BatchOrchestrator;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod config;

#[derive(Parser, Debug)]
#[command(name = "modscan")]
#[command(about = "ModScan content moderation scanner", long_about = None)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "modscan.yaml", env = "MODSCAN_CONFIG")]
    config: String,

    /// Statistics totals file
    #[arg(long, global = true, env = "MODSCAN_STATS_FILE")]
    stats_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Classify a batch of items
    Scan(ScanArgs),

    /// Print the persisted statistics totals
    Stats,

    /// Record flagged images removed after a scan
    Cleanup {
        /// Number of images removed
        count: u64,
    },
}

#[derive(Args, Debug)]
pub(crate) struct ScanArgs {
    /// Items in batch order: `text:<string>`, a `data:image/...;base64,` URL,
    /// or a path to an image file
    #[arg(required = true)]
    inputs: Vec<InputSpec>,

    /// Comma-separated models; every model the scanner can serve when omitted
    #[arg(short, long, value_delimiter = ',')]
    models: Option<Vec<String>>,

    /// Items classified at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Use one worker per CPU
    #[arg(long, conflicts_with = "concurrency")]
    parallel: bool,

    /// Per adapter call timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Commit statistics after each flagged item instead of once per batch
    #[arg(long)]
    per_item_commit: bool,

    /// Newline-delimited profanity lexicon
    #[arg(long)]
    lexicon: Option<PathBuf>,

    /// Print Prometheus metrics to stderr after the scan
    #[arg(long)]
    metrics: bool,
}

/// One command-line item
#[derive(Debug, Clone)]
pub(crate) enum InputSpec {
    Text(String),
    DataUrl(String),
    File(PathBuf),
}

impl FromStr for InputSpec {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if let Some(text) = s.strip_prefix("text:") {
            Ok(Self::Text(text.to_string()))
        } else if s.starts_with("data:") {
            Ok(Self::DataUrl(s.to_string()))
        } else if s.is_empty() {
            Err("empty input".to_string())
        } else {
            Ok(Self::File(PathBuf::from(s)))
        }
    }
}

impl InputSpec {
    async fn into_item(self) -> Result<Item> {
        Ok(match self {
            Self::Text(text) => Item::text(text),
            Self::DataUrl(url) => Item::from_data_url(&url),
            Self::File(path) => {
                let bytes = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("Failed to read image {}", path.display()))?;
                Item::image(bytes)
            }
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config = config::load(&cli.config, &cli)?;
    let accumulator = config::accumulator(&config);

    match cli.command {
        Command::Stats => {
            let totals = accumulator.totals().await?;
            println!("{}", serde_json::to_string_pretty(&totals)?);
        }
        Command::Cleanup { count } => {
            accumulator.record_cleanup(count).await?;
            let totals = accumulator.totals().await?;
            println!("{}", serde_json::to_string_pretty(&totals)?);
        }
        Command::Scan(args) => {
            let metrics_handle = if args.metrics {
                Some(init_metrics()?)
            } else {
                None
            };

            let mut items = Vec::with_capacity(args.inputs.len());
            for input in args.inputs {
                items.push(input.into_item().await?);
            }
            let has_images = items.iter().any(|item| item.kind() == ItemKind::Image);

            let mut registry =
                ModelRegistry::new().with_lexicon(Arc::new(config.lexicon.build()?));
            registry.initialize().await?;

            let selection = match &args.models {
                Some(names) => ModelSelection::parse(names)?,
                None => registry.automated_selection(has_images)?,
            };

            let orchestrator = BatchOrchestrator::new(Arc::new(registry), &config, accumulator);

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling batch...");
                    on_interrupt.cancel();
                }
            });

            let outcome = orchestrator
                .classify_batch_with_cancel(items, &selection, cancel)
                .await?;

            if let Some(warning) = &outcome.statistics_warning {
                warn!("Statistics not persisted: {}", warning);
            }
            println!("{}", serde_json::to_string_pretty(&outcome)?);

            if let Some(handle) = metrics_handle {
                eprintln!("{}", handle.render());
            }

            info!("Scan complete");
        }
    }

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("modscan=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("modscan=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Initialize metrics recorder and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!("modscan_batches_total", "Total number of batches classified");
    metrics::describe_counter!("modscan_items_total", "Total number of items classified");
    metrics::describe_counter!(
        "modscan_item_errors_total",
        "Items that failed as a whole, e.g. malformed payloads"
    );
    metrics::describe_counter!(
        "modscan_adapter_failures_total",
        "Adapter calls that failed or timed out, by adapter"
    );
    metrics::describe_counter!("modscan_verdicts_total", "Verdicts by outcome");
    metrics::describe_counter!(
        "modscan_statistics_commits_total",
        "Statistics commits by status"
    );
    metrics::describe_histogram!(
        "modscan_batch_latency_us",
        metrics::Unit::Microseconds,
        "Batch latency in microseconds"
    );

    info!("Metrics recorder initialized");
    Ok(handle)
}
