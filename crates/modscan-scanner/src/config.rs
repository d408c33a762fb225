//! Scanner configuration loading

use crate::{Cli, Command};
use modscan_classifiers::{CommitMode, ScanConfig};
use modscan_telemetry::{FileStatisticsStore, StatisticsAccumulator};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Load configuration from file and CLI overrides
pub fn load(config_path: &str, cli: &Cli) -> anyhow::Result<ScanConfig> {
    // Try to load from file, or use defaults
    let mut config = if Path::new(config_path).exists() {
        info!("Loading configuration from {}", config_path);
        ScanConfig::from_file(config_path)?
    } else {
        ScanConfig::default()
    };

    // Apply CLI overrides
    if let Some(path) = &cli.stats_file {
        config.statistics.path = Some(path.clone());
    }

    if let Command::Scan(args) = &cli.command {
        if args.parallel {
            config.batch.concurrency = num_cpus::get();
        }
        if let Some(concurrency) = args.concurrency {
            config.batch.concurrency = concurrency;
        }
        if let Some(timeout_ms) = args.timeout_ms {
            config.batch.adapter_timeout_ms = timeout_ms;
        }
        if args.per_item_commit {
            config.batch.commit_mode = CommitMode::PerItem;
        }
        if let Some(lexicon) = &args.lexicon {
            config.lexicon.path = Some(lexicon.clone());
        }
    }

    config.validate()?;
    Ok(config)
}

/// Accumulator over the configured statistics store
pub fn accumulator(config: &ScanConfig) -> StatisticsAccumulator {
    match &config.statistics.path {
        Some(path) => {
            info!("Statistics persisted to {}", path.display());
            StatisticsAccumulator::new(Arc::new(FileStatisticsStore::new(path)))
        }
        None => {
            info!("No statistics file configured, keeping totals in memory");
            StatisticsAccumulator::in_memory()
        }
    }
}
