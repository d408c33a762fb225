//! Statistics accumulator
//!
//! Front for a [`StatisticsStore`]: every store failure is reported as
//! `StatisticsCommitFailed` so callers can retry the commit on its own.

use crate::store::{InMemoryStatisticsStore, StatisticsStore};
use modscan_core::{BatchCounters, Error, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Merges batch counters into the running totals
#[derive(Clone)]
pub struct StatisticsAccumulator {
    store: Arc<dyn StatisticsStore>,
}

impl StatisticsAccumulator {
    pub fn new(store: Arc<dyn StatisticsStore>) -> Self {
        Self { store }
    }

    /// Accumulator over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStatisticsStore::new()))
    }

    pub fn store(&self) -> &Arc<dyn StatisticsStore> {
        &self.store
    }

    /// Apply `counters` to the running totals as one unit.
    ///
    /// An empty snapshot is a no-op.
    pub async fn commit(&self, counters: &BatchCounters) -> Result<()> {
        if counters.is_empty() {
            debug!("Skipping empty statistics commit");
            return Ok(());
        }

        match self.store.merge(counters).await {
            Ok(()) => {
                debug!("Committed statistics to {} store", self.store.name());
                metrics::counter!("modscan_statistics_commits_total", "status" => "ok").increment(1);
                Ok(())
            }
            Err(e) => {
                warn!("Statistics commit to {} store failed: {}", self.store.name(), e);
                metrics::counter!("modscan_statistics_commits_total", "status" => "failed")
                    .increment(1);
                Err(match e {
                    Error::StatisticsCommitFailed(_) => e,
                    other => Error::commit(other.to_string()),
                })
            }
        }
    }

    /// Current running totals
    pub async fn totals(&self) -> Result<BatchCounters> {
        self.store.totals().await
    }

    /// Record `count` flagged images removed by the caller
    pub async fn record_cleanup(&self, count: u64) -> Result<()> {
        let counters = BatchCounters {
            images_cleaned: count,
            ..BatchCounters::default()
        };
        self.commit(&counters).await?;

        if count > 0 {
            info!("Recorded {} cleaned images", count);
        }
        Ok(())
    }
}
