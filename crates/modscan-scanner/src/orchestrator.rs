//! Batch orchestration
//!
//! Drives a batch through classification and normalization, tallies the
//! counters once every item has finished, and commits them to the
//! statistics store.
//!
//! Item failures stay inside their verdicts. Only setup failures (an
//! uninitialized registry or an unserviceable selection) fail the call, and
//! they do so before any item runs.

use futures::stream::{self, StreamExt};
use modscan_classifiers::{CommitMode, ItemClassifier, ModelRegistry, ResultNormalizer, ScanConfig};
use modscan_core::{BatchCounters, Item, ItemKind, ModelSelection, Result, Verdict};
use modscan_telemetry::{ScanMetrics, StatisticsAccumulator};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle of one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Initiated,
    Processing,
    Aggregating,
    /// Every item classified cleanly and the counters were committed
    Committed,
    /// Some item or adapter failed, or the commit did not go through
    PartiallyFailed,
    /// Stopped before every item ran; nothing committed
    Cancelled,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Initiated => "initiated",
            Self::Processing => "processing",
            Self::Aggregating => "aggregating",
            Self::Committed => "committed",
            Self::PartiallyFailed => "partially_failed",
            Self::Cancelled => "cancelled",
        })
    }
}

/// Result of one batch call
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    /// One verdict per processed item, ordered by item index
    pub verdicts: Vec<Verdict>,

    /// Tally of this batch
    pub counters: BatchCounters,

    pub state: BatchState,

    /// Set when the statistics commit failed; the verdicts are still valid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics_warning: Option<String>,

    /// Counters that still need committing after a failed commit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_commit: Option<BatchCounters>,
}

impl BatchOutcome {
    /// Number of flagged verdicts
    pub fn flagged_count(&self) -> usize {
        self.verdicts.iter().filter(|v| v.flagged()).count()
    }

    /// Number of items that failed as a whole
    pub fn error_count(&self) -> usize {
        self.verdicts.iter().filter(|v| v.is_error()).count()
    }

    /// Whether the statistics for this batch are fully persisted
    pub fn is_committed(&self) -> bool {
        self.pending_commit.is_none() && self.state != BatchState::Cancelled
    }
}

/// Entry point for classifying batches of items
pub struct BatchOrchestrator {
    classifier: ItemClassifier,
    normalizer: ResultNormalizer,
    accumulator: StatisticsAccumulator,
    metrics: ScanMetrics,
    concurrency: usize,
    commit_mode: CommitMode,
    next_batch_id: AtomicU64,
}

impl BatchOrchestrator {
    /// Create an orchestrator over `registry`, which must be initialized
    /// before the first batch
    pub fn new(
        registry: Arc<ModelRegistry>,
        config: &ScanConfig,
        accumulator: StatisticsAccumulator,
    ) -> Self {
        Self {
            classifier: ItemClassifier::new(registry, config.batch.adapter_timeout()),
            normalizer: ResultNormalizer::from_config(config),
            accumulator,
            metrics: ScanMetrics::new(),
            concurrency: config.batch.concurrency.max(1),
            commit_mode: config.batch.commit_mode,
            next_batch_id: AtomicU64::new(1),
        }
    }

    /// Share an existing metrics collector
    pub fn with_metrics(mut self, metrics: ScanMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        self.classifier.registry()
    }

    pub fn accumulator(&self) -> &StatisticsAccumulator {
        &self.accumulator
    }

    pub fn metrics(&self) -> &ScanMetrics {
        &self.metrics
    }

    /// Classify `items` with the models in `selection`
    pub async fn classify_batch(
        &self,
        items: Vec<Item>,
        selection: &ModelSelection,
    ) -> Result<BatchOutcome> {
        self.classify_batch_with_cancel(items, selection, CancellationToken::new())
            .await
    }

    /// Classify `items`, stopping early once `cancel` fires.
    ///
    /// Items already classified when the token fires are returned; items not
    /// yet started are skipped and no end-of-batch commit happens.
    pub async fn classify_batch_with_cancel(
        &self,
        items: Vec<Item>,
        selection: &ModelSelection,
        cancel: CancellationToken,
    ) -> Result<BatchOutcome> {
        let batch_id = self.next_batch_id.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();
        let mut state = BatchState::Initiated;

        self.registry().ensure_initialized()?;
        let has_images = items.iter().any(|item| item.kind() == ItemKind::Image);
        self.registry().validate_selection(selection, has_images)?;

        let total = items.len();
        info!(
            "Batch {} accepted: {} items, models [{}]",
            batch_id,
            total,
            selection.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ")
        );
        advance(batch_id, &mut state, BatchState::Processing);

        let classifier = &self.classifier;
        let normalizer = &self.normalizer;
        let results = stream::iter(items.into_iter().enumerate())
            .map(|(index, item)| async move {
                match classifier.classify(index, &item, selection).await {
                    Ok(outputs) => normalizer.normalize(index, &outputs),
                    Err(e) => {
                        warn!("Item {} failed: {}", index, e);
                        Verdict::failed(index, e)
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .take_until(cancel.cancelled());
        futures::pin_mut!(results);

        let mut verdicts = Vec::with_capacity(total);
        let mut pending = BatchCounters::new();
        let mut statistics_warning = None;

        while let Some(verdict) = results.next().await {
            self.record_metrics(&verdict);

            if self.commit_mode == CommitMode::PerItem && verdict.flagged() {
                let mut delta = BatchCounters::new();
                delta.record_verdict(&verdict);
                if let Err(e) = self.accumulator.commit(&delta).await {
                    pending.merge(&delta);
                    statistics_warning = Some(e.to_string());
                }
            }

            verdicts.push(verdict);
        }

        verdicts.sort_by_key(Verdict::item_reference);
        let cancelled = verdicts.len() < total;

        advance(batch_id, &mut state, BatchState::Aggregating);
        let counters = BatchCounters::from_verdicts(&verdicts);

        if cancelled {
            let kept = match self.commit_mode {
                CommitMode::EndOfBatch => "statistics not committed",
                CommitMode::PerItem => "per-item commits kept, scan not counted",
            };
            warn!(
                "Batch {} cancelled after {} of {} items; {}",
                batch_id,
                verdicts.len(),
                total,
                kept
            );
        } else {
            let delta = match self.commit_mode {
                CommitMode::EndOfBatch => counters,
                CommitMode::PerItem => BatchCounters {
                    automated_scans: counters.automated_scans,
                    ..BatchCounters::default()
                },
            };
            if let Err(e) = self.accumulator.commit(&delta).await {
                warn!("Batch {} statistics not committed: {}", batch_id, e);
                pending.merge(&delta);
                statistics_warning = Some(e.to_string());
            }
        }

        let degraded = verdicts
            .iter()
            .any(|v| v.is_error() || v.details().unavailable_adapters().next().is_some());
        let final_state = if cancelled {
            BatchState::Cancelled
        } else if degraded || statistics_warning.is_some() {
            BatchState::PartiallyFailed
        } else {
            BatchState::Committed
        };
        advance(batch_id, &mut state, final_state);

        let latency_us = started.elapsed().as_micros() as u64;
        self.metrics.record_batch(latency_us);

        let outcome = BatchOutcome {
            verdicts,
            counters,
            state,
            statistics_warning,
            pending_commit: (!pending.is_empty()).then_some(pending),
        };

        info!(
            "Batch {} {}: {} verdicts, {} flagged, {} failed in {}us",
            batch_id,
            outcome.state,
            outcome.verdicts.len(),
            outcome.flagged_count(),
            outcome.error_count(),
            latency_us
        );

        Ok(outcome)
    }

    /// Retry the statistics commit of an outcome whose commit failed
    pub async fn retry_commit(&self, outcome: &mut BatchOutcome) -> Result<()> {
        let Some(pending) = outcome.pending_commit else {
            return Ok(());
        };

        self.accumulator.commit(&pending).await?;
        outcome.pending_commit = None;
        outcome.statistics_warning = None;

        let degraded = outcome
            .verdicts
            .iter()
            .any(|v| v.is_error() || v.details().unavailable_adapters().next().is_some());
        if outcome.state == BatchState::PartiallyFailed && !degraded {
            outcome.state = BatchState::Committed;
        }

        info!("Pending batch statistics committed on retry");
        Ok(())
    }

    fn record_metrics(&self, verdict: &Verdict) {
        if verdict.is_error() {
            self.metrics.record_item_error();
            return;
        }

        self.metrics.record_verdict(verdict.flagged());
        let unavailable = verdict.details().unavailable_adapters().count() as u64;
        if unavailable > 0 {
            self.metrics.record_adapter_failures(unavailable);
        }
    }
}

fn advance(batch_id: u64, state: &mut BatchState, next: BatchState) {
    debug!("Batch {} {} -> {}", batch_id, state, next);
    *state = next;
}
