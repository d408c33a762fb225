//! Scan metrics collection and reporting

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics collector for scan throughput and outcomes.
///
/// Keeps in-process atomics for [`snapshot`](Self::snapshot) and mirrors each
/// update to the `metrics` facade for whichever exporter is installed.
#[derive(Clone)]
pub struct ScanMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    batches: AtomicU64,
    items: AtomicU64,
    item_errors: AtomicU64,
    flagged: AtomicU64,
    clean: AtomicU64,
    adapter_failures: AtomicU64,
    total_latency_us: AtomicU64,
}

impl ScanMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    /// Record a finished batch and its wall-clock latency
    pub fn record_batch(&self, latency_us: u64) {
        self.inner.batches.fetch_add(1, Ordering::Relaxed);
        self.inner
            .total_latency_us
            .fetch_add(latency_us, Ordering::Relaxed);

        metrics::counter!("modscan_batches_total").increment(1);
        metrics::histogram!("modscan_batch_latency_us").record(latency_us as f64);
    }

    /// Record one classified item by outcome
    pub fn record_verdict(&self, flagged: bool) {
        self.inner.items.fetch_add(1, Ordering::Relaxed);
        let outcome = if flagged {
            self.inner.flagged.fetch_add(1, Ordering::Relaxed);
            "flagged"
        } else {
            self.inner.clean.fetch_add(1, Ordering::Relaxed);
            "clean"
        };

        metrics::counter!("modscan_items_total").increment(1);
        metrics::counter!("modscan_verdicts_total", "outcome" => outcome).increment(1);
    }

    /// Record an item that failed as a whole
    pub fn record_item_error(&self) {
        self.inner.items.fetch_add(1, Ordering::Relaxed);
        self.inner.item_errors.fetch_add(1, Ordering::Relaxed);

        metrics::counter!("modscan_items_total").increment(1);
        metrics::counter!("modscan_item_errors_total").increment(1);
    }

    /// Record adapters that were unavailable for an item
    pub fn record_adapter_failures(&self, count: u64) {
        self.inner
            .adapter_failures
            .fetch_add(count, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> ScanMetricsSnapshot {
        ScanMetricsSnapshot {
            batches: self.inner.batches.load(Ordering::Relaxed),
            items: self.inner.items.load(Ordering::Relaxed),
            item_errors: self.inner.item_errors.load(Ordering::Relaxed),
            flagged: self.inner.flagged.load(Ordering::Relaxed),
            clean: self.inner.clean.load(Ordering::Relaxed),
            adapter_failures: self.inner.adapter_failures.load(Ordering::Relaxed),
            total_latency_us: self.inner.total_latency_us.load(Ordering::Relaxed),
        }
    }
}

impl Default for ScanMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of current metrics
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct ScanMetricsSnapshot {
    pub batches: u64,
    pub items: u64,
    pub item_errors: u64,
    pub flagged: u64,
    pub clean: u64,
    pub adapter_failures: u64,
    pub total_latency_us: u64,
}

impl ScanMetricsSnapshot {
    /// Average latency per batch
    pub fn avg_batch_latency_us(&self) -> u64 {
        if self.batches == 0 {
            0
        } else {
            self.total_latency_us / self.batches
        }
    }

    /// Share of classified items that were flagged
    pub fn flag_rate(&self) -> f64 {
        let classified = self.flagged + self.clean;
        if classified == 0 {
            0.0
        } else {
            self.flagged as f64 / classified as f64
        }
    }
}
