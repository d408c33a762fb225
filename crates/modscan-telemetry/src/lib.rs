//! ModScan Telemetry
//!
//! Statistics and metrics for ModScan.
//!
//! Provides:
//! - Statistics stores holding running totals (in-memory and JSON file)
//! - The statistics accumulator that commits batch counters
//! - Scan throughput and outcome metrics

pub mod accumulator;
pub mod metrics;
pub mod store;

pub use accumulator::StatisticsAccumulator;
pub use metrics::{ScanMetrics, ScanMetricsSnapshot};
pub use store::{FileStatisticsStore, InMemoryStatisticsStore, StatisticsStore};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::accumulator::StatisticsAccumulator;
    pub use crate::metrics::ScanMetrics;
    pub use crate::store::{FileStatisticsStore, InMemoryStatisticsStore, StatisticsStore};
}
