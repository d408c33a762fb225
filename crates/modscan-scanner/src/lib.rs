//! ModScan Scanner
//!
//! Batch entry point of the moderation pipeline. A [`BatchOrchestrator`]
//! owns an initialized [`ModelRegistry`](modscan_classifiers::ModelRegistry)
//! and a [`StatisticsAccumulator`](modscan_telemetry::StatisticsAccumulator):
//!
//! ```ignore
//! let mut registry = ModelRegistry::new().with_lexicon(Arc::new(ProfanityLexicon::builtin()?));
//! registry.initialize().await?;
//!
//! let orchestrator = BatchOrchestrator::new(
//!     Arc::new(registry),
//!     &ScanConfig::default(),
//!     StatisticsAccumulator::in_memory(),
//! );
//! let outcome = orchestrator
//!     .classify_batch(vec![Item::text("This is a crap test")], &ModelSelection::parse(&["text"])?)
//!     .await?;
//! ```

pub mod orchestrator;

pub use orchestrator::{BatchOrchestrator, BatchOutcome, BatchState};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::orchestrator::{BatchOrchestrator, BatchOutcome, BatchState};
    pub use modscan_classifiers::prelude::*;
    pub use modscan_core::prelude::*;
    pub use modscan_telemetry::prelude::*;
}
