//! ModScan Core
//!
//! Core types and error handling shared across ModScan components.
//!
//! This crate provides:
//! - Submitted items, model selections and the closed reason taxonomy
//! - Per-item verdicts and batch counters
//! - The error taxonomy used from adapters up to the batch boundary

pub mod counters;
pub mod error;
pub mod types;
pub mod verdict;

pub use counters::BatchCounters;
pub use error::{Error, Result};
pub use types::{Gender, Image, ImageFormat, Item, ItemKind, ModelName, ModelSelection, Payload, ReasonCode};
pub use verdict::{AdapterStatus, GestureEvidence, Verdict, VerdictDetails};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::counters::BatchCounters;
    pub use crate::error::{Error, Result};
    pub use crate::types::{Gender, Image, Item, ItemKind, ModelName, ModelSelection, ReasonCode};
    pub use crate::verdict::{AdapterStatus, Verdict, VerdictDetails};
}
