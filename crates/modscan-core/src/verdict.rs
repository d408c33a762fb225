//! Per-item verdicts

use crate::types::{Gender, ModelName, ReasonCode};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// What happened to one adapter for one item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterStatus {
    /// Adapter ran and produced a signal
    Checked,
    /// Adapter ran and found nothing to report (e.g. no face)
    Absent,
    /// Adapter call failed or timed out
    Unavailable,
}

/// A gesture label reported with its score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GestureEvidence {
    pub label: String,
    pub score: f32,
}

/// Model-specific evidence attached to a verdict
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VerdictDetails {
    /// Status of every adapter that was attempted for the item
    pub adapters: BTreeMap<ModelName, AdapterStatus>,

    /// Detected gender, `N/A` when no face was found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_estimate: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub topless_probability: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub clothed_probability: Option<f32>,

    /// Text extracted by OCR, in detection order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extracted_text: Vec<String>,

    /// Every lexicon token matched, duplicates kept
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matched: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub gestures: Vec<GestureEvidence>,

    /// Adapter failure messages keyed by adapter
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub adapter_errors: BTreeMap<ModelName, String>,

    /// Item-level failure that prevented classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerdictDetails {
    /// Status recorded for `adapter`, `None` if it was never attempted
    pub fn adapter_status(&self, adapter: ModelName) -> Option<AdapterStatus> {
        self.adapters.get(&adapter).copied()
    }

    /// Adapters that were selected but could not deliver a result
    pub fn unavailable_adapters(&self) -> impl Iterator<Item = ModelName> + '_ {
        self.adapters
            .iter()
            .filter(|(_, status)| **status == AdapterStatus::Unavailable)
            .map(|(name, _)| *name)
    }
}

/// Canonical flagged/clean decision for one item.
///
/// `flagged` is derived from `reasons` at construction and cannot disagree
/// with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    item_reference: usize,
    flagged: bool,
    reasons: BTreeSet<ReasonCode>,
    details: VerdictDetails,
}

impl Verdict {
    /// Create a verdict for the item at `item_reference`
    pub fn new(
        item_reference: usize,
        reasons: BTreeSet<ReasonCode>,
        details: VerdictDetails,
    ) -> Self {
        Self {
            item_reference,
            flagged: !reasons.is_empty(),
            reasons,
            details,
        }
    }

    /// Create a clean verdict carrying an item-level error annotation
    pub fn failed(item_reference: usize, error: impl ToString) -> Self {
        let details = VerdictDetails {
            error: Some(error.to_string()),
            ..Default::default()
        };
        Self::new(item_reference, BTreeSet::new(), details)
    }

    /// Index of the item in the submitted batch
    pub fn item_reference(&self) -> usize {
        self.item_reference
    }

    pub fn flagged(&self) -> bool {
        self.flagged
    }

    pub fn reasons(&self) -> &BTreeSet<ReasonCode> {
        &self.reasons
    }

    pub fn has_reason(&self, reason: ReasonCode) -> bool {
        self.reasons.contains(&reason)
    }

    pub fn details(&self) -> &VerdictDetails {
        &self.details
    }

    /// Whether the item failed as a whole rather than being classified
    pub fn is_error(&self) -> bool {
        self.details.error.is_some()
    }
}
