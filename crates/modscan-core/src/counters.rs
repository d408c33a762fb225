//! Batch-level usage counters

use crate::types::ReasonCode;
use crate::verdict::Verdict;
use serde::{Deserialize, Serialize};

/// Tally of reason occurrences plus scan counters.
///
/// Every known key exists from construction, so merging never meets a
/// missing key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchCounters {
    pub flagged_text: u64,
    pub flagged_clothing: u64,
    pub flagged_gesture: u64,
    pub flagged_age: u64,
    pub automated_scans: u64,
    pub images_cleaned: u64,
}

impl BatchCounters {
    /// Fresh all-zero counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Tally a finished batch: one increment per reason per verdict, one scan
    pub fn from_verdicts<'a>(verdicts: impl IntoIterator<Item = &'a Verdict>) -> Self {
        let mut counters = Self::new();
        for verdict in verdicts {
            counters.record_verdict(verdict);
        }
        counters.automated_scans = 1;
        counters
    }

    /// Add one to the counter for `reason`
    pub fn increment(&mut self, reason: ReasonCode) {
        *self.reason_mut(reason) += 1;
    }

    /// Add one per reason carried by `verdict`
    pub fn record_verdict(&mut self, verdict: &Verdict) {
        for reason in verdict.reasons() {
            self.increment(*reason);
        }
    }

    /// Count for `reason`
    pub fn reason(&self, reason: ReasonCode) -> u64 {
        match reason {
            ReasonCode::FlaggedText => self.flagged_text,
            ReasonCode::FlaggedClothing => self.flagged_clothing,
            ReasonCode::FlaggedGesture => self.flagged_gesture,
            ReasonCode::FlaggedAge => self.flagged_age,
        }
    }

    fn reason_mut(&mut self, reason: ReasonCode) -> &mut u64 {
        match reason {
            ReasonCode::FlaggedText => &mut self.flagged_text,
            ReasonCode::FlaggedClothing => &mut self.flagged_clothing,
            ReasonCode::FlaggedGesture => &mut self.flagged_gesture,
            ReasonCode::FlaggedAge => &mut self.flagged_age,
        }
    }

    /// Per-key addition of `other` into `self`, saturating at `u64::MAX`
    pub fn merge(&mut self, other: &BatchCounters) {
        self.flagged_text = self.flagged_text.saturating_add(other.flagged_text);
        self.flagged_clothing = self.flagged_clothing.saturating_add(other.flagged_clothing);
        self.flagged_gesture = self.flagged_gesture.saturating_add(other.flagged_gesture);
        self.flagged_age = self.flagged_age.saturating_add(other.flagged_age);
        self.automated_scans = self.automated_scans.saturating_add(other.automated_scans);
        self.images_cleaned = self.images_cleaned.saturating_add(other.images_cleaned);
    }

    /// Sum of two snapshots
    pub fn merged(mut self, other: &BatchCounters) -> Self {
        self.merge(other);
        self
    }

    /// Whether every counter is zero
    pub fn is_empty(&self) -> bool {
        self.entries().iter().all(|(_, v)| *v == 0)
    }

    /// All counters as `(key, value)` pairs in a stable order
    pub fn entries(&self) -> [(&'static str, u64); 6] {
        [
            ("flagged_text", self.flagged_text),
            ("flagged_clothing", self.flagged_clothing),
            ("flagged_gesture", self.flagged_gesture),
            ("flagged_age", self.flagged_age),
            ("automated_scans", self.automated_scans),
            ("images_cleaned", self.images_cleaned),
        ]
    }
}
