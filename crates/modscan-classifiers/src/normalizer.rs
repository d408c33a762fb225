//! Raw adapter outputs to canonical verdicts

use crate::classifier::{AdapterOutputs, AdapterSlot, RawModelOutput};
use crate::config::{GestureConfig, ScanConfig, ThresholdConfig};
use modscan_core::{AdapterStatus, Gender, ModelName, ReasonCode, Verdict, VerdictDetails};
use std::collections::{BTreeSet, HashSet};

/// Applies thresholds and label lists to adapter outputs.
///
/// Pure: the same outputs always give the same verdict.
#[derive(Debug, Clone)]
pub struct ResultNormalizer {
    thresholds: ThresholdConfig,
    gesture_labels: HashSet<String>,
}

impl ResultNormalizer {
    pub fn new(thresholds: ThresholdConfig, gestures: &GestureConfig) -> Self {
        Self {
            thresholds,
            gesture_labels: gestures
                .labels
                .iter()
                .map(|l| l.to_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.thresholds.clone(), &config.gestures)
    }

    /// Build the verdict for the item at `index`
    pub fn normalize(&self, index: usize, outputs: &AdapterOutputs) -> Verdict {
        let mut reasons = BTreeSet::new();
        let mut details = VerdictDetails::default();

        for (model, slot) in outputs.iter() {
            let status = match slot {
                AdapterSlot::Output(output) => {
                    self.apply(output, &mut reasons, &mut details);
                    AdapterStatus::Checked
                }
                AdapterSlot::Absent => {
                    if matches!(model, ModelName::AgeGender | ModelName::Clothing) {
                        details.gender.get_or_insert(Gender::Unknown);
                    }
                    AdapterStatus::Absent
                }
                AdapterSlot::Unavailable(reason) => {
                    details.adapter_errors.insert(model, reason.clone());
                    AdapterStatus::Unavailable
                }
            };
            details.adapters.insert(model, status);
        }

        Verdict::new(index, reasons, details)
    }

    fn apply(
        &self,
        output: &RawModelOutput,
        reasons: &mut BTreeSet<ReasonCode>,
        details: &mut VerdictDetails,
    ) {
        match output {
            RawModelOutput::Clothing { gender, scores } => {
                details.gender = Some(*gender);
                details.topless_probability = Some(scores.topless_probability);
                details.clothed_probability = Some(scores.clothed_probability);
                if scores.topless_probability > self.thresholds.topless {
                    reasons.insert(ReasonCode::FlaggedClothing);
                }
            }
            RawModelOutput::AgeGender(face) => {
                details.gender = Some(face.gender);
                details.age_estimate = face.age_estimate;
                if face
                    .age_estimate
                    .is_some_and(|age| age < self.thresholds.minor_age)
                {
                    reasons.insert(ReasonCode::FlaggedAge);
                }
            }
            RawModelOutput::Text(strings) => {
                details.extracted_text = strings.clone();
            }
            RawModelOutput::Profanity(matched) => {
                if !matched.is_empty() {
                    reasons.insert(ReasonCode::FlaggedText);
                }
                details.matched = matched.clone();
            }
            RawModelOutput::Gesture(detections) => {
                let offensive = detections.iter().any(|d| {
                    d.score >= self.thresholds.gesture
                        && self.gesture_labels.contains(&d.label.to_lowercase())
                });
                if offensive {
                    reasons.insert(ReasonCode::FlaggedGesture);
                }
                details.gestures = detections.clone();
            }
        }
    }
}

impl Default for ResultNormalizer {
    fn default() -> Self {
        Self::new(ThresholdConfig::default(), &GestureConfig::default())
    }
}
