//! Per-item adapter fan-out
//!
//! Runs the adapters a selection asks for against one item and collects
//! their raw outputs. Adapter failures never escape: each one becomes an
//! `Unavailable` slot while sibling adapters keep running.

use crate::classifier::{AdapterOutputs, AdapterSlot, FaceAttributes, RawModelOutput};
use crate::registry::ModelRegistry;
use modscan_core::{Gender, Image, Item, ItemKind, ModelName, ModelSelection, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Invokes the selected adapters for single items
#[derive(Clone)]
pub struct ItemClassifier {
    registry: Arc<ModelRegistry>,
    adapter_timeout: Duration,
}

impl ItemClassifier {
    /// Create a classifier over an initialized registry
    pub fn new(registry: Arc<ModelRegistry>, adapter_timeout: Duration) -> Self {
        Self {
            registry,
            adapter_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Classify the item at `index`.
    ///
    /// Only fails with `MalformedInput`; adapter errors and timeouts are
    /// recorded as `Unavailable` slots.
    pub async fn classify(
        &self,
        index: usize,
        item: &Item,
        selection: &ModelSelection,
    ) -> Result<AdapterOutputs> {
        self.registry.ensure_initialized()?;

        match item.kind() {
            ItemKind::Text => Ok(self.classify_text(item.as_text().unwrap_or_default(), selection)),
            ItemKind::Image => {
                let image = item.decode_image(index)?;
                Ok(self.classify_image(index, &image, selection).await)
            }
        }
    }

    fn classify_text(&self, text: &str, selection: &ModelSelection) -> AdapterOutputs {
        let mut outputs = AdapterOutputs::new();

        if wants_lexicon(selection) {
            outputs.insert(ModelName::Profanity, self.match_lexicon([text]));
        }

        outputs
    }

    async fn classify_image(
        &self,
        index: usize,
        image: &Image,
        selection: &ModelSelection,
    ) -> AdapterOutputs {
        let (face_slots, text_slots, gesture_slot) = tokio::join!(
            self.run_face_chain(image, selection),
            self.run_text_chain(image, selection),
            self.run_gesture(image, selection),
        );

        let mut outputs = AdapterOutputs::new();
        for (model, slot) in face_slots.into_iter().chain(text_slots) {
            outputs.insert(model, slot);
        }
        if let Some(slot) = gesture_slot {
            outputs.insert(ModelName::Gesture, slot);
        }

        debug!(
            "Item {} classified by {} adapters ({} unavailable)",
            index,
            outputs.len(),
            outputs.unavailable_count()
        );
        outputs
    }

    /// Face detection, then gender-conditioned clothing classification
    async fn run_face_chain(
        &self,
        image: &Image,
        selection: &ModelSelection,
    ) -> Vec<(ModelName, AdapterSlot)> {
        let wants_age = selection.contains(ModelName::AgeGender);
        let wants_clothing = selection.contains(ModelName::Clothing);
        if !wants_age && !wants_clothing {
            return Vec::new();
        }

        let Some(detector) = self.registry.age_gender() else {
            return Vec::new();
        };

        let mut slots = Vec::new();
        let face = self.guarded(ModelName::AgeGender, detector.detect(image)).await;

        if wants_age {
            let slot = match &face {
                Ok(Some(attrs)) => AdapterSlot::Output(RawModelOutput::AgeGender(*attrs)),
                Ok(None) => AdapterSlot::Absent,
                Err(reason) => AdapterSlot::Unavailable(reason.clone()),
            };
            slots.push((ModelName::AgeGender, slot));
        }

        if wants_clothing {
            let slot = match face {
                Ok(Some(FaceAttributes { gender, .. })) if gender != Gender::Unknown => {
                    self.run_clothing(image, gender).await
                }
                Ok(_) => AdapterSlot::Absent,
                Err(reason) => AdapterSlot::Unavailable(format!("gender detection failed: {}", reason)),
            };
            slots.push((ModelName::Clothing, slot));
        }

        slots
    }

    async fn run_clothing(&self, image: &Image, gender: Gender) -> AdapterSlot {
        let Some(predictor) = self.registry.clothing() else {
            return AdapterSlot::Unavailable("no clothing predictor registered".to_string());
        };

        match self
            .guarded(ModelName::Clothing, predictor.predict(image, gender))
            .await
        {
            Ok(scores) => AdapterSlot::Output(RawModelOutput::Clothing { gender, scores }),
            Err(reason) => AdapterSlot::Unavailable(reason),
        }
    }

    /// OCR, then lexicon matching over the extracted text
    async fn run_text_chain(
        &self,
        image: &Image,
        selection: &ModelSelection,
    ) -> Vec<(ModelName, AdapterSlot)> {
        if !wants_lexicon(selection) {
            return Vec::new();
        }

        let Some(extractor) = self.registry.text_extractor() else {
            return Vec::new();
        };

        match self.guarded(ModelName::Text, extractor.extract(image)).await {
            Ok(strings) if strings.is_empty() => vec![(ModelName::Text, AdapterSlot::Absent)],
            Ok(strings) => {
                let matched = self.match_lexicon(strings.iter().map(String::as_str));
                vec![
                    (
                        ModelName::Text,
                        AdapterSlot::Output(RawModelOutput::Text(strings)),
                    ),
                    (ModelName::Profanity, matched),
                ]
            }
            Err(reason) => vec![(ModelName::Text, AdapterSlot::Unavailable(reason))],
        }
    }

    async fn run_gesture(&self, image: &Image, selection: &ModelSelection) -> Option<AdapterSlot> {
        if !selection.contains(ModelName::Gesture) {
            return None;
        }

        let detector = self.registry.gesture()?;
        let slot = match self.guarded(ModelName::Gesture, detector.detect(image)).await {
            Ok(detections) => AdapterSlot::Output(RawModelOutput::Gesture(detections)),
            Err(reason) => AdapterSlot::Unavailable(reason),
        };
        Some(slot)
    }

    fn match_lexicon<'a>(&self, texts: impl IntoIterator<Item = &'a str>) -> AdapterSlot {
        match self.registry.lexicon() {
            Some(lexicon) => {
                AdapterSlot::Output(RawModelOutput::Profanity(lexicon.matches_all(texts)))
            }
            None => AdapterSlot::Unavailable("no profanity lexicon registered".to_string()),
        }
    }

    /// Run one adapter call under the timeout, turning any failure into a reason
    async fn guarded<T>(
        &self,
        model: ModelName,
        call: impl Future<Output = Result<T>>,
    ) -> std::result::Result<T, String> {
        let outcome = match tokio::time::timeout(self.adapter_timeout, call).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {}ms", self.adapter_timeout.as_millis()),
        };

        warn!("Adapter {} unavailable: {}", model, outcome);
        metrics::counter!("modscan_adapter_failures_total", "adapter" => model.as_str())
            .increment(1);
        Err(outcome)
    }
}

/// Text and profanity both mean "match the lexicon against whatever text the item has"
fn wants_lexicon(selection: &ModelSelection) -> bool {
    selection.contains(ModelName::Text) || selection.contains(ModelName::Profanity)
}
