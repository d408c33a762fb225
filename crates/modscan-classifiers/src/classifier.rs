//! Predictor adapter traits and raw model outputs

use async_trait::async_trait;
use modscan_core::{Gender, GestureEvidence, Image, ModelName, Result};
use std::collections::BTreeMap;

/// Common surface of every external predictor
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Get the predictor name
    fn name(&self) -> &str;

    /// Load weights or open connections before first use
    async fn warm_up(&self) -> Result<()> {
        Ok(())
    }
}

/// A single clothing model trained for one gender
#[async_trait]
pub trait ClothingModel: Predictor {
    /// Score the image
    async fn predict(&self, image: &Image) -> Result<ClothingScores>;
}

/// Clothing classification conditioned on a prior gender classification
#[async_trait]
pub trait ClothingPredictor: Predictor {
    /// Score the image using the model for `gender`
    async fn predict(&self, image: &Image, gender: Gender) -> Result<ClothingScores>;
}

/// Face detector reporting gender and an optional age estimate
#[async_trait]
pub trait AgeGenderPredictor: Predictor {
    /// Attributes of the first detected face, `None` when there is no face
    async fn detect(&self, image: &Image) -> Result<Option<FaceAttributes>>;
}

/// OCR or cloud vision text detection
#[async_trait]
pub trait TextExtractor: Predictor {
    /// Detected text strings in detection order, possibly empty
    async fn extract(&self, image: &Image) -> Result<Vec<String>>;
}

/// Offensive gesture detection
#[async_trait]
pub trait GestureDetector: Predictor {
    /// Labelled detections, possibly empty
    async fn detect(&self, image: &Image) -> Result<Vec<GestureEvidence>>;
}

/// Output pair of a clothing model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClothingScores {
    pub topless_probability: f32,
    pub clothed_probability: f32,
}

impl ClothingScores {
    pub fn new(topless_probability: f32, clothed_probability: f32) -> Self {
        Self {
            topless_probability,
            clothed_probability,
        }
    }
}

/// Attributes of a detected face
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceAttributes {
    pub gender: Gender,
    pub age_estimate: Option<f32>,
}

impl FaceAttributes {
    pub fn new(gender: Gender) -> Self {
        Self {
            gender,
            age_estimate: None,
        }
    }

    pub fn with_age(mut self, age: f32) -> Self {
        self.age_estimate = Some(age);
        self
    }
}

/// Adapter-specific result for one item
#[derive(Debug, Clone, PartialEq)]
pub enum RawModelOutput {
    Clothing {
        gender: Gender,
        scores: ClothingScores,
    },
    AgeGender(FaceAttributes),
    Text(Vec<String>),
    Profanity(Vec<String>),
    Gesture(Vec<GestureEvidence>),
}

/// What one adapter produced for one item
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterSlot {
    /// The adapter produced a result
    Output(RawModelOutput),
    /// The adapter ran but had no signal to report
    Absent,
    /// The adapter failed; the reason is kept for the verdict
    Unavailable(String),
}

/// Per-item mapping from adapter name to its slot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterOutputs {
    slots: BTreeMap<ModelName, AdapterSlot>,
}

impl AdapterOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the slot for `model`, replacing any earlier one
    pub fn insert(&mut self, model: ModelName, slot: AdapterSlot) {
        self.slots.insert(model, slot);
    }

    pub fn with(mut self, model: ModelName, slot: AdapterSlot) -> Self {
        self.insert(model, slot);
        self
    }

    pub fn get(&self, model: ModelName) -> Option<&AdapterSlot> {
        self.slots.get(&model)
    }

    /// Slots in canonical model order
    pub fn iter(&self) -> impl Iterator<Item = (ModelName, &AdapterSlot)> {
        self.slots.iter().map(|(name, slot)| (*name, slot))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of adapters whose slot is `Unavailable`
    pub fn unavailable_count(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| matches!(slot, AdapterSlot::Unavailable(_)))
            .count()
    }
}
