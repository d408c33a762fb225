//! Model registry lifecycle and selection validation

use crate::classifier::{AgeGenderPredictor, ClothingPredictor, GestureDetector, TextExtractor};
use crate::lexicon::ProfanityLexicon;
use futures::future::BoxFuture;
use modscan_core::{Error, ModelName, ModelSelection, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Lifecycle state of a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    /// Adapters registered but not yet warmed up
    Uninitialized,
    /// Every adapter warmed up; ready for classification
    Initialized,
}

/// Holds the predictors a scanner may use.
///
/// Passed to the orchestrator at construction. Classification refuses to run
/// until [`ModelRegistry::initialize`] has succeeded.
pub struct ModelRegistry {
    clothing: Option<Arc<dyn ClothingPredictor>>,
    age_gender: Option<Arc<dyn AgeGenderPredictor>>,
    text: Option<Arc<dyn TextExtractor>>,
    gesture: Option<Arc<dyn GestureDetector>>,
    lexicon: Option<Arc<ProfanityLexicon>>,
    state: RegistryState,
}

impl ModelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            clothing: None,
            age_gender: None,
            text: None,
            gesture: None,
            lexicon: None,
            state: RegistryState::Uninitialized,
        }
    }

    /// Register the clothing predictor
    pub fn with_clothing(mut self, predictor: Arc<dyn ClothingPredictor>) -> Self {
        self.clothing = Some(predictor);
        self.state = RegistryState::Uninitialized;
        self
    }

    /// Register the face age/gender predictor
    pub fn with_age_gender(mut self, predictor: Arc<dyn AgeGenderPredictor>) -> Self {
        self.age_gender = Some(predictor);
        self.state = RegistryState::Uninitialized;
        self
    }

    /// Register the text extraction predictor
    pub fn with_text_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.text = Some(extractor);
        self.state = RegistryState::Uninitialized;
        self
    }

    /// Register the gesture detector
    pub fn with_gesture(mut self, detector: Arc<dyn GestureDetector>) -> Self {
        self.gesture = Some(detector);
        self.state = RegistryState::Uninitialized;
        self
    }

    /// Register the profanity lexicon
    pub fn with_lexicon(mut self, lexicon: Arc<ProfanityLexicon>) -> Self {
        self.lexicon = Some(lexicon);
        self.state = RegistryState::Uninitialized;
        self
    }

    /// Warm up every registered predictor. Repeated calls are no-ops.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.state == RegistryState::Initialized {
            info!("Model registry already initialized");
            return Ok(());
        }

        info!("Initializing model registry");

        let mut pending: Vec<(ModelName, String, BoxFuture<'_, Result<()>>)> = Vec::new();
        if let Some(p) = &self.clothing {
            pending.push((ModelName::Clothing, p.name().to_string(), p.warm_up()));
        }
        if let Some(p) = &self.age_gender {
            pending.push((ModelName::AgeGender, p.name().to_string(), p.warm_up()));
        }
        if let Some(p) = &self.text {
            pending.push((ModelName::Text, p.name().to_string(), p.warm_up()));
        }
        if let Some(p) = &self.gesture {
            pending.push((ModelName::Gesture, p.name().to_string(), p.warm_up()));
        }

        for (model, name, warm_up) in pending {
            if let Err(e) = warm_up.await {
                warn!("✗ Failed to load {} model {}: {}", model, name, e);
                return Err(Error::registry(format!(
                    "failed to initialize {} model '{}': {}",
                    model, name, e
                )));
            }
            info!("✓ Loaded {} model: {}", model, name);
        }

        if let Some(lexicon) = &self.lexicon {
            info!("✓ Loaded profanity lexicon with {} terms", lexicon.len());
        }

        self.state = RegistryState::Initialized;
        info!(
            "Model registry initialized with {} models",
            self.available_models(true).len()
        );

        Ok(())
    }

    pub fn state(&self) -> RegistryState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state == RegistryState::Initialized
    }

    /// Fail unless [`initialize`](Self::initialize) has completed
    pub fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(Error::registry("model registry used before initialization"))
        }
    }

    /// Models this registry can serve, for batches with or without images
    pub fn available_models(&self, for_images: bool) -> Vec<ModelName> {
        ModelName::ALL
            .into_iter()
            .filter(|m| self.serves(*m, for_images))
            .collect()
    }

    /// Selection for an automated scan: every model the registry can serve
    pub fn automated_selection(&self, for_images: bool) -> Result<ModelSelection> {
        ModelSelection::of(self.available_models(for_images))
    }

    /// Whether `model` has every adapter it needs.
    ///
    /// Clothing needs the face detector for gender. Text needs the extractor
    /// only when images are scanned; matching always needs the lexicon.
    pub fn serves(&self, model: ModelName, for_images: bool) -> bool {
        match model {
            ModelName::Clothing => self.clothing.is_some() && self.age_gender.is_some(),
            ModelName::AgeGender => self.age_gender.is_some(),
            ModelName::Gesture => self.gesture.is_some(),
            ModelName::Text | ModelName::Profanity => {
                self.lexicon.is_some() && (!for_images || self.text.is_some())
            }
        }
    }

    /// Reject a selection this registry cannot serve, before any item runs
    pub fn validate_selection(&self, selection: &ModelSelection, has_images: bool) -> Result<()> {
        let missing: Vec<&str> = selection
            .iter()
            .filter(|m| !self.serves(*m, has_images))
            .map(|m| m.as_str())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::selection(format!(
                "no adapter registered for: {}",
                missing.join(", ")
            )))
        }
    }

    pub fn clothing(&self) -> Option<&Arc<dyn ClothingPredictor>> {
        self.clothing.as_ref()
    }

    pub fn age_gender(&self) -> Option<&Arc<dyn AgeGenderPredictor>> {
        self.age_gender.as_ref()
    }

    pub fn text_extractor(&self) -> Option<&Arc<dyn TextExtractor>> {
        self.text.as_ref()
    }

    pub fn gesture(&self) -> Option<&Arc<dyn GestureDetector>> {
        self.gesture.as_ref()
    }

    pub fn lexicon(&self) -> Option<&Arc<ProfanityLexicon>> {
        self.lexicon.as_ref()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
