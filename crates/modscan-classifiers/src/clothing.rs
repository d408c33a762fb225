//! Gender-routed clothing classification

use crate::classifier::{ClothingModel, ClothingPredictor, ClothingScores, Predictor};
use async_trait::async_trait;
use modscan_core::{Error, Gender, Image, ModelName, Result};
use std::sync::Arc;
use tracing::debug;

/// Routes each image to the clothing model trained for the detected gender
pub struct GenderedClothingPredictor {
    male: Arc<dyn ClothingModel>,
    female: Arc<dyn ClothingModel>,
}

impl GenderedClothingPredictor {
    pub fn new(male: Arc<dyn ClothingModel>, female: Arc<dyn ClothingModel>) -> Self {
        Self { male, female }
    }
}

#[async_trait]
impl Predictor for GenderedClothingPredictor {
    fn name(&self) -> &str {
        "gendered-clothing"
    }

    async fn warm_up(&self) -> Result<()> {
        self.male.warm_up().await?;
        self.female.warm_up().await
    }
}

#[async_trait]
impl ClothingPredictor for GenderedClothingPredictor {
    async fn predict(&self, image: &Image, gender: Gender) -> Result<ClothingScores> {
        let model = match gender {
            Gender::Male => &self.male,
            Gender::Female => &self.female,
            Gender::Unknown => {
                return Err(Error::adapter(
                    ModelName::Clothing,
                    "no clothing model for undetected gender",
                ))
            }
        };

        debug!("Routing clothing prediction to {} ({})", model.name(), gender);
        model.predict(image).await
    }
}
