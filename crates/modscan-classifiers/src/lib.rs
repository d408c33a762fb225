//! ModScan Classifiers
//!
//! Adapter traits for the external predictors, the profanity lexicon, and
//! the two pure stages of the pipeline:
//! - [`ItemClassifier`] fans one item out to the selected adapters
//! - [`ResultNormalizer`] turns the raw outputs into a [`Verdict`](modscan_core::Verdict)
//!
//! Predictors are supplied by the caller through [`ModelRegistry`].

pub mod classifier;
pub mod clothing;
pub mod config;
pub mod item;
pub mod lexicon;
pub mod normalizer;
pub mod registry;

pub use classifier::{
    AdapterOutputs, AdapterSlot, AgeGenderPredictor, ClothingModel, ClothingPredictor,
    ClothingScores, FaceAttributes, GestureDetector, Predictor, RawModelOutput, TextExtractor,
};
pub use clothing::GenderedClothingPredictor;
pub use config::{
    BatchConfig, CommitMode, GestureConfig, LexiconConfig, ScanConfig, StatisticsConfig,
    ThresholdConfig,
};
pub use item::ItemClassifier;
pub use lexicon::ProfanityLexicon;
pub use normalizer::ResultNormalizer;
pub use registry::{ModelRegistry, RegistryState};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{
        AgeGenderPredictor, ClothingPredictor, GestureDetector, Predictor, TextExtractor,
    };
    pub use crate::config::ScanConfig;
    pub use crate::item::ItemClassifier;
    pub use crate::lexicon::ProfanityLexicon;
    pub use crate::normalizer::ResultNormalizer;
    pub use crate::registry::ModelRegistry;
}
