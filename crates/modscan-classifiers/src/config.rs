//! Configuration for scanning, thresholds and statistics

use crate::lexicon::{read_terms, ProfanityLexicon};
use modscan_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level scanner configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Decision thresholds used by the normalizer
    #[serde(default)]
    pub thresholds: ThresholdConfig,

    /// Gesture labels treated as offensive
    #[serde(default)]
    pub gestures: GestureConfig,

    /// Profanity lexicon source
    #[serde(default)]
    pub lexicon: LexiconConfig,

    /// Batch execution settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Statistics persistence
    #[serde(default)]
    pub statistics: StatisticsConfig,
}

/// Normalizer thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Topless probability above which an image is flagged
    #[serde(default = "default_topless_threshold")]
    pub topless: f32,

    /// Age estimates strictly below this are treated as minors
    #[serde(default = "default_minor_age")]
    pub minor_age: f32,

    /// Minimum score for an offensive gesture detection
    #[serde(default = "default_gesture_threshold")]
    pub gesture: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            topless: default_topless_threshold(),
            minor_age: default_minor_age(),
            gesture: default_gesture_threshold(),
        }
    }
}

/// Gesture label configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestureConfig {
    #[serde(default = "default_gesture_labels")]
    pub labels: Vec<String>,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            labels: default_gesture_labels(),
        }
    }
}

/// Lexicon configuration; empty means the built-in lexicon
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LexiconConfig {
    /// Inline terms
    #[serde(default)]
    pub terms: Vec<String>,

    /// Newline-delimited term file
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl LexiconConfig {
    /// Build the configured lexicon
    pub fn build(&self) -> Result<ProfanityLexicon> {
        if self.path.is_none() && self.terms.is_empty() {
            return ProfanityLexicon::builtin();
        }

        let mut terms = match &self.path {
            Some(path) => read_terms(path)?,
            None => Vec::new(),
        };
        terms.extend(self.terms.iter().cloned());

        ProfanityLexicon::new(terms)
    }
}

/// When batch counters are committed to the statistics store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// One commit after the whole batch
    #[default]
    EndOfBatch,
    /// One commit per flagged item, plus the scan counter at the end.
    ///
    /// Commits made before a cancellation are kept; only the final scan
    /// counter is skipped, so a cancelled batch may leave partial totals.
    PerItem,
}

/// Batch execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Items classified at once; 1 is sequential
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per adapter call timeout in milliseconds
    #[serde(default = "default_adapter_timeout_ms")]
    pub adapter_timeout_ms: u64,

    #[serde(default)]
    pub commit_mode: CommitMode,
}

impl BatchConfig {
    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_millis(self.adapter_timeout_ms)
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            adapter_timeout_ms: default_adapter_timeout_ms(),
            commit_mode: CommitMode::default(),
        }
    }
}

/// Statistics persistence settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatisticsConfig {
    /// JSON totals file; in-memory totals when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl ScanConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse scan config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::config(format!(
                "Failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        for (name, value) in [("topless", t.topless), ("gesture", t.gesture)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::config(format!(
                    "threshold '{}' must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if !t.minor_age.is_finite() || t.minor_age < 0.0 {
            return Err(Error::config(format!(
                "minor_age must be a non-negative age, got {}",
                t.minor_age
            )));
        }

        if self.batch.concurrency == 0 {
            return Err(Error::config("batch concurrency must be at least 1"));
        }

        if self.batch.adapter_timeout_ms == 0 {
            return Err(Error::config("adapter timeout must be positive"));
        }

        Ok(())
    }
}

fn default_topless_threshold() -> f32 {
    0.5
}

fn default_minor_age() -> f32 {
    18.0
}

fn default_gesture_threshold() -> f32 {
    0.5
}

fn default_gesture_labels() -> Vec<String> {
    vec!["middle_finger".to_string()]
}

fn default_concurrency() -> usize {
    1
}

fn default_adapter_timeout_ms() -> u64 {
    30_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_config_yaml() {
        let yaml = r#"
thresholds:
  topless: 0.7
  minor_age: 16
gestures:
  labels: [middle_finger, gang_sign]
lexicon:
  terms: [crap, frak]
batch:
  concurrency: 4
  adapter_timeout_ms: 500
  commit_mode: per_item
statistics:
  path: ./stats.json
"#;

        let config = ScanConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.thresholds.topless, 0.7);
        assert_eq!(config.thresholds.minor_age, 16.0);
        assert_eq!(config.thresholds.gesture, 0.5);
        assert_eq!(config.gestures.labels.len(), 2);
        assert_eq!(config.batch.concurrency, 4);
        assert_eq!(config.batch.adapter_timeout(), Duration::from_millis(500));
        assert_eq!(config.batch.commit_mode, CommitMode::PerItem);
        assert_eq!(config.statistics.path, Some(PathBuf::from("./stats.json")));

        let lexicon = config.lexicon.build().unwrap();
        assert_eq!(lexicon.len(), 2);
    }

    #[test]
    fn test_defaults() {
        let config = ScanConfig::from_yaml("{}").unwrap();

        assert_eq!(config.thresholds.topless, 0.5);
        assert_eq!(config.thresholds.minor_age, 18.0);
        assert_eq!(config.batch.concurrency, 1);
        assert_eq!(config.batch.commit_mode, CommitMode::EndOfBatch);
        assert!(config.statistics.path.is_none());
        assert!(config.lexicon.build().unwrap().contains("crap"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            ScanConfig::from_yaml("thresholds:\n  topless: 1.5\n"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ScanConfig::from_yaml("batch:\n  concurrency: 0\n"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_lexicon_file_and_terms_combine() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terms.txt");
        std::fs::write(&path, "# list\nsmeg\n").unwrap();

        let config = LexiconConfig {
            terms: vec!["frak".to_string()],
            path: Some(path),
        };

        let lexicon = config.build().unwrap();
        assert!(lexicon.contains("smeg"));
        assert!(lexicon.contains("frak"));
    }
}
