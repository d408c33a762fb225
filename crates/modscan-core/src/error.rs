//! Error types for ModScan

use crate::types::ModelName;

/// Result type alias using ModScan's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for ModScan operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// One adapter failed for one item
    #[error("adapter '{adapter}' unavailable: {reason}")]
    AdapterUnavailable { adapter: ModelName, reason: String },

    /// The model selection names an unknown or unserviceable model
    #[error("invalid model selection: {0}")]
    InvalidSelection(String),

    /// Batch counters could not be persisted
    #[error("statistics commit failed: {0}")]
    StatisticsCommitFailed(String),

    /// An item's payload does not match its declared kind
    #[error("malformed input for item {item}: {reason}")]
    MalformedInput { item: usize, reason: String },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Model registry lifecycle errors
    #[error("registry error: {0}")]
    Registry(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Timeout errors
    #[error("operation timed out")]
    Timeout,

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new adapter-unavailable error
    pub fn adapter(adapter: ModelName, reason: impl Into<String>) -> Self {
        Self::AdapterUnavailable {
            adapter,
            reason: reason.into(),
        }
    }

    /// Create a new invalid-selection error
    pub fn selection(msg: impl Into<String>) -> Self {
        Self::InvalidSelection(msg.into())
    }

    /// Create a new statistics commit error
    pub fn commit(msg: impl Into<String>) -> Self {
        Self::StatisticsCommitFailed(msg.into())
    }

    /// Create a new malformed-input error
    pub fn malformed(item: usize, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            item,
            reason: reason.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new registry error
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error is confined to a single item and must not abort a batch
    pub fn is_item_level(&self) -> bool {
        matches!(
            self,
            Self::AdapterUnavailable { .. } | Self::MalformedInput { .. } | Self::Timeout
        )
    }
}
