//! Persistent running totals
//!
//! Stores apply a [`BatchCounters`] delta as one unit: readers see either the
//! totals before the merge or after it, never a partial update.

use async_trait::async_trait;
use modscan_core::{BatchCounters, Result};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Backend holding the running statistics totals
#[async_trait]
pub trait StatisticsStore: Send + Sync {
    /// Store name for logs
    fn name(&self) -> &str;

    /// Add `delta` to the totals, all keys or none
    async fn merge(&self, delta: &BatchCounters) -> Result<()>;

    /// Current totals
    async fn totals(&self) -> Result<BatchCounters>;
}

/// Process-local totals
#[derive(Default)]
pub struct InMemoryStatisticsStore {
    totals: Mutex<BatchCounters>,
}

impl InMemoryStatisticsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from previously persisted totals
    pub fn with_totals(totals: BatchCounters) -> Self {
        Self {
            totals: Mutex::new(totals),
        }
    }
}

#[async_trait]
impl StatisticsStore for InMemoryStatisticsStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn merge(&self, delta: &BatchCounters) -> Result<()> {
        self.totals.lock().merge(delta);
        Ok(())
    }

    async fn totals(&self) -> Result<BatchCounters> {
        Ok(*self.totals.lock())
    }
}

/// Totals kept in a JSON file.
///
/// Each merge writes the new totals to a sibling temp file and renames it
/// over the original, so a failed write leaves the old totals intact.
pub struct FileStatisticsStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileStatisticsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "statistics.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn read(&self) -> Result<BatchCounters> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BatchCounters::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, totals: &BatchCounters) -> Result<()> {
        let json = serde_json::to_vec_pretty(totals)?;
        let temp = self.temp_path();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&temp, json).await?;
        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl StatisticsStore for FileStatisticsStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn merge(&self, delta: &BatchCounters) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let totals = self.read().await?.merged(delta);
        self.write(&totals).await?;

        debug!("Statistics written to {}", self.path.display());
        Ok(())
    }

    async fn totals(&self) -> Result<BatchCounters> {
        let _guard = self.write_lock.lock().await;
        self.read().await
    }
}
