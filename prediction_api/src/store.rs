//! Prediction history persistence.
//!
//! Records are keyed by their id. `put` is an upsert and `list_all` returns
//! every record in no particular order.

use crate::config::{StoreBackend, StoreConfig};
use crate::record::PredictionRecord;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to (de)serialize record: {0}")]
    Serde(#[from] serde_json::Error),
}

#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    async fn put(&self, record: &PredictionRecord) -> Result<(), StoreError>;
    async fn list_all(&self) -> Result<Vec<PredictionRecord>, StoreError>;
}

pub fn build_store(config: &StoreConfig) -> Arc<dyn RecordStore> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory prediction store, histories are lost on restart");
            Arc::new(MemoryStore::default())
        }
        StoreBackend::Fs => {
            let root = config.collection_path();
            tracing::info!("Persisting predictions under {}", root.display());
            Arc::new(FsStore::new(root))
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<Uuid, PredictionRecord>>,
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn put(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        self.records.write().insert(record.id, record.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<PredictionRecord>, StoreError> {
        Ok(self.records.read().values().cloned().collect())
    }
}

/// One JSON document per record under a collection directory.
#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn document_path(&self, id: &Uuid) -> PathBuf {
        self.root.join(format!("{}.json", id))
    }

    fn is_document(path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == "json")
    }
}

#[async_trait]
impl RecordStore for FsStore {
    async fn put(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let document = serde_json::to_vec_pretty(record)?;
        let path = self.document_path(&record.id);
        let tmp_path = path.with_extension("json.tmp");

        // Write then rename so readers never see a half-written document.
        tokio::fs::write(&tmp_path, document).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        tracing::debug!("Stored prediction {} at {}", record.id, path.display());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<PredictionRecord>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !Self::is_document(&path) {
                continue;
            }
            let raw = tokio::fs::read(&path).await?;
            records.push(serde_json::from_slice::<PredictionRecord>(&raw)?);
        }

        Ok(records)
    }
}
