//! Persistence interface for recordings
//!
//! The storage engine itself lives outside this crate. It only has to store
//! rows keyed by [`DatabaseId`], each holding the recording metadata and two
//! blobs (media and thumbnail). [`MemoryStore`] is the in-process
//! implementation used for unsaved sessions and tests.

use super::blob::Blob;
use super::entity::DatabaseId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Store errors
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("Recording not found: {0}")]
    NotFound(DatabaseId),

    #[error("Recording already stored: {0}")]
    Duplicate(DatabaseId),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Which blob of a row to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobField {
    /// Primary media payload
    Media,
    /// Preview image
    Thumbnail,
}

/// Metadata columns of a stored recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingMeta {
    pub id: DatabaseId,
    pub timestamp: DateTime<Utc>,
    pub filename: String,
}

/// A full stored row
#[derive(Debug, Clone)]
pub struct RecordingRow {
    pub meta: RecordingMeta,
    pub media: Blob,
    pub thumbnail: Blob,
}

impl RecordingRow {
    pub fn blob(&self, field: BlobField) -> &Blob {
        match field {
            BlobField::Media => &self.media,
            BlobField::Thumbnail => &self.thumbnail,
        }
    }
}

/// Row storage keyed by recording id
#[async_trait]
pub trait RecordingStore: Send + Sync {
    /// Read one blob of a row, `None` if the row does not exist
    async fn get_blob(&self, id: &DatabaseId, field: BlobField) -> Result<Option<Blob>, StoreError>;

    /// Insert a new row
    async fn insert(&self, row: RecordingRow) -> Result<(), StoreError>;

    /// Change the filename of an existing row
    async fn update_filename(&self, id: &DatabaseId, filename: &str) -> Result<(), StoreError>;

    /// Delete a row, returning whether it existed
    async fn delete(&self, id: &DatabaseId) -> Result<bool, StoreError>;

    /// Metadata of every stored row, in no particular order
    async fn list(&self) -> Result<Vec<RecordingMeta>, StoreError>;
}

/// Store backed by a map in memory
#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<HashMap<DatabaseId, RecordingRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

#[async_trait]
impl RecordingStore for MemoryStore {
    async fn get_blob(&self, id: &DatabaseId, field: BlobField) -> Result<Option<Blob>, StoreError> {
        Ok(self.rows.read().get(id).map(|row| row.blob(field).clone()))
    }

    async fn insert(&self, row: RecordingRow) -> Result<(), StoreError> {
        let mut rows = self.rows.write();
        if rows.contains_key(&row.meta.id) {
            return Err(StoreError::Duplicate(row.meta.id.clone()));
        }
        tracing::debug!("Storing recording {} ({} bytes)", row.meta.id, row.media.len());
        rows.insert(row.meta.id.clone(), row);
        Ok(())
    }

    async fn update_filename(&self, id: &DatabaseId, filename: &str) -> Result<(), StoreError> {
        let mut rows = self.rows.write();
        let row = rows
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        row.meta.filename = filename.to_string();
        Ok(())
    }

    async fn delete(&self, id: &DatabaseId) -> Result<bool, StoreError> {
        Ok(self.rows.write().remove(id).is_some())
    }

    async fn list(&self) -> Result<Vec<RecordingMeta>, StoreError> {
        Ok(self.rows.read().values().map(|row| row.meta.clone()).collect())
    }
}
