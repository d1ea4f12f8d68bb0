//! Saved recordings
//!
//! [`RecordingLibrary`] moves recordings between memory and a
//! [`RecordingStore`]. Persisting a recording swaps its resolvers for ones
//! reading the store by id; nothing else about the value changes.

use super::entity::{DatabaseId, Recording};
use super::resolver::{create_storage_resolver, ResolveError};
use super::store::{BlobField, RecordingMeta, RecordingRow, RecordingStore, StoreError};
use std::sync::Arc;
use thiserror::Error;

/// Library errors
#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Failed to load recording data: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Collection of persisted recordings
#[derive(Clone)]
pub struct RecordingLibrary {
    store: Arc<dyn RecordingStore>,
}

impl RecordingLibrary {
    pub fn new(store: Arc<dyn RecordingStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn RecordingStore> {
        &self.store
    }

    /// Persist recordings
    ///
    /// Returns the same recordings, now backed by the store. Either every
    /// recording is stored or none is: all payloads are resolved before the
    /// first insert, and rows already inserted are removed if a later insert
    /// fails.
    pub async fn add(&self, recordings: &[Recording]) -> Result<Vec<Recording>, LibraryError> {
        let mut rows = Vec::with_capacity(recordings.len());
        for recording in recordings {
            rows.push(RecordingRow {
                meta: meta_of(recording),
                media: recording.blob().await?,
                thumbnail: recording.thumbnail_blob().await?,
            });
        }

        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.meta.id.clone();
            if let Err(e) = self.store.insert(row).await {
                self.rollback(&inserted).await;
                return Err(e.into());
            }
            inserted.push(id);
        }

        for recording in recordings {
            tracing::info!(
                "Saved recording {} as '{}'",
                recording.database_id(),
                recording.filename()
            );
        }
        Ok(recordings.iter().map(|r| self.attach(r)).collect())
    }

    async fn rollback(&self, ids: &[DatabaseId]) {
        for id in ids {
            if let Err(e) = self.store.delete(id).await {
                tracing::warn!("Failed to roll back recording {}: {}", id, e);
            }
        }
    }

    /// Persist filename changes
    pub async fn update(&self, recordings: &[Recording]) -> Result<(), LibraryError> {
        for recording in recordings {
            self.store
                .update_filename(recording.database_id(), recording.filename())
                .await?;
        }
        Ok(())
    }

    /// Remove recordings from the store
    ///
    /// Resolvers handed out for them fail with `NotFound` from now on.
    /// Returns how many rows were actually removed.
    pub async fn delete(&self, recordings: &[Recording]) -> Result<usize, LibraryError> {
        let mut removed = 0;
        for recording in recordings {
            if self.store.delete(recording.database_id()).await? {
                removed += 1;
            } else {
                tracing::debug!("Recording {} was not stored", recording.database_id());
            }
        }
        tracing::info!("Deleted {} recording(s)", removed);
        Ok(removed)
    }

    /// Every stored recording, newest first
    pub async fn list(&self) -> Result<Vec<Recording>, LibraryError> {
        let mut metas = self.store.list().await?;
        metas.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        Ok(metas.into_iter().map(|meta| self.restore(meta)).collect())
    }

    fn attach(&self, recording: &Recording) -> Recording {
        let id = recording.database_id().clone();
        recording.with_resolvers(
            create_storage_resolver(self.store.clone(), id.clone(), BlobField::Media),
            create_storage_resolver(self.store.clone(), id, BlobField::Thumbnail),
        )
    }

    fn restore(&self, meta: RecordingMeta) -> Recording {
        Recording::from_parts(
            meta.id.clone(),
            meta.timestamp,
            meta.filename,
            create_storage_resolver(self.store.clone(), meta.id.clone(), BlobField::Media),
            create_storage_resolver(self.store.clone(), meta.id, BlobField::Thumbnail),
        )
    }
}

fn meta_of(recording: &Recording) -> RecordingMeta {
    RecordingMeta {
        id: recording.database_id().clone(),
        timestamp: recording.timestamp(),
        filename: recording.filename().to_string(),
    }
}
