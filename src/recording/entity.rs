//! The recording value object
//!
//! A [`Recording`] pairs metadata with two deferred byte sources. It never
//! holds decoded bytes itself, so keeping many recordings around (for
//! example in a list view) costs only their metadata.

use super::blob::Blob;
use super::resolver::{create_memory_resolver, ResolveError, SharedResolver};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque, stable storage identifier of a recording
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatabaseId(String);

impl DatabaseId {
    /// Generate a fresh random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatabaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DatabaseId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DatabaseId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A captured or exported recording
///
/// Recordings are immutable values. Renaming goes through
/// [`Recording::clone_with_new_filename`], which keeps the id and both
/// resolvers, so every holder of the original keeps a consistent view.
#[derive(Clone)]
pub struct Recording {
    database_id: DatabaseId,
    timestamp: DateTime<Utc>,
    filename: String,
    blob_resolver: SharedResolver,
    thumbnail_resolver: SharedResolver,
}

impl Recording {
    /// Create a recording with a fresh id, timestamped now
    ///
    /// The filename defaults to `<RFC 3339 timestamp>.webm`.
    pub fn new(blob_resolver: SharedResolver, thumbnail_resolver: SharedResolver) -> Self {
        let timestamp = Utc::now();
        Self {
            database_id: DatabaseId::generate(),
            filename: default_filename(&timestamp),
            timestamp,
            blob_resolver,
            thumbnail_resolver,
        }
    }

    /// Create a recording whose bytes are held in memory
    pub fn from_memory(media: &Blob, thumbnail: &Blob) -> Self {
        Self::new(create_memory_resolver(media), create_memory_resolver(thumbnail))
    }

    /// Rebuild a recording from stored metadata
    pub fn from_parts(
        database_id: DatabaseId,
        timestamp: DateTime<Utc>,
        filename: String,
        blob_resolver: SharedResolver,
        thumbnail_resolver: SharedResolver,
    ) -> Self {
        Self {
            database_id,
            timestamp,
            filename,
            blob_resolver,
            thumbnail_resolver,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn database_id(&self) -> &DatabaseId {
        &self.database_id
    }

    /// Creation timestamp
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Label used, for example, as the download name
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Load the media payload
    ///
    /// Every call goes to the resolver; nothing is cached on the recording.
    pub async fn blob(&self) -> Result<Blob, ResolveError> {
        self.blob_resolver.resolve().await
    }

    /// Load the thumbnail payload
    pub async fn thumbnail_blob(&self) -> Result<Blob, ResolveError> {
        self.thumbnail_resolver.resolve().await
    }

    pub fn blob_resolver(&self) -> &SharedResolver {
        &self.blob_resolver
    }

    pub fn thumbnail_resolver(&self) -> &SharedResolver {
        &self.thumbnail_resolver
    }

    /// Same recording under a new name; data is still backed by the
    /// original resolvers
    pub fn clone_with_new_filename(&self, filename: impl Into<String>) -> Recording {
        Recording {
            filename: filename.into(),
            ..self.clone()
        }
    }

    /// Same recording backed by different resolvers
    pub fn with_resolvers(
        &self,
        blob_resolver: SharedResolver,
        thumbnail_resolver: SharedResolver,
    ) -> Recording {
        Recording {
            blob_resolver,
            thumbnail_resolver,
            ..self.clone()
        }
    }
}

impl fmt::Debug for Recording {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recording")
            .field("database_id", &self.database_id)
            .field("timestamp", &self.timestamp)
            .field("filename", &self.filename)
            .finish_non_exhaustive()
    }
}

fn default_filename(timestamp: &DateTime<Utc>) -> String {
    format!("{}.webm", timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
}
