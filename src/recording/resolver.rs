//! Deferred byte sources
//!
//! A [`BlobResolver`] decouples "a recording exists" from "its bytes are
//! loaded". Resolvers are idempotent: every call returns semantically equal
//! bytes, and callers are free to consume what they receive.

use super::blob::Blob;
use super::entity::DatabaseId;
use super::store::{BlobField, RecordingStore, StoreError};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Blob resolution errors
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    #[error("Recording not found: {id} ({field:?})")]
    NotFound { id: DatabaseId, field: BlobField },

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Resolver failed: {0}")]
    Failed(String),
}

/// Deferred, idempotent accessor for a byte payload
#[async_trait]
pub trait BlobResolver: Send + Sync {
    async fn resolve(&self) -> Result<Blob, ResolveError>;
}

/// Shared handle to a resolver
pub type SharedResolver = Arc<dyn BlobResolver>;

#[async_trait]
impl<T: BlobResolver + ?Sized> BlobResolver for Arc<T> {
    async fn resolve(&self) -> Result<Blob, ResolveError> {
        (**self).resolve().await
    }
}

/// Resolver over a payload held in memory
///
/// The blob is copied once at construction, so later changes to the
/// caller's buffer are not observed. Each call hands out a new handle on
/// that copy.
pub struct MemoryResolver {
    blob: Blob,
}

impl MemoryResolver {
    pub fn new(blob: &Blob) -> Self {
        Self {
            blob: blob.deep_clone(),
        }
    }
}

#[async_trait]
impl BlobResolver for MemoryResolver {
    async fn resolve(&self) -> Result<Blob, ResolveError> {
        Ok(self.blob.clone())
    }
}

/// Resolver reading one field of a stored row on every call
pub struct StorageResolver {
    store: Arc<dyn RecordingStore>,
    id: DatabaseId,
    field: BlobField,
}

impl StorageResolver {
    pub fn new(store: Arc<dyn RecordingStore>, id: DatabaseId, field: BlobField) -> Self {
        Self { store, id, field }
    }
}

#[async_trait]
impl BlobResolver for StorageResolver {
    async fn resolve(&self) -> Result<Blob, ResolveError> {
        self.store
            .get_blob(&self.id, self.field)
            .await?
            .ok_or_else(|| ResolveError::NotFound {
                id: self.id.clone(),
                field: self.field,
            })
    }
}

/// Decorator handing out a separate allocation on every call
pub struct DeepCloneResolver<R> {
    inner: R,
}

impl<R: BlobResolver> DeepCloneResolver<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: BlobResolver> BlobResolver for DeepCloneResolver<R> {
    async fn resolve(&self) -> Result<Blob, ResolveError> {
        Ok(self.inner.resolve().await?.deep_clone())
    }
}

/// Resolver backed by an injected async function
pub struct FnResolver<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> BlobResolver for FnResolver<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Blob, ResolveError>> + Send + 'static,
{
    async fn resolve(&self) -> Result<Blob, ResolveError> {
        (self.f)().await
    }
}

/// Wrap an async function as a resolver
pub fn resolver_fn<F, Fut>(f: F) -> FnResolver<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Blob, ResolveError>> + Send + 'static,
{
    FnResolver { f }
}

/// Shared memory resolver for `blob`
pub fn create_memory_resolver(blob: &Blob) -> SharedResolver {
    Arc::new(MemoryResolver::new(blob))
}

/// Shared storage resolver for one field of row `id`
pub fn create_storage_resolver(
    store: Arc<dyn RecordingStore>,
    id: DatabaseId,
    field: BlobField,
) -> SharedResolver {
    Arc::new(StorageResolver::new(store, id, field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::store::{MemoryStore, RecordingMeta, RecordingRow};
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_memory_resolver_is_idempotent() {
        let resolver = MemoryResolver::new(&Blob::new(b"payload".to_vec()));

        let first = resolver.resolve().await.unwrap();
        let second = resolver.resolve().await.unwrap();
        assert_eq!(first, second);

        // Consuming one result leaves the next call untouched
        let mut owned = first.into_bytes().to_vec();
        owned.clear();
        assert_eq!(resolver.resolve().await.unwrap().data().as_ref(), b"payload");
    }

    #[tokio::test]
    async fn test_memory_resolver_copies_at_creation() {
        let source = Blob::new(b"abc".to_vec());
        let resolver = MemoryResolver::new(&source);
        let resolved = resolver.resolve().await.unwrap();
        assert_ne!(resolved.data().as_ptr(), source.data().as_ptr());
    }

    #[tokio::test]
    async fn test_deep_clone_decorator() {
        let resolver = DeepCloneResolver::new(MemoryResolver::new(&Blob::new(b"x".to_vec())));
        let a = resolver.resolve().await.unwrap();
        let b = resolver.resolve().await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a.data().as_ptr(), b.data().as_ptr());
    }

    #[tokio::test]
    async fn test_deep_clone_wraps_shared_resolver() {
        let shared: SharedResolver = create_memory_resolver(&Blob::new(b"shared".to_vec()));
        let resolver: SharedResolver = Arc::new(DeepCloneResolver::new(shared.clone()));

        let direct = shared.resolve().await.unwrap();
        let copied = resolver.resolve().await.unwrap();
        assert_eq!(copied, direct);
        assert_ne!(copied.data().as_ptr(), direct.data().as_ptr());
    }

    #[tokio::test]
    async fn test_storage_resolver_fields_and_not_found() {
        let store = Arc::new(MemoryStore::new());
        let id = DatabaseId::from("rec-1");
        store
            .insert(RecordingRow {
                meta: RecordingMeta {
                    id: id.clone(),
                    timestamp: Utc::now(),
                    filename: "rec.webm".to_string(),
                },
                media: Blob::new(b"video".to_vec()),
                thumbnail: Blob::new(b"image".to_vec()),
            })
            .await
            .unwrap();

        let media = StorageResolver::new(store.clone(), id.clone(), BlobField::Media);
        let thumb = StorageResolver::new(store.clone(), id.clone(), BlobField::Thumbnail);
        assert_eq!(media.resolve().await.unwrap().data().as_ref(), b"video");
        assert_eq!(thumb.resolve().await.unwrap().data().as_ref(), b"image");

        store.delete(&id).await.unwrap();
        assert!(matches!(
            media.resolve().await,
            Err(ResolveError::NotFound { field: BlobField::Media, .. })
        ));
    }

    #[tokio::test]
    async fn test_fn_resolver_runs_every_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let resolver = resolver_fn(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Blob::new(b"lazy".to_vec()))
            }
        });

        resolver.resolve().await.unwrap();
        resolver.resolve().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
