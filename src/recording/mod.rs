//! Recordings and their lazily resolved bytes
//!
//! A recording exists independently of its bytes: it carries resolvers
//! that fetch the media and thumbnail on demand, either from memory (right
//! after a capture or export) or from a [`RecordingStore`] once saved.

pub mod blob;
pub mod entity;
pub mod library;
pub mod resolver;
pub mod store;

pub use blob::Blob;
pub use entity::{DatabaseId, Recording};
pub use library::{LibraryError, RecordingLibrary};
pub use resolver::{
    create_memory_resolver, create_storage_resolver, resolver_fn, BlobResolver,
    DeepCloneResolver, FnResolver, MemoryResolver, ResolveError, SharedResolver,
    StorageResolver,
};
pub use store::{BlobField, MemoryStore, RecordingMeta, RecordingRow, RecordingStore, StoreError};
