//! Byte payloads handed out by resolvers

use bytes::Bytes;

/// An immutable media payload with an optional mime type
///
/// Cloning a `Blob` is cheap and shares the underlying buffer, which can
/// never be mutated through any handle. Use [`Blob::deep_clone`] when a
/// separate allocation is needed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Blob {
    data: Bytes,
    mime_type: Option<String>,
}

impl Blob {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copy the payload into a fresh allocation
    pub fn deep_clone(&self) -> Self {
        Self {
            data: Bytes::copy_from_slice(&self.data),
            mime_type: self.mime_type.clone(),
        }
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl From<Vec<u8>> for Blob {
    fn from(data: Vec<u8>) -> Self {
        Blob::new(data)
    }
}

impl From<Bytes> for Blob {
    fn from(data: Bytes) -> Self {
        Blob::new(data)
    }
}

impl From<&'static [u8]> for Blob {
    fn from(data: &'static [u8]) -> Self {
        Blob::new(Bytes::from_static(data))
    }
}
