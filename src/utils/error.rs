//! Error types and handling
//!
//! Common error types used across the crate.

use crate::config::ConfigError;
use crate::export::{EngineError, ExportError};
use crate::ranges::RangeError;
use crate::recording::{LibraryError, ResolveError, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AppError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Range(_) => "INVALID_RANGE",
            AppError::Resolve(e) => resolve_code(e),
            AppError::Store(e) => store_code(e),
            AppError::Library(LibraryError::Resolve(e)) => resolve_code(e),
            AppError::Library(LibraryError::Store(e)) => store_code(e),
            AppError::Export(e) => match e {
                ExportError::LoadFailed(_) => "LOAD_FAILED",
                ExportError::Transcode { .. } => "TRANSCODE_ERROR",
                ExportError::Engine(e) => engine_code(e),
                ExportError::Resolve(e) => resolve_code(e),
                ExportError::NoRanges => "NO_RANGES",
                ExportError::Task(_) => "EXPORT_ERROR",
            },
            AppError::Engine(e) => engine_code(e),
            AppError::Config(_) => "CONFIG_ERROR",
        }
    }
}

fn resolve_code(error: &ResolveError) -> &'static str {
    match error {
        ResolveError::NotFound { .. } => "NOT_FOUND",
        ResolveError::Store(e) => store_code(e),
        ResolveError::Failed(_) => "RESOLVE_ERROR",
    }
}

fn store_code(error: &StoreError) -> &'static str {
    match error {
        StoreError::NotFound(_) => "NOT_FOUND",
        StoreError::Duplicate(_) => "DUPLICATE",
        StoreError::Backend(_) => "STORAGE_ERROR",
    }
}

fn engine_code(error: &EngineError) -> &'static str {
    match error {
        EngineError::Failed { .. } => "TRANSCODE_ERROR",
        EngineError::Io(_) => "IO_ERROR",
        _ => "ENGINE_ERROR",
    }
}

/// Serializable error for callers outside the crate
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        ErrorResponse {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{BlobField, DatabaseId};

    #[test]
    fn test_error_codes() {
        let cases: Vec<(AppError, &str)> = vec![
            (
                RangeError::InvalidRange {
                    start: f64::NAN,
                    end: 1.0,
                }
                .into(),
                "INVALID_RANGE",
            ),
            (ExportError::LoadFailed("no ffmpeg".into()).into(), "LOAD_FAILED"),
            (
                ExportError::Transcode {
                    diagnostics: "bad".into(),
                }
                .into(),
                "TRANSCODE_ERROR",
            ),
            (ExportError::NoRanges.into(), "NO_RANGES"),
            (
                ResolveError::NotFound {
                    id: DatabaseId::from("abc"),
                    field: BlobField::Media,
                }
                .into(),
                "NOT_FOUND",
            ),
            (
                LibraryError::Store(StoreError::Duplicate(DatabaseId::from("abc"))).into(),
                "DUPLICATE",
            ),
            (
                std::io::Error::new(std::io::ErrorKind::Other, "disk").into(),
                "IO_ERROR",
            ),
        ];

        for (error, code) in cases {
            assert_eq!(error.code(), code, "{}", error);
        }
    }

    #[test]
    fn test_error_response() {
        let response = ErrorResponse::from(AppError::from(ExportError::NoRanges));
        assert_eq!(response.code, "NO_RANGES");
        assert_eq!(response.message, "No ranges to export");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["code"], "NO_RANGES");
    }
}
