//! Export types
//!
//! This module defines the engine lifecycle states, the events observers
//! receive while an export runs, and the export error type.

use super::engine::EngineError;
use crate::recording::ResolveError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of the transcoding engine owned by a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EngineState {
    /// Nothing has touched the engine yet
    Unloaded,
    /// One-time initialization in progress
    Loading,
    /// Idle and ready for work
    Ready,
    /// A slice job holds the engine
    Slicing,
    /// Initialization failed; this engine instance is unusable
    LoadFailed,
}

impl Default for EngineState {
    fn default() -> Self {
        Self::Unloaded
    }
}

/// Origin of an engine log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Emitted by this crate about the engine
    Info,
    /// Engine standard error (where ffmpeg logs)
    Stderr,
}

/// Events emitted by an export pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ExportEvent {
    /// A log line from the engine
    Output { level: LogLevel, message: String },
    /// Progress of the current engine invocation (0.0 to 1.0)
    Progress { ratio: f64 },
    /// The engine finished loading
    Loaded,
    /// The engine failed to load
    LoadError { message: String },
}

/// Export errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Transcoding engine failed to load: {0}")]
    LoadFailed(String),

    #[error("Transcode failed: {diagnostics}")]
    Transcode { diagnostics: String },

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Failed to load source media: {0}")]
    Resolve(#[from] ResolveError),

    #[error("No ranges to export")]
    NoRanges,

    #[error("Export task failed: {0}")]
    Task(String),
}

impl ExportError {
    /// Map an engine invocation failure to a transcode error
    pub(crate) fn from_run(error: EngineError) -> Self {
        match error {
            EngineError::Failed { diagnostics, .. } => ExportError::Transcode { diagnostics },
            other => ExportError::Engine(other),
        }
    }
}

impl From<ExportError> for String {
    fn from(e: ExportError) -> String {
        e.to_string()
    }
}
