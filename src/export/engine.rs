//! Transcoding engine interface
//!
//! An engine is an ffmpeg-compatible command runner working against its own
//! private filesystem. Files are addressed by plain names; the engine
//! decides where they actually live.

use super::events::EventBus;
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to start {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("Engine exited with status {status:?}: {diagnostics}")]
    Failed {
        status: Option<i32>,
        diagnostics: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("File not found in engine workspace: {0}")]
    MissingFile(String),

    #[error("Engine is not loaded")]
    NotLoaded,
}

/// An ffmpeg-compatible engine with a private filesystem
///
/// `load` is called once before anything else. Implementations are not
/// required to support concurrent `run` calls.
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// One-time initialization
    async fn load(&self, events: &EventBus) -> Result<(), EngineError>;

    /// Create or replace a file
    async fn write_file(&self, name: &str, data: Bytes) -> Result<(), EngineError>;

    /// Read a whole file
    async fn read_file(&self, name: &str) -> Result<Bytes, EngineError>;

    /// Delete a file
    async fn unlink(&self, name: &str) -> Result<(), EngineError>;

    /// Run the engine with command-line arguments
    ///
    /// Log lines and progress are reported through `events`. A non-zero
    /// exit is reported as [`EngineError::Failed`] carrying the engine's
    /// diagnostic output.
    async fn run(&self, args: &[String], events: &EventBus) -> Result<(), EngineError>;
}

/// Reject names that would escape the engine filesystem
pub fn validate_name(name: &str) -> Result<(), EngineError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);

    if invalid {
        Err(EngineError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("slice-0-abc.webm").is_ok());
        assert!(validate_name("concat list.txt").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("../etc/passwd").is_err());
        assert!(validate_name("a\\b").is_err());
    }
}
