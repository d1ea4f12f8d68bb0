//! Runtime configuration
//!
//! Configuration is a small JSON document; every field has a default, so
//! an empty object (or no file at all) is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding [`WeftConfig::ffmpeg_path`]
pub const FFMPEG_ENV: &str = "WEFT_FFMPEG";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeftConfig {
    /// ffmpeg binary, either a bare name looked up on `PATH` or a path
    pub ffmpeg_path: PathBuf,
    /// Container extension used for intermediate and output files
    pub container_extension: String,
    /// Parent directory for engine workspaces (system temp dir if unset)
    pub work_dir: Option<PathBuf>,
    /// Default `tracing` filter when `RUST_LOG` is not set
    pub log_filter: String,
}

impl Default for WeftConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            container_extension: "webm".to_string(),
            work_dir: None,
            log_filter: "weft=info".to_string(),
        }
    }
}

impl WeftConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: WeftConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Apply environment overrides
    pub fn apply_env(mut self) -> Self {
        if let Some(ffmpeg) = std::env::var_os(FFMPEG_ENV).filter(|v| !v.is_empty()) {
            self.ffmpeg_path = PathBuf::from(ffmpeg);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_from_empty_object() {
        let config: WeftConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, WeftConfig::default());
        assert_eq!(config.container_extension, "webm");
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("weft.json");
        std::fs::write(
            &path,
            r#"{ "ffmpegPath": "/opt/ffmpeg/bin/ffmpeg", "containerExtension": "mkv" }"#,
        )
        .unwrap();

        let config = WeftConfig::load(&path).unwrap();
        assert_eq!(config.ffmpeg_path, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(config.container_extension, "mkv");
        assert_eq!(config.log_filter, "weft=info");
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            WeftConfig::load(&dir.path().join("missing.json")),
            Err(ConfigError::Read { .. })
        ));

        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(WeftConfig::load(&path), Err(ConfigError::Parse { .. })));
    }
}
