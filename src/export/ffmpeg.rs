//! FFmpeg engine and command builders
//!
//! [`FfmpegEngine`] runs a native ffmpeg binary against a private temporary
//! directory, which plays the part of the engine filesystem. The free
//! functions build the stream-copy cut and concat invocations used by the
//! export pipeline.

use super::engine::{validate_name, EngineError, TranscodeEngine};
use super::events::EventBus;
use super::types::{ExportEvent, LogLevel};
use crate::config::WeftConfig;
use crate::ranges::Range;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Stderr lines kept as diagnostics for a failed run
const DIAGNOSTIC_LINES: usize = 20;

/// Format seconds as an ffmpeg timecode, `H:MM:SS.mmm`
///
/// Negative and non-finite values format as zero.
pub fn format_timecode(seconds: f64) -> String {
    let total_ms = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    };

    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let secs = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;

    format!("{}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

/// Whether `range` selects any part of a timeline starting at zero
///
/// Ranges starting at `+inf` or ending before zero select nothing and must
/// not be passed to [`cut_args`], which would cut from the beginning.
pub fn selects_anything(range: &Range) -> bool {
    range.start() < f64::INFINITY && range.end() >= 0.0
}

/// Arguments cutting `range` (in seconds) out of `input` with stream copy
///
/// Starts below zero (including `-inf`) cut from the beginning; an end of
/// `+inf` cuts to the end of the input.
pub fn cut_args(input: &str, range: &Range, output: &str) -> Vec<String> {
    let mut args = vec!["-ss".to_string(), format_timecode(range.start())];

    if range.end() != f64::INFINITY {
        args.extend(["-to".to_string(), format_timecode(range.end())]);
    }

    args.extend([
        "-i".to_string(),
        input.to_string(),
        "-c".to_string(),
        "copy".to_string(),
        output.to_string(),
    ]);
    args
}

/// Arguments joining the files listed in `manifest` with stream copy
pub fn concat_args(manifest: &str, output: &str) -> Vec<String> {
    [
        "-f", "concat", "-safe", "0", "-i", manifest, "-c", "copy", output,
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Concat demuxer playlist listing `files` in order
pub fn concat_manifest<S: AsRef<str>>(files: &[S]) -> String {
    let mut manifest = String::new();
    for file in files {
        manifest.push_str("file '");
        manifest.push_str(&file.as_ref().replace('\'', r"'\''"));
        manifest.push_str("'\n");
    }
    manifest
}

/// Parse `HH:MM:SS.xx` into seconds
pub fn parse_timestamp(value: &str) -> Option<f64> {
    let mut parts = value.trim().split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Input duration from an ffmpeg `Duration: ...` log line
pub fn parse_duration_line(line: &str) -> Option<f64> {
    let rest = line.trim_start().strip_prefix("Duration:")?;
    parse_timestamp(rest.split(',').next()?)
}

/// Output position from a `-progress` line
pub fn parse_progress_line(line: &str) -> Option<f64> {
    let micros: i64 = line.trim().strip_prefix("out_time_us=")?.parse().ok()?;
    (micros >= 0).then(|| micros as f64 / 1_000_000.0)
}

/// Expected output length in seconds of an invocation
///
/// A cut with `-to` produces `to - ss`; otherwise the output runs from `-ss`
/// (or zero) to the end of the input. `None` while the length is unknown or
/// zero.
pub fn output_length(args: &[String], input_duration: Option<f64>) -> Option<f64> {
    let timecode = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .and_then(|v| parse_timestamp(v))
    };

    let start = timecode("-ss").unwrap_or(0.0);
    let end = timecode("-to").or(input_duration)?;
    let length = end - start;
    (length > 0.0).then_some(length)
}

/// Native ffmpeg binary with a temporary-directory workspace
pub struct FfmpegEngine {
    program: PathBuf,
    work_parent: Option<PathBuf>,
    workspace: OnceLock<TempDir>,
    version: OnceLock<String>,
}

impl FfmpegEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            work_parent: None,
            workspace: OnceLock::new(),
            version: OnceLock::new(),
        }
    }

    pub fn from_config(config: &WeftConfig) -> Self {
        let engine = Self::new(config.ffmpeg_path.clone());
        match &config.work_dir {
            Some(dir) => engine.with_work_dir(dir.clone()),
            None => engine,
        }
    }

    /// Create the workspace under `dir` instead of the system temp dir
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_parent = Some(dir.into());
        self
    }

    /// First line of `ffmpeg -version`, once loaded
    pub fn version(&self) -> Option<&str> {
        self.version.get().map(String::as_str)
    }

    /// Workspace directory, once loaded
    pub fn workspace(&self) -> Option<&Path> {
        self.workspace.get().map(TempDir::path)
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    fn path_of(&self, name: &str) -> Result<PathBuf, EngineError> {
        validate_name(name)?;
        let workspace = self.workspace.get().ok_or(EngineError::NotLoaded)?;
        Ok(workspace.path().join(name))
    }

    async fn probe_version(&self) -> Result<String, EngineError> {
        let output = Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| EngineError::Spawn {
                program: self.program_name(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(EngineError::Failed {
                status: output.status.code(),
                diagnostics: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    }

    fn create_workspace(&self) -> Result<TempDir, EngineError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("weft-engine-");

        let dir = match &self.work_parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    async fn load(&self, events: &EventBus) -> Result<(), EngineError> {
        if self.workspace.get().is_some() {
            return Ok(());
        }

        let version = self.probe_version().await?;
        events.emit(&ExportEvent::Output {
            level: LogLevel::Info,
            message: version.clone(),
        });

        let workspace = self.create_workspace()?;
        tracing::info!("FFmpeg ready: {} (workspace {:?})", version, workspace.path());

        let _ = self.version.set(version);
        let _ = self.workspace.set(workspace);
        Ok(())
    }

    async fn write_file(&self, name: &str, data: Bytes) -> Result<(), EngineError> {
        let path = self.path_of(name)?;
        tokio::fs::write(&path, &data).await?;
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Bytes, EngineError> {
        let path = self.path_of(name)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(EngineError::MissingFile(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn unlink(&self, name: &str) -> Result<(), EngineError> {
        let path = self.path_of(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(EngineError::MissingFile(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn run(&self, args: &[String], events: &EventBus) -> Result<(), EngineError> {
        let workspace = self.workspace.get().ok_or(EngineError::NotLoaded)?;

        tracing::debug!("Running {} {:?}", self.program_name(), args);

        let mut child = Command::new(&self.program)
            .args(["-hide_banner", "-nostdin", "-nostats", "-y", "-progress", "pipe:1"])
            .args(args)
            .current_dir(workspace.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EngineError::Spawn {
                program: self.program_name(),
                message: e.to_string(),
            })?;

        let stderr = child.stderr.take().ok_or_else(|| EngineError::Spawn {
            program: self.program_name(),
            message: "Failed to capture stderr".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| EngineError::Spawn {
            program: self.program_name(),
            message: "Failed to capture stdout".to_string(),
        })?;

        // Input duration in f64 bits; 0.0 until ffmpeg reports it
        let duration = AtomicU64::new(0);
        let mut diagnostics: VecDeque<String> = VecDeque::with_capacity(DIAGNOSTIC_LINES);

        let read_log = async {
            let mut lines = BufReader::new(stderr).lines();
            while let Some(line) = lines.next_line().await? {
                if let Some(secs) = parse_duration_line(&line) {
                    duration.store(secs.to_bits(), Ordering::Relaxed);
                }
                if diagnostics.len() == DIAGNOSTIC_LINES {
                    diagnostics.pop_front();
                }
                diagnostics.push_back(line.clone());
                events.emit(&ExportEvent::Output {
                    level: LogLevel::Stderr,
                    message: line,
                });
            }
            Ok::<_, std::io::Error>(())
        };

        let read_progress = async {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                if line.trim() == "progress=end" {
                    events.emit(&ExportEvent::Progress { ratio: 1.0 });
                } else if let Some(position) = parse_progress_line(&line) {
                    let input = f64::from_bits(duration.load(Ordering::Relaxed));
                    let input = (input > 0.0).then_some(input);
                    if let Some(total) = output_length(args, input) {
                        let ratio = (position / total).clamp(0.0, 1.0);
                        events.emit(&ExportEvent::Progress { ratio });
                    }
                }
            }
            Ok::<_, std::io::Error>(())
        };

        let (log_result, progress_result) = tokio::join!(read_log, read_progress);
        log_result?;
        progress_result?;

        let status = child.wait().await?;
        if !status.success() {
            let diagnostics = Vec::from(diagnostics).join("\n");
            tracing::warn!("FFmpeg exited with {}: {}", status, diagnostics);
            return Err(EngineError::Failed {
                status: status.code(),
                diagnostics,
            });
        }

        Ok(())
    }
}
