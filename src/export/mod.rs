//! Video export module
//!
//! This module cuts time ranges out of a recording and joins them into a
//! new video, driving an ffmpeg-compatible engine with stream copy.

pub mod engine;
pub mod events;
pub mod ffmpeg;
pub mod pipeline;
pub mod types;

#[cfg(test)]
mod fake;

pub use engine::{validate_name, EngineError, TranscodeEngine};
pub use events::{EventBus, Subscription};
pub use ffmpeg::{concat_args, concat_manifest, cut_args, format_timecode, FfmpegEngine};
pub use pipeline::ExportPipeline;
pub use types::{EngineState, ExportError, ExportEvent, LogLevel};
