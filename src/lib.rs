//! weft - trim recordings down to the parts worth keeping.
//!
//! This is the core library of a capture tool. It provides:
//!
//! - [`ranges`]: algebra over closed time ranges (merge, query, transform)
//! - [`recording`]: recordings whose bytes are resolved lazily, from memory
//!   or from a store
//! - [`export`]: a slice-and-concatenate export pipeline driving ffmpeg
//! - [`playback`]: a controller keeping playback inside permitted ranges

pub mod config;
pub mod export;
pub mod playback;
pub mod ranges;
pub mod recording;
pub mod utils;

pub use config::WeftConfig;
pub use export::{EngineState, ExportError, ExportEvent, ExportPipeline, FfmpegEngine};
pub use playback::{EndPolicy, PlaybackController, PlaybackDecision};
pub use ranges::{Closest, Range, RangeError};
pub use recording::{Blob, BlobResolver, Recording, RecordingLibrary};
pub use utils::{AppError, AppResult};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global `tracing` subscriber
///
/// `RUST_LOG` takes precedence; otherwise `default_filter` is used. Meant
/// for binaries: the library itself never installs a subscriber.
pub fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| "weft=info".into());

    // A subscriber may already be installed (tests, embedding apps)
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
