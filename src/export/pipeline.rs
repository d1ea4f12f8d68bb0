//! Slice-and-concatenate export
//!
//! [`ExportPipeline`] owns one transcoding engine. Exporting a set of ranges
//! cuts each range out of the source with stream copy, then joins the cuts
//! with the concat demuxer. The caller's range order is the output order.
//!
//! The engine is not built for concurrent invocations, so slice jobs on the
//! same pipeline run one at a time, in arrival order. Separate pipelines do
//! not share anything and can run in parallel.

use super::engine::{EngineError, TranscodeEngine};
use super::events::{EventBus, Subscription};
use super::ffmpeg::{concat_args, concat_manifest, cut_args, selects_anything, FfmpegEngine};
use super::types::{EngineState, ExportError, ExportEvent};
use crate::config::WeftConfig;
use crate::ranges::Range;
use crate::recording::{create_memory_resolver, Blob, Recording};
use bytes::Bytes;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use uuid::Uuid;

/// Export pipeline around a single engine instance
#[derive(Clone)]
pub struct ExportPipeline {
    engine: Arc<dyn TranscodeEngine>,
    events: EventBus,
    state: Arc<RwLock<EngineState>>,
    loaded: Arc<OnceCell<Result<(), String>>>,
    queue: Arc<Mutex<()>>,
    extension: String,
}

impl ExportPipeline {
    /// Create a pipeline; the engine is loaded on first use
    pub fn new(engine: Arc<dyn TranscodeEngine>) -> Self {
        Self {
            engine,
            events: EventBus::new(),
            state: Arc::new(RwLock::new(EngineState::Unloaded)),
            loaded: Arc::new(OnceCell::new()),
            queue: Arc::new(Mutex::new(())),
            extension: "webm".to_string(),
        }
    }

    /// Create a pipeline over a native ffmpeg described by `config`
    pub fn from_config(config: &WeftConfig) -> Self {
        Self::new(Arc::new(FfmpegEngine::from_config(config)))
            .with_extension(config.container_extension.clone())
    }

    /// Container extension for intermediate and output files
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn state(&self) -> EngineState {
        *self.state.read()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Register an event listener
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ExportEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener)
    }

    /// Load the engine
    ///
    /// Runs the engine's initialization once; later calls return the
    /// outcome of that first attempt. A failed load is final for this
    /// pipeline.
    pub async fn load(&self) -> Result<(), ExportError> {
        let outcome = self
            .loaded
            .get_or_init(|| async {
                *self.state.write() = EngineState::Loading;
                tracing::info!("Loading transcoding engine");

                match self.engine.load(&self.events).await {
                    Ok(()) => {
                        *self.state.write() = EngineState::Ready;
                        self.events.emit(&ExportEvent::Loaded);
                        Ok(())
                    }
                    Err(e) => {
                        let message = e.to_string();
                        tracing::error!("Transcoding engine failed to load: {}", message);
                        *self.state.write() = EngineState::LoadFailed;
                        self.events.emit(&ExportEvent::LoadError {
                            message: message.clone(),
                        });
                        Err(message)
                    }
                }
            })
            .await;

        outcome.clone().map_err(ExportError::LoadFailed)
    }

    /// Cut `ranges` (seconds) out of `input` and join them in order
    ///
    /// Ranges that select nothing (starting at `+inf` or ending before
    /// zero) are skipped. Intermediate files are removed whether or not the
    /// export succeeds. The job runs on its own task: dropping the returned
    /// future does not stop it, so its cleanup always runs.
    pub async fn slice(&self, input: Blob, ranges: &[Range]) -> Result<Blob, ExportError> {
        let selected: Vec<Range> = ranges.iter().copied().filter(selects_anything).collect();
        if selected.len() < ranges.len() {
            tracing::debug!("Skipping {} empty range(s)", ranges.len() - selected.len());
        }
        if selected.is_empty() {
            return Err(ExportError::NoRanges);
        }

        self.load().await?;

        let job = SliceJob {
            engine: self.engine.clone(),
            events: self.events.clone(),
            state: self.state.clone(),
            queue: self.queue.clone(),
            extension: self.extension.clone(),
            input,
            ranges: selected,
        };

        tokio::spawn(job.run())
            .await
            .map_err(|e| ExportError::Task(e.to_string()))?
    }

    /// Export a trimmed copy of `recording`
    ///
    /// The result is a new in-memory recording named `<stem>-trimmed.<ext>`
    /// that shares the source's thumbnail.
    pub async fn export_recording(
        &self,
        recording: &Recording,
        ranges: &[Range],
    ) -> Result<Recording, ExportError> {
        let source = recording.blob().await?;
        let output = self.slice(source, ranges).await?;

        tracing::info!(
            "Exported {} range(s) of '{}' ({} bytes)",
            ranges.len(),
            recording.filename(),
            output.len()
        );

        Ok(Recording::new(
            create_memory_resolver(&output),
            recording.thumbnail_resolver().clone(),
        )
        .with_filename(trimmed_filename(recording.filename())))
    }
}

/// `movie.webm` -> `movie-trimmed.webm`
fn trimmed_filename(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}-trimmed.{}", stem, ext),
        _ => format!("{}-trimmed", filename),
    }
}

/// Files created in the engine during one job
///
/// Every name is tracked before the file is created, so a failure halfway
/// through a write or a run still gets its file removed. `release` unlinks
/// everything; if the tracker is dropped without being released (a panic),
/// the unlinks are handed to the runtime instead.
struct TempFiles {
    engine: Arc<dyn TranscodeEngine>,
    names: Vec<String>,
}

impl TempFiles {
    fn new(engine: Arc<dyn TranscodeEngine>) -> Self {
        Self {
            engine,
            names: Vec::new(),
        }
    }

    fn track(&mut self, name: &str) {
        self.names.push(name.to_string());
    }

    async fn write(&mut self, name: &str, data: Bytes) -> Result<(), EngineError> {
        self.track(name);
        self.engine.write_file(name, data).await
    }

    async fn release(mut self) {
        let names = std::mem::take(&mut self.names);
        unlink_all(self.engine.as_ref(), &names).await;
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        if self.names.is_empty() {
            return;
        }

        let names = std::mem::take(&mut self.names);
        let engine = self.engine.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { unlink_all(engine.as_ref(), &names).await });
            }
            Err(_) => tracing::warn!("Leaking {} engine file(s): no runtime", names.len()),
        }
    }
}

async fn unlink_all(engine: &dyn TranscodeEngine, names: &[String]) {
    for name in names {
        match engine.unlink(name).await {
            Ok(()) => {}
            Err(EngineError::MissingFile(_)) => {
                tracing::debug!("Engine file {} was never created", name);
            }
            Err(e) => tracing::warn!("Failed to remove engine file {}: {}", name, e),
        }
    }
}

/// One slice request, detached from the caller
struct SliceJob {
    engine: Arc<dyn TranscodeEngine>,
    events: EventBus,
    state: Arc<RwLock<EngineState>>,
    queue: Arc<Mutex<()>>,
    extension: String,
    input: Blob,
    ranges: Vec<Range>,
}

impl SliceJob {
    async fn run(self) -> Result<Blob, ExportError> {
        let _turn = self.queue.clone().lock_owned().await;
        *self.state.write() = EngineState::Slicing;

        let mut files = TempFiles::new(self.engine.clone());
        let result = self.execute(&mut files).await;
        files.release().await;

        *self.state.write() = EngineState::Ready;
        result
    }

    async fn execute(&self, files: &mut TempFiles) -> Result<Blob, ExportError> {
        let id = Uuid::new_v4().simple().to_string();
        let ext = &self.extension;

        let input_name = format!("input-{}.{}", id, ext);
        files
            .write(&input_name, self.input.data().clone())
            .await?;

        let mut slices = Vec::with_capacity(self.ranges.len());
        for (index, range) in self.ranges.iter().enumerate() {
            let slice_name = format!("slice-{}-{}.{}", index, id, ext);
            files.track(&slice_name);

            tracing::debug!(
                "Cutting slice {} [{}, {}] into {}",
                index,
                range.start(),
                range.end(),
                slice_name
            );
            self.engine
                .run(&cut_args(&input_name, range, &slice_name), &self.events)
                .await
                .map_err(ExportError::from_run)?;
            slices.push(slice_name);
        }

        let manifest_name = format!("concat-{}.txt", id);
        files
            .write(&manifest_name, Bytes::from(concat_manifest(&slices)))
            .await?;

        let output_name = format!("output-{}.{}", id, ext);
        files.track(&output_name);
        self.engine
            .run(&concat_args(&manifest_name, &output_name), &self.events)
            .await
            .map_err(ExportError::from_run)?;

        let data = self.engine.read_file(&output_name).await?;
        tracing::info!("Joined {} slice(s) into {} bytes", slices.len(), data.len());

        let output = Blob::new(data);
        Ok(match self.input.mime_type() {
            Some(mime) => output.with_mime_type(mime),
            None => output,
        })
    }
}
