//! In-memory engine for pipeline tests
//!
//! Understands the two invocations the pipeline issues. A cut writes
//! `[<ss>-<to>]` to its output (`end` when there is no `-to`); a concat
//! writes the listed files' contents back to back.

use super::engine::{validate_name, EngineError, TranscodeEngine};
use super::events::EventBus;
use super::types::{ExportEvent, LogLevel};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct FakeEngine {
    files: Mutex<HashMap<String, Bytes>>,
    created: Mutex<Vec<String>>,
    runs: Mutex<Vec<Vec<String>>>,
    fail_load: bool,
    fail_on_run: Option<usize>,
    fail_unlinks: bool,
    run_delay: Option<Duration>,
    loads: AtomicUsize,
    unlinks: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    /// Fail the `index`-th run (0-based) after writing a partial output
    pub fn fail_on_run(mut self, index: usize) -> Self {
        self.fail_on_run = Some(index);
        self
    }

    pub fn fail_unlinks(mut self) -> Self {
        self.fail_unlinks = true;
        self
    }

    pub fn with_run_delay(mut self, delay: Duration) -> Self {
        self.run_delay = Some(delay);
        self
    }

    /// Names currently present
    pub fn files(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Every name ever written, in order
    pub fn created(&self) -> Vec<String> {
        self.created.lock().clone()
    }

    pub fn runs(&self) -> Vec<Vec<String>> {
        self.runs.lock().clone()
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn unlink_attempts(&self) -> usize {
        self.unlinks.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_runs(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn put(&self, name: &str, data: Bytes) {
        self.files.lock().insert(name.to_string(), data);
        self.created.lock().push(name.to_string());
    }

    fn get(&self, name: &str) -> Result<Bytes, EngineError> {
        self.files
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::MissingFile(name.to_string()))
    }

    /// Output of one invocation as (output name, contents)
    fn execute(&self, args: &[String]) -> Result<(String, Bytes), EngineError> {
        let value_after = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .and_then(|i| args.get(i + 1))
                .cloned()
        };
        let output = args
            .last()
            .cloned()
            .ok_or_else(|| EngineError::InvalidName(String::new()))?;
        let input = value_after("-i").ok_or_else(|| EngineError::InvalidName(output.clone()))?;

        if value_after("-f").as_deref() == Some("concat") {
            let manifest = self.get(&input)?;
            let mut joined = Vec::new();
            for line in String::from_utf8_lossy(&manifest).lines() {
                if let Some(name) = line
                    .strip_prefix("file '")
                    .and_then(|rest| rest.strip_suffix('\''))
                {
                    joined.extend_from_slice(&self.get(name)?);
                }
            }
            return Ok((output, Bytes::from(joined)));
        }

        self.get(&input)?;
        let ss = value_after("-ss").unwrap_or_else(|| "0".to_string());
        let to = value_after("-to").unwrap_or_else(|| "end".to_string());
        Ok((output, Bytes::from(format!("[{}-{}]", ss, to))))
    }
}

#[async_trait]
impl TranscodeEngine for FakeEngine {
    async fn load(&self, _events: &EventBus) -> Result<(), EngineError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_load {
            return Err(EngineError::Spawn {
                program: "fake".to_string(),
                message: "simulated load failure".to_string(),
            });
        }
        Ok(())
    }

    async fn write_file(&self, name: &str, data: Bytes) -> Result<(), EngineError> {
        validate_name(name)?;
        self.put(name, data);
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Bytes, EngineError> {
        self.get(name)
    }

    async fn unlink(&self, name: &str) -> Result<(), EngineError> {
        self.unlinks.fetch_add(1, Ordering::SeqCst);
        if self.fail_unlinks {
            return Err(EngineError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "simulated unlink failure",
            )));
        }
        self.files
            .lock()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EngineError::MissingFile(name.to_string()))
    }

    async fn run(&self, args: &[String], events: &EventBus) -> Result<(), EngineError> {
        let index = {
            let mut runs = self.runs.lock();
            runs.push(args.to_vec());
            runs.len() - 1
        };
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        events.emit(&ExportEvent::Output {
            level: LogLevel::Stderr,
            message: format!("fake {}", args.join(" ")),
        });
        if let Some(delay) = self.run_delay {
            tokio::time::sleep(delay).await;
        }

        let result = self.execute(args).and_then(|(output, data)| {
            if self.fail_on_run == Some(index) {
                self.put(&output, Bytes::from_static(b"partial"));
                Err(EngineError::Failed {
                    status: Some(1),
                    diagnostics: "simulated failure".to_string(),
                })
            } else {
                self.put(&output, data);
                events.emit(&ExportEvent::Progress { ratio: 1.0 });
                Ok(())
            }
        });

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
