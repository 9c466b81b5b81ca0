// metarr-core/src/external/mocks.rs

// --- Mocking Infrastructure (for testing) ---
//
// Thread-safe doubles for every external tool so the batch orchestrator can
// be exercised end to end without ffmpeg or ffprobe installed.

// Only compiled for unit tests or when the "test-mocks" feature is enabled.
#![cfg(any(test, feature = "test-mocks"))]

use super::*;
use crate::error::{CoreError, CoreResult};
use ffmpeg_sidecar::event::FfmpegEvent;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Mock implementation of FfmpegProcess.
#[derive(Clone)]
pub struct MockFfmpegProcess {
    /// Events to emit when handle_events is called.
    pub events_to_emit: Vec<FfmpegEvent>,
    /// Exit status to return when wait is called.
    pub exit_status: ExitStatus,
    /// Shared with the spawner so tests can see kills.
    pub kills: Arc<AtomicUsize>,
}

impl FfmpegProcess for MockFfmpegProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>,
    {
        for event in self.events_to_emit.clone() {
            handler(event)?;
        }
        Ok(())
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        Ok(self.exit_status)
    }

    fn kill(&mut self) -> CoreResult<()> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Represents an expected ffmpeg command call and its mock result.
pub struct MockFfmpegExpectation {
    pub arg_pattern: String,
    pub result: CoreResult<MockFfmpegProcess>,
    pub create_dummy_output: bool,
}

/// Mock implementation of FfmpegSpawner supporting multiple expectations.
///
/// Calls with no matching expectation succeed and write the output file
/// when `default_success` is set, and panic otherwise.
#[derive(Clone, Default)]
pub struct MockFfmpegSpawner {
    expectations: Arc<Mutex<Vec<MockFfmpegExpectation>>>,
    received_calls: Arc<Mutex<Vec<Vec<String>>>>,
    kills: Arc<AtomicUsize>,
    default_success: bool,
}

impl MockFfmpegSpawner {
    pub fn new() -> Self {
        Default::default()
    }

    /// A spawner that succeeds for every call and creates the output file.
    pub fn succeeding() -> Self {
        Self {
            default_success: true,
            ..Self::default()
        }
    }

    pub fn add_expectation(
        &self,
        arg_pattern: &str,
        result: CoreResult<MockFfmpegProcess>,
        create_dummy_output: bool,
    ) {
        self.expectations.lock().push(MockFfmpegExpectation {
            arg_pattern: arg_pattern.to_string(),
            result,
            create_dummy_output,
        });
    }

    pub fn add_success_expectation(
        &self,
        arg_pattern: &str,
        events: Vec<FfmpegEvent>,
        create_dummy_output: bool,
    ) {
        let process = MockFfmpegProcess {
            events_to_emit: events,
            exit_status: ExitStatus::from_raw(0),
            kills: Arc::clone(&self.kills),
        };
        self.add_expectation(arg_pattern, Ok(process), create_dummy_output);
    }

    pub fn add_spawn_error_expectation(&self, arg_pattern: &str, error: CoreError) {
        self.add_expectation(arg_pattern, Err(error), false);
    }

    pub fn add_exit_error_expectation(
        &self,
        arg_pattern: &str,
        events: Vec<FfmpegEvent>,
        exit_code: i32,
    ) {
        let process = MockFfmpegProcess {
            events_to_emit: events,
            exit_status: ExitStatus::from_raw(exit_code << 8),
            kills: Arc::clone(&self.kills),
        };
        self.add_expectation(arg_pattern, Ok(process), false);
    }

    pub fn get_received_calls(&self) -> Vec<Vec<String>> {
        self.received_calls.lock().clone()
    }

    /// Number of processes killed after cancellation.
    pub fn killed(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }
}

fn create_dummy_output(args: &[String]) {
    let Some(output_path) = args.last().map(PathBuf::from) else {
        log::warn!("MockFfmpegSpawner couldn't find output path in args to create dummy file.");
        return;
    };
    if let Some(parent) = output_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match std::fs::write(&output_path, b"mock video") {
        Ok(()) => log::debug!("MockFfmpegSpawner created dummy output file: {:?}", output_path),
        Err(e) => log::error!(
            "MockFfmpegSpawner failed to create dummy output file {:?}: {}",
            output_path,
            e
        ),
    }
}

impl FfmpegSpawner for MockFfmpegSpawner {
    type Process = MockFfmpegProcess;

    fn spawn(&self, args: &[String]) -> CoreResult<Self::Process> {
        self.received_calls.lock().push(args.to_vec());

        let expectation = {
            let mut expectations = self.expectations.lock();
            expectations
                .iter()
                .position(|exp| args.iter().any(|arg| arg.contains(&exp.arg_pattern)))
                .map(|index| expectations.remove(index))
        };

        match expectation {
            Some(expectation) => match expectation.result {
                Ok(process) => {
                    if expectation.create_dummy_output {
                        create_dummy_output(args);
                    }
                    Ok(process)
                }
                Err(err) => Err(err),
            },
            None if self.default_success => {
                create_dummy_output(args);
                Ok(MockFfmpegProcess {
                    events_to_emit: Vec::new(),
                    exit_status: ExitStatus::from_raw(0),
                    kills: Arc::clone(&self.kills),
                })
            }
            None => panic!("MockFfmpegSpawner: No expectation found for command args: {args:?}"),
        }
    }
}

/// Mock implementation of FfprobeExecutor keyed by input path.
#[derive(Clone, Default)]
pub struct MockFfprobeExecutor {
    results: Arc<Mutex<HashMap<PathBuf, ProbeOutput>>>,
    calls: Arc<Mutex<Vec<PathBuf>>>,
}

impl MockFfprobeExecutor {
    pub fn new() -> Self {
        Default::default()
    }

    /// Probe result for `input_path`. Unknown paths fail like a broken probe.
    pub fn expect_probe(&self, input_path: &Path, output: ProbeOutput) {
        self.results
            .lock()
            .insert(input_path.to_path_buf(), output);
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().clone()
    }
}

impl FfprobeExecutor for MockFfprobeExecutor {
    fn probe(&self, input_path: &Path, _timeout: Option<Duration>) -> CoreResult<ProbeOutput> {
        self.calls.lock().push(input_path.to_path_buf());
        self.results.lock().get(input_path).cloned().ok_or_else(|| {
            CoreError::Ffprobe(format!(
                "MockFfprobeExecutor: No expectation set for path {}",
                input_path.display()
            ))
        })
    }
}

/// Encoder catalog with a fixed list of encoder names.
#[derive(Debug, Clone, Default)]
pub struct StaticEncoderCatalog {
    encoders: Vec<String>,
}

impl StaticEncoderCatalog {
    pub fn new<I, S>(encoders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            encoders: encoders.into_iter().map(Into::into).collect(),
        }
    }
}

impl EncoderCatalog for StaticEncoderCatalog {
    fn has_encoder(&self, name: &str) -> bool {
        self.encoders.iter().any(|e| e == name)
    }
}

/// System probe returning fixed readings.
#[derive(Debug)]
pub struct FixedSystemProbe {
    pub free_mem: u64,
    pub cpu_percent: f64,
    polls: Mutex<u32>,
}

impl FixedSystemProbe {
    pub fn new(free_mem: u64, cpu_percent: f64) -> Self {
        Self {
            free_mem,
            cpu_percent,
            polls: Mutex::new(0),
        }
    }

    pub fn polls(&self) -> u32 {
        *self.polls.lock()
    }
}

impl crate::processing::resource_gate::SystemProbe for FixedSystemProbe {
    fn free_memory(&self) -> u64 {
        *self.polls.lock() += 1;
        self.free_mem
    }

    fn cpu_percent(&self) -> f64 {
        self.cpu_percent
    }
}
