// ============================================================================
// metarr-core/src/external/ffmpeg_executor.rs
// ============================================================================
//
// FFMPEG EXECUTOR: FFmpeg Process Management and Abstraction
//
// This module provides abstractions for spawning and interacting with FFmpeg
// processes. The command builder produces a plain argument vector; a spawner
// turns it into a running process whose log output is forwarded to stderr
// unchanged. Cancellation is checked on every ffmpeg event; a cancelled run
// kills the child and reaps it before returning.
//
// KEY COMPONENTS:
// - FfmpegProcess: Trait representing an active FFmpeg process
// - FfmpegSpawner: Trait for creating new FFmpeg processes
// - SidecarSpawner: Concrete implementation using ffmpeg-sidecar
// - run_ffmpeg: spawn, forward output, wait and map failures

use crate::cancel::CancellationToken;
use crate::error::{CoreError, CoreResult, command_start_error};
use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::FfmpegEvent;
use std::path::Path;
use std::process::ExitStatus;

// --- FFmpeg Execution Abstraction ---

/// Trait representing an active ffmpeg process instance.
pub trait FfmpegProcess {
    /// Processes events from the running command using a provided handler closure.
    fn handle_events<F>(&mut self, handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>;

    /// Waits for the command to complete and returns its exit status.
    fn wait(&mut self) -> CoreResult<ExitStatus>;

    /// Terminates the process.
    fn kill(&mut self) -> CoreResult<()>;
}

/// Trait representing something that can spawn an FfmpegProcess.
pub trait FfmpegSpawner: Send + Sync {
    type Process: FfmpegProcess;
    /// Spawns ffmpeg with `args` (everything after the binary name).
    fn spawn(&self, args: &[String]) -> CoreResult<Self::Process>;
}

// --- Concrete Implementation using ffmpeg-sidecar ---

/// Wrapper around `ffmpeg_sidecar::child::FfmpegChild` implementing `FfmpegProcess`.
pub struct SidecarProcess(FfmpegChild);

impl FfmpegProcess for SidecarProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>,
    {
        let iterator = self.0.iter().map_err(|e| CoreError::Ffmpeg {
            input: Default::default(),
            message: format!("could not read ffmpeg output: {e}"),
        })?;
        for event in iterator {
            handler(event)?;
        }
        Ok(())
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        self.0.wait().map_err(CoreError::Io)
    }

    fn kill(&mut self) -> CoreResult<()> {
        self.0.kill().map_err(CoreError::Io)
    }
}

/// Concrete implementation of `FfmpegSpawner` using `ffmpeg-sidecar`.
#[derive(Debug, Clone, Default)]
pub struct SidecarSpawner;

impl FfmpegSpawner for SidecarSpawner {
    type Process = SidecarProcess;

    fn spawn(&self, args: &[String]) -> CoreResult<Self::Process> {
        let mut cmd = FfmpegCommand::new();
        cmd.args(args);
        cmd.spawn()
            .map(SidecarProcess)
            .map_err(|e| command_start_error("ffmpeg", e))
    }
}

/// Runs ffmpeg to completion. Log lines go to stderr as ffmpeg wrote them;
/// a non-zero exit becomes `CoreError::Ffmpeg` carrying the last error line.
pub fn run_ffmpeg<S: FfmpegSpawner>(
    spawner: &S,
    input: &Path,
    args: &[String],
    cancel: &CancellationToken,
) -> CoreResult<()> {
    log::debug!("Running ffmpeg {}", args.join(" "));
    let mut process = spawner.spawn(args)?;

    let mut last_error = String::new();
    let handled = process.handle_events(|event| {
        cancel.check()?;
        match event {
            FfmpegEvent::Log(_, line) => eprintln!("{line}"),
            FfmpegEvent::Error(message) => {
                eprintln!("{message}");
                last_error = message;
            }
            _ => {}
        }
        Ok(())
    });
    if let Err(err) = handled {
        if matches!(err, CoreError::Cancelled) {
            log::warn!("Stopping ffmpeg for {}", input.display());
            if let Err(e) = process.kill() {
                log::warn!("Could not kill ffmpeg for {}: {}", input.display(), e);
            }
            let _ = process.wait();
        }
        return Err(err);
    }

    let status = process.wait()?;
    if status.success() {
        return Ok(());
    }
    let message = if last_error.is_empty() {
        format!("exited with {status}")
    } else {
        format!("exited with {status}: {last_error}")
    };
    Err(CoreError::Ffmpeg {
        input: input.to_path_buf(),
        message,
    })
}
