// ============================================================================
// metarr-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: Interactions with ffmpeg and ffprobe
//
// This module encapsulates every call out to an external binary behind a
// trait so the orchestrator can be driven by test doubles.
//
// KEY COMPONENTS:
// - FfmpegSpawner / FfmpegProcess: running the final ffmpeg command
// - FfprobeExecutor: container tags and stream layout
// - EncoderCatalog: cached `ffmpeg -encoders` listing
// - check_dependency: startup check for the binaries

// ---- Internal crate imports ----
use crate::error::{CoreError, CoreResult};

// ---- Standard library imports ----
use std::io;
use std::process::{Command, Stdio};

// ============================================================================
// SUBMODULES
// ============================================================================

pub mod encoders;
pub mod ffmpeg_executor;
pub mod ffprobe_executor;

#[cfg(unix)]
pub mod mocks;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use encoders::{EncoderCatalog, SystemEncoderCatalog};
pub use ffmpeg_executor::{FfmpegProcess, FfmpegSpawner, SidecarProcess, SidecarSpawner, run_ffmpeg};
pub use ffprobe_executor::{
    CommandFfprobeExecutor, FfprobeExecutor, ProbeDisposition, ProbeFormat, ProbeOutput,
    ProbeStream,
};

// ============================================================================
// DEPENDENCY CHECKING
// ============================================================================

/// Checks that `cmd_name` can be started with `-version`.
pub fn check_dependency(cmd_name: &str) -> CoreResult<()> {
    let result = Command::new(cmd_name)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match result {
        Ok(_) => {
            log::debug!("Found dependency: {}", cmd_name);
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Dependency '{}' not found.", cmd_name);
            Err(CoreError::DependencyNotFound(cmd_name.to_string()))
        }
        Err(e) => {
            log::error!("Failed to start dependency check command '{}': {}", cmd_name, e);
            Err(CoreError::CommandStart(cmd_name.to_string(), e))
        }
    }
}
