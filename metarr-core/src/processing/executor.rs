// ============================================================================
// metarr-core/src/processing/executor.rs
// ============================================================================
//
// VIDEO EXECUTOR: Run ffmpeg and swap the result into place
//
// For one filled FileData this module probes the input, decides whether
// ffmpeg is needed at all, runs it into the temp path and then moves the
// temp file to the final path. The original video is never touched until
// ffmpeg has succeeded.
//
// KEY COMPONENTS:
// - VideoExecutor: probe, build, run and finalise one video
// - ExecuteOutcome: what happened to the file
// - TempOutputGuard: removes the temp output unless the run completed

// ---- Internal crate imports ----
use crate::cancel::CancellationToken;
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::external::{EncoderCatalog, FfmpegSpawner, FfprobeExecutor, run_ffmpeg};
use crate::fsutil::{move_or_copy_file, rename_to_backup};
use crate::model::FileData;
use crate::processing::probe::{can_skip_ffmpeg, probe_input};
use crate::transcode::CommandBuilder;

// ---- External crate imports ----
use log::{debug, info, warn};

// ---- Standard library imports ----
use std::fs;
use std::path::{Path, PathBuf};

/// Result of executing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// No video to process
    MetadataOnly,
    /// Tags already present; the video was at most renamed
    AlreadyTagged { final_path: PathBuf },
    Encoded { final_path: PathBuf },
}

/// Removes the temp output when dropped unless `keep` was called.
pub struct TempOutputGuard {
    path: PathBuf,
    armed: bool,
}

impl TempOutputGuard {
    pub fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for TempOutputGuard {
    fn drop(&mut self) {
        if self.armed && self.path.exists() {
            match fs::remove_file(&self.path) {
                Ok(()) => debug!("Removed temp output {}", self.path.display()),
                Err(e) => warn!("Could not remove temp output {}: {}", self.path.display(), e),
            }
        }
    }
}

/// Runs ffmpeg for one video and moves the output into place.
pub struct VideoExecutor<'a, S: FfmpegSpawner> {
    spawner: &'a S,
    prober: &'a dyn FfprobeExecutor,
    catalog: &'a dyn EncoderCatalog,
    config: &'a CoreConfig,
}

impl<'a, S: FfmpegSpawner> VideoExecutor<'a, S> {
    pub fn new(
        spawner: &'a S,
        prober: &'a dyn FfprobeExecutor,
        catalog: &'a dyn EncoderCatalog,
        config: &'a CoreConfig,
    ) -> Self {
        Self {
            spawner,
            prober,
            catalog,
            config,
        }
    }

    /// Processes `file`, whose output paths must already be planned.
    pub fn execute(&self, file: &mut FileData, cancel: &CancellationToken) -> CoreResult<ExecuteOutcome> {
        let Some(input) = file.paths.original_video.clone() else {
            return Ok(ExecuteOutcome::MetadataOnly);
        };
        let final_path = file.paths.final_output.clone().ok_or_else(|| {
            CoreError::Path(format!("no final path planned for {}", input.display()))
        })?;
        let temp_path = file.paths.temp_output.clone().ok_or_else(|| {
            CoreError::Path(format!("no temp path planned for {}", input.display()))
        })?;

        cancel.check()?;
        let probe = probe_input(self.prober, file, self.config.ffprobe_timeout);
        if can_skip_ffmpeg(file, probe.as_ref(), self.config) {
            info!("Metadata already present in {}", input.display());
            if final_path != input {
                cancel.check()?;
                self.make_room(&input, &final_path)?;
                move_or_copy_file(&input, &final_path)?;
                info!("Renamed {} to {}", input.display(), final_path.display());
            }
            return Ok(ExecuteOutcome::AlreadyTagged { final_path });
        }

        let args = CommandBuilder::new(self.config, self.catalog).build(file, probe.as_ref())?;
        debug!("ffmpeg {}", args.join(" "));

        cancel.check()?;
        let guard = TempOutputGuard::new(temp_path);
        run_ffmpeg(self.spawner, &input, &args, cancel)?;
        if !guard.path().exists() {
            return Err(CoreError::Ffmpeg {
                input,
                message: format!("ffmpeg produced no output at {}", guard.path().display()),
            });
        }
        cancel.check()?;

        self.make_room(&input, &final_path)?;
        move_or_copy_file(guard.path(), &final_path)?;
        guard.keep();

        if extension_of(&input) != extension_of(&final_path) && input.exists() {
            fs::remove_file(&input)?;
            debug!("Removed original {}", input.display());
        }

        info!("Wrote {}", final_path.display());
        Ok(ExecuteOutcome::Encoded { final_path })
    }

    /// With `no_file_overwrite`, anything already at the final path
    /// (including the original itself) is moved aside to a backup first.
    fn make_room(&self, input: &Path, final_path: &Path) -> CoreResult<()> {
        if !self.config.no_file_overwrite || !final_path.exists() {
            return Ok(());
        }
        let backup = rename_to_backup(final_path)?;
        if final_path == input {
            info!("Backed up original to {}", backup.display());
        } else {
            info!("Moved existing {} to {}", final_path.display(), backup.display());
        }
        Ok(())
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}
