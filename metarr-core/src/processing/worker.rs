// ============================================================================
// metarr-core/src/processing/worker.rs
// ============================================================================
//
// WORKER: The per-file pipeline
//
// WORKFLOW:
// 1. Open the sidecar (takes its path lock)
// 2. Fill FileData from it and write derived values back
// 3. Apply primary edits, commit, then the date-tag sub-phase
// 4. If edits changed the sidecar, re-read FileData from it
// 5. Release the sidecar, plan output paths
// 6. Probe / build / run ffmpeg (skipped for metadata-only items)
// 7. Rename the sidecar if filename ops changed the base, apply purge
//
// KEY COMPONENTS:
// - Collaborators: every external seam used by a worker
// - FileProcessor: runs the workflow for one WorkItem
// - FileReport: what happened to the file

// ---- Internal crate imports ----
use crate::cancel::CancellationToken;
use crate::config::{CoreConfig, PurgeMode};
use crate::edit::{self, EditContext, OverwritePolicy, OverwritePrompter};
use crate::error::CoreResult;
use crate::external::{EncoderCatalog, FfmpegSpawner, FfprobeExecutor};
use crate::filename::plan_output_paths;
use crate::fill::{FillContext, fill_metadata};
use crate::fsutil::{move_or_copy_file, rename_to_backup};
use crate::model::{FileData, SidecarKind};
use crate::processing::executor::{ExecuteOutcome, VideoExecutor};
use crate::processing::pairing::WorkItem;
use crate::processing::resource_gate::SystemProbe;
use crate::scraper::Scraper;
use crate::sidecar::Sidecar;

// ---- External crate imports ----
use log::{debug, info, warn};

// ---- Standard library imports ----
use std::fs;
use std::path::{Path, PathBuf};

/// External seams shared by all workers of a run.
pub struct Collaborators<'a, S: FfmpegSpawner> {
    pub spawner: &'a S,
    pub prober: &'a dyn FfprobeExecutor,
    pub catalog: &'a dyn EncoderCatalog,
    pub system: &'a dyn SystemProbe,
    pub scraper: &'a dyn Scraper,
    pub prompter: &'a dyn OverwritePrompter,
}

impl<S: FfmpegSpawner> Clone for Collaborators<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: FfmpegSpawner> Copy for Collaborators<'_, S> {}

/// Summary of one successfully processed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub batch_id: u64,
    pub sidecar: PathBuf,
    pub outcome: ExecuteOutcome,
    pub sidecar_changed: bool,
}

pub struct FileProcessor<'a, S: FfmpegSpawner> {
    config: &'a CoreConfig,
    tools: Collaborators<'a, S>,
    policy: &'a OverwritePolicy,
}

impl<'a, S: FfmpegSpawner> FileProcessor<'a, S> {
    pub fn new(config: &'a CoreConfig, tools: Collaborators<'a, S>, policy: &'a OverwritePolicy) -> Self {
        Self {
            config,
            tools,
            policy,
        }
    }

    pub fn process(&self, item: &WorkItem, cancel: &CancellationToken) -> CoreResult<FileReport> {
        cancel.check()?;
        let config = self.config;
        let new_file = || {
            FileData::new(
                item.batch_id,
                item.video.clone(),
                item.sidecar.clone(),
                config.meta_ops.clone(),
                config.filename_ops.clone(),
            )
        };
        let mut file = new_file()?;
        debug!("Processing {}", item.sidecar.display());

        // ---- Metadata phase (sidecar lock held) ----
        let sidecar_changed = {
            let mut sidecar =
                Sidecar::open(&file.paths.sidecar_path, file.paths.sidecar_kind, config.no_file_overwrite)?;
            let mut fill_ctx = FillContext::new(self.tools.scraper, &config.overrides);
            fill_ctx.desc_date_prefix = config.desc_date_prefix;
            fill_ctx.desc_date_suffix = config.desc_date_suffix;

            fill_metadata(&mut file, &mut sidecar, &fill_ctx)?;
            let mut changed = edit::commit(&mut sidecar, cancel)?;

            let ops = file.meta_ops.clone();
            let mut edited = false;
            if !ops.primary_is_empty() {
                let edit_ctx = EditContext {
                    policy: self.policy,
                    prompter: self.tools.prompter,
                    cancel,
                };
                edit::apply_meta_edits(&mut sidecar, &file, &ops, &edit_ctx)?;
                edited |= edit::commit(&mut sidecar, cancel)?;
            }
            edited |= edit::apply_date_tags(&mut sidecar, &file, &ops, cancel)?;

            if edited {
                file = new_file()?;
                fill_ctx.scrape = false;
                fill_metadata(&mut file, &mut sidecar, &fill_ctx)?;
                edit::commit(&mut sidecar, cancel)?;
            }
            changed |= edited;
            changed
        };

        // ---- Video phase ----
        let out_ext = config.output_ext_dotted().unwrap_or_default();
        plan_output_paths(&mut file, config.output_dir.as_deref(), &out_ext);

        let outcome = if config.skip_videos || file.is_metadata_only() {
            ExecuteOutcome::MetadataOnly
        } else {
            VideoExecutor::new(self.tools.spawner, self.tools.prober, self.tools.catalog, config)
                .execute(&mut file, cancel)?
        };

        // ---- Sidecar housekeeping ----
        let sidecar_path = self.rename_sidecar(&file)?;
        self.purge(&sidecar_path, file.paths.sidecar_kind)?;

        Ok(FileReport {
            batch_id: item.batch_id,
            sidecar: sidecar_path,
            outcome,
            sidecar_changed,
        })
    }

    /// Moves the sidecar to its renamed path, returning where it now lives.
    fn rename_sidecar(&self, file: &FileData) -> CoreResult<PathBuf> {
        let current = file.paths.sidecar_path.clone();
        let Some(renamed) = file.paths.renamed_sidecar.clone() else {
            return Ok(current);
        };
        if renamed == current {
            return Ok(current);
        }
        if renamed.exists() {
            if self.config.no_file_overwrite {
                rename_to_backup(&renamed)?;
            } else {
                warn!("Overwriting existing sidecar {}", renamed.display());
            }
        }
        move_or_copy_file(&current, &renamed)?;
        info!("Renamed {} to {}", current.display(), renamed.display());
        Ok(renamed)
    }

    fn purge(&self, sidecar: &Path, kind: SidecarKind) -> CoreResult<()> {
        let remove = match self.config.meta_purge {
            PurgeMode::None => false,
            PurgeMode::All => true,
            PurgeMode::Json => kind == SidecarKind::Json,
            PurgeMode::Nfo => kind == SidecarKind::Nfo,
        };
        if remove && sidecar.exists() {
            fs::remove_file(sidecar)?;
            info!("Purged {}", sidecar.display());
        }
        Ok(())
    }
}
