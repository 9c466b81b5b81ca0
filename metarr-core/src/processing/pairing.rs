// ============================================================================
// metarr-core/src/processing/pairing.rs
// ============================================================================
//
// PAIRING: Classify input paths and match videos with sidecars
//
// Inputs arrive as four lists (video dirs, video files, sidecar dirs,
// sidecar files). Entries in the wrong list are moved to the right one,
// lists are zipped index by index into batches, and each batch is later
// expanded into work items by matching normalised file names.
//
// KEY COMPONENTS:
// - classify_inputs: colon check, existence check, dir/file promotion
// - plan_batches: index pairing with batch ids from one atomic counter
// - match_batch: expands a batch into (video, sidecar) work items
// - names_match: normalised base comparison with compound suffixes

// ---- Internal crate imports ----
use crate::config::CoreConfig;
use crate::config::validation::check_path_has_no_colon;
use crate::discovery::{FileFilter, find_sidecars, find_videos};
use crate::error::{CoreError, CoreResult};
use crate::fsutil::is_backup_file;

// ---- External crate imports ----
use log::{debug, warn};

// ---- Standard library imports ----
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Two-part sidecar suffixes stripped before comparing names.
pub const COMPOUND_SUFFIXES: &[&str] = &[
    ".info.json",
    ".metadata.json",
    ".model.json",
    ".manifest.cdm.json",
    ".movie.nfo",
    ".tvshow.nfo",
    ".episode.nfo",
    ".disc.nfo",
    ".release.nfo",
    ".bdinfo.nfo",
    ".mediainfo.nfo",
];

/// The four input lists after classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedInputs {
    pub video_dirs: Vec<PathBuf>,
    pub video_files: Vec<PathBuf>,
    pub sidecar_dirs: Vec<PathBuf>,
    pub sidecar_files: Vec<PathBuf>,
}

/// What a batch covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchInput {
    /// `video_dir` is `None` for metadata-only batches
    Directory {
        video_dir: Option<PathBuf>,
        sidecar_dir: PathBuf,
    },
    /// A `None` sidecar is looked up next to the video
    File {
        video: Option<PathBuf>,
        sidecar: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub id: u64,
    pub input: BatchInput,
}

/// One video (or none, for metadata-only) and its sidecar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub batch_id: u64,
    pub video: Option<PathBuf>,
    pub sidecar: PathBuf,
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

/// Validates every input path and moves directories given as files (and
/// files given as directories) to the list they belong in.
pub fn classify_inputs(config: &CoreConfig) -> CoreResult<ClassifiedInputs> {
    let mut out = ClassifiedInputs::default();

    for (paths, listed_as_dir, is_video) in [
        (&config.video_dirs, true, true),
        (&config.video_files, false, true),
        (&config.sidecar_dirs, true, false),
        (&config.sidecar_files, false, false),
    ] {
        for path in paths {
            check_path_has_no_colon(path)?;
            if !path.exists() {
                return Err(CoreError::Config(format!(
                    "input path '{}' does not exist",
                    path.display()
                )));
            }
            let is_dir = path.is_dir();
            if is_dir != listed_as_dir {
                warn!(
                    "'{}' is a {}, treating it as one",
                    path.display(),
                    if is_dir { "directory" } else { "file" }
                );
            }
            let target = match (is_video, is_dir) {
                (true, true) => &mut out.video_dirs,
                (true, false) => &mut out.video_files,
                (false, true) => &mut out.sidecar_dirs,
                (false, false) => &mut out.sidecar_files,
            };
            target.push(path.clone());
        }
    }
    Ok(out)
}

// ============================================================================
// BATCH PLANNING
// ============================================================================

/// Zips the lists index by index. Leftover sidecar entries become
/// metadata-only batches; a lone video dir searches itself and a lone video
/// file searches its own directory. With `skip_videos` every batch is
/// metadata-only.
pub fn plan_batches(inputs: &ClassifiedInputs, skip_videos: bool, ids: &AtomicU64) -> Vec<Batch> {
    let mut batches = Vec::new();
    let next_id = || ids.fetch_add(1, Ordering::SeqCst) + 1;

    let dir_count = inputs.video_dirs.len().max(inputs.sidecar_dirs.len());
    for i in 0..dir_count {
        let video_dir = inputs.video_dirs.get(i).cloned();
        let sidecar_dir = inputs.sidecar_dirs.get(i).cloned();
        let input = match (video_dir, sidecar_dir) {
            (video_dir, Some(sidecar_dir)) => BatchInput::Directory {
                video_dir: if skip_videos { None } else { video_dir },
                sidecar_dir,
            },
            (Some(video_dir), None) => BatchInput::Directory {
                video_dir: (!skip_videos).then(|| video_dir.clone()),
                sidecar_dir: video_dir,
            },
            (None, None) => continue,
        };
        batches.push(Batch { id: next_id(), input });
    }

    let file_count = inputs.video_files.len().max(inputs.sidecar_files.len());
    for i in 0..file_count {
        let video = inputs.video_files.get(i).cloned();
        let sidecar = inputs.sidecar_files.get(i).cloned();
        if skip_videos && sidecar.is_none() {
            warn!(
                "Skipping '{}': videos are skipped and no sidecar was given",
                video.as_deref().unwrap_or(Path::new("")).display()
            );
            continue;
        }
        let video = if skip_videos { None } else { video };
        batches.push(Batch {
            id: next_id(),
            input: BatchInput::File { video, sidecar },
        });
    }

    batches
}

// ============================================================================
// MATCHING
// ============================================================================

/// Lowercases, drops everything but letters, digits and whitespace, and
/// collapses whitespace runs.
pub fn normalise_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Base of a sidecar name for comparison with `video_base`. A compound
/// suffix is stripped whole unless the video base itself ends with the
/// suffix's middle segment (e.g. `clip.info` for `.info.json`).
pub fn sidecar_match_base(sidecar_name: &str, video_base: &str) -> String {
    let lower = sidecar_name.to_ascii_lowercase();
    let video_lower = video_base.to_ascii_lowercase();
    if let Some(suffix) = COMPOUND_SUFFIXES.iter().find(|s| lower.ends_with(*s)) {
        let ext_start = suffix.rfind('.').unwrap_or(0);
        let middle = &suffix[..ext_start];
        let strip = if video_lower.ends_with(middle) {
            suffix.len() - ext_start
        } else {
            suffix.len()
        };
        return sidecar_name[..sidecar_name.len() - strip].to_string();
    }
    match sidecar_name.rfind('.') {
        Some(0) | None => sidecar_name.to_string(),
        Some(i) => sidecar_name[..i].to_string(),
    }
}

/// True when the sidecar belongs to the video.
pub fn names_match(video: &Path, sidecar: &Path) -> bool {
    let (Some(video_base), Some(sidecar_name)) = (
        video.file_stem().and_then(|s| s.to_str()),
        sidecar.file_name().and_then(|s| s.to_str()),
    ) else {
        return false;
    };
    if is_backup_file(video) || is_backup_file(sidecar) {
        return false;
    }
    let left = normalise_name(video_base);
    !left.is_empty() && left == normalise_name(&sidecar_match_base(sidecar_name, video_base))
}

fn match_videos(batch_id: u64, videos: Vec<PathBuf>, sidecars: &[PathBuf]) -> Vec<WorkItem> {
    videos
        .into_iter()
        .filter_map(|video| match sidecars.iter().find(|s| names_match(&video, s)) {
            Some(sidecar) => Some(WorkItem {
                batch_id,
                video: Some(video),
                sidecar: sidecar.clone(),
            }),
            None => {
                debug!("No sidecar for {}", video.display());
                None
            }
        })
        .collect()
}

/// Expands a batch into work items. Fails with `Pairing` when the batch
/// has videos but none of them has a sidecar.
pub fn match_batch(batch: &Batch, filter: &FileFilter) -> CoreResult<Vec<WorkItem>> {
    match &batch.input {
        BatchInput::Directory {
            video_dir: None,
            sidecar_dir,
        } => Ok(find_sidecars(sidecar_dir)?
            .into_iter()
            .map(|sidecar| WorkItem {
                batch_id: batch.id,
                video: None,
                sidecar,
            })
            .collect()),
        BatchInput::Directory {
            video_dir: Some(video_dir),
            sidecar_dir,
        } => {
            let videos = find_videos(video_dir, filter)?;
            if videos.is_empty() {
                warn!("No videos found in {}", video_dir.display());
                return Ok(Vec::new());
            }
            let video_count = videos.len();
            let sidecars = find_sidecars(sidecar_dir)?;
            let items = match_videos(batch.id, videos, &sidecars);
            if items.is_empty() {
                return Err(CoreError::Pairing(format!(
                    "none of the {} videos in {} has a sidecar in {}",
                    video_count,
                    video_dir.display(),
                    sidecar_dir.display()
                )));
            }
            Ok(items)
        }
        BatchInput::File { video, sidecar: Some(sidecar) } => Ok(vec![WorkItem {
            batch_id: batch.id,
            video: video.clone(),
            sidecar: sidecar.clone(),
        }]),
        BatchInput::File { video: Some(video), sidecar: None } => {
            let dir = video.parent().unwrap_or(Path::new("."));
            let sidecars = find_sidecars(dir)?;
            let items = match_videos(batch.id, vec![video.clone()], &sidecars);
            if items.is_empty() {
                return Err(CoreError::Pairing(format!(
                    "no sidecar found for {}",
                    video.display()
                )));
            }
            Ok(items)
        }
        BatchInput::File { video: None, sidecar: None } => Ok(Vec::new()),
    }
}
