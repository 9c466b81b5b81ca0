//! Configuration structures and constants for the metarr-core library.
//!
//! A `CoreConfig` is built once at startup (usually by metarr-cli) and
//! handed to the batch orchestrator. It is read-only for the rest of the
//! run; the only run-time mutable settings, the overwrite policy flags, live
//! in `edit::OverwritePolicy` which is seeded from this value.

mod builder;
pub(crate) mod validation;

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub use builder::CoreConfigBuilder;

use crate::error::CoreError;
use crate::model::{FilenameOps, MetaOps, OverrideMaps};
use crate::transcode::HwAccel;

// Default constants

/// Default number of concurrent workers.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Default CPU ceiling. Anything above 100 % never blocks the resource gate.
pub const DEFAULT_MAX_CPU: f64 = 101.0;

/// Video extensions picked up from a directory when none are given.
pub const DEFAULT_INPUT_EXTS: &[&str] = &[
    "3gp", "avi", "f4v", "flv", "m4v", "mkv", "mov", "mp4", "mpeg", "mpg", "ogm", "ogv", "ts",
    "vob", "webm", "wmv",
];

/// Which processed sidecars are deleted after a successful file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PurgeMode {
    #[default]
    None,
    All,
    Json,
    Nfo,
}

impl FromStr for PurgeMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "all" => Ok(Self::All),
            "json" => Ok(Self::Json),
            "nfo" => Ok(Self::Nfo),
            other => Err(CoreError::Config(format!(
                "invalid meta purge value '{other}' (expected all, json, nfo or none)"
            ))),
        }
    }
}

/// Main configuration structure for the metarr-core library.
///
/// # Examples
///
/// ```rust,no_run
/// use metarr_core::config::CoreConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = CoreConfigBuilder::new()
///     .video_dir(PathBuf::from("/path/to/videos"))
///     .sidecar_dir(PathBuf::from("/path/to/json"))
///     .concurrency(4)
///     .output_ext("mp4")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct CoreConfig {
    // ---- Inputs ----
    pub video_dirs: Vec<PathBuf>,
    pub video_files: Vec<PathBuf>,
    pub sidecar_dirs: Vec<PathBuf>,
    pub sidecar_files: Vec<PathBuf>,

    // ---- Filtering ----
    /// Lowercase extensions without the leading dot
    pub input_exts: Vec<String>,
    pub prefixes: Vec<String>,
    pub contains: Vec<String>,
    pub omit: Vec<String>,

    // ---- Scheduling ----
    pub concurrency: usize,
    /// CPU ceiling in percent; the resource gate waits while usage is above it
    pub max_cpu: f64,
    /// Minimum free memory in bytes before a worker starts a file
    pub min_free_mem: u64,
    /// Deadline for each ffprobe call, `None` waits indefinitely
    pub ffprobe_timeout: Option<Duration>,

    // ---- Transcoding ----
    pub gpu: HwAccel,
    /// Render node or device path (e.g. `/dev/dri/renderD128`)
    pub gpu_device: Option<PathBuf>,
    pub video_codec: String,
    pub audio_codec: String,
    pub quality: Option<u8>,
    pub video_filter: Option<String>,
    pub extra_ffmpeg_args: Vec<String>,

    // ---- Output ----
    /// Output extension without the dot, `None` keeps the input extension
    pub output_ext: Option<String>,
    pub output_dir: Option<PathBuf>,

    // ---- Metadata ----
    pub meta_ops: Arc<MetaOps>,
    pub filename_ops: Arc<FilenameOps>,
    pub overrides: Arc<OverrideMaps>,
    pub meta_overwrite: bool,
    pub meta_preserve: bool,
    pub desc_date_prefix: bool,
    pub desc_date_suffix: bool,
    pub meta_purge: PurgeMode,

    // ---- Behaviour flags ----
    pub no_file_overwrite: bool,
    pub skip_videos: bool,
    pub strip_thumbnails: bool,
    pub force_write_thumbnails: bool,
    pub cookie_path: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            video_dirs: Vec::new(),
            video_files: Vec::new(),
            sidecar_dirs: Vec::new(),
            sidecar_files: Vec::new(),
            input_exts: DEFAULT_INPUT_EXTS.iter().map(|s| (*s).to_string()).collect(),
            prefixes: Vec::new(),
            contains: Vec::new(),
            omit: Vec::new(),
            concurrency: DEFAULT_CONCURRENCY,
            max_cpu: DEFAULT_MAX_CPU,
            min_free_mem: 0,
            ffprobe_timeout: None,
            gpu: HwAccel::None,
            gpu_device: None,
            video_codec: String::new(),
            audio_codec: String::new(),
            quality: None,
            video_filter: None,
            extra_ffmpeg_args: Vec::new(),
            output_ext: None,
            output_dir: None,
            meta_ops: Arc::new(MetaOps::default()),
            filename_ops: Arc::new(FilenameOps::default()),
            overrides: Arc::new(OverrideMaps::default()),
            meta_overwrite: false,
            meta_preserve: false,
            desc_date_prefix: false,
            desc_date_suffix: false,
            meta_purge: PurgeMode::None,
            no_file_overwrite: false,
            skip_videos: false,
            strip_thumbnails: false,
            force_write_thumbnails: false,
            cookie_path: None,
        }
    }
}

impl CoreConfig {
    /// Number of worker threads, never below one.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.concurrency.max(1)
    }

    /// Output extension with a leading dot, if one was requested.
    #[must_use]
    pub fn output_ext_dotted(&self) -> Option<String> {
        self.output_ext.as_ref().map(|e| {
            let e = e.trim_start_matches('.').to_ascii_lowercase();
            format!(".{e}")
        })
    }

    /// Directory for `metarr.log`: the first sidecar directory, else the
    /// directory of the first sidecar file, else the first video directory.
    #[must_use]
    pub fn log_dir(&self) -> Option<PathBuf> {
        self.sidecar_dirs
            .first()
            .cloned()
            .or_else(|| {
                self.sidecar_files
                    .first()
                    .and_then(|f| f.parent().map(|p| p.to_path_buf()))
            })
            .or_else(|| self.video_dirs.first().cloned())
    }
}
