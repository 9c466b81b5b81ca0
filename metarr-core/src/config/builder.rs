// ============================================================================
// metarr-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for CoreConfig
//
// Fluent construction of CoreConfig. `build()` runs validation so that a
// configuration which reaches the orchestrator is always usable.
//
// KEY COMPONENTS:
// - CoreConfigBuilder: Builder struct for creating CoreConfig instances

// ---- Standard library imports ----
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// ---- Internal crate imports ----
use super::{CoreConfig, PurgeMode};
use crate::error::CoreResult;
use crate::model::{FilenameOps, MetaOps, OverrideMaps};
use crate::transcode::HwAccel;

/// Builder for creating CoreConfig instances.
///
/// # Examples
///
/// ```rust
/// use metarr_core::config::CoreConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = CoreConfigBuilder::new()
///     .video_dir(PathBuf::from("/videos"))
///     .sidecar_dir(PathBuf::from("/json"))
///     .concurrency(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CoreConfigBuilder {
    config: CoreConfig,
}

impl CoreConfigBuilder {
    /// Creates a new CoreConfigBuilder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn video_dir(mut self, dir: PathBuf) -> Self {
        self.config.video_dirs.push(dir);
        self
    }

    pub fn video_file(mut self, file: PathBuf) -> Self {
        self.config.video_files.push(file);
        self
    }

    pub fn sidecar_dir(mut self, dir: PathBuf) -> Self {
        self.config.sidecar_dirs.push(dir);
        self
    }

    pub fn sidecar_file(mut self, file: PathBuf) -> Self {
        self.config.sidecar_files.push(file);
        self
    }

    /// Replaces the accepted input extensions. Leading dots are stripped.
    pub fn input_exts<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.input_exts = exts
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    pub fn prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.config.prefixes = prefixes;
        self
    }

    pub fn contains(mut self, contains: Vec<String>) -> Self {
        self.config.contains = contains;
        self
    }

    pub fn omit(mut self, omit: Vec<String>) -> Self {
        self.config.omit = omit;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    pub fn max_cpu(mut self, max_cpu: f64) -> Self {
        self.config.max_cpu = max_cpu;
        self
    }

    /// Sets the free-memory floor in bytes.
    pub fn min_free_mem(mut self, bytes: u64) -> Self {
        self.config.min_free_mem = bytes;
        self
    }

    pub fn ffprobe_timeout(mut self, timeout: Duration) -> Self {
        self.config.ffprobe_timeout = Some(timeout);
        self
    }

    pub fn gpu(mut self, gpu: HwAccel) -> Self {
        self.config.gpu = gpu;
        self
    }

    pub fn gpu_device(mut self, device: PathBuf) -> Self {
        self.config.gpu_device = Some(device);
        self
    }

    pub fn video_codec(mut self, codec: impl Into<String>) -> Self {
        self.config.video_codec = codec.into();
        self
    }

    pub fn audio_codec(mut self, codec: impl Into<String>) -> Self {
        self.config.audio_codec = codec.into();
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.config.quality = Some(quality);
        self
    }

    pub fn video_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.video_filter = Some(filter.into());
        self
    }

    /// Splits `args` on whitespace.
    pub fn extra_ffmpeg_args(mut self, args: &str) -> Self {
        self.config.extra_ffmpeg_args = args.split_whitespace().map(str::to_string).collect();
        self
    }

    pub fn output_ext(mut self, ext: impl Into<String>) -> Self {
        let ext: String = ext.into();
        self.config.output_ext = Some(ext.trim_start_matches('.').to_ascii_lowercase());
        self
    }

    pub fn output_dir(mut self, dir: PathBuf) -> Self {
        self.config.output_dir = Some(dir);
        self
    }

    pub fn meta_ops(mut self, ops: MetaOps) -> Self {
        self.config.meta_ops = Arc::new(ops);
        self
    }

    pub fn filename_ops(mut self, ops: FilenameOps) -> Self {
        self.config.filename_ops = Arc::new(ops);
        self
    }

    pub fn overrides(mut self, overrides: OverrideMaps) -> Self {
        self.config.overrides = Arc::new(overrides);
        self
    }

    pub fn meta_overwrite(mut self, value: bool) -> Self {
        self.config.meta_overwrite = value;
        self
    }

    pub fn meta_preserve(mut self, value: bool) -> Self {
        self.config.meta_preserve = value;
        self
    }

    pub fn desc_date_prefix(mut self, value: bool) -> Self {
        self.config.desc_date_prefix = value;
        self
    }

    pub fn desc_date_suffix(mut self, value: bool) -> Self {
        self.config.desc_date_suffix = value;
        self
    }

    pub fn meta_purge(mut self, mode: PurgeMode) -> Self {
        self.config.meta_purge = mode;
        self
    }

    pub fn no_file_overwrite(mut self, value: bool) -> Self {
        self.config.no_file_overwrite = value;
        self
    }

    pub fn skip_videos(mut self, value: bool) -> Self {
        self.config.skip_videos = value;
        self
    }

    pub fn strip_thumbnails(mut self, value: bool) -> Self {
        self.config.strip_thumbnails = value;
        self
    }

    pub fn force_write_thumbnails(mut self, value: bool) -> Self {
        self.config.force_write_thumbnails = value;
        self
    }

    pub fn cookie_path(mut self, path: PathBuf) -> Self {
        self.config.cookie_path = Some(path);
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> CoreResult<CoreConfig> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without validating it.
    pub fn build_unchecked(self) -> CoreConfig {
        self.config
    }
}
