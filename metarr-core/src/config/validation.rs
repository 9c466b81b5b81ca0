//! Validation of a `CoreConfig` before the run starts.
//!
//! Every failure here is a `CoreError::Config`, which aborts the program.

use std::path::Path;

use log::warn;

use super::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::transcode::HwAccel;

/// Rejects paths FFmpeg would split on `:`.
pub fn check_path_has_no_colon(path: &Path) -> CoreResult<()> {
    if path.to_string_lossy().contains(':') {
        return Err(CoreError::Config(format!(
            "path '{}' contains ':' which ffmpeg cannot handle",
            path.display()
        )));
    }
    Ok(())
}

impl CoreConfig {
    /// Checks option ranges and combinations.
    pub fn validate(&self) -> CoreResult<()> {
        for path in self
            .video_dirs
            .iter()
            .chain(&self.video_files)
            .chain(&self.sidecar_dirs)
            .chain(&self.sidecar_files)
        {
            check_path_has_no_colon(path)?;
        }
        if let Some(dir) = &self.output_dir {
            check_path_has_no_colon(dir)?;
        }

        if !(0.0..=101.0).contains(&self.max_cpu) {
            return Err(CoreError::Config(format!(
                "max CPU must be between 0 and 100, got {}",
                self.max_cpu
            )));
        }

        if self.meta_overwrite && self.meta_preserve {
            return Err(CoreError::Config(
                "meta overwrite and meta preserve cannot both be set".to_string(),
            ));
        }

        if self.strip_thumbnails && self.force_write_thumbnails {
            return Err(CoreError::Config(
                "strip thumbnails and force write thumbnails cannot both be set".to_string(),
            ));
        }

        if let Some(q) = self.quality {
            if q > 63 {
                return Err(CoreError::Config(format!(
                    "transcode quality must be between 0 and 63, got {q}"
                )));
            }
        }

        if let Some(ext) = &self.output_ext {
            if ext.is_empty() || ext.contains(['/', '\\', ' ']) {
                return Err(CoreError::Config(format!("invalid output extension '{ext}'")));
            }
        }

        if matches!(self.gpu, HwAccel::Qsv | HwAccel::Vaapi) && self.gpu_device.is_none() {
            warn!(
                "{} acceleration without a device path, ffmpeg will pick a default device",
                self.gpu
            );
        }

        if self.concurrency == 0 {
            warn!("Concurrency 0 requested, using a single worker");
        }

        for set in &self.meta_ops.set {
            if set.field.trim().is_empty() {
                return Err(CoreError::Config("meta set with an empty field name".to_string()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn colon_paths_are_rejected() {
        let config = CoreConfig {
            video_dirs: vec![PathBuf::from("/videos/a:b")],
            ..CoreConfig::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn cpu_range_is_checked() {
        let config = CoreConfig {
            max_cpu: 150.0,
            ..CoreConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(CoreConfig::default().validate().is_ok());
    }

    #[test]
    fn quality_range_is_checked() {
        let config = CoreConfig {
            quality: Some(99),
            ..CoreConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
