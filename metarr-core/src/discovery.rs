//! File discovery for video and sidecar directories.
//!
//! Only the top level of each directory is scanned. Backup files written by
//! metarr (`*_metarrbackup*`) and temp outputs (`tmp_*`) are never returned.

use crate::error::{CoreError, CoreResult};
use crate::filename::TEMP_PREFIX;
use crate::fsutil::is_backup_file;
use crate::model::SidecarKind;

use std::path::{Path, PathBuf};

/// Name filters applied to discovered videos.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    /// Lowercase extensions without dots; empty accepts any extension
    pub exts: Vec<String>,
    /// Name must start with one of these
    pub prefixes: Vec<String>,
    /// Name must contain one of these
    pub contains: Vec<String>,
    /// Name must contain none of these
    pub omit: Vec<String>,
}

impl FileFilter {
    /// True when `path` passes every filter.
    pub fn accepts(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if !self.exts.is_empty() {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase)
                .unwrap_or_default();
            if !self.exts.iter().any(|e| *e == ext) {
                return false;
            }
        }
        if !self.prefixes.is_empty() && !self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
        {
            return false;
        }
        if !self.contains.is_empty() && !self.contains.iter().any(|c| name.contains(c.as_str())) {
            return false;
        }
        !self.omit.iter().any(|o| name.contains(o.as_str()))
    }
}

fn is_skipped(path: &Path) -> bool {
    if is_backup_file(path) {
        return true;
    }
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(TEMP_PREFIX) || n.starts_with('.'))
}

fn list_files(dir: &Path) -> CoreResult<Vec<PathBuf>> {
    let read_dir = std::fs::read_dir(dir)
        .map_err(|e| CoreError::Path(format!("cannot read {}: {}", dir.display(), e)))?;
    let mut files: Vec<PathBuf> = read_dir
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            (path.is_file() && !is_skipped(&path)).then_some(path)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Videos in `dir` that pass `filter`, sorted by path.
pub fn find_videos(dir: &Path, filter: &FileFilter) -> CoreResult<Vec<PathBuf>> {
    Ok(list_files(dir)?
        .into_iter()
        .filter(|p| SidecarKind::from_path(p).is_none() && filter.accepts(p))
        .collect())
}

/// JSON and NFO sidecars in `dir`, sorted by path.
pub fn find_sidecars(dir: &Path) -> CoreResult<Vec<PathBuf>> {
    Ok(list_files(dir)?
        .into_iter()
        .filter(|p| SidecarKind::from_path(p).is_some())
        .collect())
}
