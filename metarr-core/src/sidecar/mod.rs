// ============================================================================
// metarr-core/src/sidecar/mod.rs
// ============================================================================
//
// SIDECARS: Locked readers/writers for JSON and NFO metadata files
//
// A `Sidecar` is opened once per file by the worker that owns the FileData.
// Opening takes the process-wide lock for the file's path; the lock is held
// until the Sidecar is dropped, so a decode-edit-write cycle can never
// interleave with another worker touching the same file.
//
// KEY COMPONENTS:
// - Sidecar: sum type over JsonRw and NfoRw
// - SidecarValues: flattened string view consumed by the fill pipeline
// - rewrite_file: truncate-then-write discipline shared by both formats
// - lock / pool: per-path locks and pooled buffers

pub mod json;
pub mod lock;
pub mod nfo;
pub mod pool;

pub use json::JsonRw;
pub use lock::{SidecarGuard, lock_sidecar, prune_unused_locks};
pub use nfo::{NfoData, NfoRw};
pub use pool::release_pooled_buffers;

// ---- Standard library imports ----
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

// ---- Internal crate imports ----
use crate::error::{CoreError, CoreResult};
use crate::model::{CreditField, SidecarKind};

/// Flattened view of a sidecar for the fill pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SidecarValues {
    /// Non-empty, trimmed string values keyed by field name
    pub strings: HashMap<String, String>,
    /// List-valued credits
    pub lists: BTreeMap<CreditField, Vec<String>>,
}

impl SidecarValues {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.strings
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn put(&mut self, key: &str, value: &str) {
        let value = value.trim();
        if !value.is_empty() {
            self.strings.insert(key.to_string(), value.to_string());
        }
    }

    pub fn put_list(&mut self, field: CreditField, values: Vec<String>) {
        let values: Vec<String> = values
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if !values.is_empty() {
            self.lists.insert(field, values);
        }
    }
}

#[derive(Debug)]
pub enum Sidecar {
    Json(JsonRw),
    Nfo(NfoRw),
}

impl Sidecar {
    /// Locks `path` and decodes it as `kind`. Blocks while another reader
    /// holds the same file.
    pub fn open(path: &Path, kind: SidecarKind, no_file_overwrite: bool) -> CoreResult<Self> {
        let guard = lock_sidecar(path);
        match kind {
            SidecarKind::Json => Ok(Sidecar::Json(JsonRw::open(path, guard, no_file_overwrite)?)),
            SidecarKind::Nfo => Ok(Sidecar::Nfo(NfoRw::open(path, guard, no_file_overwrite)?)),
        }
    }

    pub fn kind(&self) -> SidecarKind {
        match self {
            Sidecar::Json(_) => SidecarKind::Json,
            Sidecar::Nfo(_) => SidecarKind::Nfo,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Sidecar::Json(rw) => rw.path(),
            Sidecar::Nfo(rw) => rw.path(),
        }
    }

    /// Re-reads the file from disk, dropping unsaved edits.
    pub fn refresh(&mut self) -> CoreResult<()> {
        match self {
            Sidecar::Json(rw) => rw.refresh().map(|_| ()),
            Sidecar::Nfo(rw) => rw.refresh().map(|_| ()),
        }
    }

    pub fn values(&self) -> SidecarValues {
        match self {
            Sidecar::Json(rw) => rw.values(),
            Sidecar::Nfo(rw) => rw.values(),
        }
    }

    /// String value of a JSON key or NFO element.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self {
            Sidecar::Json(rw) => rw.get_str(key).map(str::to_string),
            Sidecar::Nfo(rw) => rw.get_str(key),
        }
    }

    /// JSON text of a present non-string value. NFO elements are always text.
    pub fn non_string_value(&self, key: &str) -> Option<String> {
        match self {
            Sidecar::Json(rw) => rw.non_string(key),
            Sidecar::Nfo(_) => None,
        }
    }

    pub fn has_value(&self, key: &str) -> bool {
        self.get_str(key).is_some_and(|v| !v.trim().is_empty())
    }

    /// Sets a JSON key or NFO element. Returns whether anything changed.
    pub fn set_str(&mut self, key: &str, value: &str) -> CoreResult<bool> {
        match self {
            Sidecar::Json(rw) => Ok(rw.set_str(key, value)),
            Sidecar::Nfo(rw) => rw.set_str(key, value),
        }
    }

    /// Stores a filled value under its sidecar key when the key is missing
    /// or empty, or unconditionally when `force` is set. Non-string JSON
    /// values are never replaced. NFO files only receive fields that have
    /// an NFO element.
    pub fn write_back(&mut self, field: &str, value: &str, force: bool) -> CoreResult<bool> {
        if value.trim().is_empty() {
            return Ok(false);
        }
        let key = match self {
            Sidecar::Json(_) => field,
            Sidecar::Nfo(_) => match nfo::tag_for_field(field) {
                Some(tag) => tag,
                None => return Ok(false),
            },
        };
        if self.non_string_value(key).is_some() || (!force && self.has_value(key)) {
            return Ok(false);
        }
        self.set_str(key, value)
    }

    pub fn is_dirty(&self) -> bool {
        match self {
            Sidecar::Json(rw) => rw.is_dirty(),
            Sidecar::Nfo(rw) => rw.is_dirty(),
        }
    }

    pub fn write_to_file(&mut self) -> CoreResult<()> {
        match self {
            Sidecar::Json(rw) => rw.write_to_file(),
            Sidecar::Nfo(rw) => rw.write_to_file(),
        }
    }
}

/// Seek to 0, truncate, write, fsync. The original seek position is
/// restored if any step fails.
pub(crate) fn rewrite_file(file: &mut File, path: &Path, bytes: &[u8]) -> CoreResult<()> {
    let position = file
        .stream_position()
        .map_err(|e| CoreError::sidecar(path, e))?;

    let result = (|| -> std::io::Result<()> {
        file.seek(SeekFrom::Start(0))?;
        file.set_len(0)?;
        file.write_all(bytes)?;
        file.sync_all()
    })();

    if let Err(e) = result {
        let _ = file.seek(SeekFrom::Start(position));
        return Err(CoreError::sidecar(path, format!("write failed: {e}")));
    }
    Ok(())
}
