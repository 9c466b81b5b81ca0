//! JSON sidecar reader/writer.
//!
//! The document is decoded into an insertion-ordered `serde_json::Map`.
//! Only string values are read or written by the pipeline; every other
//! value is carried through untouched.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::debug;
use serde_json::{Map, Value};

use super::lock::SidecarGuard;
use super::pool::PooledBuffer;
use super::{SidecarValues, rewrite_file};
use crate::error::{CoreError, CoreResult};
use crate::model::CreditField;

#[derive(Debug)]
pub struct JsonRw {
    path: PathBuf,
    file: File,
    buf: PooledBuffer,
    map: Map<String, Value>,
    dirty: bool,
    no_file_overwrite: bool,
    backed_up: bool,
    _guard: SidecarGuard,
}

impl JsonRw {
    /// Opens and decodes `path` while holding `guard`.
    pub fn open(path: &Path, guard: SidecarGuard, no_file_overwrite: bool) -> CoreResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| CoreError::sidecar(path, e))?;
        let mut rw = Self {
            path: path.to_path_buf(),
            file,
            buf: PooledBuffer::take(),
            map: Map::new(),
            dirty: false,
            no_file_overwrite,
            backed_up: false,
            _guard: guard,
        };
        rw.decode()?;
        Ok(rw)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole file from the start and parses it.
    pub fn decode(&mut self) -> CoreResult<&Map<String, Value>> {
        self.buf.clear();
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.read_to_end(&mut self.buf))
            .map_err(|e| CoreError::sidecar(&self.path, e))?;

        self.map = if self.buf.iter().all(u8::is_ascii_whitespace) {
            Map::new()
        } else {
            match serde_json::from_slice::<Value>(&self.buf) {
                Ok(Value::Object(map)) => map,
                Ok(other) => {
                    return Err(CoreError::sidecar(
                        &self.path,
                        format!("expected a JSON object, found {}", type_name(&other)),
                    ));
                }
                Err(e) => return Err(CoreError::sidecar(&self.path, e)),
            }
        };
        self.dirty = false;
        Ok(&self.map)
    }

    /// Discards in-memory state and decodes the file again.
    pub fn refresh(&mut self) -> CoreResult<&Map<String, Value>> {
        self.decode()
    }

    pub fn map(&self) -> &Map<String, Value> {
        &self.map
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.map.get(key).and_then(Value::as_str)
    }

    /// JSON text of a value under `key` that is neither a string nor null.
    pub fn non_string(&self, key: &str) -> Option<String> {
        match self.map.get(key)? {
            Value::String(_) | Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Sets `key` to a string value. Returns whether anything changed.
    pub fn set_str(&mut self, key: &str, value: &str) -> bool {
        if self.get_str(key) == Some(value) {
            return false;
        }
        self.map
            .insert(key.to_string(), Value::String(value.to_string()));
        self.dirty = true;
        true
    }

    /// Non-empty string values plus plural credit arrays (`"artists": [..]`).
    pub fn values(&self) -> SidecarValues {
        let mut values = SidecarValues::default();
        for (key, value) in &self.map {
            match value {
                Value::String(s) if !s.trim().is_empty() => {
                    values.strings.insert(key.clone(), s.trim().to_string());
                }
                Value::Array(items) => {
                    let field = key
                        .strip_suffix('s')
                        .and_then(CreditField::from_key)
                        .or_else(|| CreditField::from_key(key));
                    if let Some(field) = field {
                        let list: Vec<String> = items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect();
                        if !list.is_empty() {
                            values.lists.insert(field, list);
                        }
                    }
                }
                _ => {}
            }
        }
        values
    }

    /// Serialises with two-space indentation and rewrites the file in place.
    pub fn write_to_file(&mut self) -> CoreResult<()> {
        if self.no_file_overwrite && !self.backed_up {
            crate::fsutil::backup_file(&self.path)?;
            self.backed_up = true;
        }
        self.buf.clear();
        serde_json::to_writer_pretty(&mut *self.buf, &self.map)?;
        self.buf.push(b'\n');
        rewrite_file(&mut self.file, &self.path, &self.buf)?;
        self.dirty = false;
        debug!("Wrote JSON sidecar {}", self.path.display());
        Ok(())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
