// ============================================================================
// metarr-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Error types for the metarr-core library
//
// Every fallible operation in the core returns `CoreResult<T>`. Leaf
// operations produce a specific `CoreError` variant; workers wrap the error
// in a `ProcessingError` that carries the batch id and the file it concerns,
// and the batch orchestrator groups those for the end-of-run summary.
//
// RECOVERY POLICY (by variant):
// - Config          -> abort the program
// - Pairing         -> abort the batch only
// - SidecarIo       -> record the failure, skip the file
// - Template        -> drop the single edit, continue
// - Ffprobe         -> treat as metadata mismatch, continue to encode
// - Ffmpeg          -> record the failure, skip the file
// - HashMismatch    -> record the failure after the copy fallback fails
// - Cancelled       -> return immediately, no further writes

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use thiserror::Error;

/// Errors raised while expanding `{{tag}}` templates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unbalanced template delimiters in '{0}'")]
    Unbalanced(String),

    #[error("template tag '{{{{{0}}}}}' could not be resolved")]
    Unresolved(String),

    #[error("template '{0}' did not settle after {1} expansion passes")]
    TooDeep(String, usize),
}

/// Custom error type for the metarr-core library.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Pairing error: {0}")]
    Pairing(String),

    #[error("Sidecar error for '{path}': {message}")]
    SidecarIo { path: PathBuf, message: String },

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("ffprobe error: {0}")]
    Ffprobe(String),

    #[error("ffmpeg failed for '{input}': {message}")]
    Ffmpeg { input: PathBuf, message: String },

    #[error("Hash mismatch moving '{src}' to '{dst}'")]
    HashMismatch { src: PathBuf, dst: PathBuf },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Path error: {0}")]
    Path(String),

    #[error("Required dependency '{0}' not found")]
    DependencyNotFound(String),

    #[error("Failed to start '{0}': {1}")]
    CommandStart(String, std::io::Error),

    #[error("'{cmd}' exited with {status}: {stderr}")]
    CommandFailed {
        cmd: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Scraper error: {0}")]
    Scraper(String),

    #[error("Worker panicked: {0}")]
    WorkerPanic(String),
}

/// Result type for metarr-core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Builds a `SidecarIo` error for the given path.
    pub fn sidecar(path: impl AsRef<Path>, message: impl fmt::Display) -> Self {
        CoreError::SidecarIo {
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }

    /// True when the error came from cooperative cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CoreError::Cancelled)
    }
}

pub fn command_start_error(cmd: impl Into<String>, err: std::io::Error) -> CoreError {
    let cmd = cmd.into();
    if err.kind() == std::io::ErrorKind::NotFound {
        CoreError::DependencyNotFound(cmd)
    } else {
        CoreError::CommandStart(cmd, err)
    }
}

pub fn command_failed_error(
    cmd: impl Into<String>,
    status: ExitStatus,
    stderr: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed {
        cmd: cmd.into(),
        status,
        stderr: stderr.into(),
    }
}

// ============================================================================
// PER-FILE FAILURES
// ============================================================================

/// A failure tied to one file inside one batch.
#[derive(Debug)]
pub struct ProcessingError {
    pub batch_id: u64,
    pub file: PathBuf,
    pub error: CoreError,
}

impl ProcessingError {
    pub fn new(batch_id: u64, file: impl Into<PathBuf>, error: CoreError) -> Self {
        Self {
            batch_id,
            file: file.into(),
            error,
        }
    }
}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[batch {}] {}: {}",
            self.batch_id,
            self.file.display(),
            self.error
        )
    }
}

impl std::error::Error for ProcessingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
