// ============================================================================
// metarr-core/src/fsutil.rs
// ============================================================================
//
// FILE SYSTEM HELPERS: Backups, verified moves and hashing
//
// KEY COMPONENTS:
// - backup_path / rename_to_backup / backup_file: `_metarrbackup` copies
// - move_or_copy_file: rename with SHA-256 verification, copy fallback
// - sha256_file: streaming digest used by both

// ---- Standard library imports ----
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

// ---- External crate imports ----
use log::{debug, warn};
use sha2::{Digest, Sha256};

// ---- Internal crate imports ----
use crate::error::{CoreError, CoreResult};

/// Tag inserted before the extension of backup files.
pub const BACKUP_TAG: &str = "_metarrbackup";

const COPY_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// `dir/name.ext` -> `dir/name_metarrbackup.ext`.
pub fn backup_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}{BACKUP_TAG}.{}", ext.to_string_lossy()),
        None => format!("{stem}{BACKUP_TAG}"),
    };
    path.with_file_name(name)
}

/// True for files produced by the backup helpers.
pub fn is_backup_file(path: &Path) -> bool {
    path.file_stem()
        .map(|s| s.to_string_lossy().contains(BACKUP_TAG))
        .unwrap_or(false)
}

/// Renames `path` to its backup name and returns the new path.
pub fn rename_to_backup(path: &Path) -> CoreResult<PathBuf> {
    let backup = backup_path(path);
    fs::rename(path, &backup)?;
    debug!("Renamed {} to {}", path.display(), backup.display());
    Ok(backup)
}

/// Copies `path` to its backup name and verifies the copy's checksum.
pub fn backup_file(path: &Path) -> CoreResult<PathBuf> {
    let backup = backup_path(path);
    copy_with_fsync(path, &backup)?;
    let expected = sha256_file(path)?;
    verify_or_remove(path, &backup, &expected)?;
    debug!("Backed up {} to {}", path.display(), backup.display());
    Ok(backup)
}

/// Hex SHA-256 of a file's contents.
pub fn sha256_file(path: &Path) -> CoreResult<String> {
    let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Moves `src` to `dst`, verifying contents by SHA-256.
///
/// A rename is tried first; if the renamed file does not hash to the source
/// digest it is deleted and a copy is made instead. A copy that still
/// mismatches is removed and reported as `HashMismatch`. When the source
/// cannot be hashed the move proceeds unverified.
pub fn move_or_copy_file(src: &Path, dst: &Path) -> CoreResult<()> {
    if src == dst {
        return Ok(());
    }
    if !src.exists() {
        return Err(CoreError::Path(format!(
            "source '{}' does not exist",
            src.display()
        )));
    }

    let expected = match sha256_file(src) {
        Ok(hash) => Some(hash),
        Err(e) => {
            warn!("Could not hash {} before moving: {}", src.display(), e);
            None
        }
    };

    match fs::rename(src, dst) {
        Ok(()) => match &expected {
            Some(hash) if sha256_file(dst).ok().as_deref() != Some(hash.as_str()) => {
                warn!(
                    "Hash mismatch after renaming {} to {}, falling back to copy",
                    src.display(),
                    dst.display()
                );
                // The rename consumed the source; only a surviving source
                // can be copied again.
                let _ = fs::remove_file(dst);
                if !src.exists() {
                    return Err(CoreError::HashMismatch {
                        src: src.to_path_buf(),
                        dst: dst.to_path_buf(),
                    });
                }
            }
            _ => return Ok(()),
        },
        Err(e) => debug!(
            "Rename {} -> {} failed ({}), copying instead",
            src.display(),
            dst.display(),
            e
        ),
    }

    copy_with_fsync(src, dst)?;
    if let Some(hash) = &expected {
        verify_or_remove(src, dst, hash)?;
    }
    fs::remove_file(src)?;
    Ok(())
}

/// Removes `dst` and fails unless it hashes to `expected`.
pub fn verify_or_remove(src: &Path, dst: &Path, expected: &str) -> CoreResult<()> {
    let actual = sha256_file(dst).ok();
    if actual.as_deref() == Some(expected) {
        return Ok(());
    }
    let _ = fs::remove_file(dst);
    Err(CoreError::HashMismatch {
        src: src.to_path_buf(),
        dst: dst.to_path_buf(),
    })
}

fn copy_with_fsync(src: &Path, dst: &Path) -> CoreResult<()> {
    let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, File::open(src)?);
    let out = File::create(dst)?;
    let mut writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, out);
    std::io::copy(&mut reader, &mut writer)?;
    let out = writer.into_inner().map_err(|e| CoreError::Io(e.into_error()))?;
    out.sync_all()?;
    Ok(())
}
