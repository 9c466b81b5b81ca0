//! Process-wide per-path sidecar locks.
//!
//! The outer map is only held while looking up or inserting an entry; the
//! per-path mutex is then locked through an owned guard that the reader
//! keeps for its whole decode-edit-write cycle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RawMutex};
use parking_lot::lock_api::ArcMutexGuard;

static SIDECAR_LOCKS: Lazy<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Held for as long as a sidecar is open; dropping it releases the path.
pub struct SidecarGuard {
    _guard: ArcMutexGuard<RawMutex, ()>,
    path: PathBuf,
}

impl std::fmt::Debug for SidecarGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SidecarGuard").field("path", &self.path).finish()
    }
}

impl SidecarGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn lock_key(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}

/// Blocks until the lock for `path` is available.
pub fn lock_sidecar(path: &Path) -> SidecarGuard {
    let key = lock_key(path);
    let entry = {
        let mut locks = SIDECAR_LOCKS.lock();
        Arc::clone(locks.entry(key.clone()).or_default())
    };
    SidecarGuard {
        _guard: entry.lock_arc(),
        path: key,
    }
}

/// Returns the guard if the path is currently free.
pub fn try_lock_sidecar(path: &Path) -> Option<SidecarGuard> {
    let key = lock_key(path);
    let entry = {
        let mut locks = SIDECAR_LOCKS.lock();
        Arc::clone(locks.entry(key.clone()).or_default())
    };
    entry.try_lock_arc().map(|guard| SidecarGuard {
        _guard: guard,
        path: key,
    })
}

/// Drops map entries no reader currently holds.
pub fn prune_unused_locks() {
    let mut locks = SIDECAR_LOCKS.lock();
    locks.retain(|_, lock| Arc::strong_count(lock) > 1 || lock.is_locked());
}
