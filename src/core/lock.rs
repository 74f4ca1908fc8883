//! Per-collection advisory locking.
//!
//! The store promises no isolation across processes, but within one process
//! every operation with a read-then-write phase must be serialized per
//! backing file, or two concurrent updates will both read the pre-update
//! sequence and the second rewrite silently discards the first (the classic
//! lost-update anomaly). One lock per file keeps unrelated collections from
//! contending with each other.
//!
//! Keys are the paths as constructed by the `Store`, not canonicalized;
//! build all handles for a collection from the same `Store` instance.

use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

static REGISTRY: OnceLock<Mutex<FxHashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

fn lock_for(path: &Path) -> Arc<Mutex<()>> {
    let registry = REGISTRY.get_or_init(|| Mutex::new(FxHashMap::default()));
    let mut map = registry
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    map.entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

/// Run `f` while holding the advisory lock for `path`.
///
/// The guard is scoped, so the lock is released on every exit path,
/// including panics inside `f` (a poisoned lock is recovered rather than
/// propagated, since the file itself carries all state).
pub fn with_file_lock<R>(path: &Path, f: impl FnOnce() -> R) -> R {
    let lock = lock_for(path);
    let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
    f()
}
