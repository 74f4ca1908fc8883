//! Store handle: the resolved data directory every collection lives under.
//!
//! There is no ambient global configuration. A `Store` is constructed once
//! at startup and passed by reference into every operation; each collection
//! module derives its backing path from `store.root`.

use std::env;
use std::path::PathBuf;

/// Environment variable consulted when no explicit data directory is given.
pub const DATA_DIR_ENV: &str = "TIDEPOOL_DATA";

/// Handle for one Tidepool data directory.
#[derive(Debug, Clone)]
pub struct Store {
    /// Directory holding every collection file.
    pub root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolution order: explicit flag, `TIDEPOOL_DATA`, then `./data`.
    pub fn resolve(explicit: Option<PathBuf>) -> Self {
        let root = explicit
            .or_else(|| env::var_os(DATA_DIR_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("data"));
        Self { root }
    }
}
