//! Storage layer for Keymaze data
//!
//! A single SQLite file holds everything recovered from the watch:
//!
//! ```text
//! ~/.local/share/keymaze/
//! └── keymaze.sqlite
//!     ├── dev_info     # one row per watch
//!     ├── tp_catalog   # one row per recorded activity
//!     └── tp_points    # GPS samples of downloaded activities
//! ```
//!
//! The store is append-only: rows are inserted once and never updated.

mod cache;
mod cache_db;

pub use cache::KeymazeCache;
pub use cache_db::{CacheCounts, CacheDb};

use std::path::Path;

use crate::config::ensure_dir;
use crate::error::Result;

/// Open the cache database at `path`, creating its directory if needed
pub fn open_store(path: &Path) -> Result<CacheDb> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    CacheDb::open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_store_creates_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("keymaze.sqlite");
        let db = open_store(&path).unwrap();
        assert!(path.exists());
        assert_eq!(db.counts().unwrap(), CacheCounts::default());
    }
}
