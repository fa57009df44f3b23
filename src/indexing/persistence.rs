//! Snapshot persistence for the cache directory.
//!
//! Layout under `<root>/.quarry/`:
//! - `index.json`: the serialized `ProjectIndex`
//! - `bm25.json`: the BM25 index with its vocabulary
//! - `graph.json`: knowledge graph nodes and edges
//! - `cache/parse/<hash>.json`: per-content-hash parse results
//!
//! All writes are atomic (write to a temp file, then rename). The cache
//! directory is single-writer: `CacheLock` guards `save_indices` with a
//! lockfile.

use crate::error::{IndexError, IndexResult};
use crate::types::{ProjectIndex, SCHEMA_VERSION};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

pub const INDEX_FILE: &str = "index.json";
pub const BM25_FILE: &str = "bm25.json";
pub const GRAPH_FILE: &str = "graph.json";
const LOCK_FILE: &str = ".lock";

/// Reads and writes the on-disk snapshot.
pub struct SnapshotStore {
    cache_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Create the cache directory tree.
    pub fn initialize(&self) -> IndexResult<()> {
        fs::create_dir_all(self.cache_dir.join("cache/parse")).map_err(|e| {
            IndexError::FileWrite {
                path: self.cache_dir.clone(),
                source: e,
            }
        })
    }

    pub fn exists(&self) -> bool {
        self.cache_dir.join(INDEX_FILE).exists()
    }

    /// Serialize a value to `<cache>/<name>` atomically.
    pub fn save_json<T: Serialize>(&self, name: &str, value: &T) -> IndexResult<()> {
        let path = self.cache_dir.join(name);
        let data = serde_json::to_vec(value).map_err(|e| IndexError::Internal(e.to_string()))?;

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, data).map_err(|e| IndexError::FileWrite {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &path).map_err(|e| IndexError::FileWrite { path, source: e })
    }

    /// Load `<cache>/<name>`; `NotFound` when missing, `Corrupted` when
    /// unreadable.
    pub fn load_json<T: DeserializeOwned>(&self, name: &str) -> IndexResult<T> {
        let path = self.cache_dir.join(name);
        let data = fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => IndexError::NotFound { path: path.clone() },
            _ => IndexError::FileRead {
                path: path.clone(),
                source: e,
            },
        })?;
        serde_json::from_slice(&data).map_err(|e| IndexError::Corrupted {
            path,
            reason: e.to_string(),
        })
    }

    /// Load the project index, rejecting snapshots with a stale schema.
    pub fn load_index(&self) -> IndexResult<ProjectIndex> {
        let index: ProjectIndex = self.load_json(INDEX_FILE)?;
        if index.schema_version != SCHEMA_VERSION {
            return Err(IndexError::SchemaMismatch {
                found: index.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        Ok(index)
    }

    pub fn save_index(&self, index: &ProjectIndex) -> IndexResult<()> {
        self.save_json(INDEX_FILE, index)
    }

    /// Cached parse result for a content hash, if present.
    pub fn load_parse_cache<T: DeserializeOwned>(&self, hash: &str) -> Option<T> {
        let path = self.cache_dir.join("cache/parse").join(format!("{hash}.json"));
        let data = fs::read(path).ok()?;
        serde_json::from_slice(&data).ok()
    }

    pub fn save_parse_cache<T: Serialize>(&self, hash: &str, value: &T) -> IndexResult<()> {
        let dir = self.cache_dir.join("cache/parse");
        fs::create_dir_all(&dir).map_err(|e| IndexError::FileWrite {
            path: dir.clone(),
            source: e,
        })?;
        let path = dir.join(format!("{hash}.json"));
        let data = serde_json::to_vec(value).map_err(|e| IndexError::Internal(e.to_string()))?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, data).map_err(|e| IndexError::FileWrite {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &path).map_err(|e| IndexError::FileWrite { path, source: e })
    }

    /// Take the single-writer lock for this cache directory.
    pub fn lock(&self) -> IndexResult<CacheLock> {
        CacheLock::acquire(&self.cache_dir)
    }

    /// Delete the whole snapshot. Used for forced re-index.
    pub fn clear(&self) -> std::io::Result<()> {
        if self.cache_dir.exists() {
            for name in [INDEX_FILE, BM25_FILE, GRAPH_FILE] {
                let path = self.cache_dir.join(name);
                if path.exists() {
                    fs::remove_file(path)?;
                }
            }
        }
        Ok(())
    }
}

/// Held while writing the snapshot; the lockfile is removed on drop.
pub struct CacheLock {
    path: PathBuf,
}

impl CacheLock {
    fn acquire(cache_dir: &Path) -> IndexResult<Self> {
        fs::create_dir_all(cache_dir).map_err(|e| IndexError::FileWrite {
            path: cache_dir.to_path_buf(),
            source: e,
        })?;
        let path = cache_dir.join(LOCK_FILE);
        match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Self { path }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(IndexError::CacheLocked {
                    path: cache_dir.to_path_buf(),
                })
            }
            Err(e) => Err(IndexError::FileWrite { path, source: e }),
        }
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path().to_path_buf());
        store.initialize().unwrap();

        let index = ProjectIndex::empty("demo", PathBuf::from("."));
        store.save_index(&index).unwrap();
        assert!(store.exists());

        let loaded = store.load_index().unwrap();
        assert_eq!(loaded, index);
    }

    #[test]
    fn schema_mismatch_is_rejected() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path().to_path_buf());
        store.initialize().unwrap();

        let mut index = ProjectIndex::empty("demo", PathBuf::from("."));
        index.schema_version = SCHEMA_VERSION + 1;
        store.save_json(INDEX_FILE, &index).unwrap();

        assert!(matches!(
            store.load_index(),
            Err(IndexError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn missing_snapshot_is_not_found() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path().to_path_buf());
        assert!(matches!(store.load_index(), Err(IndexError::NotFound { .. })));
    }

    #[test]
    fn lock_is_exclusive() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path().to_path_buf());

        let held = store.lock().unwrap();
        assert!(matches!(store.lock(), Err(IndexError::CacheLocked { .. })));
        drop(held);
        assert!(store.lock().is_ok());
    }

    #[test]
    fn parse_cache_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path().to_path_buf());
        store.initialize().unwrap();

        store.save_parse_cache("abc123", &vec![1u32, 2, 3]).unwrap();
        let back: Option<Vec<u32>> = store.load_parse_cache("abc123");
        assert_eq!(back, Some(vec![1, 2, 3]));
        let missing: Option<Vec<u32>> = store.load_parse_cache("nope");
        assert!(missing.is_none());
    }
}
