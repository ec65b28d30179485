//! Filesystem ports
//!
//! `FileOps` and `DirOps` are the side-effecting boundaries the cache depends
//! on. The system adapters delegate straight to `std::fs`; tests substitute
//! recording fakes to assert call ordering without touching the disk.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// File-level operations
pub trait FileOps: Send + Sync {
    /// Whether a file exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Read the whole file as text
    fn read(&self, path: &Path) -> Result<String>;

    /// Write `text` to `path`, replacing any previous content
    fn write(&self, path: &Path, text: &str) -> Result<()>;

    /// Delete the file at `path`
    fn delete(&self, path: &Path) -> Result<()>;

    /// Creation timestamp of the file at `path`
    fn created_at(&self, path: &Path) -> Result<DateTime<Utc>>;
}

/// Directory-level operations
pub trait DirOps: Send + Sync {
    /// Whether a directory exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Create the directory at `path`, including missing parents
    fn create(&self, path: &Path) -> Result<()>;

    /// Delete the directory at `path` and everything under it
    fn remove_all(&self, path: &Path) -> Result<()>;

    /// Paths of the immediate subdirectories of `path`
    fn list_dirs(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Paths of the immediate plain files under `path`
    fn list_files(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// The process working directory
    fn current_dir(&self) -> Result<PathBuf>;
}

/// `FileOps` backed by `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemFileOps;

impl FileOps for SystemFileOps {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| Error::io(e, path, "read"))
    }

    fn write(&self, path: &Path, text: &str) -> Result<()> {
        fs::write(path, text).map_err(|e| Error::io(e, path, "write"))
    }

    fn delete(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).map_err(|e| Error::io(e, path, "remove_file"))
    }

    fn created_at(&self, path: &Path) -> Result<DateTime<Utc>> {
        let meta = fs::metadata(path).map_err(|e| Error::io(e, path, "metadata"))?;
        // Birth time is not available on every filesystem; fall back to mtime,
        // which for cache entries (written once, never appended) is the same
        // instant.
        let stamp = meta
            .created()
            .or_else(|_| meta.modified())
            .map_err(|e| Error::io(e, path, "created"))?;
        Ok(DateTime::<Utc>::from(stamp))
    }
}

/// `DirOps` backed by `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDirOps;

impl SystemDirOps {
    fn list(path: &Path, want_dirs: bool) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for entry in fs::read_dir(path).map_err(|e| Error::io(e, path, "read_dir"))? {
            let entry = entry.map_err(|e| Error::io(e, path, "read_dir_entry"))?;
            let p = entry.path();
            if p.is_dir() == want_dirs {
                found.push(p);
            }
        }
        Ok(found)
    }
}

impl DirOps for SystemDirOps {
    fn exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(|e| Error::io(e, path, "create_dir_all"))
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        fs::remove_dir_all(path).map_err(|e| Error::io(e, path, "remove_dir_all"))
    }

    fn list_dirs(&self, path: &Path) -> Result<Vec<PathBuf>> {
        Self::list(path, true)
    }

    fn list_files(&self, path: &Path) -> Result<Vec<PathBuf>> {
        Self::list(path, false)
    }

    fn current_dir(&self) -> Result<PathBuf> {
        std::env::current_dir().map_err(|e| Error::io_no_path(e, "current_dir"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn system_file_ops_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("entry.json");
        let ops = SystemFileOps;

        assert!(!ops.exists(&path));
        ops.write(&path, "payload").unwrap();
        assert!(ops.exists(&path));
        assert_eq!(ops.read(&path).unwrap(), "payload");

        let created = ops.created_at(&path).unwrap();
        let age = Utc::now().signed_duration_since(created);
        assert!(age.num_seconds().abs() < 60);

        ops.delete(&path).unwrap();
        assert!(!ops.exists(&path));
    }

    #[test]
    fn system_dir_ops_lists_dirs_and_files_separately() {
        let tmp = TempDir::new().unwrap();
        let ops = SystemDirOps;

        ops.create(&tmp.path().join("a/b")).unwrap();
        std::fs::write(tmp.path().join("f.zip"), b"").unwrap();

        let dirs = ops.list_dirs(tmp.path()).unwrap();
        assert_eq!(dirs, vec![tmp.path().join("a")]);
        let files = ops.list_files(tmp.path()).unwrap();
        assert_eq!(files, vec![tmp.path().join("f.zip")]);
    }

    #[test]
    fn remove_all_is_recursive() {
        let tmp = TempDir::new().unwrap();
        let ops = SystemDirOps;
        let nested = tmp.path().join("x/y");
        ops.create(&nested).unwrap();
        std::fs::write(nested.join("f"), b"data").unwrap();

        ops.remove_all(&tmp.path().join("x")).unwrap();
        assert!(!ops.exists(&tmp.path().join("x")));
    }
}
