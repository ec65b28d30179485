//! Dated scope management and retention
//!
//! A [`ScopedCache`] namespaces cache entries under a `{scope}_{YYYYMMDD}`
//! directory and, on close, bounds disk growth: scope directories beyond the
//! retention limit are compressed into archives and removed, and archives
//! beyond the limit are deleted outright. The scope's own directory is
//! always among the newest kept, so retention never touches the live cache.

use crate::archive::{Archiver, ZipArchiver};
use chrono::NaiveDate;
use fcache_core::{
    BoxedError, Clock, Codec, DirOps, Error, FileCache, FileOps, JsonCodec, Result,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Maximum count of live scope directories or archives kept before pruning
pub const RETENTION_LIMIT: usize = 3;

/// Date stamp naming a scope directory, formatted `YYYYMMDD`.
///
/// Compute it once per process run and pass the same value to every scope
/// you construct; entries written through one run then share directories
/// even across midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeStamp(NaiveDate);

impl ScopeStamp {
    /// Stamp for the clock's current date
    #[must_use]
    pub fn from_clock(clock: &dyn Clock) -> Self {
        Self(clock.now().date_naive())
    }

    /// Stamp for an explicit date
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for ScopeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y%m%d"))
    }
}

/// Retention configuration for a scope
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    /// How many scope directories and how many archives to keep
    pub keep: usize,
    /// Extension of archive files, including the leading dot
    pub archive_extension: String,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            keep: RETENTION_LIMIT,
            archive_extension: ".zip".to_string(),
        }
    }
}

/// An item the retention pass could not process and skipped over
#[derive(Debug, Clone)]
pub struct SkippedItem {
    /// Path of the directory or archive that failed
    pub path: PathBuf,
    /// Why it was skipped
    pub reason: String,
}

/// Outcome of one retention pass
#[derive(Debug, Clone, Default)]
pub struct RetentionReport {
    /// Archives created from pruned scope directories
    pub archived: Vec<PathBuf>,
    /// Scope directories deleted
    pub removed_dirs: Vec<PathBuf>,
    /// Old archives deleted
    pub removed_archives: Vec<PathBuf>,
    /// Items that failed and were skipped, never fatally
    pub skipped: Vec<SkippedItem>,
}

/// A cache whose entries live under a dated, retention-managed scope
/// directory.
///
/// The retention pass runs exactly once: either through [`close`]
/// (returning its [`RetentionReport`]) or, if the scope is dropped without
/// closing, best-effort from `Drop` with failures logged.
///
/// [`close`]: Self::close
pub struct ScopedCache<J: Codec = JsonCodec> {
    name: String,
    stamp: ScopeStamp,
    cache: FileCache<J>,
    files: Arc<dyn FileOps>,
    dirs: Arc<dyn DirOps>,
    archiver: Arc<dyn Archiver>,
    policy: RetentionPolicy,
    closed: bool,
}

impl<J: Codec> fmt::Debug for ScopedCache<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedCache")
            .field("name", &self.name)
            .field("stamp", &self.stamp)
            .field("policy", &self.policy)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl ScopedCache<JsonCodec> {
    /// Create a scope over a JSON cache rooted at the process working
    /// directory
    pub fn open(name: impl Into<String>, stamp: ScopeStamp) -> Result<Self> {
        Self::new(name, stamp, FileCache::in_current_dir()?)
    }
}

impl<J: Codec> ScopedCache<J> {
    /// Create a scope named `name` over `cache`.
    ///
    /// Fails with [`Error::Configuration`] if the name is empty or
    /// whitespace-only; no directory is touched in that case.
    pub fn new(name: impl Into<String>, stamp: ScopeStamp, cache: FileCache<J>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::configuration("scope name must not be empty"));
        }
        let files = cache.file_ops();
        let dirs = cache.dir_ops();
        Ok(Self {
            name,
            stamp,
            cache,
            files,
            dirs,
            archiver: Arc::new(ZipArchiver),
            policy: RetentionPolicy::default(),
            closed: false,
        })
    }

    /// Override the archiver
    #[must_use]
    pub fn with_archiver(mut self, archiver: Arc<dyn Archiver>) -> Self {
        self.archiver = archiver;
        self
    }

    /// Override the retention policy
    #[must_use]
    pub fn with_policy(mut self, policy: RetentionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Name of this scope's directory, `{name}_{stamp}`
    #[must_use]
    pub fn dir_name(&self) -> String {
        format!("{}_{}", self.name, self.stamp)
    }

    /// Full path of this scope's directory
    #[must_use]
    pub fn scope_dir(&self) -> PathBuf {
        self.cache.base_dir().join(self.dir_name())
    }

    /// [`FileCache::get_with`] with the key namespaced under this scope's
    /// directory, which is created first if missing.
    ///
    /// Fails with [`Error::Configuration`] once the scope has been closed;
    /// a closed scope never reopens its retired directory.
    pub fn get_with<T, P, E>(&self, key: &str, ttl_secs: i64, producer: P) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        P: FnOnce() -> std::result::Result<T, E>,
        E: Into<BoxedError>,
    {
        if self.closed {
            return Err(Error::configuration("scope is closed"));
        }
        let dir = self.scope_dir();
        if !self.dirs.exists(&dir) {
            self.dirs.create(&dir)?;
        }
        let scoped_key = format!("{}/{key}", self.dir_name());
        self.cache.get_with(&scoped_key, ttl_secs, producer)
    }

    /// [`get_with`](Self::get_with) for producers that cannot fail
    pub fn get<T, P>(&self, key: &str, ttl_secs: i64, producer: P) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        P: FnOnce() -> T,
    {
        self.get_with(key, ttl_secs, || {
            Ok::<_, std::convert::Infallible>(producer())
        })
    }

    /// Run the retention pass and mark the scope closed.
    ///
    /// Idempotent: the pass runs once; later calls return an empty report.
    /// Per-item failures are logged, recorded in the report and skipped; a
    /// failure enumerating the working location itself is logged and
    /// re-raised.
    pub fn close(&mut self) -> Result<RetentionReport> {
        if self.closed {
            return Ok(RetentionReport::default());
        }
        self.closed = true;

        tracing::info!(scope = %self.name, "Starting retention pass");
        match self.run_retention() {
            Ok(report) => {
                tracing::info!(
                    scope = %self.name,
                    archived = report.archived.len(),
                    removed_dirs = report.removed_dirs.len(),
                    removed_archives = report.removed_archives.len(),
                    skipped = report.skipped.len(),
                    "Retention pass complete"
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!(scope = %self.name, error = %e, "Retention pass failed");
                Err(e)
            }
        }
    }

    fn run_retention(&self) -> Result<RetentionReport> {
        let root = self.cache.base_dir().to_path_buf();
        let mut report = RetentionReport::default();

        // Phase 1: archive and remove the oldest scope directories beyond
        // the limit. Lexicographic order is chronological because the names
        // are date-stamped.
        let mut scope_dirs: Vec<PathBuf> = self
            .dirs
            .list_dirs(&root)?
            .into_iter()
            .filter(|p| name_contains(p, &self.name))
            .collect();
        scope_dirs.sort();

        let excess = scope_dirs.len().saturating_sub(self.policy.keep);
        for dir in scope_dirs.into_iter().take(excess) {
            let archive = append_extension(&dir, &self.policy.archive_extension);
            match self.archiver.compress_dir(&dir, &archive) {
                Ok(()) => {
                    tracing::info!(dir = %dir.display(), "Archived scope directory");
                    report.archived.push(archive);
                }
                Err(e) => {
                    // The entries are already durably on disk; a failed
                    // archive must not keep the directory alive.
                    tracing::warn!(
                        dir = %dir.display(),
                        error = %e,
                        "Failed to archive scope directory"
                    );
                    report.skipped.push(SkippedItem {
                        path: archive,
                        reason: e.to_string(),
                    });
                }
            }
            match self.dirs.remove_all(&dir) {
                Ok(()) => report.removed_dirs.push(dir),
                Err(e) => {
                    tracing::warn!(
                        dir = %dir.display(),
                        error = %e,
                        "Failed to delete scope directory; skipping"
                    );
                    report.skipped.push(SkippedItem {
                        path: dir,
                        reason: e.to_string(),
                    });
                }
            }
        }

        // Phase 2: delete the oldest archives beyond the limit.
        let mut archives: Vec<PathBuf> = self
            .dirs
            .list_files(&root)?
            .into_iter()
            .filter(|p| {
                name_contains(p, &self.name) && name_contains(p, &self.policy.archive_extension)
            })
            .collect();
        archives.sort();

        let excess = archives.len().saturating_sub(self.policy.keep);
        for archive in archives.into_iter().take(excess) {
            match self.files.delete(&archive) {
                Ok(()) => {
                    tracing::info!(archive = %archive.display(), "Deleted old archive");
                    report.removed_archives.push(archive);
                }
                Err(e) => {
                    tracing::warn!(
                        archive = %archive.display(),
                        error = %e,
                        "Failed to delete archive; skipping"
                    );
                    report.skipped.push(SkippedItem {
                        path: archive,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}

impl<J: Codec> Drop for ScopedCache<J> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        tracing::info!(scope = %self.name, "Starting retention pass");
        if let Err(e) = self.run_retention() {
            tracing::error!(scope = %self.name, error = %e, "Retention pass failed during drop");
        }
    }
}

fn name_contains(path: &Path, needle: &str) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().contains(needle))
        .unwrap_or(false)
}

fn append_extension(path: &Path, extension: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(extension);
    PathBuf::from(os)
}
