//! TTL-keyed file cache
//!
//! `FileCache` persists one file per key under a base directory. `get_with`
//! returns the stored value while it is still fresh and otherwise invokes the
//! caller's producer, writes the result and returns it.
//!
//! # Expiry
//!
//! An entry is expired when `now >= created_at + ttl` — the boundary is
//! inclusive, so a TTL of 0 means every call after the one that wrote the
//! file recomputes. A negative TTL is treated the same way.
//!
//! # Locking
//!
//! One mutex per cache instance serializes the physical file reads and
//! writes across all keys. It is deliberately coarse: concurrent `get_with`
//! calls for different keys will not overlap their I/O sections, though
//! producer computation may. Nothing is locked across processes; two
//! processes sharing a directory can race.

use crate::clock::{Clock, SystemClock};
use crate::codec::{Codec, JsonCodec};
use crate::fs::{DirOps, FileOps, SystemDirOps, SystemFileOps};
use crate::{BoxedError, Error, Result};
use chrono::Duration;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Extension given to cache entry files unless overridden
pub const DEFAULT_EXTENSION: &str = ".json";

/// One week, a sensible default TTL for slow-moving payloads
pub const ONE_WEEK_SECS: i64 = 604_800;

/// File-backed TTL cache over a single directory
pub struct FileCache<J: Codec = JsonCodec> {
    base_dir: PathBuf,
    extension: String,
    clock: Arc<dyn Clock>,
    files: Arc<dyn FileOps>,
    dirs: Arc<dyn DirOps>,
    codec: J,
    io_lock: Mutex<()>,
}

impl FileCache<JsonCodec> {
    /// Create a JSON cache rooted at `base_dir`, backed by the system clock
    /// and filesystem. The directory is created lazily on first write.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self::with_ports(
            base_dir,
            Arc::new(SystemClock),
            Arc::new(SystemFileOps),
            Arc::new(SystemDirOps),
            JsonCodec,
        )
    }

    /// Create a JSON cache rooted at the process working directory
    pub fn in_current_dir() -> Result<Self> {
        let base = SystemDirOps.current_dir()?;
        Ok(Self::new(base))
    }
}

impl<J: Codec> FileCache<J> {
    /// Create a cache with explicit ports
    #[must_use]
    pub fn with_ports(
        base_dir: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
        files: Arc<dyn FileOps>,
        dirs: Arc<dyn DirOps>,
        codec: J,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            extension: DEFAULT_EXTENSION.to_string(),
            clock,
            files,
            dirs,
            codec,
            io_lock: Mutex::new(()),
        }
    }

    /// Override the entry file extension (include the leading dot)
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Directory this cache writes entries under
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// The clock port
    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// The file operations port
    #[must_use]
    pub fn file_ops(&self) -> Arc<dyn FileOps> {
        Arc::clone(&self.files)
    }

    /// The directory operations port
    #[must_use]
    pub fn dir_ops(&self) -> Arc<dyn DirOps> {
        Arc::clone(&self.dirs)
    }

    /// Return the cached value for `key` if it is younger than `ttl_secs`,
    /// otherwise invoke `producer`, persist its result and return it.
    ///
    /// Producer errors propagate as [`Error::Producer`] and leave no partial
    /// entry behind. A present but undecodable payload propagates as
    /// [`Error::Codec`]; the cache never masks corruption by recomputing.
    pub fn get_with<T, P, E>(&self, key: &str, ttl_secs: i64, producer: P) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        P: FnOnce() -> std::result::Result<T, E>,
        E: Into<BoxedError>,
    {
        let path = self.entry_path(key);

        if self.files.exists(&path) {
            if self.is_expired(&path, ttl_secs)? {
                tracing::debug!(key, path = %path.display(), "Cache entry expired; refreshing");
                self.files.delete(&path)?;
            } else {
                tracing::debug!(key, "Cache hit");
                let text = {
                    let _guard = self.io_guard();
                    self.files.read(&path)?
                };
                return self.codec.decode(&text);
            }
        } else {
            tracing::debug!(key, "Cache miss");
        }

        let value = producer().map_err(Error::producer)?;
        let text = self.codec.encode(&value)?;

        if let Some(parent) = path.parent() {
            if !self.dirs.exists(parent) {
                self.dirs.create(parent)?;
            }
        }
        {
            let _guard = self.io_guard();
            self.files.write(&path, &text)?;
        }
        Ok(value)
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

    /// Delete the entry for `key`. An absent entry is a no-op.
    pub fn remove(&self, key: &str) -> Result<()> {
        let path = self.entry_path(key);
        if self.files.exists(&path) {
            let _guard = self.io_guard();
            self.files.delete(&path)?;
        }
        Ok(())
    }

    /// Delete the base directory and every entry under it. Subsequent `get`
    /// calls recreate the directory lazily.
    pub fn clear(&self) -> Result<()> {
        if self.dirs.exists(&self.base_dir) {
            let _guard = self.io_guard();
            self.dirs.remove_all(&self.base_dir)?;
        }
        Ok(())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{key}{}", self.extension))
    }

    fn is_expired(&self, path: &Path, ttl_secs: i64) -> Result<bool> {
        if ttl_secs <= 0 {
            return Ok(true);
        }
        let created = self.files.created_at(path)?;
        // A TTL too large for chrono arithmetic can never elapse.
        let Some(ttl) = Duration::try_seconds(ttl_secs) else {
            return Ok(false);
        };
        let Some(deadline) = created.checked_add_signed(ttl) else {
            return Ok(false);
        };
        Ok(self.clock.now() >= deadline)
    }

    fn io_guard(&self) -> MutexGuard<'_, ()> {
        // A poisoned lock only means another thread panicked mid-I/O; the
        // guard itself carries no data worth invalidating.
        self.io_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
