//! Scoped retention layer for fcache
//!
//! A [`ScopedCache`] wraps a [`FileCache`](fcache_core::FileCache) and
//! namespaces its keys under a dated `{scope}_{YYYYMMDD}` directory. When
//! the scope closes — explicitly via [`ScopedCache::close`] or implicitly on
//! drop — a retention pass archives scope directories beyond the retention
//! limit into `.zip` files and prunes archives beyond the same limit,
//! bounding disk growth over repeated runs.
//!
//! # Example
//!
//! ```no_run
//! use fcache_core::{FileCache, SystemClock};
//! use fcache_scope::{ScopeStamp, ScopedCache};
//!
//! // Compute the stamp once per process run and share it between scopes.
//! let stamp = ScopeStamp::from_clock(&SystemClock);
//!
//! let mut scope = ScopedCache::new("posts", stamp, FileCache::new("cache"))?;
//! let latest: Vec<String> = scope.get("latest", 3600, || {
//!     vec!["qui est esse".to_string()]
//! })?;
//! let report = scope.close()?;
//! println!("archived {} directories", report.archived.len());
//! # Ok::<(), fcache_core::Error>(())
//! ```

mod archive;
mod manager;

pub use archive::{Archiver, ZipArchiver};
pub use manager::{
    RETENTION_LIMIT, RetentionPolicy, RetentionReport, ScopeStamp, ScopedCache, SkippedItem,
};
