//! File-backed TTL caching for fcache
//!
//! This crate provides the core cache: given a key and a "produce value"
//! closure, [`FileCache`] returns the previously stored value while it is
//! still fresh and otherwise invokes the producer, persists the result as a
//! file and returns it.
//!
//! All side effects go through small capability ports — [`Clock`],
//! [`FileOps`], [`DirOps`] and [`Codec`] — with system adapters supplied for
//! each, so expiry arithmetic and failure handling are testable without
//! touching the real filesystem.
//!
//! # Example
//!
//! ```no_run
//! use fcache_core::{FileCache, ONE_WEEK_SECS};
//!
//! let cache = FileCache::new("cache");
//! let posts: Vec<String> = cache.get("posts", ONE_WEEK_SECS, || {
//!     vec!["qui est esse".to_string()]
//! })?;
//! # Ok::<(), fcache_core::Error>(())
//! ```

mod cache;
mod clock;
mod codec;
mod error;
mod fs;

pub use cache::{DEFAULT_EXTENSION, FileCache, ONE_WEEK_SECS};
pub use clock::{Clock, SystemClock};
pub use codec::{Codec, JsonCodec};
pub use error::{BoxedError, Error, Result};
pub use fs::{DirOps, FileOps, SystemDirOps, SystemFileOps};
