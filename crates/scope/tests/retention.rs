//! End-to-end coverage for scoped caching and retention over a real
//! filesystem.

use chrono::{DateTime, Duration, Utc};
use fcache_core::{Clock, FileCache, JsonCodec, SystemDirOps, SystemFileOps};
use fcache_scope::{ScopeStamp, ScopedCache};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Post {
    id: u64,
    user_id: u64,
    title: String,
}

fn sample_posts() -> Vec<Post> {
    vec![
        Post {
            id: 1,
            user_id: 1,
            title: "sunt aut facere repellat".to_string(),
        },
        Post {
            id: 2,
            user_id: 2,
            title: "qui est esse".to_string(),
        },
    ]
}

struct FakeClock {
    now: Mutex<DateTime<Utc>>,
}

impl FakeClock {
    fn starting_now() -> Self {
        Self {
            now: Mutex::new(Utc::now()),
        }
    }

    fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock().unwrap();
        *now += Duration::seconds(secs);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

fn todays_scope(root: &Path, name: &str) -> ScopedCache {
    let cache = FileCache::new(root);
    let stamp = ScopeStamp::from_clock(cache.clock().as_ref());
    ScopedCache::new(name, stamp, cache).unwrap()
}

#[test]
fn scoped_payload_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let scope = todays_scope(tmp.path(), "posts");

    let first: Vec<Post> = scope.get("all", 3600, sample_posts).unwrap();
    let second: Vec<Post> = scope.get("all", 3600, Vec::new).unwrap();
    assert_eq!(first, sample_posts());
    assert_eq!(second, sample_posts(), "fresh entry must win over the producer");
}

#[test]
fn expired_entry_is_recomputed_after_the_ttl() {
    let tmp = TempDir::new().unwrap();
    let clock = Arc::new(FakeClock::starting_now());
    let cache = FileCache::with_ports(
        tmp.path(),
        Arc::clone(&clock) as Arc<dyn Clock>,
        Arc::new(SystemFileOps),
        Arc::new(SystemDirOps),
        JsonCodec,
    );
    let stamp = ScopeStamp::from_clock(clock.as_ref());
    let scope = ScopedCache::new("posts", stamp, cache).unwrap();

    let first: String = scope.get("headline", 1, || "X".to_string()).unwrap();
    assert_eq!(first, "X");

    clock.advance_secs(2);
    let second: String = scope.get("headline", 1, || "Y".to_string()).unwrap();
    assert_eq!(second, "Y", "entry past its TTL must be recomputed");

    let entry = tmp
        .path()
        .join(format!("posts_{stamp}"))
        .join("headline.json");
    assert_eq!(fs::read_to_string(entry).unwrap(), "\"Y\"");
}

#[test]
fn closing_the_sixth_scope_archives_and_removes_the_oldest_directories() {
    let tmp = TempDir::new().unwrap();
    for d in 1..=5 {
        let dir = tmp.path().join(format!("posts_2023010{d}"));
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("all.json"), b"[]").unwrap();
    }
    fs::create_dir(tmp.path().join("unrelated")).unwrap();

    // The scope's own directory is the sixth and newest.
    let mut scope = todays_scope(tmp.path(), "posts");
    let _: Vec<Post> = scope.get("all", 3600, sample_posts).unwrap();

    let report = scope.close().unwrap();

    // Six matching directories, limit three: the three oldest get archived
    // and removed, the scope's own directory survives.
    assert_eq!(report.archived.len(), 3);
    assert_eq!(report.removed_dirs.len(), 3);
    assert!(report.skipped.is_empty());
    for d in 1..=3 {
        assert!(!tmp.path().join(format!("posts_2023010{d}")).exists());
        assert!(tmp.path().join(format!("posts_2023010{d}.zip")).is_file());
    }
    for d in 4..=5 {
        assert!(tmp.path().join(format!("posts_2023010{d}")).is_dir());
    }
    assert!(scope.scope_dir().is_dir());
    assert!(tmp.path().join("unrelated").is_dir());
}

#[test]
fn archive_pruning_keeps_the_three_newest_zips() {
    let tmp = TempDir::new().unwrap();
    for d in 1..=5 {
        fs::write(tmp.path().join(format!("posts_2023010{d}.zip")), b"zip").unwrap();
    }

    let mut scope = todays_scope(tmp.path(), "posts");
    let report = scope.close().unwrap();

    assert_eq!(report.removed_archives.len(), 2);
    for d in 1..=2 {
        assert!(!tmp.path().join(format!("posts_2023010{d}.zip")).exists());
    }
    for d in 3..=5 {
        assert!(tmp.path().join(format!("posts_2023010{d}.zip")).is_file());
    }
}

#[test]
fn dropping_an_unclosed_scope_still_runs_retention() {
    let tmp = TempDir::new().unwrap();
    for d in 1..=5 {
        fs::create_dir(tmp.path().join(format!("posts_2023010{d}"))).unwrap();
    }

    {
        let _scope = todays_scope(tmp.path(), "posts");
        // dropped without close()
    }

    assert!(!tmp.path().join("posts_20230101").exists());
    assert!(!tmp.path().join("posts_20230102").exists());
    assert!(tmp.path().join("posts_20230101.zip").is_file());
    assert!(tmp.path().join("posts_20230102.zip").is_file());
    assert!(tmp.path().join("posts_20230103").is_dir());
}
