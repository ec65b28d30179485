//! Scope directory archiving

use fcache_core::{Error, Result};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;

/// Compresses a directory tree into an archive file.
///
/// Behind a trait so retention can keep its delete-even-if-archiving-fails
/// contract under test with a failing implementation.
pub trait Archiver: Send + Sync {
    /// Compress the directory at `src` into an archive at `dst`
    fn compress_dir(&self, src: &Path, dst: &Path) -> Result<()>;
}

/// `Archiver` producing `.zip` files
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiver;

impl Archiver for ZipArchiver {
    fn compress_dir(&self, src: &Path, dst: &Path) -> Result<()> {
        let file = fs::File::create(dst).map_err(|e| Error::io(e, dst, "create"))?;
        let mut zip = zip::ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for entry in WalkDir::new(src) {
            let entry = entry.map_err(|e| Error::archive(src, format!("walk failed: {e}")))?;
            let path = entry.path();
            let rel = path
                .strip_prefix(src)
                .map_err(|e| Error::archive(src, format!("path outside archive root: {e}")))?;
            if rel.as_os_str().is_empty() {
                continue;
            }
            // Zip entry names always use forward slashes.
            let name = rel.to_string_lossy().replace('\\', "/");
            if path.is_dir() {
                zip.add_directory(name, options)
                    .map_err(|e| Error::archive(src, format!("add directory failed: {e}")))?;
            } else {
                zip.start_file(name, options)
                    .map_err(|e| Error::archive(src, format!("add file failed: {e}")))?;
                let mut f = fs::File::open(path).map_err(|e| Error::io(e, path, "open"))?;
                std::io::copy(&mut f, &mut zip).map_err(|e| Error::io(e, path, "copy"))?;
            }
        }

        zip.finish()
            .map_err(|e| Error::archive(src, format!("zip finalize failed: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn compresses_a_directory_tree() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("scope_20230101");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("posts.json"), b"[1,2]").unwrap();
        fs::write(src.join("nested/users.json"), b"[]").unwrap();

        let dst = tmp.path().join("scope_20230101.zip");
        ZipArchiver.compress_dir(&src, &dst).unwrap();

        let reader = fs::File::open(&dst).unwrap();
        let mut archive = zip::ZipArchive::new(reader).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.iter().any(|n| n == "posts.json"));
        assert!(names.iter().any(|n| n == "nested/users.json"));
    }

    #[test]
    fn missing_source_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let dst = tmp.path().join("gone.zip");
        let err = ZipArchiver
            .compress_dir(&tmp.path().join("gone"), &dst)
            .unwrap_err();
        assert!(matches!(err, Error::Archive { .. }));
    }
}
