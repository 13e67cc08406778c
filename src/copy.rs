//! Flat copying of libraries into the bundle directory.

use log::info;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::CollectError;

/// Create `dir` and any missing parents. Existing contents are left alone.
pub fn ensure_dir(dir: &Path) -> Result<(), CollectError> {
    fs::create_dir_all(dir)
        .map_err(|e| CollectError::filesystem("Failed to create directory", dir, e))
}

/// Copy `source` into `dest_dir`, keeping only its file name.
///
/// Symlinks are followed, so the bundle gets the real library contents
/// under the name the loader asked for. An existing file of the same name
/// is overwritten. Returns the destination path.
pub fn copy_flat(source: &Path, dest_dir: &Path) -> Result<PathBuf, CollectError> {
    let file_name = source.file_name().ok_or_else(|| {
        CollectError::filesystem(
            "Library path has no file name",
            source,
            io::Error::from(io::ErrorKind::InvalidInput),
        )
    })?;
    let dest_path = dest_dir.join(file_name);

    info!("Copying {} -> {}", source.display(), dest_path.display());
    fs::copy(source, &dest_path)
        .map_err(|e| CollectError::filesystem("Failed to copy library", source, e))?;

    Ok(dest_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_dir_nested_and_idempotent() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("a/b/c/lib");

        ensure_dir(&dir).unwrap();
        fs::write(dir.join("keep.so"), b"old").unwrap();
        ensure_dir(&dir).unwrap();

        assert!(dir.is_dir());
        assert_eq!(fs::read(dir.join("keep.so")).unwrap(), b"old");
    }

    #[test]
    fn test_ensure_dir_over_file_fails() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("lib");
        fs::write(&file, b"not a dir").unwrap();

        let result = ensure_dir(&file.join("sub"));
        assert!(matches!(result, Err(CollectError::Filesystem { .. })));
    }

    #[test]
    fn test_copy_flat_drops_directories() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("usr/lib/x86_64-linux-gnu/libfoo.so.1");
        fs::create_dir_all(src.parent().unwrap()).unwrap();
        fs::write(&src, b"foo").unwrap();
        let dest_dir = temp.path().join("lib");
        fs::create_dir_all(&dest_dir).unwrap();

        let dest = copy_flat(&src, &dest_dir).unwrap();

        assert_eq!(dest, dest_dir.join("libfoo.so.1"));
        assert_eq!(fs::read(&dest).unwrap(), b"foo");
    }

    #[test]
    fn test_copy_flat_overwrites() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("libbar.so");
        fs::write(&src, b"new").unwrap();
        let dest_dir = temp.path().join("lib");
        fs::create_dir_all(&dest_dir).unwrap();
        fs::write(dest_dir.join("libbar.so"), b"stale contents").unwrap();

        copy_flat(&src, &dest_dir).unwrap();

        assert_eq!(fs::read(dest_dir.join("libbar.so")).unwrap(), b"new");
    }

    #[test]
    fn test_copy_flat_follows_symlink() {
        let temp = TempDir::new().unwrap();
        let real = temp.path().join("libz.so.1.3");
        fs::write(&real, b"zlib").unwrap();
        let link = temp.path().join("libz.so.1");
        std::os::unix::fs::symlink("libz.so.1.3", &link).unwrap();
        let dest_dir = temp.path().join("lib");
        fs::create_dir_all(&dest_dir).unwrap();

        let dest = copy_flat(&link, &dest_dir).unwrap();

        assert!(!dest.is_symlink());
        assert_eq!(fs::read(&dest).unwrap(), b"zlib");
    }

    #[test]
    fn test_copy_flat_missing_source() {
        let temp = TempDir::new().unwrap();
        let result = copy_flat(&temp.path().join("vanished.so"), temp.path());
        match result {
            Err(CollectError::Filesystem { path, source, .. }) => {
                assert!(path.ends_with("vanished.so"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected Filesystem error, got {:?}", other),
        }
    }

    #[test]
    fn test_copy_flat_no_file_name() {
        let temp = TempDir::new().unwrap();
        let result = copy_flat(Path::new("/"), temp.path());
        assert!(matches!(result, Err(CollectError::Filesystem { .. })));
    }
}
