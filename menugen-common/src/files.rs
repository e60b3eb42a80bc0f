//! Atomic file publication.
//!
//! Files are written to a temporary sibling first and renamed into place, so a
//! reader never observes a partially written file.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// Result of [`write_new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    AlreadyExists,
}

/// Writes `bytes` to `dir/file_name`, replacing any existing file.
pub async fn write_atomic(dir: &Path, file_name: &str, bytes: Vec<u8>) -> io::Result<PathBuf> {
    let dir = dir.to_path_buf();
    let target = dir.join(file_name);
    tokio::task::spawn_blocking(move || {
        let temp = stage(&dir, &bytes)?;
        temp.persist(&target).map_err(|e| e.error)?;
        Ok(target)
    })
    .await
    .map_err(io::Error::other)?
}

/// Writes `bytes` to `dir/file_name` unless the file is already there. Of two
/// concurrent writers exactly one gets [`WriteOutcome::Written`].
pub async fn write_new(dir: &Path, file_name: &str, bytes: Vec<u8>) -> io::Result<WriteOutcome> {
    let dir = dir.to_path_buf();
    let target = dir.join(file_name);
    tokio::task::spawn_blocking(move || {
        if target.exists() {
            return Ok(WriteOutcome::AlreadyExists);
        }
        let temp = stage(&dir, &bytes)?;
        match temp.persist_noclobber(&target) {
            Ok(_) => Ok(WriteOutcome::Written),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                Ok(WriteOutcome::AlreadyExists)
            }
            Err(e) => Err(e.error),
        }
    })
    .await
    .map_err(io::Error::other)?
}

fn stage(dir: &Path, bytes: &[u8]) -> io::Result<NamedTempFile> {
    std::fs::create_dir_all(dir)?;
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    Ok(temp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_atomic_creates_directory_and_replaces() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("7");

        write_atomic(&dir, "logo.jpg", b"first".to_vec()).await.unwrap();
        let path = write_atomic(&dir, "logo.jpg", b"second".to_vec()).await.unwrap();

        assert_eq!(std::fs::read(path).unwrap(), b"second");
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_write_new_keeps_first_content() {
        let root = tempfile::tempdir().unwrap();

        let first = write_new(root.path(), "index.html", b"one".to_vec()).await.unwrap();
        let second = write_new(root.path(), "index.html", b"two".to_vec()).await.unwrap();

        assert_eq!(first, WriteOutcome::Written);
        assert_eq!(second, WriteOutcome::AlreadyExists);
        assert_eq!(std::fs::read(root.path().join("index.html")).unwrap(), b"one");
    }

    #[tokio::test]
    async fn test_concurrent_write_new_has_single_winner() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().to_path_buf();

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let dir = dir.clone();
                tokio::spawn(async move {
                    write_new(&dir, "index.html", format!("page {i}").into_bytes()).await
                })
            })
            .collect();

        let mut written = 0;
        for task in tasks {
            if task.await.unwrap().unwrap() == WriteOutcome::Written {
                written += 1;
            }
        }

        assert_eq!(written, 1);
        let content = std::fs::read_to_string(dir.join("index.html")).unwrap();
        assert!(content.starts_with("page "));
    }
}
