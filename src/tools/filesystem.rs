//! Filesystem collaborator for TaskPilot
//!
//! Whole-file reads and writes. Relative paths resolve against the configured
//! working directory. There is no workspace confinement: paths are trusted.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::{PilotError, Result};

/// File access used by the `read_file` and `patch` actions.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Read the full contents of `path`.
    async fn read(&self, path: &str) -> Result<String>;

    /// Overwrite `path` with `content`, creating it if absent.
    async fn write(&self, path: &str, content: &str) -> Result<()>;
}

/// Local disk implementation backed by `tokio::fs`.
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    root: PathBuf,
}

impl LocalFileSystem {
    /// Create a filesystem resolving relative paths against `root`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        }
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn read(&self, path: &str) -> Result<String> {
        let full_path = self.resolve(path);
        tokio::fs::read_to_string(&full_path).await.map_err(|e| {
            PilotError::Tool(format!(
                "Failed to read file '{}': {}",
                full_path.display(),
                e
            ))
        })
    }

    async fn write(&self, path: &str, content: &str) -> Result<()> {
        let full_path = self.resolve(path);
        if let Some(parent) = full_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    PilotError::Tool(format!(
                        "Failed to create directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        tokio::fs::write(&full_path, content).await.map_err(|e| {
            PilotError::Tool(format!(
                "Failed to write file '{}': {}",
                full_path.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_write_then_read_relative() {
        let dir = tempdir().unwrap();
        let fs = LocalFileSystem::new(dir.path().to_path_buf());

        fs.write("notes/hello.txt", "hi there").await.unwrap();
        assert_eq!(fs.read("notes/hello.txt").await.unwrap(), "hi there");
        assert!(dir.path().join("notes/hello.txt").exists());
    }

    #[tokio::test]
    async fn test_write_overwrites_in_full() {
        let dir = tempdir().unwrap();
        let fs = LocalFileSystem::new(dir.path().to_path_buf());

        fs.write("a.txt", "a long original body").await.unwrap();
        fs.write("a.txt", "short").await.unwrap();
        assert_eq!(fs.read("a.txt").await.unwrap(), "short");
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = tempdir().unwrap();
        let fs = LocalFileSystem::new(dir.path().to_path_buf());

        let err = fs.read("missing.txt").await.unwrap_err();
        assert!(err.to_string().contains("Failed to read file"));
    }

    #[tokio::test]
    async fn test_absolute_path_ignores_root() {
        let dir = tempdir().unwrap();
        let other = tempdir().unwrap();
        let fs = LocalFileSystem::new(other.path().to_path_buf());

        let target = dir.path().join("abs.txt");
        fs.write(target.to_str().unwrap(), "x").await.unwrap();
        assert!(target.exists());
    }
}
