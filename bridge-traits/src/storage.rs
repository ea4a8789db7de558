//! File System Abstractions
//!
//! Provides the platform-agnostic directory and file primitives the explorer
//! core drives. Hosts supply an implementation (desktop: `tokio::fs`); the core
//! never touches `std::fs` directly.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// One entry returned by [`FileSystemAccess::list_directory`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// File name of the entry (last path component)
    pub name: String,
    /// Absolute path of the entry
    pub path: PathBuf,
    /// Whether the entry is itself a directory
    pub is_directory: bool,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, is_directory: bool) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_directory,
        }
    }
}

/// File system access trait
///
/// Abstracts the directory and file operations used to keep the in-memory
/// tree and the on-disk layout consistent.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn backup(fs: &dyn FileSystemAccess, path: &Path) -> Result<()> {
///     let data = fs.read_file(path).await?;
///     fs.write_file(&path.with_extension("bak"), data).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// List the direct entries of a directory
    async fn list_directory(&self, path: &Path) -> Result<Vec<DirEntry>>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write data to a file, creating or truncating it
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Create a directory
    ///
    /// With `recursive` set, missing parents are created too and an existing
    /// directory is not an error.
    async fn create_dir(&self, path: &Path, recursive: bool) -> Result<()>;

    /// Remove a directory, with all of its contents when `recursive` is set
    async fn remove_dir(&self, path: &Path, recursive: bool) -> Result<()>;

    /// Delete a file
    async fn remove_file(&self, path: &Path) -> Result<()>;

    /// Copy a single file, overwriting the destination
    async fn copy_file(&self, from: &Path, to: &Path) -> Result<()>;

    /// Move or rename a file or directory
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Copy a directory tree
    ///
    /// The destination directory is created (with parents) before its
    /// children are copied.
    async fn copy_dir_all(&self, from: &Path, to: &Path) -> Result<()> {
        self.create_dir(to, true).await?;
        let entries = self.list_directory(from).await?;

        for entry in entries {
            let target = to.join(&entry.name);
            if entry.is_directory {
                self.copy_dir_all(&entry.path, &target).await?;
            } else {
                self.copy_file(&entry.path, &target).await?;
            }
        }

        Ok(())
    }
}
