use bridge_traits::error::BridgeError;
use core_library::LibraryError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("File system error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Not a loaded folder: {}", .0.display())]
    NotAFolder(PathBuf),

    #[error("Invalid exclusion pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },
}

impl SyncError {
    /// True when the underlying cause is a missing path on disk
    pub fn is_not_found(&self) -> bool {
        match self {
            SyncError::Bridge(e) => e.is_not_found(),
            SyncError::Library(LibraryError::Bridge(e)) => e.is_not_found(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
