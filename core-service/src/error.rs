use std::path::PathBuf;

use bridge_traits::error::BridgeError;
use core_library::LibraryError;
use core_sync::SyncError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExplorerError {
    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Songs in {} have unsaved changes", folder.display())]
    PendingChanges { folder: PathBuf },

    #[error("Song '{name}' is protected and cannot be copied or moved")]
    Protected { name: String },

    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Nothing is selected")]
    NothingSelected,

    #[error("Nothing is staged for paste")]
    NothingStaged,

    #[error("No folder is open")]
    NoCurrentFolder,

    #[error("Item not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("File system error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Library error: {0}")]
    Library(LibraryError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Backup of {} failed: {message}", path.display())]
    BackupFailed { path: PathBuf, message: String },
}

impl ExplorerError {
    /// True when the operation was refused before anything on disk changed
    pub fn is_refusal(&self) -> bool {
        matches!(
            self,
            ExplorerError::PendingChanges { .. }
                | ExplorerError::Protected { .. }
                | ExplorerError::InvalidName { .. }
                | ExplorerError::InvalidTarget(_)
                | ExplorerError::NothingSelected
                | ExplorerError::NothingStaged
                | ExplorerError::NoCurrentFolder
                | ExplorerError::NotFound(_)
        )
    }
}

impl From<LibraryError> for ExplorerError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::BackupFailed { path, source } => ExplorerError::BackupFailed {
                path,
                message: source.to_string(),
            },
            other => ExplorerError::Library(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExplorerError>;
