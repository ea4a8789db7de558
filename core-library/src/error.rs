use bridge_traits::error::BridgeError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Item not found: {kind} at {}", path.display())]
    NotFound { kind: String, path: PathBuf },

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("Song {song_id} contains text that cannot be written as {encoding}")]
    Unrepresentable {
        song_id: String,
        encoding: &'static str,
    },

    #[error("Could not back up {} before overwriting: {source}", path.display())]
    BackupFailed {
        path: PathBuf,
        #[source]
        source: BridgeError,
    },

    #[error("Store invariant violated: {0}")]
    Invariant(String),
}

impl LibraryError {
    pub(crate) fn not_found(kind: &str, path: impl Into<PathBuf>) -> Self {
        LibraryError::NotFound {
            kind: kind.to_string(),
            path: path.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
