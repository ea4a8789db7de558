//! User Interaction Abstractions
//!
//! The core never renders dialogs itself. Confirmations, user-facing
//! notifications and file selection are delegated to the host through these
//! traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::Result;

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MessageLevel::Info => "info",
            MessageLevel::Warning => "warning",
            MessageLevel::Error => "error",
        };
        f.write_str(label)
    }
}

/// Prompts and message boxes shown by the host
#[async_trait]
pub trait UserPrompt: Send + Sync {
    /// Ask a yes/no question; `true` means the user agreed
    async fn confirm(&self, message: &str) -> Result<bool>;

    /// Show a message to the user
    async fn notify(&self, message: &str, level: MessageLevel) -> Result<()>;
}

/// Filter entry for [`FilePicker::pick_file`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFilter {
    /// Human-readable filter name
    pub name: String,
    /// Extensions without the leading dot
    pub extensions: Vec<String>,
}

impl FileFilter {
    pub fn new(name: impl Into<String>, extensions: &[impl AsRef<str>]) -> Self {
        Self {
            name: name.into(),
            extensions: extensions
                .iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_string())
                .collect(),
        }
    }

    /// Whether `path` carries one of this filter's extensions (case-insensitive)
    pub fn accepts(&self, path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

/// Native file-open dialog
#[async_trait]
pub trait FilePicker: Send + Sync {
    /// Let the user choose one file; `None` when the dialog was dismissed
    async fn pick_file(&self, title: &str, filters: &[FileFilter]) -> Result<Option<PathBuf>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_file_filter_normalizes_extensions() {
        let filter = FileFilter::new("MIDI", &[".mid", "MID"]);
        assert_eq!(filter.extensions, vec!["mid", "MID"]);
    }

    #[test]
    fn test_file_filter_accepts() {
        let filter = FileFilter::new("MIDI", &["mid"]);
        assert!(filter.accepts(Path::new("/songs/demo.MID")));
        assert!(filter.accepts(Path::new("demo.mid")));
        assert!(!filter.accepts(Path::new("demo.wav")));
        assert!(!filter.accepts(Path::new("demo")));
    }

    #[test]
    fn test_message_level_display() {
        assert_eq!(MessageLevel::Warning.to_string(), "warning");
        assert_eq!(MessageLevel::Error.to_string(), "error");
    }
}
