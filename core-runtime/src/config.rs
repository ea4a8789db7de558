//! # Explorer Configuration Module
//!
//! Provides configuration management for the explorer core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct an
//! `ExplorerConfig` that holds the host bridges and the record-format naming
//! conventions. It enforces fail-fast validation so a misconfigured host finds
//! out at startup rather than on the first save.
//!
//! ## Required Dependencies
//!
//! - `FileSystemAccess` - directory listing and file I/O
//!   (desktop default: `TokioFileSystem` with the `desktop-shims` feature)
//! - `UserPrompt` - confirmations and notifications
//!
//! ## Optional Dependencies
//!
//! - `FilePicker` - MIDI file selection; without it picking a file is
//!   reported as a missing capability
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::ExplorerConfig;
//! use std::sync::Arc;
//!
//! let config = ExplorerConfig::builder()
//!     .file_system(Arc::new(MyFileSystem))
//!     .prompt(Arc::new(MyPrompt))
//!     .exclusion_pattern("*.TMP")
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{FilePicker, FileSystemAccess, UserPrompt};
use std::sync::Arc;

/// Name of the per-directory record file
pub const DEFAULT_RECORD_FILE_NAME: &str = "ELS_SONG.NAM";

/// Suffix appended to the record file name for its backup copy
pub const DEFAULT_BACKUP_SUFFIX: &str = ".backup";

/// Entries never shown as items: the record file, vendor security files,
/// the Windows metadata folder and dot-files
pub const DEFAULT_EXCLUSION_PATTERNS: &[&str] = &[
    DEFAULT_RECORD_FILE_NAME,
    "*.C02",
    "System Volume Information",
    ".*",
];

/// Display name given to a freshly created folder before the user names it
pub const DEFAULT_NEW_FOLDER_NAME: &str = "新しいフォルダ";

/// Base directory name for a pasted song
pub const DEFAULT_SONG_FOLDER_BASE: &str = "SONG_001";

/// Base identifier for a pasted song
pub const DEFAULT_SONG_ID_BASE: &str = "S001";

/// Column width the record keys are padded to
pub const DEFAULT_KEY_WIDTH: usize = 13;

/// Length of the longest record key (`BLKFILE_00N`)
pub const MIN_KEY_WIDTH: usize = 11;

/// Explorer configuration.
///
/// Use [`ExplorerConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct ExplorerConfig {
    /// File name of the per-directory song record
    pub record_file_name: String,

    /// Suffix for the record backup written before every overwrite
    pub backup_suffix: String,

    /// Glob patterns (`*` and `?`) of entries hidden from listings
    pub exclusion_patterns: Vec<String>,

    /// Default name for a new folder placeholder
    pub new_folder_name: String,

    /// Base directory name resolved for pasted songs
    pub song_folder_base: String,

    /// Base identifier resolved for pasted songs
    pub song_id_base: String,

    /// Width record keys are padded to when encoding
    pub key_width: usize,

    /// Extensions offered by the MIDI file picker (without the dot)
    pub midi_extensions: Vec<String>,

    /// Buffer size of the explorer event bus
    pub event_buffer_size: usize,

    pub file_system: Arc<dyn FileSystemAccess>,

    pub prompt: Arc<dyn UserPrompt>,

    pub file_picker: Option<Arc<dyn FilePicker>>,
}

impl std::fmt::Debug for ExplorerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplorerConfig")
            .field("record_file_name", &self.record_file_name)
            .field("backup_suffix", &self.backup_suffix)
            .field("exclusion_patterns", &self.exclusion_patterns)
            .field("new_folder_name", &self.new_folder_name)
            .field("song_folder_base", &self.song_folder_base)
            .field("song_id_base", &self.song_id_base)
            .field("key_width", &self.key_width)
            .field("midi_extensions", &self.midi_extensions)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("file_system", &"FileSystemAccess { ... }")
            .field("prompt", &"UserPrompt { ... }")
            .field(
                "file_picker",
                &self.file_picker.as_ref().map(|_| "FilePicker { ... }"),
            )
            .finish()
    }
}

impl ExplorerConfig {
    pub fn builder() -> ExplorerConfigBuilder {
        ExplorerConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Names used to build paths are non-empty and contain no separator
    /// - The key width fits the longest record key
    /// - At least one MIDI extension is configured
    /// - The event buffer can hold at least one event
    pub fn validate(&self) -> Result<()> {
        for (setting, value) in [
            ("Record file name", &self.record_file_name),
            ("New folder name", &self.new_folder_name),
            ("Song folder base name", &self.song_folder_base),
            ("Song id base", &self.song_id_base),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{} cannot be empty", setting)));
            }
            if value.contains(['/', '\\']) {
                return Err(Error::Config(format!(
                    "{} must be a single path component, got '{}'",
                    setting, value
                )));
            }
        }

        if self.backup_suffix.is_empty() {
            return Err(Error::Config(
                "Backup suffix cannot be empty; the backup would overwrite the record file"
                    .to_string(),
            ));
        }

        if self.key_width < MIN_KEY_WIDTH {
            return Err(Error::Config(format!(
                "Key width {} is narrower than the longest record key ({} characters)",
                self.key_width, MIN_KEY_WIDTH
            )));
        }

        if self.midi_extensions.is_empty() {
            return Err(Error::Config(
                "At least one MIDI file extension is required".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    use bridge_desktop::TokioFileSystem;

    let fs: Arc<dyn FileSystemAccess> = Arc::new(TokioFileSystem::new());
    Ok(fs)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(Error::CapabilityMissing {
        capability: "FileSystemAccess".to_string(),
        message: "FileSystemAccess implementation is required to read and write folders. \
                 Desktop: enable the 'desktop-shims' feature to use TokioFileSystem. \
                 Other hosts: inject a platform file system bridge."
            .to_string(),
    })
}

fn prompt_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "UserPrompt".to_string(),
        message: "UserPrompt implementation is required to confirm deletions and report \
                 refused operations. Headless hosts can use bridge_desktop::HeadlessPrompt."
            .to_string(),
    }
}

/// Builder for constructing [`ExplorerConfig`] instances.
#[derive(Default)]
pub struct ExplorerConfigBuilder {
    record_file_name: Option<String>,
    backup_suffix: Option<String>,
    exclusion_patterns: Option<Vec<String>>,
    extra_exclusions: Vec<String>,
    new_folder_name: Option<String>,
    song_folder_base: Option<String>,
    song_id_base: Option<String>,
    key_width: Option<usize>,
    midi_extensions: Option<Vec<String>>,
    event_buffer_size: Option<usize>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    prompt: Option<Arc<dyn UserPrompt>>,
    file_picker: Option<Arc<dyn FilePicker>>,
}

impl ExplorerConfigBuilder {
    /// Sets the record file name (default `ELS_SONG.NAM`).
    ///
    /// The record file is always excluded from listings, even when the
    /// exclusion patterns are replaced.
    pub fn record_file_name(mut self, name: impl Into<String>) -> Self {
        self.record_file_name = Some(name.into());
        self
    }

    pub fn backup_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.backup_suffix = Some(suffix.into());
        self
    }

    /// Replaces the default exclusion patterns.
    pub fn exclusion_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusion_patterns = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    /// Adds one pattern on top of the defaults (or the replaced set).
    pub fn exclusion_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.extra_exclusions.push(pattern.into());
        self
    }

    pub fn new_folder_name(mut self, name: impl Into<String>) -> Self {
        self.new_folder_name = Some(name.into());
        self
    }

    pub fn song_folder_base(mut self, name: impl Into<String>) -> Self {
        self.song_folder_base = Some(name.into());
        self
    }

    pub fn song_id_base(mut self, id: impl Into<String>) -> Self {
        self.song_id_base = Some(id.into());
        self
    }

    pub fn key_width(mut self, width: usize) -> Self {
        self.key_width = Some(width);
        self
    }

    pub fn midi_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.midi_extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    pub fn prompt(mut self, prompt: Arc<dyn UserPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn file_picker(mut self, picker: Arc<dyn FilePicker>) -> Self {
        self.file_picker = Some(picker);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when a required bridge was not provided
    ///   and no desktop default is available
    /// - [`Error::Config`] when a setting fails validation
    pub fn build(self) -> Result<ExplorerConfig> {
        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system()?,
        };

        let prompt = self.prompt.ok_or_else(prompt_missing_error)?;

        let record_file_name = self
            .record_file_name
            .unwrap_or_else(|| DEFAULT_RECORD_FILE_NAME.to_string());

        let mut exclusion_patterns = self.exclusion_patterns.unwrap_or_else(|| {
            DEFAULT_EXCLUSION_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect()
        });
        exclusion_patterns.extend(self.extra_exclusions);
        if !exclusion_patterns.contains(&record_file_name) {
            exclusion_patterns.insert(0, record_file_name.clone());
        }

        let config = ExplorerConfig {
            record_file_name,
            backup_suffix: self
                .backup_suffix
                .unwrap_or_else(|| DEFAULT_BACKUP_SUFFIX.to_string()),
            exclusion_patterns,
            new_folder_name: self
                .new_folder_name
                .unwrap_or_else(|| DEFAULT_NEW_FOLDER_NAME.to_string()),
            song_folder_base: self
                .song_folder_base
                .unwrap_or_else(|| DEFAULT_SONG_FOLDER_BASE.to_string()),
            song_id_base: self
                .song_id_base
                .unwrap_or_else(|| DEFAULT_SONG_ID_BASE.to_string()),
            key_width: self.key_width.unwrap_or(DEFAULT_KEY_WIDTH),
            midi_extensions: self
                .midi_extensions
                .unwrap_or_else(|| vec!["mid".to_string()]),
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
            file_system,
            prompt,
            file_picker: self.file_picker,
        };

        config.validate()?;

        Ok(config)
    }
}
