//! # Sync Engine
//!
//! Loads folders of the open tree lazily from disk.
//!
//! ## Workflow
//!
//! ### Expand
//! 1. List the real directory
//! 2. Decode its record file, when one is listed
//! 3. Drop excluded entries
//! 4. Reconcile the listing into the store (see [`crate::reconcile`])
//! 5. Warn about song paths claimed twice
//!
//! ### Open (`set_now_folder`)
//! Expand, then mark the folder expanded and make it the current folder.
//!
//! All disk reads happen before the store is touched, so a failed listing
//! or record read leaves the store as it was.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bridge_traits::storage::FileSystemAccess;
use core_library::record::read_record;
use core_library::{ItemStore, RecordCodec};
use core_runtime::config::ExplorerConfig;
use tracing::{debug, instrument, warn};

use crate::error::{Result, SyncError};
use crate::exclusion::ExclusionRules;
use crate::reconcile::{apply, reconcile};

/// What one expand changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandOutcome {
    pub child_count: usize,
    /// Paths pruned because they vanished from disk
    pub removed: Vec<PathBuf>,
    /// Song paths claimed by more than one identifier
    pub duplicates: Vec<PathBuf>,
}

pub struct SyncEngine {
    fs: Arc<dyn FileSystemAccess>,
    codec: RecordCodec,
    rules: ExclusionRules,
    record_file_name: String,
}

impl SyncEngine {
    pub fn new(
        fs: Arc<dyn FileSystemAccess>,
        codec: RecordCodec,
        rules: ExclusionRules,
        record_file_name: impl Into<String>,
    ) -> Self {
        Self {
            fs,
            codec,
            rules,
            record_file_name: record_file_name.into(),
        }
    }

    /// Build an engine from the explorer configuration.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidPattern`] if an exclusion pattern does not compile.
    pub fn from_config(config: &ExplorerConfig) -> Result<Self> {
        let rules = ExclusionRules::new(&config.exclusion_patterns)?;
        Ok(Self::new(
            Arc::clone(&config.file_system),
            RecordCodec::new(config.key_width),
            rules,
            config.record_file_name.clone(),
        ))
    }

    pub fn file_system(&self) -> &Arc<dyn FileSystemAccess> {
        &self.fs
    }

    pub fn codec(&self) -> &RecordCodec {
        &self.codec
    }

    pub fn rules(&self) -> &ExclusionRules {
        &self.rules
    }

    pub fn record_file_name(&self) -> &str {
        &self.record_file_name
    }

    /// Reload the children of `folder` from disk.
    ///
    /// # Errors
    ///
    /// - [`SyncError::NotAFolder`] if `folder` is not loaded in the store
    /// - [`SyncError::Bridge`] / [`SyncError::Library`] if listing or reading
    ///   the record file fails
    #[instrument(skip(self, store), fields(folder = %folder.display()))]
    pub async fn expand(&self, store: &mut ItemStore, folder: &Path) -> Result<ExpandOutcome> {
        if store.folder(folder).is_none() {
            return Err(SyncError::NotAFolder(folder.to_path_buf()));
        }

        let listing = self.fs.list_directory(folder).await?;
        // matched the way exclusions match, read under its on-disk spelling
        let record_name = listing
            .iter()
            .find(|entry| {
                !entry.is_directory && entry.name.eq_ignore_ascii_case(&self.record_file_name)
            })
            .map(|entry| entry.name.clone());

        let songs = match record_name {
            Some(name) => read_record(self.fs.as_ref(), &self.codec, folder, &name).await?,
            None => Vec::new(),
        };

        let listed = listing.len();
        let entries: Vec<_> = listing
            .into_iter()
            .filter(|entry| !self.rules.is_excluded(&entry.name))
            .collect();
        debug!(
            listed,
            kept = entries.len(),
            songs = songs.len(),
            "Listed folder"
        );

        let reconciliation = reconcile(store, folder, entries, songs);
        for duplicate in &reconciliation.duplicates {
            warn!(
                path = %duplicate.display(),
                "Song folder is claimed by more than one record entry; keeping the first"
            );
        }
        let child_count = reconciliation.child_count();
        let duplicates = reconciliation.duplicates.clone();
        let removed = apply(store, reconciliation)?;

        debug_assert!(
            store.validate().is_ok(),
            "store invariants broken after expanding {}",
            folder.display()
        );
        if !removed.is_empty() {
            debug!(count = removed.len(), "Pruned vanished items");
        }

        Ok(ExpandOutcome {
            child_count,
            removed,
            duplicates,
        })
    }

    /// Expand `folder`, mark it expanded and make it the current folder.
    pub async fn set_now_folder(&self, store: &mut ItemStore, folder: &Path) -> Result<ExpandOutcome> {
        let outcome = self.expand(store, folder).await?;
        store.set_expanded(folder, true)?;
        store.set_current_folder(folder)?;
        Ok(outcome)
    }

    /// Names of every real entry in `folder`, excluded ones included.
    ///
    /// Used to pick names that do not collide on disk.
    pub async fn directory_names(&self, folder: &Path) -> Result<Vec<String>> {
        let listing = self.fs.list_directory(folder).await?;
        Ok(listing.into_iter().map(|entry| entry.name).collect())
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("codec", &self.codec)
            .field("rules", &self.rules)
            .field("record_file_name", &self.record_file_name)
            .finish_non_exhaustive()
    }
}
