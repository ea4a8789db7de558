//! # Explorer
//!
//! The façade a host drives: one open root, one current folder, one
//! selection and one staged copy/cut.
//!
//! ## Overview
//!
//! [`Explorer`] owns the [`ItemStore`] and performs every mutation in a fixed
//! sequence of disk and store steps. Structural operations are refused while
//! songs in the affected folder have unsaved edits. Refusals are shown to the
//! user through [`UserPrompt`](bridge_traits::prompt::UserPrompt) and
//! returned as errors for which [`ExplorerError::is_refusal`] holds.
//!
//! Operations are grouped by concern:
//! - navigation, selection and song editing (this module)
//! - folder creation, rename and tree toggling (`folders`)
//! - deletion (`delete`)
//! - copy/cut staging and paste (`paste`)
//! - saving the current folder (`save`)
//!
//! Callers must serialize operations; every method takes `&mut self`.

use std::path::{Path, PathBuf};

use bridge_traits::prompt::{FileFilter, MessageLevel};
use core_library::record::write_record;
use core_library::{BackupPolicy, Item, ItemInfo, ItemStore, SongField, SongItem};
use core_runtime::config::ExplorerConfig;
use core_runtime::events::{ClipboardEvent, EventBus, EventStream, ExplorerEvent, TreeEvent};
use core_sync::SyncEngine;
use serde::Serialize;
use tracing::{debug, info, instrument, trace, warn};

use crate::clipboard::{Clipboard, StagedItem};
use crate::error::{ExplorerError, Result};
use crate::job::SaveJob;

/// A folder in the navigation pane; children are listed only when expanded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub path: PathBuf,
    pub name: String,
    pub expanded: bool,
    pub children: Vec<TreeNode>,
}

pub struct Explorer {
    pub(crate) config: ExplorerConfig,
    pub(crate) engine: SyncEngine,
    pub(crate) store: ItemStore,
    pub(crate) events: EventBus,
    pub(crate) clipboard: Clipboard,
    pub(crate) selection: Option<PathBuf>,
    /// Placeholder folder awaiting its real name
    pub(crate) editing: Option<PathBuf>,
    pub(crate) last_save: Option<SaveJob>,
}

impl Explorer {
    /// Create an explorer with nothing open.
    ///
    /// # Errors
    ///
    /// [`ExplorerError::Sync`] if an exclusion pattern in `config` is invalid.
    pub fn new(config: ExplorerConfig) -> Result<Self> {
        let engine = SyncEngine::from_config(&config)?;
        let events = EventBus::new(config.event_buffer_size);
        debug!(?config, "Explorer created");

        Ok(Self {
            config,
            engine,
            store: ItemStore::new(),
            events,
            clipboard: Clipboard::new(),
            selection: None,
            editing: None,
            last_save: None,
        })
    }

    /// Desktop defaults: `tokio::fs` file system and the given prompt.
    ///
    /// ```no_run
    /// # async fn example() -> core_service::Result<()> {
    /// use bridge_desktop::HeadlessPrompt;
    /// use core_service::Explorer;
    /// use std::sync::Arc;
    ///
    /// let mut explorer = Explorer::bootstrap_desktop(Arc::new(HeadlessPrompt::accepting()))?;
    /// explorer.open_root("/media/usb".as_ref()).await?;
    /// # Ok(())
    /// # }
    /// ```
    #[cfg(feature = "desktop-shims")]
    pub fn bootstrap_desktop(
        prompt: std::sync::Arc<dyn bridge_traits::prompt::UserPrompt>,
    ) -> Result<Self> {
        let config = ExplorerConfig::builder().prompt(prompt).build()?;
        Self::new(config)
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    pub fn selection(&self) -> Option<&Path> {
        self.selection.as_deref()
    }

    pub fn staged(&self) -> Option<&StagedItem> {
        self.clipboard.staged()
    }

    /// Path of the folder placeholder created by `create_pending_folder`
    pub fn editing(&self) -> Option<&Path> {
        self.editing.as_deref()
    }

    /// Most recent save, in whatever state it reached
    pub fn last_save(&self) -> Option<&SaveJob> {
        self.last_save.as_ref()
    }

    // -------------------------------------------------------------------------
    // Opening and navigation
    // -------------------------------------------------------------------------

    /// Replace the tree with `root` and load its first level.
    #[instrument(skip(self), fields(root = %root.display()))]
    pub async fn open_root(&mut self, root: &Path) -> Result<()> {
        self.store.open_root(root);
        self.selection = None;
        self.editing = None;
        if self.clipboard.clear() {
            self.emit(ExplorerEvent::Clipboard(ClipboardEvent::Cleared));
        }
        self.emit(ExplorerEvent::Tree(TreeEvent::RootOpened {
            path: root.to_path_buf(),
        }));

        let outcome = self.engine.set_now_folder(&mut self.store, root).await?;
        self.emit(ExplorerEvent::Tree(TreeEvent::FolderLoaded {
            path: root.to_path_buf(),
            child_count: outcome.child_count,
        }));
        info!(children = outcome.child_count, "Opened root");
        Ok(())
    }

    pub fn current_folder_path(&self) -> Option<&Path> {
        self.store.current_folder_path()
    }

    /// Children of the current folder, folders first then by name
    pub fn current_children(&self, include_files: bool) -> Vec<&Item> {
        self.store.current_children(include_files)
    }

    /// Make `folder` the current folder, loading it from disk.
    #[instrument(skip(self), fields(folder = %folder.display()))]
    pub async fn enter_folder(&mut self, folder: &Path) -> Result<()> {
        if let Some(current) = self.store.current_folder_path().map(Path::to_path_buf) {
            self.ensure_clean(&current).await?;
        }
        if self.store.folder(folder).is_none() {
            return Err(ExplorerError::NotFound(folder.to_path_buf()));
        }

        let outcome = self.engine.set_now_folder(&mut self.store, folder).await?;
        self.selection = None;
        self.emit(ExplorerEvent::Tree(TreeEvent::FolderLoaded {
            path: folder.to_path_buf(),
            child_count: outcome.child_count,
        }));
        Ok(())
    }

    /// Move to the parent of the current folder; a no-op at the root.
    pub async fn go_up(&mut self) -> Result<()> {
        let current = self.current_folder()?;
        let parent = self
            .store
            .folder(&current)
            .and_then(|folder| folder.parent_path.clone());

        match parent {
            Some(parent) => self.enter_folder(&parent).await,
            None => Ok(()),
        }
    }

    /// Nested folders from the root; collapsed folders have no children listed
    pub fn folder_tree(&self) -> Option<TreeNode> {
        self.store.root_path().and_then(|root| self.tree_node(root))
    }

    fn tree_node(&self, path: &Path) -> Option<TreeNode> {
        let folder = self.store.folder(path)?;
        let children = if folder.expanded {
            self.store
                .children_of(path, false)
                .into_iter()
                .filter(|item| item.is_folder())
                .filter_map(|item| self.tree_node(item.path()))
                .collect()
        } else {
            Vec::new()
        };

        Some(TreeNode {
            path: folder.path.clone(),
            name: folder.name.clone(),
            expanded: folder.expanded,
            children,
        })
    }

    /// Components of the current folder path, for a breadcrumb bar
    pub fn breadcrumbs(&self) -> Vec<String> {
        let Some(current) = self.store.current_folder_path() else {
            return Vec::new();
        };
        let text = current.to_string_lossy();
        text.trim_end_matches(['/', '\\'])
            .split(['/', '\\'])
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    pub fn select(&mut self, path: &Path) -> Result<()> {
        if !self.store.contains(path) {
            return Err(ExplorerError::NotFound(path.to_path_buf()));
        }
        self.selection = Some(path.to_path_buf());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    // -------------------------------------------------------------------------
    // Song editing
    // -------------------------------------------------------------------------

    /// Edit one field of a song's working copy.
    pub fn update_song_field(
        &mut self,
        path: &Path,
        field: SongField,
        value: Option<&str>,
    ) -> Result<()> {
        if self.store.song(path).is_none() {
            return Err(ExplorerError::NotFound(path.to_path_buf()));
        }
        self.store.update_song_field(path, field, value)?;
        self.emit(ExplorerEvent::Tree(TreeEvent::ItemsChanged {
            paths: vec![path.to_path_buf()],
        }));
        Ok(())
    }

    /// Ask the host for a MIDI file and use it as the song's pending MIDI file.
    ///
    /// Returns the chosen path, or `None` when the dialog was dismissed.
    pub async fn pick_midi_file(&mut self, path: &Path) -> Result<Option<PathBuf>> {
        if self.store.song(path).is_none() {
            return Err(ExplorerError::NotFound(path.to_path_buf()));
        }
        let picker = self.config.file_picker.clone().ok_or_else(|| {
            ExplorerError::CapabilityMissing {
                capability: "FilePicker".to_string(),
                message: "A FilePicker is required to choose MIDI files".to_string(),
            }
        })?;

        let filter = FileFilter::new("MIDI", &self.config.midi_extensions);
        let Some(picked) = picker
            .pick_file("Select MIDI file", std::slice::from_ref(&filter))
            .await?
        else {
            trace!("MIDI selection dismissed");
            return Ok(None);
        };

        if !filter.accepts(&picked) {
            let err = ExplorerError::InvalidName {
                name: picked.display().to_string(),
                reason: "not a MIDI file".to_string(),
            };
            return Err(self.refuse(err).await);
        }

        let value = picked.to_string_lossy().into_owned();
        self.update_song_field(path, SongField::MidFile, Some(&value))?;
        Ok(Some(picked))
    }

    pub fn clear_midi_file(&mut self, path: &Path) -> Result<()> {
        self.update_song_field(path, SongField::MidFile, None)
    }

    /// Whether any song in the current folder has unsaved edits
    pub fn has_pending_changes(&self) -> bool {
        self.store
            .current_folder_path()
            .is_some_and(|current| self.store.has_dirty_in(current))
    }

    /// Roll back every unsaved edit in the current folder; no disk access.
    pub fn discard_changes(&mut self) -> Result<Vec<PathBuf>> {
        let current = self.current_folder()?;
        let touched = self.store.discard_changes(&current);
        if !touched.is_empty() {
            debug!(count = touched.len(), "Discarded song edits");
            self.emit(ExplorerEvent::Tree(TreeEvent::ItemsChanged {
                paths: touched.clone(),
            }));
        }
        Ok(touched)
    }

    // -------------------------------------------------------------------------
    // Shared helpers
    // -------------------------------------------------------------------------

    pub(crate) fn current_folder(&self) -> Result<PathBuf> {
        self.store
            .current_folder_path()
            .map(Path::to_path_buf)
            .ok_or(ExplorerError::NoCurrentFolder)
    }

    /// Refuse when songs in `folder` have unsaved edits
    pub(crate) async fn ensure_clean(&self, folder: &Path) -> Result<()> {
        if self.store.has_dirty_in(folder) {
            let err = ExplorerError::PendingChanges {
                folder: folder.to_path_buf(),
            };
            return Err(self.refuse(err).await);
        }
        Ok(())
    }

    /// Tell the user why an operation was refused and hand the error back
    pub(crate) async fn refuse(&self, err: ExplorerError) -> ExplorerError {
        warn!(error = %err, "Operation refused");
        self.notify(&err.to_string(), MessageLevel::Warning).await;
        err
    }

    /// Report a failed operation to the user and hand the error back
    pub(crate) async fn report(&self, err: ExplorerError) -> ExplorerError {
        tracing::error!(error = %err, "Operation failed");
        self.notify(&err.to_string(), MessageLevel::Error).await;
        err
    }

    /// Route an error to [`Self::refuse`] or [`Self::report`]
    pub(crate) async fn surface(&self, err: ExplorerError) -> ExplorerError {
        if err.is_refusal() {
            self.refuse(err).await
        } else {
            self.report(err).await
        }
    }

    pub(crate) async fn notify(&self, message: &str, level: MessageLevel) {
        if let Err(e) = self.config.prompt.notify(message, level).await {
            warn!(error = %e, "Could not deliver notification");
        }
    }

    pub(crate) fn emit(&self, event: ExplorerEvent) {
        if self.events.emit(event).is_err() {
            trace!("No event subscribers");
        }
    }

    /// Rewrite the record file of `folder` from the songs in the store
    pub(crate) async fn write_folder_record(&self, folder: &Path, policy: BackupPolicy) -> Result<()> {
        let songs: Vec<SongItem> = self.store.songs_in(folder).into_iter().cloned().collect();
        write_record(
            self.config.file_system.as_ref(),
            self.engine.codec(),
            folder,
            &self.config.record_file_name,
            &self.config.backup_suffix,
            policy,
            &songs,
        )
        .await?;
        Ok(())
    }

    /// Re-read `folder` after a mutation; failures are logged, not raised.
    pub(crate) async fn reload(&mut self, folder: &Path) {
        if self.store.folder(folder).is_none() {
            return;
        }
        match self.engine.expand(&mut self.store, folder).await {
            Ok(outcome) => self.emit(ExplorerEvent::Tree(TreeEvent::FolderLoaded {
                path: folder.to_path_buf(),
                child_count: outcome.child_count,
            })),
            Err(e) => warn!(folder = %folder.display(), error = %e, "Reload failed"),
        }
    }
}

impl std::fmt::Debug for Explorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Explorer")
            .field("root", &self.store.root_path())
            .field("current_folder", &self.store.current_folder_path())
            .field("items", &self.store.len())
            .field("selection", &self.selection)
            .field("staged", &self.clipboard.staged())
            .finish_non_exhaustive()
    }
}
