//! Folder creation, renaming and tree toggling

use std::path::{Path, PathBuf};

use core_library::{resolve_name, FolderItem, Item, ItemInfo};
use core_runtime::events::{ExplorerEvent, TreeEvent};
use tracing::{debug, info, instrument, warn};

use crate::error::{ExplorerError, Result};
use crate::explorer::Explorer;

/// Characters FAT file systems reject in names
const FORBIDDEN_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Trim a user-entered name and reject ones that cannot name a directory entry
pub(crate) fn validate_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    let reason = if trimmed.is_empty() {
        Some("name cannot be empty")
    } else if trimmed == "." || trimmed == ".." {
        Some("name is reserved")
    } else if trimmed.contains(FORBIDDEN_CHARS) {
        Some("name contains a character that is not allowed in file names")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ExplorerError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(trimmed),
    }
}

impl Explorer {
    /// Add a placeholder folder with a free default name to the current
    /// folder. Nothing is created on disk until
    /// [`commit_pending_folder`](Self::commit_pending_folder).
    pub async fn create_pending_folder(&mut self) -> Result<PathBuf> {
        let parent = self.current_folder()?;
        self.ensure_clean(&parent).await?;
        self.cancel_pending_folder();

        let mut taken: Vec<String> = self
            .store
            .children_of(&parent, true)
            .iter()
            .map(|item| item.name().to_string())
            .collect();
        match self.engine.directory_names(&parent).await {
            Ok(names) => taken.extend(names),
            Err(e) => warn!(error = %e, "Could not list folder; resolving against loaded items only"),
        }

        let name = resolve_name(
            &self.config.new_folder_name,
            taken.iter().map(String::as_str),
        );
        let path = parent.join(&name);
        self.store.insert(Item::Folder(FolderItem::new(
            name,
            path.clone(),
            Some(parent),
        )))?;
        self.editing = Some(path.clone());
        debug!(path = %path.display(), "Created folder placeholder");

        self.emit(ExplorerEvent::Tree(TreeEvent::ItemsChanged {
            paths: vec![path.clone()],
        }));
        Ok(path)
    }

    /// Create the placeholder's directory under `name`.
    ///
    /// On any failure the placeholder is discarded and the error returned.
    #[instrument(skip(self), fields(placeholder = %placeholder.display()))]
    pub async fn commit_pending_folder(&mut self, placeholder: &Path, name: &str) -> Result<PathBuf> {
        if self.editing.as_deref() != Some(placeholder) {
            return Err(ExplorerError::NotFound(placeholder.to_path_buf()));
        }

        match self.create_named_folder(placeholder, name).await {
            Ok(created) => {
                self.editing = None;
                info!(path = %created.display(), "Created folder");
                self.emit(ExplorerEvent::Tree(TreeEvent::ItemsChanged {
                    paths: vec![placeholder.to_path_buf(), created.clone()],
                }));
                Ok(created)
            }
            Err(err) => {
                self.cancel_pending_folder();
                Err(self.surface(err).await)
            }
        }
    }

    async fn create_named_folder(&mut self, placeholder: &Path, name: &str) -> Result<PathBuf> {
        let name = validate_name(name)?;
        let parent = placeholder
            .parent()
            .ok_or_else(|| ExplorerError::InvalidTarget("placeholder has no parent".to_string()))?;
        let target = parent.join(name);

        let clashes_in_store = target != placeholder && self.store.contains(&target);
        if clashes_in_store || self.config.file_system.exists(&target).await? {
            return Err(ExplorerError::InvalidName {
                name: name.to_string(),
                reason: "an item with this name already exists".to_string(),
            });
        }

        self.config.file_system.create_dir(&target, false).await?;
        if let Err(e) = self.store.relocate(placeholder, &target, Some(name)) {
            // the directory exists now; list it in place of the placeholder
            self.cancel_pending_folder();
            self.reload(parent).await;
            return Err(e.into());
        }
        Ok(target)
    }

    /// Drop the placeholder folder, if any
    pub fn cancel_pending_folder(&mut self) -> bool {
        let Some(placeholder) = self.editing.take() else {
            return false;
        };
        let removed = self.store.remove_subtree(&placeholder);
        if !removed.is_empty() {
            self.emit(ExplorerEvent::Tree(TreeEvent::ItemsChanged { paths: removed }));
        }
        true
    }

    /// Rename a file or folder on disk and in the tree.
    ///
    /// Songs are renamed by editing their name field instead.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn rename_item(&mut self, path: &Path, name: &str) -> Result<PathBuf> {
        if self.editing.as_deref() == Some(path) {
            return self.commit_pending_folder(path, name).await;
        }

        let item = self
            .store
            .get(path)
            .ok_or_else(|| ExplorerError::NotFound(path.to_path_buf()))?;
        let parent = match (item, item.parent_path()) {
            (Item::Song(_), _) => {
                let err = ExplorerError::InvalidTarget(
                    "songs are renamed through their name field".to_string(),
                );
                return Err(self.refuse(err).await);
            }
            (_, None) => {
                let err = ExplorerError::InvalidTarget("the root folder cannot be renamed".to_string());
                return Err(self.refuse(err).await);
            }
            (_, Some(parent)) => parent.to_path_buf(),
        };
        self.ensure_clean(&parent).await?;
        self.ensure_clean(path).await?;

        let name = match validate_name(name) {
            Ok(name) => name,
            Err(err) => return Err(self.refuse(err).await),
        };
        let target = parent.join(name);
        if target == path {
            return Ok(target);
        }

        let exists = match self.config.file_system.exists(&target).await {
            Ok(exists) => exists,
            Err(e) => return Err(self.report(e.into()).await),
        };
        if exists || self.store.contains(&target) {
            let err = ExplorerError::InvalidName {
                name: name.to_string(),
                reason: "an item with this name already exists".to_string(),
            };
            return Err(self.refuse(err).await);
        }

        if let Err(e) = self.config.file_system.rename(path, &target).await {
            return Err(self.report(e.into()).await);
        }
        let moved = self.store.relocate(path, &target, Some(name))?;

        if let Some(selected) = self.selection.as_deref() {
            if let Ok(rest) = selected.strip_prefix(path) {
                self.selection = Some(target.join(rest));
            }
        }
        if self.clipboard.forget_within(path) {
            debug!("Dropped staged item that was renamed");
        }

        info!(to = %target.display(), "Renamed item");
        let mut paths = vec![path.to_path_buf()];
        paths.extend(moved);
        self.emit(ExplorerEvent::Tree(TreeEvent::ItemsChanged { paths }));
        Ok(target)
    }

    /// Flip a folder's expanded flag, loading it from disk when it opens.
    ///
    /// Load failures are logged; the folder stays expanded with what was
    /// already known.
    pub async fn toggle_folder(&mut self, path: &Path) -> Result<bool> {
        if self.store.folder(path).is_none() {
            return Err(ExplorerError::NotFound(path.to_path_buf()));
        }
        let expanded = self.store.toggle_expanded(path)?;
        if expanded {
            self.reload(path).await;
        }
        Ok(expanded)
    }

    /// Re-read the current folder from disk.
    pub async fn refresh(&mut self) -> Result<()> {
        let current = self.current_folder()?;
        let outcome = self.engine.set_now_folder(&mut self.store, &current).await?;
        self.emit(ExplorerEvent::Tree(TreeEvent::FolderLoaded {
            path: current,
            child_count: outcome.child_count,
        }));
        Ok(())
    }
}
