//! # Item Store
//!
//! The authoritative in-memory tree for one open root folder.
//!
//! ## Invariants
//!
//! - every item path is unique (items are keyed by path)
//! - an item's `parent_path` names a folder whose `children` lists the item
//!   exactly once
//! - a folder's `children` only names items present in the store
//!
//! Every mutating method either leaves these intact or fails without
//! touching the store. Mutations return the paths they affected so a
//! presentation layer can decide what to redraw.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::{LibraryError, Result};
use crate::models::{FolderItem, Item, ItemInfo, SongField, SongItem};

#[derive(Debug, Default, Clone)]
pub struct ItemStore {
    items: HashMap<PathBuf, Item>,
    root: Option<PathBuf>,
    current_folder: Option<PathBuf>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole store with a single expanded root folder, which
    /// also becomes the current folder.
    pub fn open_root(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        let mut root = FolderItem::new(name, path.clone(), None);
        root.expanded = true;

        self.items.clear();
        self.items.insert(path.clone(), Item::Folder(root));
        self.root = Some(path.clone());
        self.current_folder = Some(path);
        debug!(root = ?self.root, "Opened root folder");
    }

    pub fn root_path(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn get(&self, path: &Path) -> Option<&Item> {
        self.items.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.items.contains_key(path)
    }

    pub fn folder(&self, path: &Path) -> Option<&FolderItem> {
        self.items.get(path).and_then(Item::as_folder)
    }

    pub fn song(&self, path: &Path) -> Option<&SongItem> {
        self.items.get(path).and_then(Item::as_song)
    }

    fn folder_mut(&mut self, path: &Path) -> Result<&mut FolderItem> {
        match self.items.get_mut(path) {
            Some(Item::Folder(folder)) => Ok(folder),
            _ => Err(LibraryError::not_found("folder", path)),
        }
    }

    // -------------------------------------------------------------------------
    // Current folder
    // -------------------------------------------------------------------------

    pub fn current_folder_path(&self) -> Option<&Path> {
        self.current_folder.as_deref()
    }

    pub fn current_folder(&self) -> Option<&FolderItem> {
        self.current_folder.as_deref().and_then(|p| self.folder(p))
    }

    /// Designate `path` as the current folder; it must be a loaded folder.
    pub fn set_current_folder(&mut self, path: &Path) -> Result<()> {
        if self.folder(path).is_none() {
            return Err(LibraryError::not_found("folder", path));
        }
        self.current_folder = Some(path.to_path_buf());
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------------

    /// Insert a new item and link it into its parent's child list.
    ///
    /// # Errors
    ///
    /// - [`LibraryError::Invariant`] if the path is already taken or the
    ///   item has no parent
    /// - [`LibraryError::NotFound`] if the parent is not a loaded folder
    pub fn insert(&mut self, item: Item) -> Result<()> {
        let path = item.path().to_path_buf();
        if self.items.contains_key(&path) {
            return Err(LibraryError::Invariant(format!(
                "path {} is already in the store",
                path.display()
            )));
        }
        let parent = item
            .parent_path()
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                LibraryError::Invariant(format!("{} has no parent folder", path.display()))
            })?;

        self.folder_mut(&parent)?.children.push(path.clone());
        trace!(path = ?path, kind = %item.kind(), "Inserted item");
        self.items.insert(path, item);
        Ok(())
    }

    /// Replace an item at the same path, or insert it if unknown.
    ///
    /// Used by reconciliation, which sets child lists itself; the parent's
    /// list is not touched here.
    pub fn upsert(&mut self, item: Item) {
        let path = item.path().to_path_buf();
        self.items.insert(path, item);
    }

    /// Set a folder's child list wholesale.
    pub fn replace_children(&mut self, folder: &Path, children: Vec<PathBuf>) -> Result<()> {
        self.folder_mut(folder)?.children = children;
        Ok(())
    }

    /// Remove an item together with everything loaded below it.
    ///
    /// Returns the removed paths, the item itself first. The current folder
    /// moves to the removed item's parent when it was inside the subtree.
    pub fn remove_subtree(&mut self, path: &Path) -> Vec<PathBuf> {
        let Some(item) = self.items.get(path) else {
            return Vec::new();
        };
        let parent = item.parent_path().map(Path::to_path_buf);
        let removed = self.subtree_paths(path);

        for p in &removed {
            self.items.remove(p);
        }
        if let Some(parent) = &parent {
            if let Ok(folder) = self.folder_mut(parent) {
                folder.children.retain(|c| c != path);
            }
        }
        if self
            .current_folder
            .as_deref()
            .is_some_and(|current| removed.iter().any(|p| p == current))
        {
            self.current_folder = parent;
        }

        debug!(path = ?path, count = removed.len(), "Removed subtree");
        removed
    }

    /// Paths of `path` and all loaded descendants, parents before children
    pub fn subtree_paths(&self, path: &Path) -> Vec<PathBuf> {
        let mut out = Vec::new();
        if !self.items.contains_key(path) {
            return out;
        }
        let mut queue = vec![path.to_path_buf()];
        while let Some(p) = queue.pop() {
            if let Some(Item::Folder(folder)) = self.items.get(&p) {
                queue.extend(folder.children.iter().rev().cloned());
            }
            out.push(p);
        }
        out
    }

    /// Move an item (and its loaded subtree) to `new_path` under the same
    /// parent, optionally renaming it.
    ///
    /// The parent's child list keeps its order. Song MIDI paths inside the
    /// subtree are re-rooted along with their songs.
    pub fn relocate(
        &mut self,
        old_path: &Path,
        new_path: &Path,
        new_name: Option<&str>,
    ) -> Result<Vec<PathBuf>> {
        if old_path == new_path {
            if let (Some(name), Some(item)) = (new_name, self.items.get_mut(old_path)) {
                let parent = item.parent_path().map(Path::to_path_buf);
                item.set_location(Some(name), old_path.to_path_buf(), parent);
            }
            return Ok(vec![old_path.to_path_buf()]);
        }
        if !self.items.contains_key(old_path) {
            return Err(LibraryError::not_found("item", old_path));
        }
        if self.items.contains_key(new_path) {
            return Err(LibraryError::Invariant(format!(
                "path {} is already in the store",
                new_path.display()
            )));
        }

        let rebase = |p: &Path| -> PathBuf {
            match p.strip_prefix(old_path) {
                Ok(rest) if rest.as_os_str().is_empty() => new_path.to_path_buf(),
                Ok(rest) => new_path.join(rest),
                Err(_) => p.to_path_buf(),
            }
        };

        let paths = self.subtree_paths(old_path);
        let mut moved = Vec::with_capacity(paths.len());
        let mut taken: Vec<Item> = paths.iter().filter_map(|p| self.items.remove(p)).collect();

        for item in &mut taken {
            let is_top = item.path() == old_path;
            let path = rebase(item.path());
            let parent = if is_top {
                item.parent_path().map(Path::to_path_buf)
            } else {
                item.parent_path().map(&rebase)
            };
            item.set_location(if is_top { new_name } else { None }, path, parent);

            match item {
                Item::Folder(folder) => {
                    folder.children = folder.children.iter().map(|c| rebase(c.as_path())).collect();
                }
                Item::Song(song) => {
                    for record in [&mut song.original, &mut song.changed] {
                        if let Some(mid) = record.midfile.as_mut() {
                            *mid = rebase(mid.as_path());
                        }
                    }
                }
                Item::File(_) => {}
            }
        }

        let parent = taken
            .first()
            .and_then(|item| item.parent_path().map(Path::to_path_buf));
        for item in taken {
            moved.push(item.path().to_path_buf());
            self.items.insert(item.path().to_path_buf(), item);
        }
        if let Some(parent) = parent {
            if let Ok(folder) = self.folder_mut(&parent) {
                for child in folder.children.iter_mut() {
                    if child.as_path() == old_path {
                        *child = new_path.to_path_buf();
                    }
                }
            }
        }
        let current = self
            .current_folder
            .as_deref()
            .filter(|current| current.starts_with(old_path))
            .map(&rebase);
        if current.is_some() {
            self.current_folder = current;
        }
        if self.root.as_deref() == Some(old_path) {
            self.root = Some(new_path.to_path_buf());
        }

        debug!(from = ?old_path, to = ?new_path, count = moved.len(), "Relocated item");
        Ok(moved)
    }

    // -------------------------------------------------------------------------
    // Folder state
    // -------------------------------------------------------------------------

    pub fn set_expanded(&mut self, path: &Path, expanded: bool) -> Result<()> {
        self.folder_mut(path)?.expanded = expanded;
        Ok(())
    }

    /// Flip a folder's expanded flag and return the new value.
    pub fn toggle_expanded(&mut self, path: &Path) -> Result<bool> {
        let folder = self.folder_mut(path)?;
        folder.expanded = !folder.expanded;
        Ok(folder.expanded)
    }

    /// Direct children of a folder: folders first, then by name.
    ///
    /// Plain files are skipped unless `include_files` is set.
    pub fn children_of(&self, folder: &Path, include_files: bool) -> Vec<&Item> {
        let Some(folder) = self.folder(folder) else {
            return Vec::new();
        };
        let mut children: Vec<&Item> = folder
            .children
            .iter()
            .filter_map(|p| self.items.get(p))
            .filter(|item| include_files || !matches!(item, Item::File(_)))
            .collect();
        children.sort_by(|a, b| compare_items(a, b));
        children
    }

    pub fn current_children(&self, include_files: bool) -> Vec<&Item> {
        match self.current_folder.as_deref() {
            Some(current) => self.children_of(current, include_files),
            None => Vec::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Songs
    // -------------------------------------------------------------------------

    /// Songs directly inside `folder`, in child-list order
    pub fn songs_in(&self, folder: &Path) -> Vec<&SongItem> {
        self.folder(folder)
            .map(|f| {
                f.children
                    .iter()
                    .filter_map(|p| self.song(p))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Any song directly inside `folder` has pending edits
    pub fn has_dirty_in(&self, folder: &Path) -> bool {
        self.songs_in(folder).iter().any(|song| song.is_dirty())
    }

    /// Edit one field of a song's `changed` record.
    ///
    /// Editing the song name renames the item in the same step. The song's
    /// directory name is refused; it moves only with the directory itself.
    pub fn update_song_field(
        &mut self,
        path: &Path,
        field: SongField,
        value: Option<&str>,
    ) -> Result<()> {
        let Some(Item::Song(song)) = self.items.get_mut(path) else {
            return Err(LibraryError::not_found("song", path));
        };
        if !field.is_editable() {
            return Err(LibraryError::InvalidInput {
                field: field.key().to_string(),
                message: format!("{} cannot be edited", field.label()),
            });
        }
        song.changed.set(field, value)?;
        if field == SongField::SongName {
            song.name = song.changed.song_name.clone();
        }
        trace!(path = ?path, field = %field, "Updated song field");
        Ok(())
    }

    /// Reset every song in `folder` to its persisted record.
    pub fn discard_changes(&mut self, folder: &Path) -> Vec<PathBuf> {
        self.map_songs_in(folder, |song| {
            if !song.is_dirty() {
                return false;
            }
            song.changed = song.original.clone();
            song.name = song.original.song_name.clone();
            true
        })
    }

    /// Mark the `changed` record of every song in `folder` as persisted.
    pub fn commit_changes(&mut self, folder: &Path) -> Vec<PathBuf> {
        self.map_songs_in(folder, |song| {
            if !song.is_dirty() {
                return false;
            }
            song.original = song.changed.clone();
            true
        })
    }

    fn map_songs_in<F>(&mut self, folder: &Path, mut f: F) -> Vec<PathBuf>
    where
        F: FnMut(&mut SongItem) -> bool,
    {
        let children = self
            .folder(folder)
            .map(|f| f.children.clone())
            .unwrap_or_default();
        let mut touched = Vec::new();
        for child in children {
            if let Some(Item::Song(song)) = self.items.get_mut(&child) {
                if f(song) {
                    touched.push(child);
                }
            }
        }
        touched
    }

    // -------------------------------------------------------------------------
    // Consistency
    // -------------------------------------------------------------------------

    /// Paths listed more than once across all child lists
    pub fn duplicate_paths(&self) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for item in self.items.values() {
            if let Item::Folder(folder) = item {
                for child in &folder.children {
                    if !seen.insert(child.as_path()) && !duplicates.contains(child) {
                        duplicates.push(child.clone());
                    }
                }
            }
        }
        duplicates
    }

    /// Check the tree invariants, reporting the first violation.
    pub fn validate(&self) -> Result<()> {
        if let Some(duplicate) = self.duplicate_paths().first() {
            return Err(LibraryError::Invariant(format!(
                "{} is listed more than once",
                duplicate.display()
            )));
        }

        for item in self.items.values() {
            if let Some(parent) = item.parent_path() {
                let listed = self
                    .folder(parent)
                    .map(|f| f.children.iter().filter(|c| c.as_path() == item.path()).count())
                    .unwrap_or(0);
                if listed != 1 {
                    return Err(LibraryError::Invariant(format!(
                        "{} appears {} times in parent {}",
                        item.path().display(),
                        listed,
                        parent.display()
                    )));
                }
            } else if self.root.as_deref() != Some(item.path()) {
                return Err(LibraryError::Invariant(format!(
                    "{} has no parent but is not the root",
                    item.path().display()
                )));
            }

            if let Item::Folder(folder) = item {
                for child in &folder.children {
                    let linked = self
                        .items
                        .get(child)
                        .and_then(|c| c.parent_path())
                        .is_some_and(|p| p == folder.path);
                    if !linked {
                        return Err(LibraryError::Invariant(format!(
                            "{} lists {} which is missing or has another parent",
                            folder.path.display(),
                            child.display()
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Folders before anything else, then by name
fn compare_items(a: &Item, b: &Item) -> Ordering {
    b.is_folder()
        .cmp(&a.is_folder())
        .then_with(|| a.name().cmp(b.name()))
}
