//! # Folder Reconciliation
//!
//! Merges a fresh directory listing for one folder (the scope) into the
//! [`ItemStore`] without touching disk.
//!
//! ## Rules
//!
//! - decoded songs own their backing directories; a listed directory with
//!   the same path as a song is not also shown as a plain folder
//! - a folder seen before keeps its expanded flag and loaded children
//! - a song whose on-disk record did not change keeps its pending edits
//! - children of the scope that vanished from disk are pruned together with
//!   everything loaded below them; the rest of the store is left alone
//!
//! [`reconcile`] computes the changes and [`apply`] commits them, so the
//! merge rules can be tested against plain values.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use bridge_traits::storage::DirEntry;
use core_library::{FileItem, FolderItem, Item, ItemInfo, ItemStore, SongItem};
use tracing::trace;

use crate::error::{Result, SyncError};

/// Changes needed to bring one folder in line with disk
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub folder: PathBuf,
    /// New child list of `folder`, songs first then listing order
    pub children: Vec<PathBuf>,
    /// Items to insert or refresh
    pub upserts: Vec<Item>,
    /// Items to remove together with their loaded subtrees
    pub removals: Vec<PathBuf>,
    /// Song paths claimed by more than one identifier; the first one wins
    pub duplicates: Vec<PathBuf>,
}

impl Reconciliation {
    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// Compute the reconciliation of `folder` against an already filtered
/// listing and the songs decoded from its record file.
pub fn reconcile(
    store: &ItemStore,
    folder: &Path,
    entries: Vec<DirEntry>,
    songs: Vec<SongItem>,
) -> Reconciliation {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut children = Vec::with_capacity(entries.len() + songs.len());
    let mut upserts = Vec::with_capacity(entries.len() + songs.len());
    let mut removals = Vec::new();
    let mut duplicates = Vec::new();

    for song in songs {
        if !seen.insert(song.path.clone()) {
            duplicates.push(song.path.clone());
            continue;
        }
        let refreshed = match store.song(&song.path) {
            Some(known) if known.original == song.original => SongItem {
                song_id: song.song_id,
                ..known.clone()
            },
            _ => song,
        };
        children.push(refreshed.path.clone());
        upserts.push(Item::Song(refreshed));
    }

    for entry in entries {
        // skips song-owned directories as well as repeated listing entries
        if !seen.insert(entry.path.clone()) {
            continue;
        }
        let item = if entry.is_directory {
            match store.folder(&entry.path) {
                Some(known) => Item::Folder(FolderItem {
                    name: entry.name,
                    parent_path: Some(folder.to_path_buf()),
                    ..known.clone()
                }),
                None => Item::Folder(FolderItem::new(
                    entry.name,
                    entry.path,
                    Some(folder.to_path_buf()),
                )),
            }
        } else {
            Item::File(FileItem::new(
                entry.name,
                entry.path,
                Some(folder.to_path_buf()),
            ))
        };
        children.push(item.path().to_path_buf());
        upserts.push(item);
    }

    // a folder that is now a song or a file loses what was loaded below it
    for item in &upserts {
        if item.is_folder() {
            continue;
        }
        if let Some(previous) = store.folder(item.path()) {
            removals.extend(previous.children.iter().cloned());
        }
    }

    if let Some(previous) = store.folder(folder) {
        removals.extend(
            previous
                .children
                .iter()
                .filter(|child| !seen.contains(*child))
                .cloned(),
        );
    }

    trace!(
        folder = ?folder,
        children = children.len(),
        removals = removals.len(),
        "Reconciled folder"
    );

    Reconciliation {
        folder: folder.to_path_buf(),
        children,
        upserts,
        removals,
        duplicates,
    }
}

/// Commit a reconciliation to the store.
///
/// Returns every path that was removed. The store is untouched when
/// `folder` is not a loaded folder.
pub fn apply(store: &mut ItemStore, reconciliation: Reconciliation) -> Result<Vec<PathBuf>> {
    let Reconciliation {
        folder,
        children,
        upserts,
        removals,
        ..
    } = reconciliation;

    if store.folder(&folder).is_none() {
        return Err(SyncError::NotAFolder(folder));
    }

    let mut removed = Vec::new();
    for path in &removals {
        removed.extend(store.remove_subtree(path));
    }
    for item in upserts {
        store.upsert(item);
    }
    store.replace_children(&folder, children)?;

    // the current folder may have been replaced by a song or a file
    let current_lost = store
        .current_folder_path()
        .is_some_and(|current| store.folder(current).is_none());
    if current_lost {
        store.set_current_folder(&folder)?;
    }

    Ok(removed)
}
