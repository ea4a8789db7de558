//! Copy/cut staging and paste
//!
//! A paste always runs copy before delete: the source is only removed once
//! its copy exists. Songs need both record files rewritten when they move
//! between folders; plain files and folders are picked up by reloading the
//! two folders afterwards.

use std::path::{Path, PathBuf};

use core_library::{resolve_name, BackupPolicy, Item, ItemInfo, SongItem};
use core_runtime::events::{ClipboardEvent, ExplorerEvent, TreeEvent};
use tracing::{debug, info, instrument};

use crate::clipboard::ClipboardOperation;
use crate::error::{ExplorerError, Result};
use crate::explorer::Explorer;

impl Explorer {
    /// Stage the selection to be copied by the next paste.
    pub async fn stage_copy(&mut self) -> Result<()> {
        self.stage(ClipboardOperation::Copy).await
    }

    /// Stage the selection to be moved by the next paste.
    pub async fn stage_cut(&mut self) -> Result<()> {
        self.stage(ClipboardOperation::Cut).await
    }

    async fn stage(&mut self, operation: ClipboardOperation) -> Result<()> {
        let path = self.selection.clone().ok_or(ExplorerError::NothingSelected)?;
        let item = self
            .store
            .get(&path)
            .ok_or_else(|| ExplorerError::NotFound(path.clone()))?;

        if item.parent_path().is_none() {
            let err = ExplorerError::InvalidTarget(
                "the root folder cannot be copied or moved".to_string(),
            );
            return Err(self.refuse(err).await);
        }
        if let Some(err) = protection_error(item) {
            return Err(self.refuse(err).await);
        }

        let kind = item.kind();
        self.clipboard.stage(path.clone(), kind, operation);
        debug!(path = %path.display(), %operation, "Staged item");
        self.emit(ExplorerEvent::Clipboard(ClipboardEvent::Staged {
            path,
            operation: operation.as_str().to_string(),
        }));
        Ok(())
    }

    /// Drop the staged item without pasting it
    pub fn clear_staged(&mut self) {
        if self.clipboard.clear() {
            self.emit(ExplorerEvent::Clipboard(ClipboardEvent::Cleared));
        }
    }

    /// Paste the staged item into the current folder.
    ///
    /// Returns the path of the pasted copy, or `None` when cutting into the
    /// folder the item already lives in.
    #[instrument(skip(self))]
    pub async fn paste(&mut self) -> Result<Option<PathBuf>> {
        let staged = self
            .clipboard
            .staged()
            .cloned()
            .ok_or(ExplorerError::NothingStaged)?;
        let dest = self.current_folder()?;

        let Some(item) = self.store.get(&staged.path).cloned() else {
            self.clear_staged();
            let err = ExplorerError::NotFound(staged.path);
            return Err(self.refuse(err).await);
        };
        let source_parent = item
            .parent_path()
            .map(Path::to_path_buf)
            .ok_or_else(|| ExplorerError::InvalidTarget("the root folder cannot be pasted".to_string()))?;
        let cut = staged.operation == ClipboardOperation::Cut;

        if cut && source_parent == dest {
            debug!("Cut into the same folder; nothing to do");
            self.clear_staged();
            return Ok(None);
        }

        self.ensure_clean(&dest).await?;
        if cut && matches!(item, Item::Song(_)) {
            // the source record is rewritten too
            self.ensure_clean(&source_parent).await?;
        }
        if let Some(err) = protection_error(&item) {
            return Err(self.refuse(err).await);
        }
        if item.is_folder() && dest.starts_with(&staged.path) {
            let err = ExplorerError::InvalidTarget(
                "a folder cannot be pasted into itself".to_string(),
            );
            return Err(self.refuse(err).await);
        }

        let pasted = match &item {
            Item::Song(song) => self.paste_song(song, &source_parent, &dest, cut).await,
            other => {
                self.paste_entry(other.path(), other.name(), other.is_folder(), &dest, cut)
                    .await
            }
        };
        let new_path = match pasted {
            Ok(path) => path,
            Err(err) => return Err(self.report(err).await),
        };

        self.reload(&dest).await;
        if source_parent != dest {
            self.reload(&source_parent).await;
        }
        self.clear_staged();

        info!(
            from = %staged.path.display(),
            to = %new_path.display(),
            operation = %staged.operation,
            "Pasted item"
        );
        self.emit(ExplorerEvent::Tree(TreeEvent::ItemsChanged {
            paths: vec![staged.path, new_path.clone()],
        }));
        Ok(Some(new_path))
    }

    async fn paste_song(
        &mut self,
        song: &SongItem,
        source_parent: &Path,
        dest: &Path,
        cut: bool,
    ) -> Result<PathBuf> {
        let fs = self.config.file_system.clone();

        let (name, song_id) = {
            let dest_songs = self.store.songs_in(dest);
            let name = resolve_name(
                &song.original.song_name,
                dest_songs.iter().map(|s| s.name.as_str()),
            );
            let song_id = resolve_name(
                &self.config.song_id_base,
                dest_songs.iter().map(|s| s.song_id.as_str()),
            );
            (name, song_id)
        };

        let mut taken = self.engine.directory_names(dest).await?;
        taken.extend(
            self.store
                .children_of(dest, true)
                .iter()
                .filter_map(|item| item.path().file_name())
                .map(|n| n.to_string_lossy().into_owned()),
        );
        let folder_name = resolve_name(
            &self.config.song_folder_base,
            taken.iter().map(String::as_str),
        );
        let new_path = dest.join(&folder_name);

        let mut record = song.original.clone();
        record.song_name = name;
        record.folder = folder_name;
        record.midfile = record.midfile.as_deref().map(|mid| {
            mid.strip_prefix(&song.path)
                .map(|rest| new_path.join(rest))
                .unwrap_or_else(|_| mid.to_path_buf())
        });

        fs.copy_dir_all(&song.path, &new_path).await?;
        self.store.insert(Item::Song(SongItem::new(
            song_id,
            new_path.clone(),
            Some(dest.to_path_buf()),
            record,
        )))?;

        if cut {
            fs.remove_dir(&song.path, true).await?;
            self.store.remove_subtree(&song.path);
        }

        self.write_folder_record(dest, BackupPolicy::BestEffort).await?;
        if cut && source_parent != dest {
            self.write_folder_record(source_parent, BackupPolicy::BestEffort)
                .await?;
        }
        Ok(new_path)
    }

    async fn paste_entry(
        &mut self,
        source: &Path,
        name: &str,
        is_folder: bool,
        dest: &Path,
        cut: bool,
    ) -> Result<PathBuf> {
        let fs = self.config.file_system.clone();
        let taken = self.engine.directory_names(dest).await?;
        let target = dest.join(resolve_name(name, taken.iter().map(String::as_str)));

        if is_folder {
            fs.copy_dir_all(source, &target).await?;
        } else {
            fs.copy_file(source, &target).await?;
        }

        if cut {
            if is_folder {
                fs.remove_dir(source, true).await?;
            } else {
                fs.remove_file(source).await?;
            }
            self.store.remove_subtree(source);
        }
        Ok(target)
    }
}

fn protection_error(item: &Item) -> Option<ExplorerError> {
    match item {
        Item::Song(song) if song.is_protected() => Some(ExplorerError::Protected {
            name: song.name.clone(),
        }),
        _ => None,
    }
}
