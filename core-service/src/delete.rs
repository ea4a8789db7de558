//! Deleting the selected item

use std::path::PathBuf;

use core_library::record::write_record;
use core_library::{BackupPolicy, ItemInfo, ItemKind, SongItem};
use core_runtime::events::{ClipboardEvent, ExplorerEvent, TreeEvent};
use tracing::{debug, info, instrument};

use crate::error::{ExplorerError, Result};
use crate::explorer::Explorer;

impl Explorer {
    /// Delete the selected item after asking the user.
    ///
    /// Returns `Ok(false)` when the user declines. Disk is changed first; the
    /// tree is only updated once every disk step succeeded, so a failure
    /// leaves it as it was.
    #[instrument(skip(self))]
    pub async fn delete_selected(&mut self) -> Result<bool> {
        let path = self.selection.clone().ok_or(ExplorerError::NothingSelected)?;
        let item = self
            .store
            .get(&path)
            .ok_or_else(|| ExplorerError::NotFound(path.clone()))?;
        let kind = item.kind();
        let name = item.name().to_string();
        let Some(parent) = item.parent_path().map(|p| p.to_path_buf()) else {
            let err = ExplorerError::InvalidTarget("the root folder cannot be deleted".to_string());
            return Err(self.refuse(err).await);
        };

        self.ensure_clean(&parent).await?;
        if kind == ItemKind::Folder {
            self.ensure_clean(&path).await?;
        }

        let question = format!("{}「{}」を削除しますか？", kind.label(), name);
        let confirmed = match self.config.prompt.confirm(&question).await {
            Ok(answer) => answer,
            Err(e) => return Err(self.report(e.into()).await),
        };
        if !confirmed {
            debug!(path = %path.display(), "Deletion declined");
            return Ok(false);
        }

        let fs = self.config.file_system.clone();
        let removed_on_disk = match kind {
            ItemKind::File => fs.remove_file(&path).await,
            ItemKind::Folder | ItemKind::Song => fs.remove_dir(&path, true).await,
        };
        if let Err(e) = removed_on_disk {
            return Err(self.report(e.into()).await);
        }

        if kind == ItemKind::Song {
            let remaining: Vec<SongItem> = self
                .store
                .songs_in(&parent)
                .into_iter()
                .filter(|song| song.path != path)
                .cloned()
                .collect();
            let written = write_record(
                fs.as_ref(),
                self.engine.codec(),
                &parent,
                &self.config.record_file_name,
                &self.config.backup_suffix,
                BackupPolicy::BestEffort,
                &remaining,
            )
            .await;
            if let Err(e) = written {
                return Err(self.report(e.into()).await);
            }
        }

        let removed = self.store.remove_subtree(&path);
        self.selection = None;
        if self.clipboard.forget_within(&path) {
            self.emit(ExplorerEvent::Clipboard(ClipboardEvent::Cleared));
        }
        info!(path = %path.display(), kind = %kind, count = removed.len(), "Deleted item");
        self.emit(ExplorerEvent::Tree(TreeEvent::ItemsChanged {
            paths: removed.clone(),
        }));

        self.reload(&parent).await;
        Ok(true)
    }

    /// Paths a deletion of the selection would remove from the loaded tree
    pub fn deletion_preview(&self) -> Vec<PathBuf> {
        self.selection
            .as_deref()
            .map(|path| self.store.subtree_paths(path))
            .unwrap_or_default()
    }
}
