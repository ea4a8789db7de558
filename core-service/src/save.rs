//! Saving the current folder
//!
//! ## Workflow
//! 1. Replace the MIDI file of every song whose MIDI reference changed,
//!    concurrently across songs
//! 2. Point each song's working copy at the copied-in file
//! 3. Back up and rewrite the record file; a failed backup aborts the save
//! 4. Commit the working copies as the new saved state
//!
//! Progress is published as [`SaveEvent`]s and kept as the explorer's last
//! [`SaveJob`].

use std::path::{Path, PathBuf};

use bridge_traits::storage::FileSystemAccess;
use core_library::{BackupPolicy, SongField, SongItem};
use core_runtime::events::{ExplorerEvent, SaveEvent, TreeEvent};
use futures::future::try_join_all;
use tracing::{debug, info, instrument};

use crate::error::{ExplorerError, Result};
use crate::explorer::Explorer;
use crate::job::SaveJob;

impl Explorer {
    /// Persist every song of the current folder.
    ///
    /// Returns the finished job. On failure the error is returned, the
    /// saved state of the songs is left as it was, and
    /// [`last_save`](Self::last_save) holds the failed job.
    #[instrument(skip(self))]
    pub async fn save(&mut self) -> Result<SaveJob> {
        let folder = self.current_folder()?;
        let mut job = SaveJob::new(&folder);
        job.start()?;
        self.last_save = Some(job.clone());
        self.emit(ExplorerEvent::Save(SaveEvent::InProgress {
            folder: folder.clone(),
        }));

        match self.persist_folder(&folder).await {
            Ok(song_count) => {
                job.succeed(song_count)?;
                info!(folder = %folder.display(), song_count, "Saved folder");
                self.emit(ExplorerEvent::Save(SaveEvent::Succeeded {
                    folder,
                    song_count,
                }));
                self.last_save = Some(job.clone());
                Ok(job)
            }
            Err(err) => {
                job.fail(err.to_string())?;
                self.emit(ExplorerEvent::Save(SaveEvent::Failed {
                    folder,
                    message: err.to_string(),
                }));
                self.last_save = Some(job);
                Err(self.report(err).await)
            }
        }
    }

    async fn persist_folder(&mut self, folder: &Path) -> Result<usize> {
        let fs = self.config.file_system.clone();
        let songs: Vec<SongItem> = self.store.songs_in(folder).into_iter().cloned().collect();

        let record_path = folder.join(&self.config.record_file_name);
        if songs.is_empty() && !fs.exists(&record_path).await? {
            debug!("No songs and no record file; nothing to save");
            return Ok(0);
        }

        let replacements = songs
            .iter()
            .filter(|song| song.changed.midfile != song.original.midfile)
            .map(|song| replace_midi_file(fs.as_ref(), song));
        let placed = try_join_all(replacements).await?;

        for (song_path, midfile) in placed {
            let value = midfile.map(|path| path.to_string_lossy().into_owned());
            self.store
                .update_song_field(&song_path, SongField::MidFile, value.as_deref())?;
        }

        self.write_folder_record(folder, BackupPolicy::Required).await?;

        let committed = self.store.commit_changes(folder);
        if !committed.is_empty() {
            self.emit(ExplorerEvent::Tree(TreeEvent::ItemsChanged { paths: committed }));
        }
        Ok(songs.len())
    }
}

/// Swap a song's MIDI file for the one its working copy points at.
///
/// Returns the song path and where the MIDI file now lives inside it.
async fn replace_midi_file(
    fs: &dyn FileSystemAccess,
    song: &SongItem,
) -> Result<(PathBuf, Option<PathBuf>)> {
    if let Some(old) = &song.original.midfile {
        if fs.exists(old).await? {
            fs.remove_file(old).await?;
        }
    }

    let placed = match &song.changed.midfile {
        Some(source) => {
            let file_name = source.file_name().ok_or_else(|| ExplorerError::InvalidName {
                name: source.display().to_string(),
                reason: "MIDI path has no file name".to_string(),
            })?;
            let target = song.path.join(file_name);
            if source != &target {
                fs.copy_file(source, &target).await?;
            }
            Some(target)
        }
        None => None,
    };

    debug!(song = %song.song_id, midfile = ?placed, "Replaced MIDI file");
    Ok((song.path.clone(), placed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::SaveStatus;
    use crate::test_support::{explorer_at, read_record_text, write_song_folder};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_writes_record_and_backup() {
        let dir = TempDir::new().unwrap();
        write_song_folder(dir.path(), &[("S001", "Intro", "SONG_001")]);
        let original = read_record_text(dir.path());
        let (mut explorer, _prompt) = explorer_at(dir.path()).await;
        let song = dir.path().join("SONG_001");

        explorer
            .update_song_field(&song, SongField::SongName, Some("Renamed"))
            .unwrap();
        let mut events = explorer.events().subscribe();
        let job = explorer.save().await.unwrap();

        assert_eq!(job.status(), SaveStatus::Succeeded);
        assert_eq!(job.song_count(), 1);
        assert!(!explorer.has_pending_changes());
        assert!(read_record_text(dir.path()).contains("S001:SONGNAME     = Renamed\r\n"));
        let backup = std::fs::read(dir.path().join("ELS_SONG.NAM.backup")).unwrap();
        assert_eq!(backup, original.as_bytes());

        assert_eq!(
            events.try_recv().unwrap(),
            ExplorerEvent::Save(SaveEvent::InProgress {
                folder: dir.path().to_path_buf()
            })
        );
    }

    #[tokio::test]
    async fn test_save_copies_new_midi_file() {
        let dir = TempDir::new().unwrap();
        write_song_folder(dir.path(), &[("S001", "Intro", "SONG_001")]);
        let outside = TempDir::new().unwrap();
        let midi = outside.path().join("take2.mid");
        std::fs::write(&midi, b"MThd").unwrap();
        let (mut explorer, _prompt) = explorer_at(dir.path()).await;
        let song = dir.path().join("SONG_001");

        explorer
            .update_song_field(&song, SongField::MidFile, Some(midi.to_str().unwrap()))
            .unwrap();
        explorer.save().await.unwrap();

        let placed = song.join("take2.mid");
        assert_eq!(std::fs::read(&placed).unwrap(), b"MThd");
        let saved = explorer.store().song(&song).unwrap();
        assert_eq!(saved.original.midfile.as_deref(), Some(placed.as_path()));
        assert!(read_record_text(dir.path()).contains("S001:MIDFILE      = take2.mid\r\n"));
    }

    #[tokio::test]
    async fn test_save_empty_folder_is_noop() {
        let dir = TempDir::new().unwrap();
        let (mut explorer, _prompt) = explorer_at(dir.path()).await;

        let job = explorer.save().await.unwrap();

        assert_eq!(job.song_count(), 0);
        assert!(!dir.path().join("ELS_SONG.NAM").exists());
        assert_eq!(
            explorer.last_save().map(SaveJob::status),
            Some(SaveStatus::Succeeded)
        );
    }

    #[tokio::test]
    async fn test_unrepresentable_name_fails_without_commit() {
        let dir = TempDir::new().unwrap();
        write_song_folder(dir.path(), &[("S001", "Intro", "SONG_001")]);
        let before = read_record_text(dir.path());
        let (mut explorer, prompt) = explorer_at(dir.path()).await;
        let song = dir.path().join("SONG_001");

        explorer
            .update_song_field(&song, SongField::SongName, Some("🎹 Piano"))
            .unwrap();
        let err = explorer.save().await.unwrap_err();

        assert!(!err.is_refusal());
        assert_eq!(explorer.last_save().unwrap().status(), SaveStatus::Failed);
        assert!(explorer.has_pending_changes());
        assert_eq!(read_record_text(dir.path()), before);
        assert_eq!(prompt.notifications().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_backup_aborts_save() {
        let dir = TempDir::new().unwrap();
        write_song_folder(dir.path(), &[("S001", "Intro", "SONG_001")]);
        let before = std::fs::read(dir.path().join("ELS_SONG.NAM")).unwrap();
        let (mut explorer, prompt) = explorer_at(dir.path()).await;
        let song = dir.path().join("SONG_001");
        // a directory in the way makes the backup copy fail
        std::fs::create_dir(dir.path().join("ELS_SONG.NAM.backup")).unwrap();

        explorer
            .update_song_field(&song, SongField::SongName, Some("Renamed"))
            .unwrap();
        let err = explorer.save().await.unwrap_err();

        assert!(matches!(err, ExplorerError::BackupFailed { .. }));
        assert_eq!(explorer.last_save().unwrap().status(), SaveStatus::Failed);
        assert_eq!(std::fs::read(dir.path().join("ELS_SONG.NAM")).unwrap(), before);
        assert!(explorer.store().song(&song).unwrap().is_dirty());
        assert!(explorer.has_pending_changes());
        assert_eq!(prompt.notifications().len(), 1);
    }
}
