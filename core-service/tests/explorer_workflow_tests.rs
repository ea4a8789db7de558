//! Integration tests for the Explorer
//!
//! These tests drive the explorer against real temporary directories and
//! verify:
//! - Record files after editing, saving, pasting and deleting songs
//! - Confirmation and file picker interactions with the host
//! - Tree invariants across a sequence of mutations

use async_trait::async_trait;
use bridge_desktop::TokioFileSystem;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::prompt::{FileFilter, FilePicker, MessageLevel, UserPrompt};
use core_service::{Explorer, ExplorerConfig, ExplorerError, ItemInfo, SaveStatus, SongField};
use encoding_rs::SHIFT_JIS;
use mockall::mock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

mock! {
    pub Prompt {}

    #[async_trait]
    impl UserPrompt for Prompt {
        async fn confirm(&self, message: &str) -> BridgeResult<bool>;
        async fn notify(&self, message: &str, level: MessageLevel) -> BridgeResult<()>;
    }
}

mock! {
    pub Picker {}

    #[async_trait]
    impl FilePicker for Picker {
        async fn pick_file(&self, title: &str, filters: &[FileFilter]) -> BridgeResult<Option<PathBuf>>;
    }
}

const RECORD: &str = "ELS_SONG.NAM";

fn song_block(id: &str, name: &str, folder: &str, security: &str) -> String {
    [
        ("SONGNAME", name),
        ("FOLDER", folder),
        ("SECURITY", security),
        ("MODEL", "ELS-02C"),
        ("PART_UK", "PLAY"),
        ("PART_LK", "PLAY"),
        ("PART_PK", "PLAY"),
        ("PART_LEAD", "OFF"),
        ("PART_KBP", "PLAY"),
        ("PART_CTRL", "OFF"),
        ("BLKFILE_001", "B00.BLK"),
    ]
    .iter()
    .map(|(key, value)| format!("{}:{:<13}= {}\r\n", id, key, value))
    .collect()
}

/// Create song directories and the record file describing them
fn write_songs(dir: &Path, songs: &[(&str, &str, &str, &str)]) {
    std::fs::create_dir_all(dir).unwrap();
    let mut text = String::new();
    for (id, name, folder, security) in songs {
        std::fs::create_dir_all(dir.join(folder)).unwrap();
        std::fs::write(dir.join(folder).join("B00.BLK"), b"block").unwrap();
        text.push_str(&song_block(id, name, folder, security));
    }
    std::fs::write(dir.join(RECORD), SHIFT_JIS.encode(&text).0).unwrap();
}

fn read_record(dir: &Path) -> String {
    let bytes = std::fs::read(dir.join(RECORD)).unwrap();
    SHIFT_JIS.decode(&bytes).0.into_owned()
}

async fn open(root: &Path, prompt: MockPrompt, picker: Option<MockPicker>) -> Explorer {
    let mut builder = ExplorerConfig::builder()
        .file_system(Arc::new(TokioFileSystem::new()))
        .prompt(Arc::new(prompt));
    if let Some(picker) = picker {
        builder = builder.file_picker(Arc::new(picker));
    }
    let mut explorer = Explorer::new(builder.build().unwrap()).unwrap();
    explorer.open_root(root).await.unwrap();
    explorer
}

/// A prompt that must never be used
fn silent_prompt() -> MockPrompt {
    let mut prompt = MockPrompt::new();
    prompt.expect_confirm().never();
    prompt.expect_notify().never();
    prompt
}

#[tokio::test]
async fn test_rename_song_and_save() {
    let dir = TempDir::new().unwrap();
    write_songs(dir.path(), &[("S001", "Intro", "SONG_001", "OFF")]);
    let mut explorer = open(dir.path(), silent_prompt(), None).await;
    let song = dir.path().join("SONG_001");

    explorer
        .update_song_field(&song, SongField::SongName, Some("Renamed"))
        .unwrap();
    assert_eq!(explorer.store().song(&song).unwrap().name, "Renamed");
    assert!(explorer.has_pending_changes());

    let job = explorer.save().await.unwrap();
    assert_eq!(job.status(), SaveStatus::Succeeded);

    let lines: Vec<String> = read_record(dir.path())
        .split("\r\n")
        .map(str::to_string)
        .collect();
    assert_eq!(lines[0], "S001:SONGNAME     = Renamed");
    assert_eq!(lines[1], "S001:FOLDER       = SONG_001");
    assert!(read_record_backup_exists(dir.path()));
    assert!(!explorer.has_pending_changes());
}

fn read_record_backup_exists(dir: &Path) -> bool {
    dir.join(format!("{}.backup", RECORD)).exists()
}

#[tokio::test]
async fn test_cut_song_across_folders_rewrites_both_records() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("SOURCE");
    let dest = dir.path().join("DEST");
    write_songs(
        &source,
        &[
            ("S001", "Intro", "SONG_001", "OFF"),
            ("S002", "Outro", "SONG_002", "OFF"),
        ],
    );
    write_songs(&dest, &[("S001", "Intro", "SONG_001", "OFF")]);
    let mut explorer = open(dir.path(), silent_prompt(), None).await;

    explorer.enter_folder(&source).await.unwrap();
    explorer.select(&source.join("SONG_002")).unwrap();
    explorer.stage_cut().await.unwrap();
    explorer.go_up().await.unwrap();
    explorer.enter_folder(&dest).await.unwrap();

    let pasted = explorer.paste().await.unwrap().unwrap();

    assert_eq!(pasted, dest.join("SONG_002"));
    assert!(pasted.join("B00.BLK").exists());
    assert!(!source.join("SONG_002").exists());

    let dest_record = read_record(&dest);
    assert!(dest_record.contains("S002:SONGNAME     = Outro\r\n"));
    assert!(dest_record.contains("S002:FOLDER       = SONG_002\r\n"));
    let source_record = read_record(&source);
    assert!(source_record.contains("S001:SONGNAME     = Intro\r\n"));
    assert!(!source_record.contains("S002:"));

    assert!(explorer.store().song(&source.join("SONG_002")).is_none());
    assert!(explorer.staged().is_none());
    explorer.store().validate().unwrap();
}

#[tokio::test]
async fn test_copy_song_across_folders_keeps_source() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("A");
    let dest = dir.path().join("B");
    write_songs(
        &source,
        &[
            ("S001", "Intro", "SONG_001", "OFF"),
            ("S002", "Outro", "SONG_002", "OFF"),
        ],
    );
    write_songs(&dest, &[("S001", "Intro", "SONG_001", "OFF")]);
    std::fs::create_dir(dest.join("SONG_002")).unwrap();
    let mut explorer = open(dir.path(), silent_prompt(), None).await;

    explorer.enter_folder(&source).await.unwrap();
    explorer.select(&source.join("SONG_002")).unwrap();
    explorer.stage_copy().await.unwrap();
    explorer.go_up().await.unwrap();
    explorer.enter_folder(&dest).await.unwrap();

    let pasted = explorer.paste().await.unwrap().unwrap();

    assert_eq!(pasted, dest.join("SONG_003"));
    let copy = explorer.store().song(&pasted).unwrap();
    assert_eq!(copy.song_id, "S002");
    assert_eq!(copy.name, "Outro");
    assert_eq!(copy.original, copy.changed);
    assert_eq!(explorer.store().songs_in(&dest).len(), 2);
    assert!(!explorer.has_pending_changes());

    let dest_record = read_record(&dest);
    assert!(dest_record.contains("S002:FOLDER       = SONG_003\r\n"));
    assert!(dest_record.contains("S001:FOLDER       = SONG_001\r\n"));

    assert!(source.join("SONG_002").join("B00.BLK").exists());
    assert_eq!(explorer.store().songs_in(&source).len(), 2);
    assert!(read_record(&source).contains("S002:SONGNAME     = Outro\r\n"));
    explorer.store().validate().unwrap();
}

#[tokio::test]
async fn test_copy_folder_gets_unique_name() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("SETS").join("inner")).unwrap();
    let mut explorer = open(dir.path(), silent_prompt(), None).await;

    explorer.select(&dir.path().join("SETS")).unwrap();
    explorer.stage_copy().await.unwrap();
    let pasted = explorer.paste().await.unwrap().unwrap();

    assert_eq!(pasted, dir.path().join("SETS_001"));
    assert!(pasted.join("inner").is_dir());
    assert!(dir.path().join("SETS").join("inner").is_dir());
    assert!(explorer.store().folder(&pasted).is_some());
}

#[tokio::test]
async fn test_delete_asks_for_confirmation() {
    let dir = TempDir::new().unwrap();
    write_songs(dir.path(), &[("S001", "Intro", "SONG_001", "OFF")]);
    std::fs::create_dir(dir.path().join("KEEP")).unwrap();

    let mut prompt = MockPrompt::new();
    let mut answers = vec![true, false].into_iter();
    prompt
        .expect_confirm()
        .times(2)
        .returning(move |_| Ok(answers.next().unwrap_or(false)));
    prompt.expect_notify().never();
    let mut explorer = open(dir.path(), prompt, None).await;

    explorer.select(&dir.path().join("SONG_001")).unwrap();
    assert!(explorer.delete_selected().await.unwrap());
    explorer.select(&dir.path().join("KEEP")).unwrap();
    assert!(!explorer.delete_selected().await.unwrap());

    assert!(!dir.path().join("SONG_001").exists());
    assert!(dir.path().join("KEEP").is_dir());
    assert!(!read_record(dir.path()).contains("S001:"));
}

#[tokio::test]
async fn test_delete_confirmation_names_the_item() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("OLD")).unwrap();

    let mut prompt = MockPrompt::new();
    prompt
        .expect_confirm()
        .withf(|message| message.contains("フォルダ") && message.contains("OLD"))
        .times(1)
        .returning(|_| Ok(true));
    let mut explorer = open(dir.path(), prompt, None).await;

    explorer.select(&dir.path().join("OLD")).unwrap();
    assert!(explorer.delete_selected().await.unwrap());
}

#[tokio::test]
async fn test_protected_song_refusal_is_reported() {
    let dir = TempDir::new().unwrap();
    write_songs(dir.path(), &[("S001", "Locked", "SONG_001", "ON")]);

    let mut prompt = MockPrompt::new();
    prompt
        .expect_notify()
        .withf(|message, level| *level == MessageLevel::Warning && message.contains("Locked"))
        .times(1)
        .returning(|_, _| Ok(()));
    let mut explorer = open(dir.path(), prompt, None).await;
    let song = dir.path().join("SONG_001");

    assert!(explorer.store().song(&song).unwrap().is_protected());
    explorer.select(&song).unwrap();
    let err = explorer.stage_cut().await.unwrap_err();

    assert!(matches!(err, ExplorerError::Protected { .. }));
    assert!(err.is_refusal());
    assert!(explorer.staged().is_none());
}

#[tokio::test]
async fn test_picked_midi_file_is_copied_on_save() {
    let dir = TempDir::new().unwrap();
    write_songs(dir.path(), &[("S001", "Intro", "SONG_001", "OFF")]);
    let outside = TempDir::new().unwrap();
    let midi = outside.path().join("Intro.MID");
    std::fs::write(&midi, b"MThd").unwrap();

    let mut picker = MockPicker::new();
    let picked = midi.clone();
    picker
        .expect_pick_file()
        .withf(|_, filters| filters.len() == 1 && filters[0].extensions == vec!["mid".to_string()])
        .times(1)
        .returning(move |_, _| Ok(Some(picked.clone())));
    let mut explorer = open(dir.path(), silent_prompt(), Some(picker)).await;
    let song = dir.path().join("SONG_001");

    let chosen = explorer.pick_midi_file(&song).await.unwrap();
    assert_eq!(chosen.as_deref(), Some(midi.as_path()));
    assert!(explorer.has_pending_changes());

    explorer.save().await.unwrap();

    assert!(song.join("Intro.MID").exists());
    assert!(read_record(dir.path()).contains("S001:MIDFILE      = Intro.MID\r\n"));
}

#[tokio::test]
async fn test_tree_stays_consistent_across_operations() {
    let dir = TempDir::new().unwrap();
    write_songs(dir.path(), &[("S001", "Intro", "SONG_001", "OFF")]);
    std::fs::create_dir_all(dir.path().join("A").join("B")).unwrap();
    let mut explorer = open(dir.path(), silent_prompt(), None).await;

    explorer.toggle_folder(&dir.path().join("A")).await.unwrap();
    let placeholder = explorer.create_pending_folder().await.unwrap();
    let created = explorer
        .commit_pending_folder(&placeholder, "NEW")
        .await
        .unwrap();
    explorer.rename_item(&created, "RENAMED").await.unwrap();

    explorer.select(&dir.path().join("SONG_001")).unwrap();
    explorer.stage_copy().await.unwrap();
    explorer.enter_folder(&dir.path().join("RENAMED")).await.unwrap();
    explorer.paste().await.unwrap();
    explorer.refresh().await.unwrap();
    explorer.go_up().await.unwrap();
    explorer.refresh().await.unwrap();

    let store = explorer.store();
    store.validate().unwrap();
    assert!(store.duplicate_paths().is_empty());
    assert!(store.folder(&dir.path().join("A").join("B")).is_some());
    assert!(store.song(&dir.path().join("RENAMED").join("SONG_001")).is_some());

    let names: Vec<_> = explorer
        .current_children(false)
        .iter()
        .map(|item| item.name().to_string())
        .collect();
    assert_eq!(names, vec!["A", "RENAMED", "Intro"]);
}
