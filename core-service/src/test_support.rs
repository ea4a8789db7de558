//! Fixtures shared by the unit tests of this crate

use std::path::Path;
use std::sync::Arc;

use bridge_desktop::{HeadlessPrompt, TokioFileSystem};
use bridge_traits::prompt::FilePicker;
use core_runtime::config::ExplorerConfig;
use encoding_rs::SHIFT_JIS;

use crate::Explorer;

pub(crate) const RECORD: &str = "ELS_SONG.NAM";

/// One complete song block in record file layout
pub(crate) fn record_block(id: &str, name: &str, folder: &str) -> String {
    [
        ("SONGNAME", name),
        ("FOLDER", folder),
        ("SECURITY", "OFF"),
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

pub(crate) fn write_record_text(dir: &Path, text: &str) {
    let (bytes, _, _) = SHIFT_JIS.encode(text);
    std::fs::write(dir.join(RECORD), bytes).unwrap();
}

pub(crate) fn read_record_text(dir: &Path) -> String {
    let bytes = std::fs::read(dir.join(RECORD)).unwrap();
    SHIFT_JIS.decode(&bytes).0.into_owned()
}

/// Song directories with a block file each, plus their record file
pub(crate) fn write_song_folder(dir: &Path, songs: &[(&str, &str, &str)]) {
    let mut text = String::new();
    for (id, name, folder) in songs {
        let song_dir = dir.join(folder);
        std::fs::create_dir_all(&song_dir).unwrap();
        std::fs::write(song_dir.join("B00.BLK"), b"block").unwrap();
        text.push_str(&record_block(id, name, folder));
    }
    write_record_text(dir, &text);
}

pub(crate) async fn explorer_with_prompt(
    root: &Path,
    prompt: Arc<HeadlessPrompt>,
    picker: Option<Arc<dyn FilePicker>>,
) -> Explorer {
    let mut builder = ExplorerConfig::builder()
        .file_system(Arc::new(TokioFileSystem::new()))
        .prompt(prompt);
    if let Some(picker) = picker {
        builder = builder.file_picker(picker);
    }
    let mut explorer = Explorer::new(builder.build().unwrap()).unwrap();
    explorer.open_root(root).await.unwrap();
    explorer
}

/// An explorer opened at `root` whose prompt accepts every confirmation
pub(crate) async fn explorer_at(root: &Path) -> (Explorer, Arc<HeadlessPrompt>) {
    let prompt = Arc::new(HeadlessPrompt::accepting());
    let explorer = explorer_with_prompt(root, prompt.clone(), None).await;
    (explorer, prompt)
}
