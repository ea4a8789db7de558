//! # Song Record Codec
//!
//! Reads and writes the per-directory record file (`ELS_SONG.NAM`).
//!
//! ## Format
//!
//! Shift_JIS text, one field per line, CRLF separated:
//!
//! ```text
//! S001:SONGNAME     = My Song
//! S001:FOLDER       = SONG_001
//! S001:SECURITY     = OFF
//! ```
//!
//! Decoding is best effort. Lines that do not match `ID:KEY=VALUE` are
//! skipped, and an identifier whose block lacks a required field (or holds
//! an unknown enumeration value) is dropped without affecting its siblings.
//! `FOLDER` and `MIDFILE` must name a single entry; a block pointing outside
//! its directory is dropped the same way.
//!
//! Encoding writes the `changed` record of every song, sorted by identifier,
//! fields in schema order, absent fields omitted.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use bridge_traits::storage::FileSystemAccess;
use bytes::Bytes;
use encoding_rs::SHIFT_JIS;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::{LibraryError, Result};
use crate::models::{plain_name, SongField, SongItem, SongRecord};

/// Line grammar: trimmed identifier and key, then everything after `=`.
fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*([^:]*?)\s*:\s*([^=]*?)\s*=(.*)$")
            .unwrap_or_else(|e| unreachable!("record line pattern is valid: {}", e))
    })
}

/// How a failed backup copy is treated when overwriting a record file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupPolicy {
    /// Abort the write when the backup cannot be made
    Required,
    /// Log the failure and overwrite anyway
    BestEffort,
}

/// Encoder/decoder for the record file format
#[derive(Debug, Clone, Copy)]
pub struct RecordCodec {
    key_width: usize,
}

impl Default for RecordCodec {
    fn default() -> Self {
        Self { key_width: 13 }
    }
}

impl RecordCodec {
    pub fn new(key_width: usize) -> Self {
        Self { key_width }
    }

    pub fn key_width(&self) -> usize {
        self.key_width
    }

    /// Decode record file bytes into songs living under `folder`.
    ///
    /// Songs are returned in order of first appearance of their identifier.
    pub fn decode(&self, bytes: &[u8], folder: &Path) -> Vec<SongItem> {
        let (text, had_errors) = SHIFT_JIS.decode_without_bom_handling(bytes);
        if had_errors {
            warn!(folder = ?folder, "Record file contains invalid Shift_JIS sequences");
        }

        // first value of each (id, key) wins
        let mut order: Vec<String> = Vec::new();
        let mut values: HashMap<String, HashMap<String, String>> = HashMap::new();

        for line in text.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            let Some(caps) = line_pattern().captures(line) else {
                continue;
            };
            let (id, key, raw) = (&caps[1], &caps[2], &caps[3]);
            // `KEY=` carries no value at all, `KEY= ` carries an empty one
            if id.is_empty() || key.is_empty() || raw.is_empty() {
                continue;
            }
            let value = raw.trim();

            let fields = values.entry(id.to_string()).or_insert_with(|| {
                order.push(id.to_string());
                HashMap::new()
            });
            fields
                .entry(key.to_string())
                .or_insert_with(|| value.to_string());
        }

        let mut songs = Vec::with_capacity(order.len());
        for id in order {
            let Some(fields) = values.get(&id) else {
                continue;
            };
            let lookup = |field: SongField| fields.get(field.key()).map(String::as_str);

            let Some(folder_name) = lookup(SongField::Folder).and_then(plain_name) else {
                debug!(song_id = %id, "Skipping record without a usable FOLDER");
                continue;
            };
            let song_path = folder.join(folder_name);

            match SongRecord::from_lookup(&song_path, lookup) {
                Some(record) => songs.push(SongItem::new(
                    id,
                    song_path,
                    Some(folder.to_path_buf()),
                    record,
                )),
                None => debug!(song_id = %id, "Skipping incomplete record"),
            }
        }

        songs
    }

    /// Encode songs into record file bytes.
    ///
    /// # Errors
    ///
    /// [`LibraryError::Unrepresentable`] when a value has characters outside
    /// Shift_JIS; writing it would silently corrupt the record.
    pub fn encode<'a, I>(&self, songs: I) -> Result<Vec<u8>>
    where
        I: IntoIterator<Item = &'a SongItem>,
    {
        let mut songs: Vec<&SongItem> = songs.into_iter().collect();
        songs.sort_by(|a, b| a.song_id.cmp(&b.song_id));

        let mut lines = Vec::new();
        for song in &songs {
            for field in SongField::ALL {
                let Some(value) = song.changed.get(field) else {
                    continue;
                };
                let value = match field {
                    SongField::MidFile => file_name_of(&value),
                    _ => value,
                };
                lines.push(self.format_line(&song.song_id, field, &value));
            }
        }

        let text = lines.join("\r\n");
        let (encoded, _, had_errors) = SHIFT_JIS.encode(&text);
        if had_errors {
            let song_id = songs
                .iter()
                .find(|song| {
                    SongField::ALL.iter().any(|field| {
                        song.changed
                            .get(*field)
                            .map(|v| SHIFT_JIS.encode(&v).2)
                            .unwrap_or(false)
                    })
                })
                .map(|song| song.song_id.clone())
                .unwrap_or_default();
            return Err(LibraryError::Unrepresentable {
                song_id,
                encoding: SHIFT_JIS.name(),
            });
        }

        Ok(match encoded {
            Cow::Borrowed(slice) => slice.to_vec(),
            Cow::Owned(vec) => vec,
        })
    }

    /// `ID:KEY<padding>= VALUE`
    fn format_line(&self, song_id: &str, field: SongField, value: &str) -> String {
        format!(
            "{}:{:<width$}= {}",
            song_id,
            field.key(),
            value,
            width = self.key_width
        )
    }
}

fn file_name_of(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// Path of the backup written next to `record_path`
pub fn backup_path(record_path: &Path, suffix: &str) -> PathBuf {
    let mut name = record_path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Read and decode the record file of `folder`; a missing file yields no songs.
pub async fn read_record(
    fs: &dyn FileSystemAccess,
    codec: &RecordCodec,
    folder: &Path,
    record_file_name: &str,
) -> Result<Vec<SongItem>> {
    let record_path = folder.join(record_file_name);
    match fs.read_file(&record_path).await {
        Ok(bytes) => Ok(codec.decode(&bytes, folder)),
        Err(e) if e.is_not_found() => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Encode `songs` and overwrite the record file of `folder`.
///
/// The previous file, if any, is first copied to its backup path.
pub async fn write_record<'a, I>(
    fs: &dyn FileSystemAccess,
    codec: &RecordCodec,
    folder: &Path,
    record_file_name: &str,
    backup_suffix: &str,
    policy: BackupPolicy,
    songs: I,
) -> Result<()>
where
    I: IntoIterator<Item = &'a SongItem>,
{
    // encode first so an unrepresentable value never leaves a fresh backup behind
    let bytes = codec.encode(songs)?;
    let record_path = folder.join(record_file_name);

    if fs.exists(&record_path).await? {
        let backup = backup_path(&record_path, backup_suffix);
        if let Err(e) = fs.copy_file(&record_path, &backup).await {
            match policy {
                BackupPolicy::Required => {
                    return Err(LibraryError::BackupFailed {
                        path: backup,
                        source: e,
                    })
                }
                BackupPolicy::BestEffort => {
                    warn!(path = ?backup, error = %e, "Record backup failed, overwriting anyway")
                }
            }
        }
    }

    let size = bytes.len();
    fs.write_file(&record_path, Bytes::from(bytes)).await?;
    info!(path = ?record_path, size, "Wrote record file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PartState, SwitchState};

    const FOLDER: &str = "/usb/MUSIC";

    fn sjis(text: &str) -> Vec<u8> {
        SHIFT_JIS.encode(text).0.into_owned()
    }

    fn complete_block(id: &str, name: &str, folder: &str) -> String {
        [
            format!("{}:SONGNAME     = {}", id, name),
            format!("{}:FOLDER       = {}", id, folder),
            format!("{}:SECURITY     = OFF", id),
            format!("{}:MODEL        = ELS-02C", id),
            format!("{}:PART_UK      = PLAY", id),
            format!("{}:PART_LK      = PLAY", id),
            format!("{}:PART_PK      = PLAY", id),
            format!("{}:PART_LEAD    = OFF", id),
            format!("{}:PART_KBP     = PLAY", id),
            format!("{}:PART_CTRL    = OFF", id),
            format!("{}:BLKFILE_001  = B00.BLK", id),
        ]
        .join("\r\n")
    }

    #[test]
    fn test_decode_complete_record() {
        let codec = RecordCodec::default();
        let songs = codec.decode(&sjis(&complete_block("S001", "Test", "SONG_001")), Path::new(FOLDER));

        assert_eq!(songs.len(), 1);
        let song = &songs[0];
        assert_eq!(song.song_id, "S001");
        assert_eq!(song.name, "Test");
        assert_eq!(song.path, PathBuf::from("/usb/MUSIC/SONG_001"));
        assert_eq!(song.parent_path.as_deref(), Some(Path::new(FOLDER)));
        assert_eq!(song.original.security, SwitchState::Off);
        assert_eq!(song.original.part_lead, PartState::Off);
        assert_eq!(song.original, song.changed);
    }

    #[test]
    fn test_decode_japanese_text() {
        let codec = RecordCodec::default();
        let songs = codec.decode(
            &sjis(&complete_block("S001", "春の歌", "SONG_001")),
            Path::new(FOLDER),
        );

        assert_eq!(songs[0].original.song_name, "春の歌");
    }

    #[test]
    fn test_required_field_rejection_keeps_siblings() {
        let broken: String = complete_block("S002", "Broken", "SONG_002")
            .lines()
            .filter(|line| !line.contains("MODEL"))
            .collect::<Vec<_>>()
            .join("\r\n");
        let text = format!("{}\r\n{}", complete_block("S001", "Good", "SONG_001"), broken);

        let songs = RecordCodec::default().decode(&sjis(&text), Path::new(FOLDER));

        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].song_id, "S001");
    }

    #[test]
    fn test_malformed_lines_and_lf_endings() {
        let text = format!(
            "garbage\n:NOID= x\nS001:SONGNAME=\n{}\nS001:SONGNAME     = Shadowed",
            complete_block("S001", "First", "SONG_001").replace("\r\n", "\n")
        );

        let songs = RecordCodec::default().decode(&sjis(&text), Path::new(FOLDER));

        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].name, "First");
    }

    #[test]
    fn test_escaping_names_drop_the_song() {
        for bad in ["/etc", "..", "a/b"] {
            let folder_block = complete_block("S002", "Folder", bad);
            let midfile_block = format!(
                "{}\r\nS003:MIDFILE      = {}",
                complete_block("S003", "Midi", "SONG_003"),
                bad
            );
            let text = format!(
                "{}\r\n{}\r\n{}",
                complete_block("S001", "Good", "SONG_001"),
                folder_block,
                midfile_block
            );

            let songs = RecordCodec::default().decode(&sjis(&text), Path::new(FOLDER));

            assert_eq!(songs.len(), 1, "{}", bad);
            assert_eq!(songs[0].path, PathBuf::from("/usb/MUSIC/SONG_001"));
        }
    }

    #[test]
    fn test_empty_value_is_kept() {
        let empty_name: String = complete_block("S002", "Second", "SONG_002")
            .replace("S002:SONGNAME     = Second", "S002:SONGNAME     = ");
        let text = format!("{}\r\n{}", complete_block("S001", "First", "SONG_001"), empty_name);
        let codec = RecordCodec::default();

        let songs = codec.decode(&sjis(&text), Path::new(FOLDER));

        assert_eq!(songs.len(), 2);
        assert_eq!(songs[1].song_id, "S002");
        assert_eq!(songs[1].original.song_name, "");

        let written = String::from_utf8(codec.encode(&songs).unwrap()).unwrap();
        assert!(written.contains("S002:SONGNAME     = \r\n"));
        assert_eq!(codec.decode(written.as_bytes(), Path::new(FOLDER)).len(), 2);
    }

    #[test]
    fn test_midfile_resolved_under_song_path() {
        let text = format!(
            "{}\r\nS001:MIDFILE      = song.mid",
            complete_block("S001", "Test", "SONG_001")
        );
        let songs = RecordCodec::default().decode(&sjis(&text), Path::new(FOLDER));

        assert_eq!(
            songs[0].original.midfile,
            Some(PathBuf::from("/usb/MUSIC/SONG_001/song.mid"))
        );
    }

    #[test]
    fn test_encode_line_layout_and_order() {
        let codec = RecordCodec::default();
        let mut songs = codec.decode(
            &sjis(&format!(
                "{}\r\n{}",
                complete_block("S002", "Second", "SONG_002"),
                complete_block("S001", "First", "SONG_001")
            )),
            Path::new(FOLDER),
        );
        songs[1].changed.midfile = Some(PathBuf::from("/elsewhere/new.mid"));

        let bytes = codec.encode(&songs).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.split("\r\n").collect();

        assert_eq!(lines[0], "S001:SONGNAME     = First");
        // PART_XG is absent, so MIDFILE directly follows PART_CTRL
        assert_eq!(lines[9], "S001:PART_CTRL    = OFF");
        assert_eq!(lines[10], "S001:MIDFILE      = new.mid");
        assert_eq!(lines[11], "S001:BLKFILE_001  = B00.BLK");
        assert_eq!(lines[12], "S002:SONGNAME     = Second");
        assert!(!text.ends_with("\r\n"));
    }

    #[test]
    fn test_round_trip_with_all_fields() {
        let codec = RecordCodec::default();
        let text = [
            complete_block("S001", "曲名", "SONG_001"),
            "S001:PART_XG      = PLAY".to_string(),
            "S001:MIDFILE      = a.mid".to_string(),
            "S001:BLKFILE_002  = B01.BLK".to_string(),
            "S001:BLKFILE_003  = B02.BLK".to_string(),
            "S001:BLKFILE_004  = B03.BLK".to_string(),
            "S001:BLKFILE_005  = B04.BLK".to_string(),
            "S001:SECFILE      = S.C02".to_string(),
        ]
        .join("\r\n");

        let first = codec.decode(&sjis(&text), Path::new(FOLDER));
        let encoded = codec.encode(&first).unwrap();
        let second = codec.decode(&encoded, Path::new(FOLDER));
        let reencoded = codec.encode(&second).unwrap();

        assert_eq!(encoded, reencoded);
        assert_eq!(first, second);
        assert!(second[0].original.secfile.is_some());
    }

    #[test]
    fn test_unrepresentable_text_is_error() {
        let codec = RecordCodec::default();
        let mut songs = codec.decode(
            &sjis(&complete_block("S001", "Test", "SONG_001")),
            Path::new(FOLDER),
        );
        songs[0].changed.song_name = "🎹".to_string();

        match codec.encode(&songs) {
            Err(LibraryError::Unrepresentable { song_id, .. }) => assert_eq!(song_id, "S001"),
            other => panic!("expected unrepresentable error, got {:?}", other),
        }
    }

    #[test]
    fn test_wider_key_width() {
        let codec = RecordCodec::new(15);
        let songs = codec.decode(
            &sjis(&complete_block("S001", "Test", "SONG_001")),
            Path::new(FOLDER),
        );
        let text = String::from_utf8(codec.encode(&songs).unwrap()).unwrap();

        assert!(text.starts_with("S001:SONGNAME       = Test"));
    }

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path(Path::new("/usb/ELS_SONG.NAM"), ".backup"),
            PathBuf::from("/usb/ELS_SONG.NAM.backup")
        );
    }

    #[tokio::test]
    async fn test_write_record_backs_up_previous_file() {
        use bridge_desktop::TokioFileSystem;

        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();
        let codec = RecordCodec::default();
        let original = sjis(&complete_block("S001", "Old", "SONG_001"));
        std::fs::write(dir.path().join("ELS_SONG.NAM"), &original).unwrap();

        let mut songs = read_record(&fs, &codec, dir.path(), "ELS_SONG.NAM")
            .await
            .unwrap();
        songs[0].changed.song_name = "New".to_string();
        write_record(
            &fs,
            &codec,
            dir.path(),
            "ELS_SONG.NAM",
            ".backup",
            BackupPolicy::Required,
            &songs,
        )
        .await
        .unwrap();

        let backup = std::fs::read(dir.path().join("ELS_SONG.NAM.backup")).unwrap();
        assert_eq!(backup, original);
        let reread = read_record(&fs, &codec, dir.path(), "ELS_SONG.NAM")
            .await
            .unwrap();
        assert_eq!(reread[0].original.song_name, "New");
    }

    #[tokio::test]
    async fn test_missing_record_reads_as_empty() {
        use bridge_desktop::TokioFileSystem;

        let dir = tempfile::tempdir().unwrap();
        let songs = read_record(
            &TokioFileSystem::new(),
            &RecordCodec::default(),
            dir.path(),
            "ELS_SONG.NAM",
        )
        .await
        .unwrap();

        assert!(songs.is_empty());
    }
}
