//! Domain models for the explorer tree
//!
//! Items mirror one directory entry each. Songs carry two snapshots of their
//! record: `original` is what the record file on disk says, `changed` is what
//! the user intends. A song is dirty whenever the two differ.

use crate::error::{LibraryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

// =============================================================================
// Field Value Types
// =============================================================================

/// `ON`/`OFF` switch used by the protection flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwitchState {
    On,
    Off,
}

impl SwitchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwitchState::On => "ON",
            SwitchState::Off => "OFF",
        }
    }
}

impl FromStr for SwitchState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ON" => Ok(SwitchState::On),
            "OFF" => Ok(SwitchState::Off),
            other => Err(format!("expected ON or OFF, got '{}'", other)),
        }
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `OFF`/`PLAY` state of one keyboard part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartState {
    Off,
    Play,
}

impl PartState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartState::Off => "OFF",
            PartState::Play => "PLAY",
        }
    }
}

impl FromStr for PartState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "OFF" => Ok(PartState::Off),
            "PLAY" => Ok(PartState::Play),
            other => Err(format!("expected OFF or PLAY, got '{}'", other)),
        }
    }
}

impl fmt::Display for PartState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Record Schema
// =============================================================================

/// One field of the song record, in file order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SongField {
    SongName,
    Folder,
    Security,
    Model,
    PartUk,
    PartLk,
    PartPk,
    PartLead,
    PartKbp,
    PartCtrl,
    PartXg,
    MidFile,
    BlkFile001,
    BlkFile002,
    BlkFile003,
    BlkFile004,
    BlkFile005,
    SecFile,
}

impl SongField {
    /// Every field in the order lines are written to the record file
    pub const ALL: [SongField; 18] = [
        SongField::SongName,
        SongField::Folder,
        SongField::Security,
        SongField::Model,
        SongField::PartUk,
        SongField::PartLk,
        SongField::PartPk,
        SongField::PartLead,
        SongField::PartKbp,
        SongField::PartCtrl,
        SongField::PartXg,
        SongField::MidFile,
        SongField::BlkFile001,
        SongField::BlkFile002,
        SongField::BlkFile003,
        SongField::BlkFile004,
        SongField::BlkFile005,
        SongField::SecFile,
    ];

    /// Key written in the record file
    pub fn key(&self) -> &'static str {
        match self {
            SongField::SongName => "SONGNAME",
            SongField::Folder => "FOLDER",
            SongField::Security => "SECURITY",
            SongField::Model => "MODEL",
            SongField::PartUk => "PART_UK",
            SongField::PartLk => "PART_LK",
            SongField::PartPk => "PART_PK",
            SongField::PartLead => "PART_LEAD",
            SongField::PartKbp => "PART_KBP",
            SongField::PartCtrl => "PART_CTRL",
            SongField::PartXg => "PART_XG",
            SongField::MidFile => "MIDFILE",
            SongField::BlkFile001 => "BLKFILE_001",
            SongField::BlkFile002 => "BLKFILE_002",
            SongField::BlkFile003 => "BLKFILE_003",
            SongField::BlkFile004 => "BLKFILE_004",
            SongField::BlkFile005 => "BLKFILE_005",
            SongField::SecFile => "SECFILE",
        }
    }

    /// Label shown to the user next to the field
    pub fn label(&self) -> &'static str {
        match self {
            SongField::SongName => "ソング名",
            SongField::Folder => "フォルダ名",
            SongField::Security => "保護状態",
            SongField::Model => "モデル名",
            SongField::PartUk => "上鍵盤",
            SongField::PartLk => "下鍵盤",
            SongField::PartPk => "ペダル鍵盤",
            SongField::PartLead => "リード",
            SongField::PartKbp => "キーボードパーカッション",
            SongField::PartCtrl => "コントロール",
            SongField::PartXg => "XG",
            SongField::MidFile => "MIDIファイル名",
            SongField::BlkFile001 => "バンクデータ1",
            SongField::BlkFile002 => "バンクデータ2",
            SongField::BlkFile003 => "バンクデータ3",
            SongField::BlkFile004 => "バンクデータ4",
            SongField::BlkFile005 => "バンクデータ5",
            SongField::SecFile => "セキュリティファイル名",
        }
    }

    /// A record missing a required field is not a song
    pub fn is_required(&self) -> bool {
        !matches!(
            self,
            SongField::PartXg
                | SongField::MidFile
                | SongField::BlkFile002
                | SongField::BlkFile003
                | SongField::BlkFile004
                | SongField::BlkFile005
                | SongField::SecFile
        )
    }

    /// Fields the user may edit; the directory name only changes through
    /// rename, cut and paste.
    pub fn is_editable(&self) -> bool {
        !matches!(self, SongField::Folder)
    }

    pub fn from_key(key: &str) -> Option<SongField> {
        SongField::ALL.into_iter().find(|field| field.key() == key)
    }
}

/// `value` when it names exactly one entry inside a directory.
///
/// Absolute paths, `..` and nested paths would escape or skip the song's
/// directory once joined onto it.
pub fn plain_name(value: &str) -> Option<&str> {
    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Some(value),
        _ => None,
    }
}

impl fmt::Display for SongField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Metadata of one song as stored in the record file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongRecord {
    pub song_name: String,
    /// Name of the song's directory inside the record's folder
    pub folder: String,
    pub security: SwitchState,
    pub model: String,
    pub part_uk: PartState,
    pub part_lk: PartState,
    pub part_pk: PartState,
    pub part_lead: PartState,
    pub part_kbp: PartState,
    pub part_ctrl: PartState,
    pub part_xg: Option<PartState>,
    /// Absolute path of the MIDI file; only its file name is persisted
    pub midfile: Option<PathBuf>,
    pub blkfile_001: String,
    pub blkfile_002: Option<String>,
    pub blkfile_003: Option<String>,
    pub blkfile_004: Option<String>,
    pub blkfile_005: Option<String>,
    pub secfile: Option<String>,
}

impl SongRecord {
    /// Build a record from raw `(field, value)` lookups.
    ///
    /// `song_path` anchors a relative MIDI file name. Returns `None` when a
    /// required field is missing, an enumerated field holds an unknown
    /// value, or the folder or MIDI file name is not a single path segment.
    pub fn from_lookup<'a, F>(song_path: &Path, lookup: F) -> Option<Self>
    where
        F: Fn(SongField) -> Option<&'a str>,
    {
        let text = |field: SongField| lookup(field).map(str::to_string);
        let part = |field: SongField| lookup(field)?.parse::<PartState>().ok();

        let part_xg = match lookup(SongField::PartXg) {
            Some(value) => Some(value.parse::<PartState>().ok()?),
            None => None,
        };
        let midfile = match lookup(SongField::MidFile) {
            Some(value) => Some(song_path.join(plain_name(value)?)),
            None => None,
        };

        Some(Self {
            song_name: text(SongField::SongName)?,
            folder: plain_name(lookup(SongField::Folder)?)?.to_string(),
            security: lookup(SongField::Security)?.parse().ok()?,
            model: text(SongField::Model)?,
            part_uk: part(SongField::PartUk)?,
            part_lk: part(SongField::PartLk)?,
            part_pk: part(SongField::PartPk)?,
            part_lead: part(SongField::PartLead)?,
            part_kbp: part(SongField::PartKbp)?,
            part_ctrl: part(SongField::PartCtrl)?,
            part_xg,
            midfile,
            blkfile_001: text(SongField::BlkFile001)?,
            blkfile_002: text(SongField::BlkFile002),
            blkfile_003: text(SongField::BlkFile003),
            blkfile_004: text(SongField::BlkFile004),
            blkfile_005: text(SongField::BlkFile005),
            secfile: text(SongField::SecFile),
        })
    }

    /// Current value of a field as record text, `None` when absent.
    ///
    /// The MIDI field returns the full path; the codec reduces it to a file
    /// name when writing.
    pub fn get(&self, field: SongField) -> Option<String> {
        match field {
            SongField::SongName => Some(self.song_name.clone()),
            SongField::Folder => Some(self.folder.clone()),
            SongField::Security => Some(self.security.to_string()),
            SongField::Model => Some(self.model.clone()),
            SongField::PartUk => Some(self.part_uk.to_string()),
            SongField::PartLk => Some(self.part_lk.to_string()),
            SongField::PartPk => Some(self.part_pk.to_string()),
            SongField::PartLead => Some(self.part_lead.to_string()),
            SongField::PartKbp => Some(self.part_kbp.to_string()),
            SongField::PartCtrl => Some(self.part_ctrl.to_string()),
            SongField::PartXg => self.part_xg.map(|p| p.to_string()),
            SongField::MidFile => self
                .midfile
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            SongField::BlkFile001 => Some(self.blkfile_001.clone()),
            SongField::BlkFile002 => self.blkfile_002.clone(),
            SongField::BlkFile003 => self.blkfile_003.clone(),
            SongField::BlkFile004 => self.blkfile_004.clone(),
            SongField::BlkFile005 => self.blkfile_005.clone(),
            SongField::SecFile => self.secfile.clone(),
        }
    }

    /// Set a field from text. `None` clears an optional field.
    ///
    /// # Errors
    ///
    /// [`LibraryError::InvalidInput`] when clearing a required field, setting
    /// an empty value, or setting an enumerated field to an unknown value.
    /// The record is unchanged on error.
    pub fn set(&mut self, field: SongField, value: Option<&str>) -> Result<()> {
        let invalid = |message: String| LibraryError::InvalidInput {
            field: field.key().to_string(),
            message,
        };

        let value = match value {
            Some(v) if v.trim().is_empty() => {
                return Err(invalid("value cannot be empty".to_string()))
            }
            Some(v) => Some(v),
            None if field.is_required() => {
                return Err(invalid(format!("{} is required", field.label())))
            }
            None => None,
        };

        let switch = |v: &str| v.parse::<SwitchState>().map_err(invalid);
        let part = |v: &str| v.parse::<PartState>().map_err(invalid);

        // required fields were rejected above when value is None
        match (field, value) {
            (SongField::SongName, Some(v)) => self.song_name = v.to_string(),
            (SongField::Folder, Some(v)) => {
                self.folder = plain_name(v)
                    .ok_or_else(|| invalid("must be a single directory name".to_string()))?
                    .to_string()
            }
            (SongField::Security, Some(v)) => self.security = switch(v)?,
            (SongField::Model, Some(v)) => self.model = v.to_string(),
            (SongField::PartUk, Some(v)) => self.part_uk = part(v)?,
            (SongField::PartLk, Some(v)) => self.part_lk = part(v)?,
            (SongField::PartPk, Some(v)) => self.part_pk = part(v)?,
            (SongField::PartLead, Some(v)) => self.part_lead = part(v)?,
            (SongField::PartKbp, Some(v)) => self.part_kbp = part(v)?,
            (SongField::PartCtrl, Some(v)) => self.part_ctrl = part(v)?,
            (SongField::PartXg, v) => self.part_xg = v.map(part).transpose()?,
            (SongField::MidFile, v) => self.midfile = v.map(PathBuf::from),
            (SongField::BlkFile001, Some(v)) => self.blkfile_001 = v.to_string(),
            (SongField::BlkFile002, v) => self.blkfile_002 = v.map(str::to_string),
            (SongField::BlkFile003, v) => self.blkfile_003 = v.map(str::to_string),
            (SongField::BlkFile004, v) => self.blkfile_004 = v.map(str::to_string),
            (SongField::BlkFile005, v) => self.blkfile_005 = v.map(str::to_string),
            (SongField::SecFile, v) => self.secfile = v.map(str::to_string),
            (_, None) => return Err(invalid(format!("{} is required", field.label()))),
        }

        Ok(())
    }

    pub fn is_protected(&self) -> bool {
        self.security == SwitchState::On
    }
}

// =============================================================================
// Items
// =============================================================================

/// Shared accessors of every item variant
pub trait ItemInfo {
    fn name(&self) -> &str;
    fn path(&self) -> &Path;
    /// `None` only for the root of the open tree
    fn parent_path(&self) -> Option<&Path>;
}

/// Discriminant of [`Item`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    File,
    Folder,
    Song,
}

impl ItemKind {
    /// Word used in user-facing messages
    pub fn label(&self) -> &'static str {
        match self {
            ItemKind::File => "ファイル",
            ItemKind::Folder => "フォルダ",
            ItemKind::Song => "ソング",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::File => f.write_str("file"),
            ItemKind::Folder => f.write_str("folder"),
            ItemKind::Song => f.write_str("song"),
        }
    }
}

/// A plain file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileItem {
    pub name: String,
    pub path: PathBuf,
    pub parent_path: Option<PathBuf>,
}

/// A directory that is not owned by a song record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderItem {
    pub name: String,
    pub path: PathBuf,
    pub parent_path: Option<PathBuf>,
    /// Whether the children have been loaded and are shown in the tree
    pub expanded: bool,
    /// Paths of the loaded children, in listing order
    pub children: Vec<PathBuf>,
}

/// A song: one record block plus the directory it owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongItem {
    pub name: String,
    /// The song's own directory
    pub path: PathBuf,
    pub parent_path: Option<PathBuf>,
    /// Identifier unique within the record file (e.g. `S001`)
    pub song_id: String,
    pub original: SongRecord,
    pub changed: SongRecord,
}

impl FileItem {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, parent: Option<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            parent_path: parent,
        }
    }
}

impl FolderItem {
    /// A folder whose children have not been loaded yet
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, parent: Option<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            parent_path: parent,
            expanded: false,
            children: Vec::new(),
        }
    }
}

impl SongItem {
    /// A freshly decoded song: `changed` starts as a copy of `record`
    pub fn new(
        song_id: impl Into<String>,
        path: impl Into<PathBuf>,
        parent: Option<PathBuf>,
        record: SongRecord,
    ) -> Self {
        Self {
            name: record.song_name.clone(),
            path: path.into(),
            parent_path: parent,
            song_id: song_id.into(),
            changed: record.clone(),
            original: record,
        }
    }

    /// Pending edits exist
    pub fn is_dirty(&self) -> bool {
        self.original != self.changed
    }

    /// The persisted record has protection switched on
    pub fn is_protected(&self) -> bool {
        self.original.is_protected()
    }
}

/// One node of the explorer tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Item {
    File(FileItem),
    Folder(FolderItem),
    Song(SongItem),
}

impl Item {
    pub fn kind(&self) -> ItemKind {
        match self {
            Item::File(_) => ItemKind::File,
            Item::Folder(_) => ItemKind::Folder,
            Item::Song(_) => ItemKind::Song,
        }
    }

    pub fn as_folder(&self) -> Option<&FolderItem> {
        match self {
            Item::Folder(folder) => Some(folder),
            _ => None,
        }
    }

    pub fn as_song(&self) -> Option<&SongItem> {
        match self {
            Item::Song(song) => Some(song),
            _ => None,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Item::Folder(_))
    }

    pub(crate) fn set_location(&mut self, name: Option<&str>, path: PathBuf, parent: Option<PathBuf>) {
        let (item_name, item_path, item_parent) = match self {
            Item::File(f) => (&mut f.name, &mut f.path, &mut f.parent_path),
            Item::Folder(f) => (&mut f.name, &mut f.path, &mut f.parent_path),
            Item::Song(s) => (&mut s.name, &mut s.path, &mut s.parent_path),
        };
        if let Some(name) = name {
            *item_name = name.to_string();
        }
        *item_path = path;
        *item_parent = parent;
    }
}

impl ItemInfo for Item {
    fn name(&self) -> &str {
        match self {
            Item::File(f) => &f.name,
            Item::Folder(f) => &f.name,
            Item::Song(s) => &s.name,
        }
    }

    fn path(&self) -> &Path {
        match self {
            Item::File(f) => &f.path,
            Item::Folder(f) => &f.path,
            Item::Song(s) => &s.path,
        }
    }

    fn parent_path(&self) -> Option<&Path> {
        match self {
            Item::File(f) => f.parent_path.as_deref(),
            Item::Folder(f) => f.parent_path.as_deref(),
            Item::Song(s) => s.parent_path.as_deref(),
        }
    }
}

impl From<FileItem> for Item {
    fn from(item: FileItem) -> Self {
        Item::File(item)
    }
}

impl From<FolderItem> for Item {
    fn from(item: FolderItem) -> Self {
        Item::Folder(item)
    }
}

impl From<SongItem> for Item {
    fn from(item: SongItem) -> Self {
        Item::Song(item)
    }
}
