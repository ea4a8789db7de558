//! # Explorer Library Module
//!
//! Owns the in-memory model of an opened folder tree and the record file
//! format that describes the songs inside it.
//!
//! ## Overview
//!
//! This module manages:
//! - Item and song record models with edit tracking
//! - The Shift_JIS record codec and its backup-before-overwrite writer
//! - Unique name resolution for pasted and created items
//! - The [`ItemStore`](store::ItemStore) tree and its invariants

pub mod error;
pub mod models;
pub mod naming;
pub mod record;
pub mod store;

pub use error::{LibraryError, Result};
pub use models::{
    FileItem, FolderItem, Item, ItemInfo, ItemKind, PartState, SongField, SongItem, SongRecord,
    SwitchState,
};
pub use naming::resolve_name;
pub use record::{BackupPolicy, RecordCodec};
pub use store::ItemStore;
