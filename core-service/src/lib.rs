//! Explorer service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (file system, user
//! prompts, file picker) into the explorer core and exposes the operations a
//! host drives: opening a root, navigating, editing songs and performing
//! create/rename/delete/copy/cut/paste/save against the real directory tree.
//! Desktop apps typically enable the `desktop-shims` feature (which depends
//! on `bridge-desktop`) and call [`Explorer::bootstrap_desktop`].

pub mod clipboard;
mod delete;
pub mod error;
pub mod explorer;
mod folders;
pub mod job;
mod paste;
mod save;

#[cfg(test)]
pub(crate) mod test_support;

pub use clipboard::{ClipboardOperation, StagedItem};
pub use error::{ExplorerError, Result};
pub use explorer::{Explorer, TreeNode};
pub use job::{SaveJob, SaveStatus};

pub use core_library::{Item, ItemInfo, ItemKind, SongField, SongItem, SongRecord};
pub use core_runtime::config::{ExplorerConfig, ExplorerConfigBuilder};
pub use core_runtime::events::{EventBus, EventStream, ExplorerEvent};
