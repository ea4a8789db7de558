//! # Filesystem Sync Module
//!
//! Keeps the in-memory item tree in step with the real directory tree.
//!
//! ## Overview
//!
//! Folders are loaded lazily: nothing below a folder is known until it is
//! expanded. Each expand lists the directory, decodes its record file and
//! reconciles the result into the [`ItemStore`](core_library::ItemStore).
//!
//! ## Components
//!
//! - **Exclusion Rules** (`exclusion`): glob patterns for entries that are never shown
//! - **Reconciliation** (`reconcile`): pure merge of a listing into the store
//! - **Sync Engine** (`engine`): async `expand` / `set_now_folder` over a `FileSystemAccess`

pub mod engine;
pub mod error;
pub mod exclusion;
pub mod reconcile;

pub use engine::{ExpandOutcome, SyncEngine};
pub use error::{Result, SyncError};
pub use exclusion::ExclusionRules;
pub use reconcile::{apply, reconcile, Reconciliation};
