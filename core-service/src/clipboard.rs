//! Single-slot copy/cut staging

use std::fmt;
use std::path::{Path, PathBuf};

use core_library::ItemKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipboardOperation {
    Copy,
    Cut,
}

impl ClipboardOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipboardOperation::Copy => "copy",
            ClipboardOperation::Cut => "cut",
        }
    }
}

impl fmt::Display for ClipboardOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An item waiting for a paste target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedItem {
    pub path: PathBuf,
    pub kind: ItemKind,
    pub operation: ClipboardOperation,
}

/// Holds at most one staged item; staging again replaces it.
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    staged: Option<StagedItem>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&mut self, path: impl Into<PathBuf>, kind: ItemKind, operation: ClipboardOperation) {
        self.staged = Some(StagedItem {
            path: path.into(),
            kind,
            operation,
        });
    }

    pub fn staged(&self) -> Option<&StagedItem> {
        self.staged.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_none()
    }

    /// Drop the staged item; returns whether there was one
    pub fn clear(&mut self) -> bool {
        self.staged.take().is_some()
    }

    /// Drop the staged item if it lies at or below `path`
    pub fn forget_within(&mut self, path: &Path) -> bool {
        if self
            .staged
            .as_ref()
            .is_some_and(|staged| staged.path.starts_with(path))
        {
            self.staged = None;
            return true;
        }
        false
    }
}
