//! # Save Job State Machine
//!
//! Tracks one save of the current folder so a host can show a blocking
//! progress view and its result.
//!
//! ```text
//! Pending → InProgress → Succeeded
//!     ↓          ↓
//!     └───────→ Failed
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{ExplorerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    Pending,
    InProgress,
    Succeeded,
    Failed,
}

impl SaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaveStatus::Pending => "pending",
            SaveStatus::InProgress => "in_progress",
            SaveStatus::Succeeded => "succeeded",
            SaveStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SaveStatus::Succeeded | SaveStatus::Failed)
    }
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct SaveJob {
    folder: PathBuf,
    status: SaveStatus,
    song_count: usize,
    error: Option<String>,
    started_at: Option<Instant>,
    elapsed: Option<Duration>,
}

impl SaveJob {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            status: SaveStatus::Pending,
            song_count: 0,
            error: None,
            started_at: None,
            elapsed: None,
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn status(&self) -> SaveStatus {
        self.status
    }

    /// Number of songs written by a successful save
    pub fn song_count(&self) -> usize {
        self.song_count
    }

    /// Failure message, set only in [`SaveStatus::Failed`]
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Wall time from start to the terminal state
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    pub fn start(&mut self) -> Result<()> {
        self.transition(SaveStatus::InProgress)?;
        self.started_at = Some(Instant::now());
        Ok(())
    }

    pub fn succeed(&mut self, song_count: usize) -> Result<()> {
        self.transition(SaveStatus::Succeeded)?;
        self.song_count = song_count;
        self.finish_timer();
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        self.transition(SaveStatus::Failed)?;
        self.error = Some(message.into());
        self.finish_timer();
        Ok(())
    }

    fn finish_timer(&mut self) {
        self.elapsed = self.started_at.map(|started| started.elapsed());
    }

    fn transition(&mut self, to: SaveStatus) -> Result<()> {
        let valid = matches!(
            (self.status, to),
            (SaveStatus::Pending, SaveStatus::InProgress)
                | (SaveStatus::Pending, SaveStatus::Failed)
                | (SaveStatus::InProgress, SaveStatus::Succeeded)
                | (SaveStatus::InProgress, SaveStatus::Failed)
        );

        if !valid {
            return Err(ExplorerError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!("Cannot transition from {} to {}", self.status, to),
            });
        }

        self.status = to;
        Ok(())
    }
}
