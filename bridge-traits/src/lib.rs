//! # Host Bridge Traits
//!
//! Capabilities the explorer core consumes but does not implement itself.
//!
//! ## Overview
//!
//! The core keeps an in-memory mirror of a directory tree and mutates the real
//! tree on the user's behalf. Everything that touches the outside world goes
//! through one of these traits so the core can run against the desktop
//! filesystem, a test double, or a sandboxed host.
//!
//! ## Traits
//!
//! - [`FileSystemAccess`](storage::FileSystemAccess) - directory listing, byte I/O, copy/move/remove
//! - [`UserPrompt`](prompt::UserPrompt) - confirmations and user-facing notifications
//! - [`FilePicker`](prompt::FilePicker) - native file selection
//! - [`LoggerSink`](log::LoggerSink) - forward structured logs to the host
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert their native errors and keep the failing
//! path in the message.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a host can share one
//! implementation between the core and its own async tasks.

pub mod error;
pub mod log;
pub mod prompt;
pub mod storage;

pub use error::BridgeError;

pub use log::{LogEntry, LogLevel, LoggerSink, StderrLogger};
pub use prompt::{FileFilter, FilePicker, MessageLevel, UserPrompt};
pub use storage::{DirEntry, FileSystemAccess};
