//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `FileSystemAccess` using `tokio::fs`
//! - `UserPrompt` as a headless, scripted implementation that reports every
//!   notification through `tracing` (CLI hosts, automation, tests)
//!
//! Dialog-based prompts and file pickers belong to the GUI host and are
//! injected through the same traits.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{HeadlessPrompt, TokioFileSystem};
//! use std::sync::Arc;
//!
//! let fs = Arc::new(TokioFileSystem::new());
//! let prompt = Arc::new(HeadlessPrompt::accepting());
//! ```

mod filesystem;
mod prompt;

pub use filesystem::TokioFileSystem;
pub use prompt::HeadlessPrompt;
