//! Workspace façade crate.
//!
//! Re-exports the explorer service so host applications can depend on
//! `el-explorer` and enable the documented features without wiring each
//! workspace crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
