//! # Core Runtime Module
//!
//! Provides the runtime infrastructure shared by the explorer crates:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate holds no explorer logic. It establishes the logging conventions,
//! the validated [`ExplorerConfig`](config::ExplorerConfig) handed to the
//! service, and the broadcast channel the service publishes state changes on.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
