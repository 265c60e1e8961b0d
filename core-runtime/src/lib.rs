//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the bookshelf core:
//! - Logging and tracing infrastructure
//! - Configuration management
//!
//! ## Overview
//!
//! This crate contains the core runtime utilities that other modules depend on.
//! It establishes the logging conventions and the validated configuration that
//! wires host bridges (file system, settings) into the sync engine.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::{Error, Result};
