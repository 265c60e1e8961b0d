//! # Desktop Bridge Implementations
//!
//! Bridge adapters for macOS, Windows and Linux hosts.
//!
//! ## Overview
//!
//! - [`TokioFileSystem`]: cover files through `tokio::fs`; a full volume is
//!   reported as `BridgeError::DiskFull`
//! - [`SqliteSettingsStore`]: typed preferences in a single SQLite table
//! - [`default_library_dir`]: per-user directory for covers and settings
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{default_library_dir, SqliteSettingsStore, TokioFileSystem};
//!
//! let library = default_library_dir();
//! let settings = SqliteSettingsStore::new(library.join("settings.db")).await?;
//! let fs = TokioFileSystem::new();
//! ```

mod filesystem;
mod settings;

pub use filesystem::{default_library_dir, TokioFileSystem};
pub use settings::SqliteSettingsStore;
