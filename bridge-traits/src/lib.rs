//! # Host Bridge Traits
//!
//! Capabilities the sync core borrows from the host application.
//!
//! ## Overview
//!
//! The core never touches the disk, the preference store or the wall clock
//! directly. Each of those goes through a trait defined here, so the same
//! merge engine runs against `bridge-desktop` adapters, a mobile host, or the
//! in-memory doubles used by tests.
//!
//! | Trait | Used for |
//! |-------|----------|
//! | [`FileSystemAccess`](storage::FileSystemAccess) | Cover files: sizing, reading downloads, writing the stored copy |
//! | [`SettingsStore`](storage::SettingsStore) | Per-field sync actions, hidden fields, last sync dates |
//! | [`Clock`](time::Clock) | Sync dates and modification stamps |
//! | [`LoggerSink`](time::LoggerSink) | Mirroring core log events into the host's log view |
//!
//! ## Errors
//!
//! Every trait returns [`BridgeError`](error::BridgeError). A full volume must
//! be reported as `BridgeError::DiskFull` and not as a plain I/O error: the
//! sync reader aborts on it, while any other cover failure only costs the
//! cover.
//!
//! All traits are `Send + Sync` and used behind `Arc<dyn _>`.

pub mod error;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use storage::{FileSystemAccess, SettingsStore};
pub use time::{Clock, ConsoleLogger, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
