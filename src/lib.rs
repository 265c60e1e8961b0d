//! Workspace facade crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (e.g., `core-sync`, `core-library`, `bridge-desktop`).
//! Host applications can depend on `bookshelf-workspace` and enable the
//! documented features without needing to wire each crate individually.

#[cfg(feature = "sync")]
pub use core_library;
#[cfg(feature = "sync")]
pub use core_metadata;
#[cfg(feature = "sync")]
pub use core_sync;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop;
#[cfg(feature = "desktop-shims")]
pub use core_runtime;
