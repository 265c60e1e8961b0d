//! # Cover Metadata Module
//!
//! Persists cover images downloaded by remote catalog readers.
//!
//! ## Overview
//!
//! This module handles:
//! - Locating the persisted cover file of a book (by UUID and slot)
//! - Moving a downloaded cover into permanent storage after sniffing its format
//! - Distinguishing a full disk (fatal) from any other storage failure

pub mod covers;
pub mod error;

pub use covers::{CoverFile, CoverStorage, FileCoverStorage};
pub use error::{MetadataError, Result};
