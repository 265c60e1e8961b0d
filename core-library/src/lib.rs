//! # Library Management Module
//!
//! Owns the book domain model consumed by the sync subsystem.
//!
//! ## Overview
//!
//! This module manages:
//! - Stable field keys and their classification ([`FieldKind`])
//! - Book records as ordered `key -> value` maps ([`BookRecord`])
//! - List entities (authors, series, publishers, TOC entries, bookshelves)
//! - Locale-aware de-duplication of merged lists ([`prune`])
//! - The repository seam used to persist merged deltas

pub mod error;
pub mod keys;
pub mod models;
pub mod prune;
pub mod record;
pub mod repositories;

pub use error::{LibraryError, Result};
pub use keys::{CoverSlot, FieldKind, ListKind};
pub use models::{Author, AuthorType, BookId, Bookshelf, Publisher, Series, TocEntry};
pub use prune::{ListPruner, LocaleListPruner};
pub use record::{BookRecord, FieldValue};
pub use repositories::{BookRepository, InMemoryBookRepository, Page, PageRequest};
