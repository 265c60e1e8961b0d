//! # Repository Pattern Implementation
//!
//! Persistence seam for merged book deltas.
//!
//! ## Architecture
//!
//! - [`BookRepository`] defines the operations the sync readers and writers
//!   need; a relational implementation lives with the host application
//! - [`InMemoryBookRepository`] keeps books in a map for hosts without a
//!   database and for tests
//! - All operations return `Result<T>` for error handling

pub mod book;
pub mod pagination;

pub use book::{BookRepository, InMemoryBookRepository};
pub use pagination::{Page, PageRequest};
