//! Domain models for the book library
//!
//! Plain value types carried inside [`BookRecord`](crate::BookRecord) lists.
//! An `id` of `0` marks an entity that has not been saved locally yet.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

// =============================================================================
// ID Types
// =============================================================================

/// Row identifier of a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(pub i64);

impl BookId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Author
// =============================================================================

/// Bit set describing what an author did for a given book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorType(pub u32);

impl AuthorType {
    pub const UNKNOWN: AuthorType = AuthorType(0);
    pub const WRITER: AuthorType = AuthorType(1);
    pub const FOREWORD: AuthorType = AuthorType(1 << 2);
    pub const AFTERWORD: AuthorType = AuthorType(1 << 3);
    pub const TRANSLATOR: AuthorType = AuthorType(1 << 4);
    pub const INTRODUCTION: AuthorType = AuthorType(1 << 5);
    pub const EDITOR: AuthorType = AuthorType(1 << 6);
    pub const CONTRIBUTOR: AuthorType = AuthorType(1 << 7);
    pub const COVER_ARTIST: AuthorType = AuthorType(1 << 8);
    pub const COVER_INKING: AuthorType = AuthorType(1 << 9);
    pub const NARRATOR: AuthorType = AuthorType(1 << 10);
    pub const COVER_COLORIST: AuthorType = AuthorType(1 << 11);
    pub const ARTIST: AuthorType = AuthorType(1 << 12);
    pub const INKING: AuthorType = AuthorType(1 << 13);
    pub const COLORIST: AuthorType = AuthorType(1 << 15);
    pub const PSEUDONYM: AuthorType = AuthorType(1 << 16);

    pub fn contains(self, other: AuthorType) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_unknown(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for AuthorType {
    type Output = AuthorType;

    fn bitor(self, rhs: Self) -> Self::Output {
        AuthorType(self.0 | rhs.0)
    }
}

impl BitOrAssign for AuthorType {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub family_name: String,
    pub given_names: String,
    #[serde(default)]
    pub author_type: AuthorType,
    #[serde(default)]
    pub is_complete: bool,
}

impl Author {
    pub fn new(family_name: impl Into<String>, given_names: impl Into<String>) -> Self {
        Self {
            family_name: family_name.into(),
            given_names: given_names.into(),
            ..Default::default()
        }
    }

    /// Parse "Given Names Family" or "Family, Given Names".
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        if let Some((family, given)) = name.split_once(',') {
            return Self::new(family.trim(), given.trim());
        }
        match name.rsplit_once(char::is_whitespace) {
            Some((given, family)) => Self::new(family.trim(), given.trim()),
            None => Self::new(name, ""),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    pub fn with_type(mut self, author_type: AuthorType) -> Self {
        self.author_type = author_type;
        self
    }

    /// "Given Names Family", as displayed.
    pub fn formatted_name(&self) -> String {
        if self.given_names.is_empty() {
            self.family_name.clone()
        } else {
            format!("{} {}", self.given_names, self.family_name)
        }
    }
}

// =============================================================================
// Series
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Series {
    pub id: i64,
    pub title: String,
    /// Position of the book in the series; empty when unnumbered.
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub is_complete: bool,
}

impl Series {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = number.into();
        self
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    pub fn is_numbered(&self) -> bool {
        !self.number.trim().is_empty()
    }
}

// =============================================================================
// Publisher
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Publisher {
    pub id: i64,
    pub name: String,
}

impl Publisher {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
        }
    }
}

// =============================================================================
// Table of contents
// =============================================================================

/// A work contained in an anthology or collection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TocEntry {
    pub id: i64,
    pub title: String,
    /// Primary author of the work.
    pub author: Author,
    #[serde(default)]
    pub first_publication: String,
}

impl TocEntry {
    pub fn new(title: impl Into<String>, author: Author) -> Self {
        Self {
            id: 0,
            title: title.into(),
            author,
            first_publication: String::new(),
        }
    }
}

// =============================================================================
// Bookshelf
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bookshelf {
    pub id: i64,
    pub name: String,
}

impl Bookshelf {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }
}
