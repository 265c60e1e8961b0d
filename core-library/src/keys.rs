//! Field keys
//!
//! Stable identifiers for book attributes. The same strings key the values of
//! a [`BookRecord`](crate::BookRecord), the entries of a sync field registry,
//! and the persisted per-field sync actions, so they must never change.

use serde::{Deserialize, Serialize};

/// Primary key of a book row.
pub const PK_ID: &str = "_id";
/// Stable book UUID; cover files are keyed by it.
pub const BOOK_UUID: &str = "book_uuid";

pub const TITLE: &str = "title";
pub const LANGUAGE: &str = "language";
pub const DESCRIPTION: &str = "description";
pub const FORMAT: &str = "format";
pub const DATE_PUBLISHED: &str = "date_published";
pub const DATE_ACQUIRED: &str = "date_acquired";
pub const LOCATION: &str = "location";
pub const PERSONAL_NOTES: &str = "notes";
pub const RATING: &str = "rating";
pub const READ: &str = "read";
pub const READ_START: &str = "read_start";
pub const READ_END: &str = "read_end";
pub const PRICE_PAID: &str = "price_paid";
pub const PRICE_PAID_CURRENCY: &str = "price_paid_currency";
/// UTC timestamp of the last local modification.
pub const LAST_UPDATED: &str = "last_updated";

pub const AUTHOR_LIST: &str = "author_list";
pub const SERIES_LIST: &str = "series_list";
pub const PUBLISHER_LIST: &str = "publisher_list";
pub const TOC_LIST: &str = "toc_list";
pub const BOOKSHELF_LIST: &str = "bookshelf_list";

/// "Cover is used" toggles, indexed by [`CoverSlot`].
pub const COVER_IS_USED: [&str; 2] = ["cover_is_used_0", "cover_is_used_1"];
/// Downloaded cover file paths, indexed by [`CoverSlot`]. Never persisted.
pub const TMP_FILE_SPEC: [&str; 2] = ["tmp_file_spec_0", "tmp_file_spec_1"];

pub const CALIBRE_BOOK_ID: &str = "calibre_book_id";
pub const CALIBRE_BOOK_UUID: &str = "calibre_book_uuid";
pub const CALIBRE_BOOK_MAIN_FORMAT: &str = "calibre_book_main_format";

pub const STRIP_INFO_BOOK_ID: &str = "stripinfo_book_id";
pub const STRIP_INFO_COLL_ID: &str = "stripinfo_coll_id";
pub const STRIP_INFO_OWNED: &str = "stripinfo_owned";
pub const STRIP_INFO_WANTED: &str = "stripinfo_wanted";
pub const STRIP_INFO_AMOUNT: &str = "stripinfo_amount";

/// Visibility preference keys gating list fields.
///
/// A list field may be hidden by a different flag than its storage key.
pub mod prefs {
    pub const AUTHOR: &str = "fk_author";
    pub const SERIES: &str = "fk_series";
    pub const PUBLISHER: &str = "fk_publisher";
    pub const TOC: &str = "fk_toc";
    pub const BOOKSHELF: &str = "fk_bookshelf";
}

/// The closed set of list-typed fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListKind {
    Authors,
    Series,
    Publishers,
    Toc,
    Bookshelves,
}

impl ListKind {
    pub const ALL: [ListKind; 5] = [
        ListKind::Authors,
        ListKind::Series,
        ListKind::Publishers,
        ListKind::Toc,
        ListKind::Bookshelves,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ListKind::Authors => AUTHOR_LIST,
            ListKind::Series => SERIES_LIST,
            ListKind::Publishers => PUBLISHER_LIST,
            ListKind::Toc => TOC_LIST,
            ListKind::Bookshelves => BOOKSHELF_LIST,
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }
}

/// Cover image slot: front (0) or back (1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoverSlot {
    Front = 0,
    Back = 1,
}

impl CoverSlot {
    pub const ALL: [CoverSlot; 2] = [CoverSlot::Front, CoverSlot::Back];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Key of the "cover is used" toggle for this slot.
    pub fn is_used_key(self) -> &'static str {
        COVER_IS_USED[self.index()]
    }

    /// Key under which a reader hands over the downloaded cover file path.
    pub fn tmp_file_key(self) -> &'static str {
        TMP_FILE_SPEC[self.index()]
    }
}

/// How the merge engine treats a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Scalar,
    List(ListKind),
    /// Both the toggle and the temp-file key of a slot classify as the slot.
    Cover(CoverSlot),
}

impl FieldKind {
    pub fn of(key: &str) -> Self {
        if let Some(kind) = ListKind::from_key(key) {
            return FieldKind::List(kind);
        }
        CoverSlot::ALL
            .into_iter()
            .find(|slot| slot.is_used_key() == key || slot.tmp_file_key() == key)
            .map(FieldKind::Cover)
            .unwrap_or(FieldKind::Scalar)
    }

    pub fn is_list(self) -> bool {
        matches!(self, FieldKind::List(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_keys_round_trip() {
        for kind in ListKind::ALL {
            assert_eq!(ListKind::from_key(kind.key()), Some(kind));
            assert_eq!(FieldKind::of(kind.key()), FieldKind::List(kind));
        }
        assert_eq!(ListKind::from_key(TITLE), None);
    }

    #[test]
    fn test_cover_keys_classify_as_slot() {
        assert_eq!(FieldKind::of("cover_is_used_0"), FieldKind::Cover(CoverSlot::Front));
        assert_eq!(FieldKind::of("tmp_file_spec_1"), FieldKind::Cover(CoverSlot::Back));
        assert_eq!(CoverSlot::from_index(1), Some(CoverSlot::Back));
        assert_eq!(CoverSlot::from_index(2), None);
    }

    #[test]
    fn test_everything_else_is_scalar() {
        assert_eq!(FieldKind::of(TITLE), FieldKind::Scalar);
        assert_eq!(FieldKind::of(PRICE_PAID_CURRENCY), FieldKind::Scalar);
        assert!(!FieldKind::of(RATING).is_list());
    }
}
