//! List de-duplication
//!
//! After a remote list and a local list are concatenated, duplicates are
//! removed here. The first occurrence of an entity keeps its position; later
//! duplicates contribute missing details (ids, author type flags, series
//! numbers) before being dropped.

use crate::models::{Author, Bookshelf, Publisher, Series, TocEntry};
use crate::record::FieldValue;

/// Removes duplicates from list-typed fields.
///
/// Every method returns `true` when the list was modified.
pub trait ListPruner: Send + Sync {
    fn prune_authors(&self, list: &mut Vec<Author>, locale: &str) -> bool;

    fn prune_series(&self, list: &mut Vec<Series>, locale: &str) -> bool;

    fn prune_publishers(&self, list: &mut Vec<Publisher>, locale: &str) -> bool;

    fn prune_toc(&self, list: &mut Vec<TocEntry>, locale: &str) -> bool;

    fn prune_bookshelves(&self, list: &mut Vec<Bookshelf>) -> bool;

    /// Dispatch on the list kind of `value`; scalars are left alone.
    fn prune_value(&self, value: &mut FieldValue, locale: &str) -> bool {
        match value {
            FieldValue::Authors(list) => self.prune_authors(list, locale),
            FieldValue::Series(list) => self.prune_series(list, locale),
            FieldValue::Publishers(list) => self.prune_publishers(list, locale),
            FieldValue::Toc(list) => self.prune_toc(list, locale),
            FieldValue::Bookshelves(list) => self.prune_bookshelves(list),
            _ => false,
        }
    }
}

/// Name-based pruning with locale-sensitive case folding.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocaleListPruner;

impl LocaleListPruner {
    pub fn new() -> Self {
        Self
    }
}

/// Case-fold and collapse whitespace.
///
/// Turkish and Azerbaijani fold `I` to dotless `ı` and `İ` to `i`.
pub fn normalize_name(name: &str, locale: &str) -> String {
    let turkic = matches!(language_of(locale).as_str(), "tr" | "az");
    let mut out = String::with_capacity(name.len());
    for (i, word) in name.split_whitespace().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        for c in word.chars() {
            match c {
                'I' if turkic => out.push('ı'),
                'İ' if turkic => out.push('i'),
                _ => out.extend(c.to_lowercase()),
            }
        }
    }
    out
}

fn language_of(locale: &str) -> String {
    locale
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Ids conflict only when both entities are saved under different rows.
fn ids_compatible(a: i64, b: i64) -> bool {
    a == 0 || b == 0 || a == b
}

/// Generic first-wins merge: `same` decides identity, `absorb` folds the
/// duplicate into the kept entity.
fn merge_duplicates<T>(
    list: &mut Vec<T>,
    mut same: impl FnMut(&T, &T) -> bool,
    mut absorb: impl FnMut(&mut T, T),
) -> bool {
    let mut kept: Vec<T> = Vec::with_capacity(list.len());
    let mut modified = false;

    for item in list.drain(..) {
        match kept.iter_mut().find(|existing| same(existing, &item)) {
            Some(existing) => {
                absorb(existing, item);
                modified = true;
            }
            None => kept.push(item),
        }
    }

    *list = kept;
    modified
}

impl ListPruner for LocaleListPruner {
    fn prune_authors(&self, list: &mut Vec<Author>, locale: &str) -> bool {
        merge_duplicates(
            list,
            |a, b| {
                ids_compatible(a.id, b.id)
                    && normalize_name(&a.family_name, locale) == normalize_name(&b.family_name, locale)
                    && normalize_name(&a.given_names, locale) == normalize_name(&b.given_names, locale)
            },
            |kept, dup| {
                kept.author_type |= dup.author_type;
                if kept.id == 0 {
                    kept.id = dup.id;
                }
            },
        )
    }

    fn prune_series(&self, list: &mut Vec<Series>, locale: &str) -> bool {
        merge_duplicates(
            list,
            |a, b| {
                ids_compatible(a.id, b.id)
                    && normalize_name(&a.title, locale) == normalize_name(&b.title, locale)
                    && (!a.is_numbered() || !b.is_numbered() || a.number.trim() == b.number.trim())
            },
            |kept, dup| {
                if !kept.is_numbered() && dup.is_numbered() {
                    kept.number = dup.number;
                }
                if kept.id == 0 {
                    kept.id = dup.id;
                }
            },
        )
    }

    fn prune_publishers(&self, list: &mut Vec<Publisher>, locale: &str) -> bool {
        merge_duplicates(
            list,
            |a, b| {
                ids_compatible(a.id, b.id)
                    && normalize_name(&a.name, locale) == normalize_name(&b.name, locale)
            },
            |kept, dup| {
                if kept.id == 0 {
                    kept.id = dup.id;
                }
            },
        )
    }

    fn prune_toc(&self, list: &mut Vec<TocEntry>, locale: &str) -> bool {
        merge_duplicates(
            list,
            |a, b| {
                ids_compatible(a.id, b.id)
                    && normalize_name(&a.title, locale) == normalize_name(&b.title, locale)
                    && normalize_name(&a.author.formatted_name(), locale)
                        == normalize_name(&b.author.formatted_name(), locale)
            },
            |kept, dup| {
                if kept.id == 0 {
                    kept.id = dup.id;
                }
                if kept.first_publication.is_empty() {
                    kept.first_publication = dup.first_publication;
                }
            },
        )
    }

    fn prune_bookshelves(&self, list: &mut Vec<Bookshelf>) -> bool {
        merge_duplicates(
            list,
            |a, b| {
                if a.id != 0 && b.id != 0 {
                    a.id == b.id
                } else {
                    a.name.trim() == b.name.trim()
                }
            },
            |kept, dup| {
                if kept.id == 0 {
                    kept.id = dup.id;
                }
            },
        )
    }
}
