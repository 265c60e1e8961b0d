//! Book records
//!
//! A [`BookRecord`] is an insertion-ordered `key -> value` map. The same type
//! carries a full local book, a partial remote delta, and the merged delta that
//! is handed to the repository, so every accessor tolerates missing keys.

use crate::keys::{self, ListKind};
use crate::models::{Author, BookId, Bookshelf, Publisher, Series, TocEntry};
use chrono::{DateTime, NaiveDateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
    Authors(Vec<Author>),
    Series(Vec<Series>),
    Publishers(Vec<Publisher>),
    Toc(Vec<TocEntry>),
    Bookshelves(Vec<Bookshelf>),
}

impl FieldValue {
    /// String form of a scalar, `None` for lists.
    ///
    /// Booleans use their stored integer form so `false` reads as `"0"`.
    pub fn to_plain_string(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) => Some(s.trim().to_string()),
            FieldValue::Integer(i) => Some(i.to_string()),
            FieldValue::Real(r) if *r == 0.0 => Some("0".to_string()),
            FieldValue::Real(r) => Some(r.to_string()),
            FieldValue::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            _ => None,
        }
    }

    pub fn list_kind(&self) -> Option<ListKind> {
        match self {
            FieldValue::Authors(_) => Some(ListKind::Authors),
            FieldValue::Series(_) => Some(ListKind::Series),
            FieldValue::Publishers(_) => Some(ListKind::Publishers),
            FieldValue::Toc(_) => Some(ListKind::Toc),
            FieldValue::Bookshelves(_) => Some(ListKind::Bookshelves),
            _ => None,
        }
    }

    pub fn list_len(&self) -> Option<usize> {
        match self {
            FieldValue::Authors(v) => Some(v.len()),
            FieldValue::Series(v) => Some(v.len()),
            FieldValue::Publishers(v) => Some(v.len()),
            FieldValue::Toc(v) => Some(v.len()),
            FieldValue::Bookshelves(v) => Some(v.len()),
            _ => None,
        }
    }

    /// No meaningful content: an empty list, or a scalar whose string form is
    /// empty or the `"0"` not-set sentinel.
    pub fn is_blank(&self) -> bool {
        match self.list_len() {
            Some(len) => len == 0,
            None => self
                .to_plain_string()
                .map_or(true, |s| s.is_empty() || s == "0"),
        }
    }

    /// An empty list of the given kind.
    pub fn empty_list(kind: ListKind) -> Self {
        match kind {
            ListKind::Authors => FieldValue::Authors(Vec::new()),
            ListKind::Series => FieldValue::Series(Vec::new()),
            ListKind::Publishers => FieldValue::Publishers(Vec::new()),
            ListKind::Toc => FieldValue::Toc(Vec::new()),
            ListKind::Bookshelves => FieldValue::Bookshelves(Vec::new()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Real(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<Vec<Author>> for FieldValue {
    fn from(value: Vec<Author>) -> Self {
        FieldValue::Authors(value)
    }
}

impl From<Vec<Series>> for FieldValue {
    fn from(value: Vec<Series>) -> Self {
        FieldValue::Series(value)
    }
}

impl From<Vec<Publisher>> for FieldValue {
    fn from(value: Vec<Publisher>) -> Self {
        FieldValue::Publishers(value)
    }
}

impl From<Vec<TocEntry>> for FieldValue {
    fn from(value: Vec<TocEntry>) -> Self {
        FieldValue::Toc(value)
    }
}

impl From<Vec<Bookshelf>> for FieldValue {
    fn from(value: Vec<Bookshelf>) -> Self {
        FieldValue::Bookshelves(value)
    }
}

/// A book, or a partial view of one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookRecord {
    fields: IndexMap<String, FieldValue>,
}

impl BookRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`put`](Self::put).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.put(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// String form of a scalar value; `None` when absent or list-typed.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(FieldValue::to_plain_string)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            FieldValue::Integer(i) => Some(*i),
            FieldValue::Bool(b) => Some(i64::from(*b)),
            FieldValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Insert or replace; a replaced key keeps its position.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.fields.insert(key.into(), value.into())
    }

    /// Remove a key, preserving the order of the remaining keys.
    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.fields.shift_remove(key)
    }

    /// True when the key is absent or its value [is blank](FieldValue::is_blank).
    pub fn is_blank(&self, key: &str) -> bool {
        self.get(key).map_or(true, FieldValue::is_blank)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keep only the entries for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &FieldValue) -> bool) {
        self.fields.retain(|k, v| keep(k, v));
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn id(&self) -> Option<BookId> {
        self.get_i64(keys::PK_ID).filter(|id| *id > 0).map(BookId)
    }

    pub fn set_id(&mut self, id: BookId) {
        self.put(keys::PK_ID, id.get());
    }

    pub fn uuid(&self) -> Option<String> {
        self.get_string(keys::BOOK_UUID).filter(|s| !s.is_empty())
    }

    pub fn title(&self) -> Option<String> {
        self.get_string(keys::TITLE)
    }

    pub fn language(&self) -> Option<String> {
        self.get_string(keys::LANGUAGE).filter(|s| !s.is_empty())
    }

    /// Parse [`LAST_UPDATED`](keys::LAST_UPDATED) as RFC 3339 or
    /// `YYYY-MM-DD HH:MM:SS` in UTC.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        let raw = self.get_string(keys::LAST_UPDATED)?;
        parse_utc(&raw)
    }

    pub fn authors(&self) -> &[Author] {
        match self.get(keys::AUTHOR_LIST) {
            Some(FieldValue::Authors(v)) => v,
            _ => &[],
        }
    }

    pub fn series(&self) -> &[Series] {
        match self.get(keys::SERIES_LIST) {
            Some(FieldValue::Series(v)) => v,
            _ => &[],
        }
    }

    pub fn publishers(&self) -> &[Publisher] {
        match self.get(keys::PUBLISHER_LIST) {
            Some(FieldValue::Publishers(v)) => v,
            _ => &[],
        }
    }

    pub fn toc(&self) -> &[TocEntry] {
        match self.get(keys::TOC_LIST) {
            Some(FieldValue::Toc(v)) => v,
            _ => &[],
        }
    }

    pub fn bookshelves(&self) -> &[Bookshelf] {
        match self.get(keys::BOOKSHELF_LIST) {
            Some(FieldValue::Bookshelves(v)) => v,
            _ => &[],
        }
    }
}

impl FromIterator<(String, FieldValue)> for BookRecord {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for BookRecord {
    type Item = (String, FieldValue);
    type IntoIter = indexmap::map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

pub(crate) fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
