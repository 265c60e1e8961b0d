//! # Merge Engine
//!
//! Reconciles remote book data with a local book, one field at a time.
//!
//! ## Overview
//!
//! A [`SyncReaderProcessor`] holds the ordered set of [`SyncField`]s for one
//! sync target. It is used in two passes per book:
//!
//! 1. [`filter`](SyncReaderProcessor::filter), before anything is fetched:
//!    narrows the fields to those the local book actually needs, so a reader
//!    can skip downloads (covers in particular).
//! 2. [`process`](SyncReaderProcessor::process), after the fetch: turns the
//!    remote record into the minimal delta to persist.
//!
//! `process` runs as a pipeline of stages, each taking the working record by
//! value and handing back a new one:
//!
//! - [`retain_wanted`]: drop keys that were not asked for, or are `Skip`
//! - reconcile: covers are stored, `CopyIfBlank` yields to local content,
//!   `Append` merges lists and removes duplicates
//! - [`backfill_language`]: keep the book language next to the merged fields
//! - [`into_delta`]: nothing left means nothing to write
//!
//! Cover files are the only side effect. A full disk aborts the merge, any
//! other cover failure is logged and the book's other fields still merge.
//!
//! ## Usage
//!
//! ```ignore
//! let wanted = processor.filter(&local, covers.as_ref()).await;
//! let covers_wanted = covers_wanted(&wanted);
//! let remote = catalog.fetch_book(&external_id, covers_wanted).await?;
//!
//! let ctx = MergeContext::new(covers.as_ref(), &pruner, "en");
//! if let Some(delta) = processor.process(&ctx, id, &local, &wanted, remote).await? {
//!     repository.update(&delta).await?;
//! }
//! ```

use crate::action::SyncAction;
use crate::error::{Result, SyncError};
use crate::field::SyncField;
use core_library::{
    keys, BookId, BookRecord, CoverSlot, FieldKind, FieldValue, ListKind, ListPruner,
};
use core_metadata::CoverStorage;
use core_runtime::logging::strip_path;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, error, instrument, warn};

/// The fields relevant to one book, in registry order.
pub type FieldsWanted = IndexMap<String, SyncField>;

/// Collaborators of a merge.
#[derive(Clone, Copy)]
pub struct MergeContext<'a> {
    pub covers: &'a dyn CoverStorage,
    pub pruner: &'a dyn ListPruner,
    /// Fallback for books without a language.
    pub locale: &'a str,
}

impl<'a> MergeContext<'a> {
    pub fn new(covers: &'a dyn CoverStorage, pruner: &'a dyn ListPruner, locale: &'a str) -> Self {
        Self {
            covers,
            pruner,
            locale,
        }
    }
}

/// Result of [`SyncReaderProcessor::merge`].
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Fields to persist, with the primary key set; `None` when nothing changed.
    pub delta: Option<BookRecord>,
    /// Cover files moved into permanent storage.
    pub covers_stored: usize,
}

/// Ordered field registry plus the filter/process merge passes.
///
/// Built by [`SyncReaderProcessorBuilder`](crate::SyncReaderProcessorBuilder).
/// Serialisable so a configured processor can travel with a reader config.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SyncReaderProcessor {
    fields: IndexMap<String, SyncField>,
}

impl SyncReaderProcessor {
    pub(crate) fn from_fields(fields: IndexMap<String, SyncField>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> impl Iterator<Item = &SyncField> {
        self.fields.values()
    }

    pub fn field(&self, key: &str) -> Option<&SyncField> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Change the action of one field.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidArgument`] for an unknown key, or `Append` on a
    /// field that is not a list.
    pub fn set_action(&mut self, key: &str, action: SyncAction) -> Result<()> {
        self.fields
            .get_mut(key)
            .ok_or_else(|| SyncError::InvalidArgument(format!("no sync field {key}")))?
            .set_action(action)
    }

    /// Set every field to `action`; non-list fields take `Overwrite` for `Append`.
    pub fn set_all_actions(&mut self, action: SyncAction) {
        for field in self.fields.values_mut() {
            field.set_action_lenient(action);
        }
    }

    pub fn reset_actions(&mut self) {
        for field in self.fields.values_mut() {
            field.reset_action();
        }
    }

    /// The fields worth fetching for `local`.
    ///
    /// `Append` and `Overwrite` always need remote data. `CopyIfBlank` only
    /// does when the local value is blank: an absent or empty list, a missing
    /// or zero-length cover file, or a scalar that is empty or `"0"`.
    /// `Skip` never does. Reads only; `local` is not modified.
    pub async fn filter(&self, local: &BookRecord, covers: &dyn CoverStorage) -> FieldsWanted {
        let mut wanted = FieldsWanted::new();

        for field in self.fields.values() {
            let include = match field.action() {
                SyncAction::Skip => false,
                SyncAction::Append | SyncAction::Overwrite => true,
                SyncAction::CopyIfBlank => is_blank(local, field.key(), covers).await,
            };
            if include {
                wanted.insert(field.key().to_string(), field.clone());
            }
        }

        wanted
    }

    /// Merge `remote` into `local` and return the delta to persist.
    ///
    /// `fields_wanted` is normally the output of [`filter`](Self::filter);
    /// extra keys are tolerated. The delta always carries `book_id`.
    ///
    /// # Errors
    ///
    /// - [`SyncError::DiskFull`] when a cover cannot be stored for lack of space
    /// - [`SyncError::InvalidArgument`] when `Append` meets a key that is not
    ///   one of the list fields, or a value of the wrong list type
    pub async fn process(
        &self,
        ctx: &MergeContext<'_>,
        book_id: BookId,
        local: &BookRecord,
        fields_wanted: &FieldsWanted,
        remote: BookRecord,
    ) -> Result<Option<BookRecord>> {
        Ok(self
            .merge(ctx, book_id, local, fields_wanted, remote)
            .await?
            .delta)
    }

    /// [`process`](Self::process), also reporting how many covers were stored.
    #[instrument(skip_all, fields(book_id = %book_id))]
    pub async fn merge(
        &self,
        ctx: &MergeContext<'_>,
        book_id: BookId,
        local: &BookRecord,
        fields_wanted: &FieldsWanted,
        remote: BookRecord,
    ) -> Result<MergeOutcome> {
        let working = retain_wanted(remote, fields_wanted);
        let (working, covers_stored) = reconcile(ctx, local, fields_wanted, working).await?;
        let working = backfill_language(local, working);
        let delta = into_delta(working, book_id);

        debug!(
            fields = delta.as_ref().map_or(0, BookRecord::len),
            covers_stored, "Merged remote data"
        );
        Ok(MergeOutcome {
            delta,
            covers_stored,
        })
    }
}

/// Which cover slots a reader should download for this set of fields.
pub fn covers_wanted(fields_wanted: &FieldsWanted) -> [bool; 2] {
    CoverSlot::ALL.map(|slot| fields_wanted.contains_key(slot.tmp_file_key()))
}

async fn is_blank(local: &BookRecord, key: &str, covers: &dyn CoverStorage) -> bool {
    match FieldKind::of(key) {
        FieldKind::Cover(slot) => cover_is_blank(local, slot, covers).await,
        FieldKind::List(_) | FieldKind::Scalar => local.is_blank(key),
    }
}

async fn cover_is_blank(local: &BookRecord, slot: CoverSlot, covers: &dyn CoverStorage) -> bool {
    let Some(uuid) = local.uuid() else {
        return true;
    };
    match covers.has_cover(&uuid, slot).await {
        Ok(has_cover) => !has_cover,
        Err(err) => {
            warn!(uuid = %uuid, slot = slot.index(), error = %err, "Cover lookup failed");
            true
        }
    }
}

/// Keep only keys that are wanted with an action other than `Skip`.
pub fn retain_wanted(mut remote: BookRecord, fields_wanted: &FieldsWanted) -> BookRecord {
    remote.retain(|key, _| {
        fields_wanted
            .get(key)
            .is_some_and(|field| field.action() != SyncAction::Skip)
    });
    remote
}

async fn reconcile(
    ctx: &MergeContext<'_>,
    local: &BookRecord,
    fields_wanted: &FieldsWanted,
    mut working: BookRecord,
) -> Result<(BookRecord, usize)> {
    let locale = local.language().unwrap_or_else(|| ctx.locale.to_string());
    let mut covers_stored = 0;

    for field in fields_wanted.values() {
        let key = field.key();
        if !working.contains(key) {
            continue;
        }

        match (FieldKind::of(key), field.action()) {
            (FieldKind::Cover(slot), _) => {
                if store_remote_cover(ctx.covers, local, &mut working, slot).await? {
                    covers_stored += 1;
                }
            }
            (_, SyncAction::CopyIfBlank) => {
                if !local.is_blank(key) {
                    working.remove(key);
                }
            }
            (FieldKind::List(kind), SyncAction::Append) => {
                if let Some(remote) = working.get(key).cloned() {
                    let merged = append_list(kind, remote, local, ctx.pruner, &locale)?;
                    working.put(key, merged);
                }
            }
            (FieldKind::Scalar, SyncAction::Append) => {
                return Err(SyncError::InvalidArgument(format!(
                    "{key} is not a list field and cannot append"
                )));
            }
            (_, SyncAction::Overwrite | SyncAction::Skip) => {}
        }
    }

    Ok((working, covers_stored))
}

/// Remote entries first, then the local ones, then duplicates removed.
///
/// An empty remote list is returned as is.
fn append_list(
    kind: ListKind,
    remote: FieldValue,
    local: &BookRecord,
    pruner: &dyn ListPruner,
    locale: &str,
) -> Result<FieldValue> {
    if remote.list_kind() != Some(kind) {
        return Err(SyncError::InvalidArgument(format!(
            "{} does not hold a list of the expected type",
            kind.key()
        )));
    }
    if remote.list_len() == Some(0) {
        return Ok(remote);
    }

    let mut merged = match remote {
        FieldValue::Authors(mut list) => {
            list.extend_from_slice(local.authors());
            FieldValue::Authors(list)
        }
        FieldValue::Series(mut list) => {
            list.extend_from_slice(local.series());
            FieldValue::Series(list)
        }
        FieldValue::Publishers(mut list) => {
            list.extend_from_slice(local.publishers());
            FieldValue::Publishers(list)
        }
        FieldValue::Toc(mut list) => {
            list.extend_from_slice(local.toc());
            FieldValue::Toc(list)
        }
        FieldValue::Bookshelves(mut list) => {
            list.extend_from_slice(local.bookshelves());
            FieldValue::Bookshelves(list)
        }
        scalar => return Ok(scalar),
    };

    pruner.prune_value(&mut merged, locale);
    Ok(merged)
}

/// Take the slot's temp file out of `working` and store it.
async fn store_remote_cover(
    covers: &dyn CoverStorage,
    local: &BookRecord,
    working: &mut BookRecord,
    slot: CoverSlot,
) -> Result<bool> {
    let file_spec = working
        .remove(slot.tmp_file_key())
        .and_then(|value| value.to_plain_string());

    match file_spec {
        Some(file_spec) if !file_spec.is_empty() => {
            persist_cover(covers, local.uuid().as_deref(), slot, &file_spec).await
        }
        _ => Ok(false),
    }
}

/// Move a downloaded cover into storage.
///
/// Returns whether the cover was stored. Only a full disk is an error; every
/// other failure is logged.
pub(crate) async fn persist_cover(
    covers: &dyn CoverStorage,
    uuid: Option<&str>,
    slot: CoverSlot,
    file_spec: &str,
) -> Result<bool> {
    let Some(uuid) = uuid else {
        error!(slot = slot.index(), "Cannot store cover of a book without uuid");
        return Ok(false);
    };

    match covers.persist(Path::new(file_spec), uuid, slot).await {
        Ok(_) => Ok(true),
        Err(err) if err.is_disk_full() => Err(SyncError::DiskFull(err)),
        Err(err) => {
            error!(
                uuid = %uuid,
                slot = slot.index(),
                file = strip_path(file_spec),
                error = %err,
                "Failed to store cover"
            );
            Ok(false)
        }
    }
}

/// Add the local language when the remote data has none, so it stays
/// available to whoever interprets the merged fields.
pub fn backfill_language(local: &BookRecord, mut working: BookRecord) -> BookRecord {
    if working.is_empty() || working.language().is_some() {
        return working;
    }
    if let Some(language) = local.language() {
        working.put(keys::LANGUAGE, language);
    }
    working
}

/// `None` for an empty record, else the record with its primary key set.
pub fn into_delta(mut working: BookRecord, book_id: BookId) -> Option<BookRecord> {
    if working.is_empty() {
        return None;
    }
    working.set_id(book_id);
    Some(working)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::SyncField;
    use core_library::{Author, LocaleListPruner};
    use pretty_assertions::assert_eq;

    fn wanted(fields: &[(&str, bool, SyncAction)]) -> FieldsWanted {
        fields
            .iter()
            .map(|(key, can_append, action)| {
                let mut field = SyncField::new(*key, *key, *can_append, SyncAction::Skip).unwrap();
                field.set_action(*action).unwrap();
                (key.to_string(), field)
            })
            .collect()
    }

    #[test]
    fn test_retain_wanted_drops_unknown_and_skip() {
        let wanted = wanted(&[
            (keys::TITLE, false, SyncAction::Overwrite),
            (keys::LOCATION, false, SyncAction::Skip),
        ]);
        let remote = BookRecord::new()
            .with(keys::TITLE, "Dune")
            .with(keys::LOCATION, "Shelf")
            .with(keys::RATING, 5i64);

        let kept = retain_wanted(remote, &wanted);
        assert_eq!(kept, BookRecord::new().with(keys::TITLE, "Dune"));
    }

    #[test]
    fn test_backfill_language_only_for_non_empty() {
        let local = BookRecord::new().with(keys::LANGUAGE, "nl");

        let filled = backfill_language(&local, BookRecord::new().with(keys::TITLE, "Kuifje"));
        assert_eq!(filled.language().as_deref(), Some("nl"));

        let kept = backfill_language(
            &local,
            BookRecord::new()
                .with(keys::TITLE, "Tintin")
                .with(keys::LANGUAGE, "fr"),
        );
        assert_eq!(kept.language().as_deref(), Some("fr"));

        assert!(backfill_language(&local, BookRecord::new()).is_empty());
    }

    #[test]
    fn test_into_delta() {
        assert_eq!(into_delta(BookRecord::new(), BookId(3)), None);

        let delta = into_delta(BookRecord::new().with(keys::TITLE, "Dune"), BookId(3)).unwrap();
        assert_eq!(delta.id(), Some(BookId(3)));
    }

    #[test]
    fn test_append_list_remote_first() {
        let local = BookRecord::new().with(
            keys::AUTHOR_LIST,
            vec![Author::from_name("Alice"), Author::from_name("Bob")],
        );
        let remote = FieldValue::from(vec![Author::from_name("Bob"), Author::from_name("Carol")]);

        let merged =
            append_list(ListKind::Authors, remote, &local, &LocaleListPruner::new(), "en").unwrap();
        let names: Vec<String> = match merged {
            FieldValue::Authors(list) => list.iter().map(Author::formatted_name).collect(),
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(names, vec!["Bob", "Carol", "Alice"]);
    }

    #[test]
    fn test_append_list_empty_remote_untouched() {
        let local = BookRecord::new().with(keys::AUTHOR_LIST, vec![Author::from_name("Alice")]);
        let merged = append_list(
            ListKind::Authors,
            FieldValue::empty_list(ListKind::Authors),
            &local,
            &LocaleListPruner::new(),
            "en",
        )
        .unwrap();
        assert_eq!(merged.list_len(), Some(0));
    }

    #[test]
    fn test_append_list_type_mismatch() {
        let err = append_list(
            ListKind::Series,
            FieldValue::from("Dune"),
            &BookRecord::new(),
            &LocaleListPruner::new(),
            "en",
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::InvalidArgument(_)));
    }

    #[test]
    fn test_covers_wanted() {
        let fields = wanted(&[(keys::TMP_FILE_SPEC[1], false, SyncAction::CopyIfBlank)]);
        assert_eq!(covers_wanted(&fields), [false, true]);
    }
}
