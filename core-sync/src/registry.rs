//! Field registry construction
//!
//! Turns a declarative list of wanted fields, the user's visibility choices
//! and the stored per-field actions into a [`SyncReaderProcessor`].

use crate::action::SyncAction;
use crate::error::{Result, SyncError};
use crate::field::SyncField;
use crate::processor::SyncReaderProcessor;
use crate::visibility::FieldVisibility;
use bridge_traits::storage::SettingsStore;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Builder for [`SyncReaderProcessor`].
///
/// Hidden fields are never added, so the merge engine does not know they
/// exist. Related-field links are resolved once, in [`build`](Self::build),
/// regardless of the order in which they were declared.
///
/// Construction errors (empty key or label, `Append` default on a scalar)
/// are deferred to `build`.
///
/// # Example
///
/// ```ignore
/// let processor = SyncReaderProcessorBuilder::new("stripinfo.sync.", visibility)
///     .add(keys::PRICE_PAID, "Price paid")
///     .add_related_field(keys::PRICE_PAID, keys::PRICE_PAID_CURRENCY)
///     .add_list(keys::prefs::BOOKSHELF, keys::BOOKSHELF_LIST, "Bookshelves")
///     .build()?;
/// ```
pub struct SyncReaderProcessorBuilder {
    prefix: String,
    visibility: Arc<dyn FieldVisibility>,
    stored: HashMap<String, SyncAction>,
    fields: IndexMap<String, SyncField>,
    related: Vec<(String, String)>,
    error: Option<SyncError>,
}

impl SyncReaderProcessorBuilder {
    /// A builder without stored actions: every field starts at its default.
    pub fn new(prefix: impl Into<String>, visibility: Arc<dyn FieldVisibility>) -> Self {
        Self {
            prefix: prefix.into(),
            visibility,
            stored: HashMap::new(),
            fields: IndexMap::new(),
            related: Vec::new(),
            error: None,
        }
    }

    /// A builder that applies the actions stored under `prefix + key`.
    ///
    /// A stored value that cannot be read as an ordinal is logged and
    /// ignored, leaving that field at its default action.
    pub async fn with_preferences(
        prefix: impl Into<String>,
        visibility: Arc<dyn FieldVisibility>,
        store: &dyn SettingsStore,
    ) -> Result<Self> {
        let mut builder = Self::new(prefix, visibility);

        for setting in store.list_keys_with_prefix(&builder.prefix).await? {
            let Some(key) = setting.strip_prefix(builder.prefix.as_str()) else {
                continue;
            };
            match store.get_i64(&setting).await {
                Ok(Some(ordinal)) => {
                    builder
                        .stored
                        .insert(key.to_string(), SyncAction::from_ordinal(ordinal));
                }
                Ok(None) => {}
                // The field keeps its default action.
                Err(err) => {
                    warn!(setting = %setting, error = %err, "Unreadable sync field preference");
                }
            }
        }

        debug!(
            prefix = %builder.prefix,
            stored = builder.stored.len(),
            "Loaded sync field preferences"
        );
        Ok(builder)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Add a scalar field defaulting to [`SyncAction::CopyIfBlank`].
    pub fn add(self, key: &str, label: &str) -> Self {
        self.add_with_action(key, label, SyncAction::CopyIfBlank)
    }

    /// Add a scalar field with an explicit default action.
    pub fn add_with_action(self, key: &str, label: &str, default_action: SyncAction) -> Self {
        if !self.visibility.is_used(key) {
            return self;
        }
        let field = SyncField::new(key, label, false, default_action);
        self.insert(field)
    }

    /// Add a list field defaulting to [`SyncAction::Append`].
    ///
    /// Visibility is checked against `pref_key`, which may differ from `key`.
    pub fn add_list(self, pref_key: &str, key: &str, label: &str) -> Self {
        if !self.visibility.is_used(pref_key) {
            return self;
        }
        let field = SyncField::new(key, label, true, SyncAction::Append);
        self.insert(field)
    }

    /// Declare that `related_key` follows `primary_key`.
    ///
    /// At build time the related field is added as a copy of the primary,
    /// unless the primary is absent or set to `Skip`.
    pub fn add_related_field(mut self, primary_key: &str, related_key: &str) -> Self {
        self.related
            .push((primary_key.to_string(), related_key.to_string()));
        self
    }

    /// Positional form: one key adds a scalar, two keys add a list as
    /// `[pref_key, key]`.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidArgument`] for any other number of keys.
    pub fn add_keys(self, label: &str, keys: &[&str]) -> Result<Self> {
        match keys {
            [key] => Ok(self.add(key, label)),
            [pref_key, key] => Ok(self.add_list(pref_key, key, label)),
            _ => Err(SyncError::InvalidArgument(format!(
                "{label}: expected 1 or 2 keys, got {}",
                keys.len()
            ))),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &SyncField> {
        self.fields.values()
    }

    pub fn field(&self, key: &str) -> Option<&SyncField> {
        self.fields.get(key)
    }

    /// Change the action of a field before building.
    pub fn set_action(&mut self, key: &str, action: SyncAction) -> Result<()> {
        self.fields
            .get_mut(key)
            .ok_or_else(|| SyncError::InvalidArgument(format!("no sync field {key}")))?
            .set_action(action)
    }

    /// Persist the current action of every field under `prefix + key`.
    pub async fn write_preferences(&self, store: &dyn SettingsStore) -> Result<()> {
        for field in self.fields.values() {
            store
                .set_i64(&self.preference_key(field.key()), field.action().ordinal())
                .await?;
        }
        Ok(())
    }

    /// Reset every field to its default action and persist that.
    pub async fn reset_preferences(&mut self, store: &dyn SettingsStore) -> Result<()> {
        for field in self.fields.values_mut() {
            field.reset_action();
        }
        self.write_preferences(store).await
    }

    /// Resolve related fields and produce the processor.
    pub fn build(self) -> Result<SyncReaderProcessor> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let mut fields = self.fields;
        for (primary_key, related_key) in &self.related {
            let related = match fields.get(primary_key) {
                Some(primary) if primary.action() != SyncAction::Skip => {
                    primary.create_related_field(related_key.as_str())
                }
                _ => continue,
            };
            fields.insert(related_key.clone(), related);
        }

        Ok(SyncReaderProcessor::from_fields(fields))
    }

    fn preference_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn insert(mut self, field: Result<SyncField>) -> Self {
        match field {
            Ok(mut field) => {
                if let Some(stored) = self.stored.get(field.key()) {
                    field.set_action_lenient(*stored);
                }
                self.fields.insert(field.key().to_string(), field);
            }
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visibility::{AllFieldsVisible, HiddenFields};
    use bridge_desktop::SqliteSettingsStore;
    use core_library::keys;

    const PREFIX: &str = "test.sync.";

    fn builder() -> SyncReaderProcessorBuilder {
        SyncReaderProcessorBuilder::new(PREFIX, Arc::new(AllFieldsVisible))
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let processor = builder()
            .add(keys::LOCATION, "Location")
            .add_with_action(keys::TITLE, "Title", SyncAction::Overwrite)
            .add_list(keys::prefs::AUTHOR, keys::AUTHOR_LIST, "Authors")
            .build()
            .unwrap();

        let keys: Vec<&str> = processor.fields().map(SyncField::key).collect();
        assert_eq!(keys, vec![keys::LOCATION, keys::TITLE, keys::AUTHOR_LIST]);
        assert_eq!(
            processor.field(keys::AUTHOR_LIST).map(SyncField::action),
            Some(SyncAction::Append)
        );
        assert!(processor.field(keys::AUTHOR_LIST).unwrap().can_append());
    }

    #[test]
    fn test_hidden_fields_are_absent() {
        let visibility = HiddenFields::new()
            .hide(keys::LOCATION)
            .hide(keys::prefs::BOOKSHELF);
        let processor = SyncReaderProcessorBuilder::new(PREFIX, Arc::new(visibility))
            .add(keys::LOCATION, "Location")
            .add(keys::RATING, "Rating")
            .add_list(keys::prefs::BOOKSHELF, keys::BOOKSHELF_LIST, "Bookshelves")
            .build()
            .unwrap();

        assert!(!processor.contains(keys::LOCATION));
        assert!(!processor.contains(keys::BOOKSHELF_LIST));
        assert!(processor.contains(keys::RATING));
    }

    #[test]
    fn test_related_field_follows_primary() {
        // link declared before the primary exists
        let processor = builder()
            .add_related_field(keys::PRICE_PAID, keys::PRICE_PAID_CURRENCY)
            .add_with_action(keys::PRICE_PAID, "Price paid", SyncAction::Overwrite)
            .build()
            .unwrap();

        let currency = processor.field(keys::PRICE_PAID_CURRENCY).unwrap();
        assert_eq!(currency.action(), SyncAction::Overwrite);
        assert_eq!(currency.label(), "Price paid");
    }

    #[test]
    fn test_related_field_dropped_for_skip_or_missing_primary() {
        let mut builder = builder()
            .add(keys::PRICE_PAID, "Price paid")
            .add_related_field(keys::PRICE_PAID, keys::PRICE_PAID_CURRENCY)
            .add_related_field(keys::CALIBRE_BOOK_ID, keys::CALIBRE_BOOK_UUID);
        builder.set_action(keys::PRICE_PAID, SyncAction::Skip).unwrap();

        let processor = builder.build().unwrap();
        assert!(!processor.contains(keys::PRICE_PAID_CURRENCY));
        assert!(!processor.contains(keys::CALIBRE_BOOK_UUID));
    }

    #[test]
    fn test_add_keys_arity() {
        let processor = builder()
            .add_keys("Rating", &[keys::RATING])
            .unwrap()
            .add_keys("Series", &[keys::prefs::SERIES, keys::SERIES_LIST])
            .unwrap()
            .build()
            .unwrap();
        assert!(!processor.field(keys::RATING).unwrap().can_append());
        assert!(processor.field(keys::SERIES_LIST).unwrap().can_append());

        let err = builder().add_keys("Bad", &["a", "b", "c"]).err().unwrap();
        assert!(matches!(err, SyncError::InvalidArgument(_)));
        assert!(builder().add_keys("Empty", &[]).is_err());
    }

    #[test]
    fn test_invalid_field_fails_at_build() {
        let result = builder()
            .add_with_action(keys::TITLE, "Title", SyncAction::Append)
            .add(keys::RATING, "Rating")
            .build();
        assert!(matches!(result, Err(SyncError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_preferences_round_trip() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();

        let mut builder = builder()
            .add(keys::LOCATION, "Location")
            .add_list(keys::prefs::AUTHOR, keys::AUTHOR_LIST, "Authors");
        builder.set_action(keys::LOCATION, SyncAction::Skip).unwrap();
        builder
            .set_action(keys::AUTHOR_LIST, SyncAction::Overwrite)
            .unwrap();
        builder.write_preferences(&store).await.unwrap();

        assert_eq!(store.get_i64("test.sync.location").await.unwrap(), Some(0));

        let restored =
            SyncReaderProcessorBuilder::with_preferences(PREFIX, Arc::new(AllFieldsVisible), &store)
                .await
                .unwrap()
                .add(keys::LOCATION, "Location")
                .add_list(keys::prefs::AUTHOR, keys::AUTHOR_LIST, "Authors")
                .add(keys::RATING, "Rating");
        assert_eq!(
            restored.field(keys::LOCATION).map(SyncField::action),
            Some(SyncAction::Skip)
        );
        assert_eq!(
            restored.field(keys::AUTHOR_LIST).map(SyncField::action),
            Some(SyncAction::Overwrite)
        );
        assert_eq!(
            restored.field(keys::RATING).map(SyncField::action),
            Some(SyncAction::CopyIfBlank)
        );
    }

    #[tokio::test]
    async fn test_stored_append_on_scalar_is_coerced() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();
        store
            .set_i64("test.sync.location", SyncAction::Append.ordinal())
            .await
            .unwrap();

        let builder =
            SyncReaderProcessorBuilder::with_preferences(PREFIX, Arc::new(AllFieldsVisible), &store)
                .await
                .unwrap()
                .add(keys::LOCATION, "Location");
        assert_eq!(
            builder.field(keys::LOCATION).map(SyncField::action),
            Some(SyncAction::Overwrite)
        );
    }

    #[tokio::test]
    async fn test_unreadable_preference_falls_back_to_default() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();
        store.set_bool("test.sync.location", true).await.unwrap();
        store
            .set_i64("test.sync.rating", SyncAction::Overwrite.ordinal())
            .await
            .unwrap();

        let builder =
            SyncReaderProcessorBuilder::with_preferences(PREFIX, Arc::new(AllFieldsVisible), &store)
                .await
                .unwrap()
                .add(keys::LOCATION, "Location")
                .add(keys::RATING, "Rating");
        assert_eq!(
            builder.field(keys::LOCATION).map(SyncField::action),
            Some(SyncAction::CopyIfBlank)
        );
        assert_eq!(
            builder.field(keys::RATING).map(SyncField::action),
            Some(SyncAction::Overwrite)
        );
    }

    #[tokio::test]
    async fn test_reset_preferences() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();
        let mut builder = builder().add(keys::LOCATION, "Location");
        builder
            .set_action(keys::LOCATION, SyncAction::Overwrite)
            .unwrap();
        builder.write_preferences(&store).await.unwrap();

        builder.reset_preferences(&store).await.unwrap();
        assert_eq!(
            builder.field(keys::LOCATION).map(SyncField::action),
            Some(SyncAction::CopyIfBlank)
        );
        assert_eq!(store.get_i64("test.sync.location").await.unwrap(), Some(1));
    }
}
