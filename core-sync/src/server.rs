//! Sync servers
//!
//! Selects the reader and writer for a remote site, together with the
//! site's default field registry and the setting keys it owns.

use crate::action::SyncAction;
use crate::config::{SyncReaderConfig, SyncWriterConfig, Updates};
use crate::error::{Result, SyncError};
use crate::processor::SyncReaderProcessor;
use crate::reader::{CatalogReader, SyncReader};
use crate::registry::SyncReaderProcessorBuilder;
use crate::remote::{RemoteCatalog, RemoteCatalogWriter};
use crate::services::SyncServices;
use crate::visibility::{FieldVisibility, HiddenFields};
use crate::writer::{CatalogWriter, SyncWriter};
use bridge_traits::storage::SettingsStore;
use core_library::keys;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncServer {
    /// A self-hosted Calibre content server.
    CalibreContentServer,
    /// The StripInfo comics site.
    StripInfo,
}

impl SyncServer {
    pub const ALL: [SyncServer; 2] = [SyncServer::CalibreContentServer, SyncServer::StripInfo];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncServer::CalibreContentServer => "calibre",
            SyncServer::StripInfo => "stripinfo",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SyncServer::CalibreContentServer => "Calibre Content Server",
            SyncServer::StripInfo => "StripInfo",
        }
    }

    /// Whether remote books carry a modification date, which
    /// [`Updates::OnlyNewer`] depends on.
    pub fn has_last_updated_date_field(&self) -> bool {
        matches!(self, SyncServer::CalibreContentServer)
    }

    pub fn supports_writer(&self) -> bool {
        matches!(self, SyncServer::CalibreContentServer)
    }

    /// Settings prefix of the stored per-field actions.
    pub fn preference_prefix(&self) -> String {
        format!("{}.sync.fields.update.", self.as_str())
    }

    /// Settings key of the last completed sync.
    pub fn last_sync_key(&self) -> String {
        format!("{}.last_sync_date", self.as_str())
    }

    /// Book key holding the site's id, used to match remote and local books.
    pub fn external_id_key(&self) -> &'static str {
        match self {
            SyncServer::CalibreContentServer => keys::CALIBRE_BOOK_UUID,
            SyncServer::StripInfo => keys::STRIP_INFO_BOOK_ID,
        }
    }

    /// Keys linking a local book to the site; cleared when a book is unlinked.
    pub fn link_keys(&self) -> &'static [&'static str] {
        match self {
            SyncServer::CalibreContentServer => &[
                keys::CALIBRE_BOOK_ID,
                keys::CALIBRE_BOOK_UUID,
                keys::CALIBRE_BOOK_MAIN_FORMAT,
            ],
            SyncServer::StripInfo => &[
                keys::STRIP_INFO_BOOK_ID,
                keys::STRIP_INFO_COLL_ID,
                keys::STRIP_INFO_OWNED,
                keys::STRIP_INFO_WANTED,
                keys::STRIP_INFO_AMOUNT,
            ],
        }
    }

    /// Default field registry with default actions.
    pub fn default_processor(
        &self,
        visibility: Arc<dyn FieldVisibility>,
    ) -> Result<SyncReaderProcessor> {
        let builder = SyncReaderProcessorBuilder::new(self.preference_prefix(), visibility);
        self.declare_fields(builder).build()
    }

    /// Default field registry with the user's stored actions applied.
    pub async fn processor_with_preferences(
        &self,
        visibility: Arc<dyn FieldVisibility>,
        store: &dyn SettingsStore,
    ) -> Result<SyncReaderProcessor> {
        let builder =
            SyncReaderProcessorBuilder::with_preferences(self.preference_prefix(), visibility, store)
                .await?;
        self.declare_fields(builder).build()
    }

    /// The site's fields, in display order.
    pub fn declare_fields(&self, builder: SyncReaderProcessorBuilder) -> SyncReaderProcessorBuilder {
        match self {
            SyncServer::CalibreContentServer => builder
                .add(keys::COVER_IS_USED[0], "Front cover")
                .add_related_field(keys::COVER_IS_USED[0], keys::TMP_FILE_SPEC[0])
                .add_with_action(keys::TITLE, "Title", SyncAction::Overwrite)
                .add_list(keys::prefs::AUTHOR, keys::AUTHOR_LIST, "Authors")
                .add_list(keys::prefs::SERIES, keys::SERIES_LIST, "Series")
                .add_with_action(keys::DESCRIPTION, "Description", SyncAction::Overwrite)
                .add_list(keys::prefs::PUBLISHER, keys::PUBLISHER_LIST, "Publishers")
                .add(keys::DATE_PUBLISHED, "Date published")
                .add(keys::CALIBRE_BOOK_ID, "Calibre")
                .add_related_field(keys::CALIBRE_BOOK_ID, keys::CALIBRE_BOOK_UUID)
                .add_with_action(keys::LAST_UPDATED, "Last updated", SyncAction::Overwrite)
                .add(keys::FORMAT, "Format")
                .add(keys::LANGUAGE, "Language")
                .add(keys::RATING, "Rating")
                .add(keys::READ, "Read")
                .add(keys::READ_START, "Read start")
                .add(keys::READ_END, "Read end")
                .add(keys::PERSONAL_NOTES, "Personal notes"),

            SyncServer::StripInfo => builder
                .add(keys::STRIP_INFO_BOOK_ID, "StripInfo")
                .add(keys::COVER_IS_USED[0], "Front cover")
                .add_related_field(keys::COVER_IS_USED[0], keys::TMP_FILE_SPEC[0])
                .add(keys::COVER_IS_USED[1], "Back cover")
                .add_related_field(keys::COVER_IS_USED[1], keys::TMP_FILE_SPEC[1])
                .add_list(keys::prefs::BOOKSHELF, keys::BOOKSHELF_LIST, "Bookshelves")
                .add(keys::DATE_ACQUIRED, "Date acquired")
                .add(keys::LOCATION, "Location")
                .add(keys::PERSONAL_NOTES, "Personal notes")
                .add(keys::RATING, "Rating")
                .add(keys::READ, "Read")
                .add(keys::PRICE_PAID, "Price paid")
                .add_related_field(keys::PRICE_PAID, keys::PRICE_PAID_CURRENCY)
                .add(keys::STRIP_INFO_OWNED, "Owned")
                .add(keys::STRIP_INFO_WANTED, "Wishlist")
                .add(keys::STRIP_INFO_AMOUNT, "Number")
                .add(keys::STRIP_INFO_COLL_ID, "StripInfo collection"),
        }
    }

    fn validate_reader(&self, config: &SyncReaderConfig) -> Result<()> {
        config.validate()?;
        if config.updates == Updates::OnlyNewer && !self.has_last_updated_date_field() {
            return Err(SyncError::UnsupportedOperation(format!(
                "{} has no last-updated date; cannot import only newer books",
                self.label()
            )));
        }
        Ok(())
    }

    /// Build the reader for this server.
    ///
    /// Without a processor in `config`, the default registry is used with the
    /// user's field visibility and stored actions.
    pub async fn create_reader(
        &self,
        config: SyncReaderConfig,
        remote: Arc<dyn RemoteCatalog>,
        services: SyncServices,
    ) -> Result<Box<dyn SyncReader>> {
        self.validate_reader(&config)?;

        let processor = match config.processor.clone() {
            Some(processor) => processor,
            None => {
                let store = services.settings.as_ref();
                let visibility = Arc::new(HiddenFields::load(store).await?);
                self.processor_with_preferences(visibility, store).await?
            }
        };

        Ok(Box::new(CatalogReader::new(
            *self, remote, services, config, processor,
        )))
    }

    /// Build the writer for this server.
    ///
    /// # Errors
    ///
    /// [`SyncError::UnsupportedOperation`] for read-only servers.
    pub fn create_writer(
        &self,
        config: SyncWriterConfig,
        remote: Arc<dyn RemoteCatalogWriter>,
        services: SyncServices,
    ) -> Result<Box<dyn SyncWriter>> {
        if !self.supports_writer() {
            return Err(SyncError::UnsupportedOperation(format!(
                "{} cannot be written to",
                self.label()
            )));
        }
        config.validate()?;
        Ok(Box::new(CatalogWriter::new(*self, remote, services, config)))
    }
}

impl FromStr for SyncServer {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "calibre" => Ok(SyncServer::CalibreContentServer),
            "stripinfo" => Ok(SyncServer::StripInfo),
            _ => Err(SyncError::UnknownServer(s.to_string())),
        }
    }
}

impl fmt::Display for SyncServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::SyncField;
    use crate::visibility::AllFieldsVisible;
    use std::collections::BTreeSet;

    #[test]
    fn test_from_str() {
        for server in SyncServer::ALL {
            assert_eq!(server.as_str().parse::<SyncServer>().unwrap(), server);
        }
        assert_eq!(
            "Calibre".parse::<SyncServer>().unwrap(),
            SyncServer::CalibreContentServer
        );
        assert!(matches!(
            "goodreads".parse::<SyncServer>(),
            Err(SyncError::UnknownServer(_))
        ));
    }

    #[test]
    fn test_capabilities() {
        assert!(SyncServer::CalibreContentServer.has_last_updated_date_field());
        assert!(SyncServer::CalibreContentServer.supports_writer());
        assert!(!SyncServer::StripInfo.has_last_updated_date_field());
        assert!(!SyncServer::StripInfo.supports_writer());
        assert_ne!(
            SyncServer::StripInfo.preference_prefix(),
            SyncServer::CalibreContentServer.preference_prefix()
        );
    }

    #[test]
    fn test_stripinfo_default_fields() {
        let processor = SyncServer::StripInfo
            .default_processor(Arc::new(AllFieldsVisible))
            .unwrap();

        let keys: Vec<&str> = processor.fields().map(SyncField::key).collect();
        assert_eq!(keys[0], keys::STRIP_INFO_BOOK_ID);
        assert!(keys.contains(&keys::TMP_FILE_SPEC[0]));
        assert!(keys.contains(&keys::TMP_FILE_SPEC[1]));
        assert!(keys.contains(&keys::PRICE_PAID_CURRENCY));
        assert_eq!(
            processor.field(keys::BOOKSHELF_LIST).map(SyncField::action),
            Some(SyncAction::Append)
        );
        assert_eq!(
            processor.field(keys::LOCATION).map(SyncField::action),
            Some(SyncAction::CopyIfBlank)
        );
    }

    #[test]
    fn test_calibre_default_fields() {
        let processor = SyncServer::CalibreContentServer
            .default_processor(Arc::new(AllFieldsVisible))
            .unwrap();

        assert_eq!(
            processor.field(keys::TITLE).map(SyncField::action),
            Some(SyncAction::Overwrite)
        );
        assert_eq!(
            processor.field(keys::CALIBRE_BOOK_UUID).map(SyncField::action),
            Some(SyncAction::CopyIfBlank)
        );
        assert!(processor.contains(keys::TMP_FILE_SPEC[0]));
        assert!(!processor.contains(keys::TMP_FILE_SPEC[1]));
        for list in [keys::AUTHOR_LIST, keys::SERIES_LIST, keys::PUBLISHER_LIST] {
            assert!(processor.field(list).unwrap().can_append());
        }
    }

    #[test]
    fn test_stripinfo_rejects_only_newer() {
        let config = SyncReaderConfig {
            updates: Updates::OnlyNewer,
            ..Default::default()
        };
        assert!(matches!(
            SyncServer::StripInfo.validate_reader(&config),
            Err(SyncError::UnsupportedOperation(_))
        ));
        assert!(SyncServer::CalibreContentServer
            .validate_reader(&config)
            .is_ok());

        let empty = SyncReaderConfig {
            record_types: BTreeSet::new(),
            updates: Updates::Overwrite,
            ..Default::default()
        };
        assert!(matches!(
            SyncServer::StripInfo.validate_reader(&empty),
            Err(SyncError::InvalidArgument(_))
        ));
    }
}
