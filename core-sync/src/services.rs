//! Collaborators shared by readers and writers

use crate::error::Result;
use crate::processor::MergeContext;
use bridge_traits::storage::SettingsStore;
use bridge_traits::time::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use core_library::{BookRepository, ListPruner, LocaleListPruner};
use core_metadata::{CoverStorage, FileCoverStorage};
use core_runtime::CoreConfig;
use std::sync::Arc;
use tracing::warn;

/// Everything a sync run needs besides the remote site.
#[derive(Clone)]
pub struct SyncServices {
    pub repository: Arc<dyn BookRepository>,
    pub covers: Arc<dyn CoverStorage>,
    pub pruner: Arc<dyn ListPruner>,
    pub settings: Arc<dyn SettingsStore>,
    pub clock: Arc<dyn Clock>,
    /// Used for books without a language.
    pub locale: String,
}

impl SyncServices {
    pub fn new(
        repository: Arc<dyn BookRepository>,
        covers: Arc<dyn CoverStorage>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            repository,
            covers,
            pruner: Arc::new(LocaleListPruner::new()),
            settings,
            clock: Arc::new(SystemClock),
            locale: core_runtime::config::DEFAULT_LOCALE.to_string(),
        }
    }

    /// Wire file-backed cover storage, the settings store and the user
    /// locale from the core configuration.
    pub fn from_config(config: &CoreConfig, repository: Arc<dyn BookRepository>) -> Self {
        let covers = Arc::new(FileCoverStorage::from_config(config));
        Self::new(repository, covers, Arc::clone(&config.settings_store))
            .with_locale(config.user_locale.clone())
    }

    pub fn with_pruner(mut self, pruner: Arc<dyn ListPruner>) -> Self {
        self.pruner = pruner;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn merge_context(&self) -> MergeContext<'_> {
        MergeContext::new(self.covers.as_ref(), self.pruner.as_ref(), &self.locale)
    }

    /// The stored date of the last completed run; unreadable values count as
    /// never synced.
    pub async fn last_sync_date(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        let Some(raw) = self.settings.get_string(key).await? else {
            return Ok(None);
        };
        match DateTime::parse_from_rfc3339(&raw) {
            Ok(date) => Ok(Some(date.with_timezone(&Utc))),
            Err(err) => {
                warn!(key, error = %err, "Ignoring unreadable last sync date");
                Ok(None)
            }
        }
    }

    /// Record now as the last sync date and return it.
    pub async fn mark_synced(&self, key: &str) -> Result<DateTime<Utc>> {
        let now = self.clock.now();
        self.settings.set_string(key, &now.to_rfc3339()).await?;
        Ok(now)
    }
}
