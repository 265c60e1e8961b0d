//! Session helpers
//!
//! Hold the server choice and the run configuration while a user sets up a
//! sync, keep the options consistent with what the server supports, and
//! construct the reader or writer at the end.

use crate::config::{RecordType, SyncReaderConfig, SyncWriterConfig, Updates};
use crate::error::{Result, SyncError};
use crate::processor::SyncReaderProcessor;
use crate::reader::SyncReader;
use crate::remote::{RemoteCatalog, RemoteCatalogWriter};
use crate::server::SyncServer;
use crate::services::SyncServices;
use crate::writer::SyncWriter;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SyncReaderHelper {
    server: SyncServer,
    config: SyncReaderConfig,
}

impl SyncReaderHelper {
    /// Defaults to [`Updates::OnlyNewer`] where the server supports it,
    /// [`Updates::Overwrite`] elsewhere.
    pub fn new(server: SyncServer) -> Self {
        let updates = if server.has_last_updated_date_field() {
            Updates::OnlyNewer
        } else {
            Updates::Overwrite
        };
        Self {
            server,
            config: SyncReaderConfig {
                updates,
                ..Default::default()
            },
        }
    }

    pub fn server(&self) -> SyncServer {
        self.server
    }

    pub fn config(&self) -> &SyncReaderConfig {
        &self.config
    }

    pub fn set_record_type(&mut self, record_type: RecordType, enabled: bool) {
        if enabled {
            self.config.record_types.insert(record_type);
        } else {
            self.config.record_types.remove(&record_type);
        }
    }

    pub fn updates(&self) -> Updates {
        self.config.updates
    }

    /// # Errors
    ///
    /// [`SyncError::UnsupportedOperation`] for `OnlyNewer` on a server without
    /// modification dates.
    pub fn set_updates(&mut self, updates: Updates) -> Result<()> {
        if updates == Updates::OnlyNewer && !self.server.has_last_updated_date_field() {
            return Err(SyncError::UnsupportedOperation(format!(
                "{} cannot import only newer books",
                self.server.label()
            )));
        }
        self.config.updates = updates;
        Ok(())
    }

    pub fn set_sync_date(&mut self, sync_date: Option<DateTime<Utc>>) {
        self.config.sync_date = sync_date;
    }

    /// Use a customised field registry instead of the server default.
    pub fn set_processor(&mut self, processor: Option<SyncReaderProcessor>) {
        self.config.processor = processor;
    }

    pub async fn create_reader(
        &self,
        remote: Arc<dyn RemoteCatalog>,
        services: SyncServices,
    ) -> Result<Box<dyn SyncReader>> {
        self.server
            .create_reader(self.config.clone(), remote, services)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct SyncWriterHelper {
    server: SyncServer,
    config: SyncWriterConfig,
}

impl SyncWriterHelper {
    /// # Errors
    ///
    /// [`SyncError::UnsupportedOperation`] for read-only servers.
    pub fn new(server: SyncServer) -> Result<Self> {
        if !server.supports_writer() {
            return Err(SyncError::UnsupportedOperation(format!(
                "{} cannot be written to",
                server.label()
            )));
        }
        Ok(Self {
            server,
            config: SyncWriterConfig::default(),
        })
    }

    pub fn server(&self) -> SyncServer {
        self.server
    }

    pub fn config(&self) -> &SyncWriterConfig {
        &self.config
    }

    pub fn set_record_type(&mut self, record_type: RecordType, enabled: bool) {
        if enabled {
            self.config.record_types.insert(record_type);
        } else {
            self.config.record_types.remove(&record_type);
        }
    }

    pub fn set_incremental(&mut self, incremental: bool) {
        self.config.incremental = incremental;
    }

    pub fn set_delete_local_books(&mut self, delete: bool) {
        self.config.delete_local_books = delete;
    }

    pub fn set_last_sync_date(&mut self, date: Option<DateTime<Utc>>) {
        self.config.last_sync_date = date;
    }

    pub fn create_writer(
        &self,
        remote: Arc<dyn RemoteCatalogWriter>,
        services: SyncServices,
    ) -> Result<Box<dyn SyncWriter>> {
        self.server
            .create_writer(self.config.clone(), remote, services)
    }
}
