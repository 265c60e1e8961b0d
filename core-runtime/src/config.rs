//! # Core Configuration
//!
//! Everything a sync session needs from the host, gathered and checked once.
//!
//! ## Overview
//!
//! [`CoreConfig`] carries the cover directories, the two required bridges
//! ([`FileSystemAccess`] for cover files, [`SettingsStore`] for per-field
//! actions and sync dates), the user locale used to de-duplicate merged
//! lists, and the logging setup.
//!
//! [`CoreConfigBuilder::build`] fails fast: a missing bridge is reported as
//! [`Error::CapabilityMissing`] before any sync starts. With the
//! `desktop-shims` feature the desktop adapters fill in whatever the host
//! left out, including a per-user library directory.
//!
//! ## Usage
//!
//! ```ignore
//! let config = CoreConfig::builder()
//!     .covers_dir(library.join("covers"))
//!     .file_system(Arc::new(TokioFileSystem::new()))
//!     .settings_store(Arc::new(settings))
//!     .user_locale("tr")
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::logging::LoggingConfig;
use bridge_traits::{FileSystemAccess, SettingsStore};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Locale used for list de-duplication when none is configured.
pub const DEFAULT_LOCALE: &str = "en";

/// File name of the default settings database, next to the covers directory.
pub const SETTINGS_DB: &str = "settings.db";

#[derive(Clone)]
pub struct CoreConfig {
    /// Persisted covers, `{uuid}.jpg` / `{uuid}_1.jpg`.
    pub covers_dir: PathBuf,
    /// Where readers drop downloads before they are moved into `covers_dir`.
    pub temp_dir: PathBuf,
    pub file_system: Arc<dyn FileSystemAccess>,
    pub settings_store: Arc<dyn SettingsStore>,
    pub user_locale: String,
    pub logging: LoggingConfig,
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("covers_dir", &self.covers_dir)
            .field("temp_dir", &self.temp_dir)
            .field("user_locale", &self.user_locale)
            .field("logging", &self.logging)
            .finish_non_exhaustive()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// # Errors
    ///
    /// [`Error::Config`] when a directory is empty, both directories are the
    /// same, or the locale is blank.
    pub fn validate(&self) -> Result<()> {
        for (name, dir) in [("covers", &self.covers_dir), ("temp", &self.temp_dir)] {
            if dir.as_os_str().is_empty() {
                return Err(Error::Config(format!("{name} directory cannot be empty")));
            }
        }
        if self.covers_dir == self.temp_dir {
            return Err(Error::Config(format!(
                "covers and temp directory are both {}",
                self.covers_dir.display()
            )));
        }
        if self.user_locale.trim().is_empty() {
            return Err(Error::Config("user locale cannot be blank".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct CoreConfigBuilder {
    covers_dir: Option<PathBuf>,
    temp_dir: Option<PathBuf>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    user_locale: Option<String>,
    logging: Option<LoggingConfig>,
}

impl CoreConfigBuilder {
    pub fn covers_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.covers_dir = Some(path.into());
        self
    }

    /// Defaults to `<covers_dir>/tmp`.
    pub fn temp_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(path.into());
        self
    }

    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Defaults to [`DEFAULT_LOCALE`].
    pub fn user_locale(mut self, locale: impl Into<String>) -> Self {
        self.user_locale = Some(locale.into());
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] for a bridge that was neither set nor
    ///   provided by `desktop-shims`
    /// - [`Error::Config`] for a missing covers directory (without
    ///   `desktop-shims`) or any [`CoreConfig::validate`] failure
    /// - [`Error::Internal`] when the default settings database cannot open
    pub fn build(self) -> Result<CoreConfig> {
        let covers_dir = match self.covers_dir {
            Some(dir) => dir,
            None => shims::covers_dir()?,
        };
        let temp_dir = self.temp_dir.unwrap_or_else(|| covers_dir.join("tmp"));

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => shims::file_system()?,
        };
        let settings_store = match self.settings_store {
            Some(store) => store,
            None => {
                let db_path = covers_dir
                    .parent()
                    .unwrap_or(covers_dir.as_path())
                    .join(SETTINGS_DB);
                shims::settings_store(db_path)?
            }
        };

        let config = CoreConfig {
            covers_dir,
            temp_dir,
            file_system,
            settings_store,
            user_locale: self
                .user_locale
                .unwrap_or_else(|| DEFAULT_LOCALE.to_string()),
            logging: self.logging.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(feature = "desktop-shims")]
mod shims {
    use super::*;
    use bridge_desktop::{default_library_dir, SqliteSettingsStore, TokioFileSystem};

    pub(super) fn covers_dir() -> Result<PathBuf> {
        Ok(default_library_dir().join("covers"))
    }

    pub(super) fn file_system() -> Result<Arc<dyn FileSystemAccess>> {
        Ok(Arc::new(TokioFileSystem::new()))
    }

    /// Opens the database on a private runtime; `build` is synchronous and
    /// may be called from inside another runtime, where `block_on` panics.
    pub(super) fn settings_store(db_path: PathBuf) -> Result<Arc<dyn SettingsStore>> {
        let open = move || -> Result<SqliteSettingsStore> {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| Error::Internal(format!("settings runtime: {e}")))?;
            runtime
                .block_on(SqliteSettingsStore::new(db_path))
                .map_err(|e| Error::Internal(format!("default settings store: {e}")))
        };

        let store = if tokio::runtime::Handle::try_current().is_ok() {
            std::thread::spawn(open)
                .join()
                .map_err(|_| Error::Internal("settings store thread panicked".to_string()))??
        } else {
            open()?
        };
        Ok(Arc::new(store))
    }
}

#[cfg(not(feature = "desktop-shims"))]
mod shims {
    use super::*;

    fn missing(capability: &str, purpose: &str) -> Error {
        Error::CapabilityMissing {
            capability: capability.to_string(),
            message: format!(
                "{capability} is required for {purpose}; inject a host adapter \
                 or enable the 'desktop-shims' feature"
            ),
        }
    }

    pub(super) fn covers_dir() -> Result<PathBuf> {
        Err(Error::Config(
            "covers directory is required, set it with .covers_dir()".to_string(),
        ))
    }

    pub(super) fn file_system() -> Result<Arc<dyn FileSystemAccess>> {
        Err(missing("FileSystemAccess", "cover storage"))
    }

    pub(super) fn settings_store(_db_path: PathBuf) -> Result<Arc<dyn SettingsStore>> {
        Err(missing("SettingsStore", "sync field preferences"))
    }
}
