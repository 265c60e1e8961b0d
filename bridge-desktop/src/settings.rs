//! [`SettingsStore`] backed by one SQLite table.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SettingsStore,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, warn};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS preferences (
    name  TEXT PRIMARY KEY NOT NULL,
    kind  TEXT NOT NULL,
    value TEXT NOT NULL
)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Text,
    Flag,
    Integer,
}

impl Kind {
    fn tag(self) -> &'static str {
        match self {
            Kind::Text => "text",
            Kind::Flag => "flag",
            Kind::Integer => "integer",
        }
    }
}

fn db_error(action: &'static str) -> impl FnOnce(sqlx::Error) -> BridgeError {
    move |err| BridgeError::OperationFailed(format!("settings: {action}: {err}"))
}

/// Preferences in SQLite, one row per key with its value kind.
///
/// Reading a key as a different kind than it was written with fails instead
/// of guessing, so a stale `bool` can never be taken for a sync action.
pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    /// Open (or create) the database at `db_path`.
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| BridgeError::from_io(err, parent))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(db_error("open"))?;

        let store = Self::with_pool(pool).await?;
        debug!(path = %db_path.display(), "Opened settings database");
        Ok(store)
    }

    /// A private in-memory database, mostly for tests.
    pub async fn in_memory() -> Result<Self> {
        // Each connection would otherwise get its own empty database.
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(db_error("open"))?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(db_error("open"))?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(db_error("create schema"))?;
        Ok(Self { pool })
    }

    async fn write(&self, name: &str, kind: Kind, value: String) -> Result<()> {
        sqlx::query(
            "INSERT INTO preferences (name, kind, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET kind = excluded.kind, value = excluded.value",
        )
        .bind(name)
        .bind(kind.tag())
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(db_error("write"))?;
        Ok(())
    }

    async fn read<T>(&self, name: &str, kind: Kind) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT kind, value FROM preferences WHERE name = ?1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("read"))?;

        let Some((stored_kind, value)) = row else {
            return Ok(None);
        };
        if stored_kind != kind.tag() {
            warn!(name, stored = %stored_kind, requested = kind.tag(), "Preference read with wrong kind");
            return Err(BridgeError::OperationFailed(format!(
                "settings: {name} holds {stored_kind}, not {}",
                kind.tag()
            )));
        }

        value.parse().map(Some).map_err(|err: T::Err| {
            BridgeError::OperationFailed(format!("settings: {name}: unreadable value: {err}"))
        })
    }
}

/// `LIKE` pattern matching `prefix` literally.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = prefix.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    pattern.push('%');
    pattern
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.write(key, Kind::Text, value.to_string()).await
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        self.read(key, Kind::Text).await
    }

    async fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.write(key, Kind::Flag, value.to_string()).await
    }

    async fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        self.read(key, Kind::Flag).await
    }

    async fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        self.write(key, Kind::Integer, value.to_string()).await
    }

    async fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        self.read(key, Kind::Integer).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM preferences WHERE name = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(db_error("remove"))?;
        Ok(())
    }

    async fn list_keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM preferences WHERE name LIKE ?1 ESCAPE '\\' ORDER BY name",
        )
        .bind(like_prefix(prefix))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list"))?;

        // SQLite's LIKE ignores ASCII case.
        Ok(names
            .into_iter()
            .filter(|name| name.starts_with(prefix))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_values_round_trip_by_kind() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();

        store
            .set_string("calibre.last_sync_date", "2025-06-01T00:00:00+00:00")
            .await
            .unwrap();
        store.set_bool("fields.visibility.location", false).await.unwrap();
        store.set_i64("calibre.sync.fields.update.title", 3).await.unwrap();

        assert_eq!(
            store.get_string("calibre.last_sync_date").await.unwrap().as_deref(),
            Some("2025-06-01T00:00:00+00:00")
        );
        assert_eq!(store.get_bool("fields.visibility.location").await.unwrap(), Some(false));
        assert_eq!(store.get_i64("calibre.sync.fields.update.title").await.unwrap(), Some(3));
        assert_eq!(store.get_i64("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_wrong_kind_is_an_error() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();
        store.set_bool("calibre.sync.fields.update.notes", true).await.unwrap();

        assert!(store.get_i64("calibre.sync.fields.update.notes").await.is_err());
    }

    #[tokio::test]
    async fn test_overwrite_and_remove() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();

        store.set_i64("stripinfo.sync.fields.update.notes", 1).await.unwrap();
        store.set_i64("stripinfo.sync.fields.update.notes", 2).await.unwrap();
        assert_eq!(
            store.get_i64("stripinfo.sync.fields.update.notes").await.unwrap(),
            Some(2)
        );

        store.remove("stripinfo.sync.fields.update.notes").await.unwrap();
        store.remove("stripinfo.sync.fields.update.notes").await.unwrap();
        assert_eq!(
            store.get_i64("stripinfo.sync.fields.update.notes").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_prefix_is_literal_and_case_sensitive() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();

        store.set_i64("calibre.sync.fields.update.title", 2).await.unwrap();
        store.set_i64("calibre.sync.fields.update.notes", 1).await.unwrap();
        store.set_i64("calibreXsync.fields.update.title", 1).await.unwrap();
        store.set_i64("Calibre.sync.fields.update.rating", 1).await.unwrap();
        store.set_i64("stripinfo.sync.fields.update.title", 3).await.unwrap();

        let keys = store
            .list_keys_with_prefix("calibre.sync.fields.update.")
            .await
            .unwrap();
        assert_eq!(
            keys,
            vec![
                "calibre.sync.fields.update.notes",
                "calibre.sync.fields.update.title"
            ]
        );
    }

    #[tokio::test]
    async fn test_file_database_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("library").join("settings.db");

        {
            let store = SqliteSettingsStore::new(path.clone()).await.unwrap();
            store.set_i64("calibre.sync.fields.update.title", 0).await.unwrap();
        }

        let store = SqliteSettingsStore::new(path).await.unwrap();
        assert_eq!(
            store.get_i64("calibre.sync.fields.update.title").await.unwrap(),
            Some(0)
        );
    }
}
