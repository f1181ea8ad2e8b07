// SQLite-backed blob store

use crate::blob::{BlobStore, validate_key};
use chrono::Utc;
use eyre::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use tracing::debug;

/// Blobs kept in a single `blobs` table of a SQLite database
pub struct SqliteBlobStore {
    db: Connection,
}

impl SqliteBlobStore {
    /// Open or create the database file at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let db = Connection::open(path).context("Failed to open SQLite database")?;
        let store = Self { db };
        store.create_schema()?;
        Ok(store)
    }

    /// Database that lives only as long as this value
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let store = Self { db };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating blob schema");

        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS blobs (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    /// Milliseconds since epoch of the last write to `key`
    pub fn updated_at(&self, key: &str) -> Result<Option<i64>> {
        let ts = self
            .db
            .query_row("SELECT updated_at FROM blobs WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(ts)
    }
}

impl BlobStore for SqliteBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;

        let value = self
            .db
            .query_row("SELECT value FROM blobs WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .context("Failed to read blob from database")?;

        Ok(value)
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;

        self.db
            .execute(
                "INSERT OR REPLACE INTO blobs (key, value, updated_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![key, value, Utc::now().timestamp_millis()],
            )
            .context("Failed to write blob to database")?;

        debug!(key, bytes = value.len(), "Wrote blob row");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.db.execute("DELETE FROM blobs WHERE key = ?1", [key])?;
        Ok(())
    }
}
