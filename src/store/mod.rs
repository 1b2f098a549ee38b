//! SQLite backing store.
//!
//! A [`Store`] owns one connection. Components borrow it explicitly:
//!
//! - [`PayloadStore`]: content-addressed payload blobs
//! - [`RecordCatalog`]: one row per archive record
//! - [`ResponseIndex`]: URL → response capture log
//!
//! All three accept any `&Connection`, so the ingester can hand them an
//! open transaction and commit a record's writes as one unit.

pub mod catalog;
pub mod index;
pub mod payloads;

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OpenFlags, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

pub use catalog::RecordCatalog;
pub use index::{ResponseIndex, UrlPattern};
pub use payloads::PayloadStore;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS payloads (
        hash TEXT PRIMARY KEY NOT NULL,
        data BLOB NOT NULL
    ) STRICT;

    CREATE TABLE IF NOT EXISTS warc_records (
        warc_record_id TEXT NOT NULL PRIMARY KEY,
        warc_type TEXT NOT NULL,
        warc_headers TEXT NOT NULL,
        http_headers TEXT,
        payload_hash TEXT REFERENCES payloads(hash)
    ) STRICT;

    CREATE TABLE IF NOT EXISTS responses_index (
        url TEXT NOT NULL,
        response_id TEXT NOT NULL REFERENCES warc_records(warc_record_id),
        http_status INTEGER,
        payload_hash TEXT REFERENCES payloads(hash)
    ) STRICT;

    CREATE INDEX IF NOT EXISTS responses_index_by_url ON responses_index(url);
";

/// Whether the store is opened for ingestion or for queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Create if missing, apply the schema, enable WAL
    ReadWrite,

    /// Never creates or alters anything
    ReadOnly,
}

/// `PRAGMA synchronous` level for writers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynchronousMode {
    Off,
    #[default]
    Normal,
    Full,
}

impl SynchronousMode {
    pub const fn pragma_value(self) -> i64 {
        match self {
            SynchronousMode::Off => 0,
            SynchronousMode::Normal => 1,
            SynchronousMode::Full => 2,
        }
    }
}

/// Connection tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    /// How long to wait for a lock before reporting busy
    pub busy_timeout: Duration,
    pub synchronous: SynchronousMode,
    pub page_size: u32,
    pub cache_size_kib: u32,
    pub mmap_size_bytes: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(10),
            synchronous: SynchronousMode::Normal,
            page_size: 32_768,
            cache_size_kib: 30_000,
            mmap_size_bytes: 30_000_000_000,
        }
    }
}

/// Row counts per table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
    pub payloads: u64,
    pub records: u64,
    pub responses: u64,
}

/// Handle to one SQLite database
pub struct Store {
    conn: Connection,
    path: PathBuf,
    mode: OpenMode,
}

impl Store {
    /// Open (and for writers, initialize) the store at `path`
    pub fn open(path: impl AsRef<Path>, mode: OpenMode, settings: &StoreSettings) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let flags = match mode {
            OpenMode::ReadWrite => {
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX
            }
            OpenMode::ReadOnly => {
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX
            }
        };

        let conn = Connection::open_with_flags(&path, flags).map_err(|source| {
            Error::StoreUnavailable {
                path: path.clone(),
                source,
            }
        })?;

        let store = Self { conn, path, mode };
        store
            .configure(settings)
            .map_err(|err| store.unavailable(err))?;
        debug!(path = %store.path.display(), ?mode, "Opened store");
        Ok(store)
    }

    /// Private in-memory store with the full schema
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn,
            path: PathBuf::from(":memory:"),
            mode: OpenMode::ReadWrite,
        };
        store.configure(&StoreSettings::default())?;
        Ok(store)
    }

    fn unavailable(&self, err: Error) -> Error {
        match err {
            Error::Sqlite(source) => Error::StoreUnavailable {
                path: self.path.clone(),
                source,
            },
            other => other,
        }
    }

    fn configure(&self, settings: &StoreSettings) -> Result<()> {
        let conn = &self.conn;
        conn.busy_timeout(settings.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        // page_size only takes effect before the first table is created
        conn.pragma_update(None, "page_size", settings.page_size)?;
        conn.pragma_update(None, "temp_store", 2)?;
        pragma_set(conn, "mmap_size", settings.mmap_size_bytes)?;
        conn.pragma_update(None, "cache_size", -i64::from(settings.cache_size_kib))?;

        if self.mode == OpenMode::ReadWrite {
            conn.pragma_update(None, "auto_vacuum", 2)?;
            pragma_set(conn, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", settings.synchronous.pragma_value())?;
            conn.execute_batch(SCHEMA)?;
        }

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Borrow the connection for read-only components
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Begin a write transaction, taking the write lock up front
    pub fn transaction(&mut self) -> Result<Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }

    pub fn payloads(&self) -> PayloadStore<'_> {
        PayloadStore::new(&self.conn)
    }

    pub fn catalog(&self) -> RecordCatalog<'_> {
        RecordCatalog::new(&self.conn)
    }

    pub fn index(&self) -> ResponseIndex<'_> {
        ResponseIndex::new(&self.conn)
    }

    pub fn counts(&self) -> Result<StoreCounts> {
        Ok(StoreCounts {
            payloads: self.payloads().count()?,
            records: self.catalog().count()?,
            responses: self.index().count()?,
        })
    }

    /// Rebuild the database file to reclaim space
    pub fn vacuum(&self) -> Result<()> {
        self.conn.execute_batch("VACUUM;")?;
        Ok(())
    }
}

/// Set a pragma that may echo its new value back as a row
fn pragma_set(conn: &Connection, name: &str, value: impl std::fmt::Display) -> Result<()> {
    let mut stmt = conn.prepare(&format!("PRAGMA {} = {}", name, value))?;
    let mut rows = stmt.query([])?;
    while rows.next()?.is_some() {}
    Ok(())
}

pub(crate) fn count_rows(conn: &Connection, table: &str) -> Result<u64> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })?;
    Ok(count.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_store_has_schema() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.counts().unwrap(), StoreCounts::default());
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("archive.sqlite3");
        let settings = StoreSettings::default();

        drop(Store::open(&path, OpenMode::ReadWrite, &settings).unwrap());
        let store = Store::open(&path, OpenMode::ReadWrite, &settings).unwrap();

        assert_eq!(store.counts().unwrap(), StoreCounts::default());
    }

    #[test]
    fn test_read_only_missing_file_is_unavailable() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.sqlite3");

        let err = Store::open(&path, OpenMode::ReadOnly, &StoreSettings::default())
            .err()
            .unwrap();

        assert!(matches!(err, Error::StoreUnavailable { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_read_only_sees_writer_schema() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("archive.sqlite3");
        let settings = StoreSettings::default();

        let _writer = Store::open(&path, OpenMode::ReadWrite, &settings).unwrap();
        let reader = Store::open(&path, OpenMode::ReadOnly, &settings).unwrap();

        assert_eq!(reader.mode(), OpenMode::ReadOnly);
        assert_eq!(reader.counts().unwrap(), StoreCounts::default());
    }
}
