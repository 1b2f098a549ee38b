//! Content-addressed payload blobs.
//!
//! Payloads are immutable: there is no update or delete. A second `put`
//! under a known digest is a no-op and the stored bytes are never compared
//! against the new ones; digests are assumed collision-resistant.

use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::{ContentDigest, InsertOutcome};
use crate::error::{Error, Result};

/// Payload table view over a connection or transaction
pub struct PayloadStore<'a> {
    conn: &'a Connection,
}

impl<'a> PayloadStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Store bytes under `digest`; first writer wins
    pub fn put(&self, digest: &ContentDigest, bytes: &[u8]) -> Result<InsertOutcome> {
        let changed = self.conn.execute(
            "INSERT INTO payloads (hash, data) VALUES (?1, ?2)
             ON CONFLICT (hash) DO NOTHING",
            params![digest.as_str(), bytes],
        )?;

        Ok(if changed == 0 {
            InsertOutcome::AlreadyExisted
        } else {
            InsertOutcome::Inserted
        })
    }

    pub fn get(&self, digest: &ContentDigest) -> Result<Vec<u8>> {
        self.conn
            .query_row(
                "SELECT data FROM payloads WHERE hash = ?1",
                params![digest.as_str()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::PayloadNotFound(digest.to_string()))
    }

    pub fn contains(&self, digest: &ContentDigest) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM payloads WHERE hash = ?1",
                params![digest.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn count(&self) -> Result<u64> {
        super::count_rows(self.conn, "payloads")
    }
}
