//! Record catalog: one row per archive record, keyed by record id.
//!
//! The catalog is the unit of idempotency. Callers must write the payload
//! a record references before inserting the record itself; the foreign key
//! on `payload_hash` rejects the insert otherwise.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::{ArchiveRecordEntry, ContentDigest, InsertOutcome, OnConflict, RecordType};
use crate::error::{Error, Result};

/// Catalog table view over a connection or transaction
pub struct RecordCatalog<'a> {
    conn: &'a Connection,
}

impl<'a> RecordCatalog<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a catalog row, resolving an existing `record_id` per `on_conflict`
    pub fn insert(&self, entry: &ArchiveRecordEntry, on_conflict: OnConflict) -> Result<InsertOutcome> {
        let changed = self.conn.execute(
            "INSERT INTO warc_records
                (warc_record_id, warc_type, warc_headers, http_headers, payload_hash)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (warc_record_id) DO NOTHING",
            params![
                entry.record_id,
                entry.record_type.as_str(),
                entry.header_text,
                entry.protocol_header_text,
                entry.payload_digest.as_ref().map(ContentDigest::as_str),
            ],
        )?;

        if changed > 0 {
            return Ok(InsertOutcome::Inserted);
        }

        match on_conflict {
            OnConflict::Skip => Ok(InsertOutcome::AlreadyExisted),
            OnConflict::Fail => Err(Error::DuplicateRecord {
                record_id: entry.record_id.clone(),
            }),
        }
    }

    pub fn contains(&self, record_id: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM warc_records WHERE warc_record_id = ?1",
                params![record_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn get(&self, record_id: &str) -> Result<Option<ArchiveRecordEntry>> {
        Ok(self
            .conn
            .query_row(
                "SELECT warc_record_id, warc_type, warc_headers, http_headers, payload_hash
                 FROM warc_records
                 WHERE warc_record_id = ?1",
                params![record_id],
                map_entry,
            )
            .optional()?)
    }

    pub fn count(&self) -> Result<u64> {
        super::count_rows(self.conn, "warc_records")
    }
}

fn map_entry(row: &Row<'_>) -> rusqlite::Result<ArchiveRecordEntry> {
    let record_type: String = row.get(1)?;
    let payload_hash: Option<String> = row.get(4)?;

    Ok(ArchiveRecordEntry {
        record_id: row.get(0)?,
        record_type: RecordType::from(record_type),
        header_text: row.get(2)?,
        protocol_header_text: row.get(3)?,
        payload_digest: payload_hash.map(ContentDigest::new),
    })
}
