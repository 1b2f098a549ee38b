//! Rows persisted by the store.
//!
//! These are the typed forms of the three tables; mapping to and from
//! SQLite rows happens only inside `crate::store`.

use serde::{Deserialize, Serialize};

use super::digest::ContentDigest;
use super::record::{ArchiveRecord, RecordType};

/// Outcome of an insert that tolerates an existing key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertOutcome {
    Inserted,

    /// The key was already present; nothing was written
    AlreadyExisted,
}

impl InsertOutcome {
    pub fn is_inserted(self) -> bool {
        matches!(self, InsertOutcome::Inserted)
    }
}

/// What the record catalog does when a record id is already stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnConflict {
    /// Surface `DuplicateRecord` (strict ingestion)
    Fail,

    /// Leave the existing row untouched (idempotent ingestion)
    #[default]
    Skip,
}

/// One row per archive record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRecordEntry {
    pub record_id: String,
    pub record_type: RecordType,
    pub header_text: String,
    pub protocol_header_text: Option<String>,
    pub payload_digest: Option<ContentDigest>,
}

impl From<&ArchiveRecord> for ArchiveRecordEntry {
    fn from(record: &ArchiveRecord) -> Self {
        Self {
            record_id: record.record_id.clone(),
            record_type: record.record_type.clone(),
            header_text: record.header_text.clone(),
            protocol_header_text: record.protocol_header_text.clone(),
            payload_digest: record.payload_digest().cloned(),
        }
    }
}

/// Capture-log entry mapping a target URL to a response record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseIndexEntry {
    pub url: String,
    pub record_id: String,

    /// `None` when the response block carried no HTTP status line
    pub http_status: Option<u16>,
    pub payload_digest: Option<ContentDigest>,
}

impl ResponseIndexEntry {
    /// Build the index entry for a response record; `None` for any other type
    /// or a response without a target URL
    pub fn from_record(record: &ArchiveRecord) -> Option<Self> {
        if !record.record_type.is_response() {
            return None;
        }

        Some(Self {
            url: record.target_url.clone()?,
            record_id: record.record_id.clone(),
            http_status: record.http_status,
            payload_digest: record.payload_digest().cloned(),
        })
    }
}

/// A response joined with its catalog row and payload bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlResponse {
    pub url: String,
    pub record_id: String,
    pub header_text: String,
    pub protocol_header_text: Option<String>,
    pub http_status: Option<u16>,
    pub record_type: RecordType,
    pub payload_digest: Option<ContentDigest>,

    /// Empty when the response carried no payload
    #[serde(skip)]
    pub payload_bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_entry_only_for_responses() {
        let response = ArchiveRecord::response("<urn:uuid:1>", "http://a/", 200, "x");
        let request =
            ArchiveRecord::new(RecordType::Request, "<urn:uuid:2>").with_target_url("http://a/");

        let entry = ResponseIndexEntry::from_record(&response).unwrap();
        assert_eq!(entry.url, "http://a/");
        assert_eq!(entry.http_status, Some(200));
        assert_eq!(entry.payload_digest, response.payload_digest().cloned());

        assert!(ResponseIndexEntry::from_record(&request).is_none());
    }

    #[test]
    fn test_catalog_entry_from_record() {
        let record = ArchiveRecord::new(RecordType::Warcinfo, "<urn:uuid:3>");
        let entry = ArchiveRecordEntry::from(&record);

        assert_eq!(entry.record_id, "<urn:uuid:3>");
        assert_eq!(entry.record_type, RecordType::Warcinfo);
        assert!(entry.payload_digest.is_none());
        assert!(entry.protocol_header_text.is_none());
    }

    #[test]
    fn test_on_conflict_defaults_to_skip() {
        assert_eq!(OnConflict::default(), OnConflict::Skip);
    }
}
