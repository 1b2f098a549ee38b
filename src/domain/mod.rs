//! Domain types for warcdb.
//!
//! This module contains the core data structures:
//! - Records: archive records as read from a source
//! - Entries: typed rows of the payload, catalog and index tables
//! - Digests: payload dedup keys

pub mod digest;
pub mod entry;
pub mod record;

// Re-export commonly used types
pub use digest::ContentDigest;
pub use entry::{ArchiveRecordEntry, InsertOutcome, OnConflict, ResponseIndexEntry, UrlResponse};
pub use record::{ArchiveRecord, RecordPayload, RecordType};
