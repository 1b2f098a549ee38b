//! Ingestion and query engines.
//!
//! This module contains:
//! - Ingester: drives record sources into the store
//! - QueryEngine: read-only URL and payload lookups
//! - discover: expands input paths into archive files

pub mod discover;
pub mod ingest;
pub mod query;

// Re-export commonly used types
pub use discover::{discover_archives, ArchiveFile};
pub use ingest::{FileReport, IngestOptions, IngestReport, Ingester, RecordOutcome};
pub use query::QueryEngine;
