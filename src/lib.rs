//! warcdb - WARC archives in a queryable SQLite store
//!
//! Imports WARC files into a single SQLite database and answers URL
//! queries against it.
//!
//! # Architecture
//!
//! The store is built around three tables:
//! - Payloads are stored once per content digest
//! - Every archive record gets one catalog row, keyed by record id
//! - Response records are appended to a URL index pointing at both
//!
//! # Modules
//!
//! - `source`: WARC readers producing archive records
//! - `store`: SQLite schema and the payload, catalog and index tables
//! - `engine`: Ingestion and queries
//! - `domain`: Data structures (ArchiveRecord, entries, digests)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Import a crawl (files or directories)
//! warcdb import --db archive.sqlite3 crawl/
//!
//! # List captured URLs
//! warcdb query --db archive.sqlite3 --get-urls-like 'example.com*'
//!
//! # Dump a payload
//! warcdb query --db archive.sqlite3 --get-url-payload http://example.com/
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod source;
pub mod store;

// Re-export main types at crate root for convenience
pub use domain::{ArchiveRecord, ContentDigest, InsertOutcome, OnConflict, RecordType, UrlResponse};
pub use engine::{IngestOptions, IngestReport, Ingester, QueryEngine};
pub use error::{Error, Result};
pub use source::{RecordSource, WarcFileSource};
pub use store::{OpenMode, Store, StoreSettings};
