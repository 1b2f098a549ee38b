//! Idempotency Integration Tests
//!
//! Re-ingesting records with `skip_existing` must leave the store exactly
//! as the first ingestion left it.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use warcdb::domain::{ArchiveRecord, RecordType};
use warcdb::engine::{IngestOptions, Ingester};
use warcdb::store::{OpenMode, Store, StoreSettings};
use warcdb::Result;

/// On-disk store in a temporary directory
struct IdempotencyTestStore {
    _temp: TempDir,
    path: PathBuf,
}

impl IdempotencyTestStore {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("archive.sqlite3");
        Self { _temp: temp, path }
    }

    fn open(&self) -> Store {
        Store::open(&self.path, OpenMode::ReadWrite, &StoreSettings::default()).unwrap()
    }

    fn ingest(&self, records: Vec<ArchiveRecord>) {
        let mut store = self.open();
        let items: Vec<Result<ArchiveRecord>> = records.into_iter().map(Ok).collect();
        Ingester::new(&mut store, IngestOptions::default())
            .ingest_source(Path::new("batch.warc"), items.into_iter())
            .unwrap();
    }

    /// Every row of every table, in a stable order
    fn snapshot(&self) -> Vec<String> {
        let store = self.open();
        let conn = store.connection();
        let mut rows = Vec::new();

        for sql in [
            "SELECT 'payload', hash, hex(data) FROM payloads",
            "SELECT 'record', warc_record_id, warc_type || '|' || warc_headers || '|' || ifnull(http_headers, '') || '|' || ifnull(payload_hash, '') FROM warc_records",
            "SELECT 'response', url, response_id || '|' || ifnull(http_status, '') || '|' || ifnull(payload_hash, '') FROM responses_index",
        ] {
            let mut stmt = conn.prepare(sql).unwrap();
            let table: Vec<String> = stmt
                .query_map([], |row| {
                    let kind: String = row.get(0)?;
                    let key: String = row.get(1)?;
                    let rest: String = row.get(2)?;
                    Ok(format!("{}:{}:{}", kind, key, rest))
                })
                .unwrap()
                .collect::<rusqlite::Result<_>>()
                .unwrap();
            rows.extend(table);
        }

        rows.sort();
        rows
    }
}

fn crawl() -> Vec<ArchiveRecord> {
    vec![
        ArchiveRecord::new(RecordType::Warcinfo, "<urn:uuid:info>").with_payload("software: test"),
        ArchiveRecord::new(RecordType::Request, "<urn:uuid:req-1>")
            .with_target_url("http://example.com/")
            .with_protocol_headers("GET / HTTP/1.1\r\nHost: example.com"),
        ArchiveRecord::response("<urn:uuid:resp-1>", "http://example.com/", 200, "hello"),
        ArchiveRecord::response("<urn:uuid:resp-2>", "http://example.com/missing", 404, "not here"),
        ArchiveRecord::response("<urn:uuid:resp-3>", "http://mirror.example.com/", 200, "hello"),
    ]
}

#[test]
fn test_second_ingestion_leaves_state_unchanged() {
    let store = IdempotencyTestStore::new();

    store.ingest(crawl());
    let after_first = store.snapshot();
    assert!(!after_first.is_empty());

    store.ingest(crawl());
    let after_second = store.snapshot();

    assert_eq!(after_first, after_second);
}

#[test]
fn test_duplicate_record_has_one_catalog_row() {
    let store = IdempotencyTestStore::new();
    let record = ArchiveRecord::response("<urn:uuid:1>", "http://example.com/", 200, "hello");

    store.ingest(vec![record.clone()]);
    store.ingest(vec![record]);

    let store = store.open();
    let counts = store.counts().unwrap();
    assert_eq!(counts.records, 1);
    assert_eq!(counts.responses, 1);
    assert!(store.catalog().contains("<urn:uuid:1>").unwrap());
}

#[test]
fn test_overlapping_batches_only_add_new_records() {
    let store = IdempotencyTestStore::new();
    let records = crawl();

    store.ingest(records[..3].to_vec());
    store.ingest(records[1..].to_vec());

    let full = IdempotencyTestStore::new();
    full.ingest(records);

    assert_eq!(store.snapshot(), full.snapshot());
}

#[test]
fn test_skipped_records_are_reported() {
    let store = IdempotencyTestStore::new();
    store.ingest(crawl());

    let mut handle = store.open();
    let items: Vec<Result<ArchiveRecord>> = crawl().into_iter().map(Ok).collect();
    let report = Ingester::new(&mut handle, IngestOptions::default())
        .ingest_source(Path::new("batch.warc"), items.into_iter())
        .unwrap();

    assert_eq!(report.records_seen, 5);
    assert_eq!(report.records_skipped, 5);
    assert_eq!(report.records_inserted, 0);
    assert_eq!(report.payloads_inserted + report.payloads_deduplicated, 0);
}
