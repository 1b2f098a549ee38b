//! Ingestion engine: archive records → payloads, catalog, index.
//!
//! Per record, strictly in order:
//! 1. with `skip_existing`, a record id already in the catalog is dropped
//!    without touching payloads or index
//! 2. the payload (if any) is put by digest
//! 3. the catalog row is inserted under the conflict policy
//! 4. responses newly accepted by the catalog are appended to the index
//!
//! Steps 2 to 4 share one transaction. Files are ingested in the order given,
//! each committing record by record; a failure in one file leaves earlier
//! files and earlier records intact.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::discover::{discover_archives, total_size};
use crate::domain::{ArchiveRecord, ArchiveRecordEntry, InsertOutcome, OnConflict, ResponseIndexEntry};
use crate::error::Result;
use crate::source::{RecordSource, WarcFileSource};
use crate::store::{PayloadStore, RecordCatalog, ResponseIndex, Store};

/// Ingestion policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestOptions {
    /// Idempotent mode: skip known record ids. When false, a known record
    /// id aborts the run with `DuplicateRecord`.
    pub skip_existing: bool,

    /// VACUUM after a batch import
    pub vacuum: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            skip_existing: true,
            vacuum: true,
        }
    }
}

impl IngestOptions {
    pub fn on_conflict(&self) -> OnConflict {
        if self.skip_existing {
            OnConflict::Skip
        } else {
            OnConflict::Fail
        }
    }
}

/// What happened to one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Record id was already cataloged; nothing was written
    Skipped,

    Inserted {
        payload: Option<InsertOutcome>,
        indexed: bool,
    },
}

/// Counters for one input file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub records_seen: u64,
    pub records_inserted: u64,
    pub records_skipped: u64,
    pub payloads_inserted: u64,
    pub payloads_deduplicated: u64,
    pub responses_indexed: u64,
    pub bytes_read: u64,
}

impl FileReport {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            ..Self::default()
        }
    }

    fn record(&mut self, outcome: RecordOutcome) {
        self.records_seen += 1;
        match outcome {
            RecordOutcome::Skipped => self.records_skipped += 1,
            RecordOutcome::Inserted { payload, indexed } => {
                self.records_inserted += 1;
                match payload {
                    Some(InsertOutcome::Inserted) => self.payloads_inserted += 1,
                    Some(InsertOutcome::AlreadyExisted) => self.payloads_deduplicated += 1,
                    None => {}
                }
                if indexed {
                    self.responses_indexed += 1;
                }
            }
        }
    }
}

/// Summary of a batch import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub files: Vec<FileReport>,

    /// Size on disk of all discovered files
    pub total_bytes: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl IngestReport {
    pub fn records_inserted(&self) -> u64 {
        self.files.iter().map(|f| f.records_inserted).sum()
    }

    pub fn records_skipped(&self) -> u64 {
        self.files.iter().map(|f| f.records_skipped).sum()
    }

    pub fn bytes_read(&self) -> u64 {
        self.files.iter().map(|f| f.bytes_read).sum()
    }
}

/// Single-writer ingestion over an explicit store handle
pub struct Ingester<'s> {
    store: &'s mut Store,
    options: IngestOptions,
}

impl<'s> Ingester<'s> {
    pub fn new(store: &'s mut Store, options: IngestOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Ingest every archive found under `inputs`, sequentially
    pub fn ingest_paths(&mut self, inputs: &[PathBuf]) -> Result<IngestReport> {
        let started_at = Utc::now();
        let archives = discover_archives(inputs)?;
        let total_bytes = total_size(&archives);
        info!(files = archives.len(), total_bytes, "Discovered archives");

        let mut files = Vec::with_capacity(archives.len());
        let mut consumed = 0u64;

        for archive in &archives {
            let report = self.ingest_file(&archive.path)?;
            consumed += report.bytes_read;
            info!(
                path = %archive.path.display(),
                records = report.records_seen,
                inserted = report.records_inserted,
                "Progress: {}/{} bytes",
                consumed,
                total_bytes
            );
            files.push(report);
        }

        if self.options.vacuum && !archives.is_empty() {
            info!("Vacuuming store");
            self.store.vacuum()?;
        }

        Ok(IngestReport {
            files,
            total_bytes,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Ingest one WARC file
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn ingest_file(&mut self, path: &Path) -> Result<FileReport> {
        let source = WarcFileSource::open(path).map_err(|e| e.in_file(path))?;
        self.ingest_source(path, source)
    }

    /// Drain a record source into the store; `path` labels errors and the report
    pub fn ingest_source<S: RecordSource>(&mut self, path: &Path, mut source: S) -> Result<FileReport> {
        let mut report = FileReport::new(path);

        while let Some(item) = source.next() {
            let record = item.map_err(|e| {
                warn!(path = %path.display(), error = %e, "Stopping at malformed record");
                e.in_file(path)
            })?;

            let outcome = self.ingest_record(&record).map_err(|e| {
                warn!(record_id = %record.record_id, error = %e, "Record rejected");
                e.in_file(path)
            })?;
            report.record(outcome);
        }

        report.bytes_read = source.bytes_read();
        debug!(?report, "File ingested");
        Ok(report)
    }

    /// Apply the insert/skip/dedup policy to a single record
    pub fn ingest_record(&mut self, record: &ArchiveRecord) -> Result<RecordOutcome> {
        if self.options.skip_existing && self.store.catalog().contains(&record.record_id)? {
            debug!(record_id = %record.record_id, "Already cataloged, skipping");
            return Ok(RecordOutcome::Skipped);
        }

        let on_conflict = self.options.on_conflict();
        let tx = self.store.transaction()?;

        let payload = match &record.payload {
            Some(p) => Some(PayloadStore::new(&tx).put(&p.digest, &p.bytes)?),
            None => None,
        };

        let entry = ArchiveRecordEntry::from(record);
        let cataloged = RecordCatalog::new(&tx).insert(&entry, on_conflict)?;
        if cataloged == InsertOutcome::AlreadyExisted {
            // Dropping the transaction rolls back the payload write too
            return Ok(RecordOutcome::Skipped);
        }

        let mut indexed = false;
        if let Some(index_entry) = ResponseIndexEntry::from_record(record) {
            ResponseIndex::new(&tx).insert(&index_entry)?;
            indexed = true;
        } else if record.record_type.is_response() {
            warn!(record_id = %record.record_id, "Response without target URL, not indexed");
        }

        tx.commit()?;
        Ok(RecordOutcome::Inserted { payload, indexed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RecordType;
    use crate::error::Error;

    fn source(records: Vec<ArchiveRecord>) -> std::vec::IntoIter<Result<ArchiveRecord>> {
        records.into_iter().map(Ok).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_response_is_fully_stored() {
        let mut store = Store::open_in_memory().unwrap();
        let record = ArchiveRecord::response("<urn:uuid:1>", "http://example.com/", 200, "hello");

        let outcome = Ingester::new(&mut store, IngestOptions::default())
            .ingest_record(&record)
            .unwrap();

        assert_eq!(
            outcome,
            RecordOutcome::Inserted {
                payload: Some(InsertOutcome::Inserted),
                indexed: true
            }
        );
        let counts = store.counts().unwrap();
        assert_eq!((counts.payloads, counts.records, counts.responses), (1, 1, 1));
    }

    #[test]
    fn test_non_response_is_not_indexed() {
        let mut store = Store::open_in_memory().unwrap();
        let request = ArchiveRecord::new(RecordType::Request, "<urn:uuid:2>")
            .with_target_url("http://example.com/")
            .with_payload("GET body");

        Ingester::new(&mut store, IngestOptions::default())
            .ingest_record(&request)
            .unwrap();

        let counts = store.counts().unwrap();
        assert_eq!((counts.payloads, counts.records, counts.responses), (1, 1, 0));
    }

    #[test]
    fn test_skip_existing_skips_before_writing() {
        let mut store = Store::open_in_memory().unwrap();
        let record = ArchiveRecord::response("<urn:uuid:1>", "http://example.com/", 200, "hello");
        let mut ingester = Ingester::new(&mut store, IngestOptions::default());

        ingester.ingest_record(&record).unwrap();
        let second = ingester.ingest_record(&record).unwrap();

        assert_eq!(second, RecordOutcome::Skipped);
    }

    #[test]
    fn test_strict_duplicate_rolls_back_record() {
        let mut store = Store::open_in_memory().unwrap();
        let options = IngestOptions {
            skip_existing: false,
            vacuum: false,
        };
        let first = ArchiveRecord::response("<urn:uuid:1>", "http://example.com/", 200, "hello");
        let reused_id = ArchiveRecord::response("<urn:uuid:1>", "http://example.com/", 200, "other");

        let mut ingester = Ingester::new(&mut store, options);
        ingester.ingest_record(&first).unwrap();
        let err = ingester.ingest_record(&reused_id).unwrap_err();

        assert!(err.is_duplicate());
        // The payload of the rejected record was rolled back with it
        let counts = store.counts().unwrap();
        assert_eq!((counts.payloads, counts.records, counts.responses), (1, 1, 1));
    }

    #[test]
    fn test_source_error_keeps_committed_records() {
        let mut store = Store::open_in_memory().unwrap();
        let items = vec![
            Ok(ArchiveRecord::response("<urn:uuid:1>", "http://a/", 200, "a")),
            Err(Error::MalformedRecord {
                path: PathBuf::from("broken.warc"),
                reason: "bad header".to_string(),
            }),
            Ok(ArchiveRecord::response("<urn:uuid:2>", "http://b/", 200, "b")),
        ];

        let err = Ingester::new(&mut store, IngestOptions::default())
            .ingest_source(Path::new("broken.warc"), items.into_iter())
            .unwrap_err();

        assert!(err.is_malformed());
        assert_eq!(store.counts().unwrap().records, 1);
    }

    #[test]
    fn test_file_report_counts_dedup() {
        let mut store = Store::open_in_memory().unwrap();
        let records = vec![
            ArchiveRecord::response("<urn:uuid:1>", "http://a/", 200, "same"),
            ArchiveRecord::response("<urn:uuid:2>", "http://b/", 200, "same"),
            ArchiveRecord::new(RecordType::Warcinfo, "<urn:uuid:3>"),
        ];

        let report = Ingester::new(&mut store, IngestOptions::default())
            .ingest_source(Path::new("mem.warc"), source(records))
            .unwrap();

        assert_eq!(report.records_seen, 3);
        assert_eq!(report.records_inserted, 3);
        assert_eq!(report.payloads_inserted, 1);
        assert_eq!(report.payloads_deduplicated, 1);
        assert_eq!(report.responses_indexed, 2);
    }
}
