//! WARC file reader.
//!
//! Reads `.warc` and multi-member `.warc.gz` files with the `warc` crate and
//! maps each record onto an [`ArchiveRecord`]:
//!
//! - `header_text` is the header section exactly as written in the file
//! - `application/http` blocks are split into HTTP head and payload, with
//!   chunked transfer coding removed
//! - other blocks are payload as a whole
//! - the payload digest is `WARC-Payload-Digest` when present, else sha256
//! - `revisit` records never carry a payload; their block has no body
//! - an empty payload is no payload

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use flate2::read::MultiGzDecoder;
use ::warc::{WarcHeader, WarcReader};

use super::http::split_message;
use super::tracking::{lock_section, CountingReader, HeaderCapture, HeaderSection};
use super::RecordSource;
use crate::domain::{ArchiveRecord, ContentDigest, RecordPayload, RecordType};
use crate::error::{Error, Result};

type RecordIter = Box<dyn Iterator<Item = Result<ArchiveRecord>>>;

/// Headers the record mapping looks at
fn mapped_headers() -> [(WarcHeader, &'static str); 5] {
    [
        (WarcHeader::WarcType, "WARC-Type"),
        (WarcHeader::RecordID, "WARC-Record-ID"),
        (WarcHeader::TargetURI, "WARC-Target-URI"),
        (WarcHeader::PayloadDigest, "WARC-Payload-Digest"),
        (WarcHeader::ContentType, "Content-Type"),
    ]
}

/// Records of one WARC file, in file order
pub struct WarcFileSource {
    path: PathBuf,
    records: RecordIter,
    consumed: Arc<AtomicU64>,
    failed: bool,
}

impl WarcFileSource {
    /// Open a `.warc` or `.warc.gz` file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;

        let counting = CountingReader::new(file);
        let consumed = counting.counter();

        let records = if is_gzip(&path) {
            let decoder = BufReader::new(MultiGzDecoder::new(counting));
            read_records(path.clone(), HeaderCapture::new(decoder))
        } else {
            read_records(path.clone(), HeaderCapture::new(counting))
        };

        Ok(Self {
            path,
            records,
            consumed,
            failed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Iterator for WarcFileSource {
    type Item = Result<ArchiveRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        // The reader cannot resynchronize after a format error
        if self.failed {
            return None;
        }
        let item = self.records.next()?;
        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }
}

impl RecordSource for WarcFileSource {
    fn bytes_read(&self) -> u64 {
        self.consumed.load(Ordering::Relaxed)
    }
}

pub fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

fn read_records<R: BufRead + 'static>(path: PathBuf, reader: HeaderCapture<R>) -> RecordIter {
    let section: Arc<Mutex<HeaderSection>> = reader.section();

    Box::new(WarcReader::new(reader).iter_records().map(move |item| {
        let raw_header = lock_section(&section).take();
        let record = item.map_err(|e| Error::MalformedRecord {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let headers: Vec<(&'static str, String)> = mapped_headers()
            .into_iter()
            .filter_map(|(header, name)| record.header(header).map(|v| (name, v.into_owned())))
            .collect();

        build_record(&path, &headers, header_text(&raw_header), record.body())
    }))
}

/// Header section as written in the file, without its terminating blank line
fn header_text(raw: &[u8]) -> String {
    let text = raw.strip_suffix(b"\r\n").unwrap_or(raw);
    String::from_utf8_lossy(text).into_owned()
}

fn header<'h>(headers: &'h [(&'static str, String)], name: &str) -> Option<&'h str> {
    headers
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}

/// Map WARC headers and content block onto an archive record
pub(crate) fn build_record(
    path: &Path,
    headers: &[(&'static str, String)],
    header_text: String,
    block: &[u8],
) -> Result<ArchiveRecord> {
    let malformed = |reason: &str| Error::MalformedRecord {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let record_id = header(headers, "WARC-Record-ID").ok_or_else(|| malformed("missing WARC-Record-ID"))?;
    let record_type = header(headers, "WARC-Type")
        .map(RecordType::from)
        .ok_or_else(|| malformed("missing WARC-Type"))?;

    let mut record = ArchiveRecord::new(record_type, record_id).with_header_text(header_text);

    if let Some(uri) = header(headers, "WARC-Target-URI") {
        // WARC 1.0 writers sometimes wrap the URI in angle brackets
        let uri = uri.trim_start_matches('<').trim_end_matches('>');
        record = record.with_target_url(uri);
    }

    let is_http = header(headers, "Content-Type")
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("application/http"));

    let payload_bytes = if is_http {
        let message = split_message(block);
        record.protocol_header_text = Some(message.head);
        record.http_status = message.status;
        message.body.into_owned()
    } else {
        block.to_vec()
    };

    if !payload_bytes.is_empty() && record.record_type != RecordType::Revisit {
        let digest = header(headers, "WARC-Payload-Digest")
            .map(ContentDigest::new)
            .unwrap_or_else(|| ContentDigest::compute(&payload_bytes));
        record.payload = Some(RecordPayload {
            digest,
            bytes: payload_bytes,
        });
    }

    Ok(record)
}
