//! Read-only queries over the response index, catalog and payloads.
//!
//! A lookup that matches nothing is an empty `Vec`, never an error.

use rusqlite::params;

use crate::domain::{ContentDigest, RecordType, UrlResponse};
use crate::error::Result;
use crate::store::{Store, UrlPattern};

pub struct QueryEngine<'s> {
    store: &'s Store,
}

impl<'s> QueryEngine<'s> {
    pub fn new(store: &'s Store) -> Self {
        Self { store }
    }

    /// URLs matching a `*` pattern; unordered, duplicates included
    pub fn list_urls(&self, pattern: &str) -> Result<Vec<String>> {
        self.store
            .index()
            .find_by_url_pattern(&UrlPattern::parse(pattern))
    }

    /// Captures of exactly `url` with their payload bytes, at most `limit`.
    /// With `only_ok`, responses with status >= 300 (or none) are excluded.
    pub fn fetch_payload(&self, url: &str, limit: usize, only_ok: bool) -> Result<Vec<UrlResponse>> {
        let status_filter = if only_ok {
            "AND responses_index.http_status < 300"
        } else {
            ""
        };
        let sql = format!(
            "SELECT
                responses_index.url,
                warc_records.warc_record_id,
                warc_records.warc_headers,
                warc_records.http_headers,
                responses_index.http_status,
                warc_records.warc_type,
                responses_index.payload_hash,
                payloads.data
             FROM responses_index
             JOIN warc_records ON responses_index.response_id = warc_records.warc_record_id
             LEFT JOIN payloads ON responses_index.payload_hash = payloads.hash
             WHERE responses_index.url = ?1
             {}
             LIMIT ?2",
            status_filter
        );

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let conn = self.store.connection();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![url, limit], |row| {
            let record_type: String = row.get(5)?;
            let payload_hash: Option<String> = row.get(6)?;
            let payload_bytes: Option<Vec<u8>> = row.get(7)?;

            Ok(UrlResponse {
                url: row.get(0)?,
                record_id: row.get(1)?,
                header_text: row.get(2)?,
                protocol_header_text: row.get(3)?,
                http_status: row.get(4)?,
                record_type: RecordType::from(record_type),
                payload_digest: payload_hash.map(ContentDigest::new),
                payload_bytes: payload_bytes.unwrap_or_default(),
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Payload bytes of the first capture of `url`.
    /// `None` when there is no capture or it carried no payload.
    pub fn first_payload(&self, url: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .fetch_payload(url, 1, false)?
            .into_iter()
            .next()
            .filter(|r| r.payload_digest.is_some())
            .map(|r| r.payload_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ArchiveRecord;
    use crate::engine::{IngestOptions, Ingester};

    fn store_with(records: &[ArchiveRecord]) -> Store {
        let mut store = Store::open_in_memory().unwrap();
        let mut ingester = Ingester::new(&mut store, IngestOptions::default());
        for record in records {
            ingester.ingest_record(record).unwrap();
        }
        store
    }

    #[test]
    fn test_fetch_joins_catalog_and_payload() {
        let record = ArchiveRecord::response("<urn:uuid:1>", "http://example.com/", 200, "hello");
        let store = store_with(&[record.clone()]);

        let rows = QueryEngine::new(&store)
            .fetch_payload("http://example.com/", 1, true)
            .unwrap();

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.record_id, "<urn:uuid:1>");
        assert_eq!(row.record_type, RecordType::Response);
        assert_eq!(row.header_text, record.header_text);
        assert_eq!(row.protocol_header_text, record.protocol_header_text);
        assert_eq!(row.payload_digest.as_ref(), record.payload_digest());
        assert_eq!(row.payload_bytes, b"hello");
    }

    #[test]
    fn test_limit_caps_rows() {
        let store = store_with(&[
            ArchiveRecord::response("<urn:uuid:1>", "http://example.com/", 200, "v1"),
            ArchiveRecord::response("<urn:uuid:2>", "http://example.com/", 200, "v2"),
            ArchiveRecord::response("<urn:uuid:3>", "http://example.com/", 200, "v3"),
        ]);
        let query = QueryEngine::new(&store);

        assert_eq!(query.fetch_payload("http://example.com/", 2, false).unwrap().len(), 2);
        assert_eq!(query.fetch_payload("http://example.com/", 10, false).unwrap().len(), 3);
    }

    #[test]
    fn test_response_without_payload_or_status() {
        let bare = ArchiveRecord::new(RecordType::Response, "<urn:uuid:1>").with_target_url("dns:example.com");
        let store = store_with(&[bare]);
        let query = QueryEngine::new(&store);

        let all = query.fetch_payload("dns:example.com", 1, false).unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].payload_bytes.is_empty());
        assert_eq!(all[0].http_status, None);

        assert!(query.fetch_payload("dns:example.com", 1, true).unwrap().is_empty());
        assert_eq!(query.first_payload("dns:example.com").unwrap(), None);
    }

    #[test]
    fn test_unknown_url_is_empty() {
        let store = store_with(&[]);
        let query = QueryEngine::new(&store);

        assert!(query.fetch_payload("http://nowhere/", 5, false).unwrap().is_empty());
        assert_eq!(query.first_payload("http://nowhere/").unwrap(), None);
        assert!(query.list_urls("*").unwrap().is_empty());
    }
}
