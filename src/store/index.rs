//! Response index: an append-only capture log of `url → response record`.
//!
//! Repeated captures of a URL are all kept, so there is no uniqueness
//! constraint here. The ingester only appends after the catalog accepted
//! the record, which is what keeps a record from being indexed twice.

use rusqlite::{params, Connection};

use crate::domain::{ContentDigest, ResponseIndexEntry};
use crate::error::Result;

/// URL pattern with `*` wildcards, compiled to a case-sensitive SQLite `GLOB`
///
/// Matching is by substring unless the pattern starts with `^` (anchor at
/// the start of the URL) or ends with `$` (anchor at the end).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPattern {
    glob: String,
}

impl UrlPattern {
    pub fn parse(pattern: &str) -> Self {
        let (anchored_start, rest) = match pattern.strip_prefix('^') {
            Some(rest) => (true, rest),
            None => (false, pattern),
        };
        let (anchored_end, body) = match rest.strip_suffix('$') {
            Some(body) => (true, body),
            None => (false, rest),
        };

        let mut glob = String::with_capacity(body.len() + 2);
        if !anchored_start {
            glob.push('*');
        }
        for c in body.chars() {
            match c {
                '*' => glob.push('*'),
                // GLOB metacharacters that appear in URLs
                '?' => glob.push_str("[?]"),
                '[' => glob.push_str("[[]"),
                other => glob.push(other),
            }
        }
        if !anchored_end {
            glob.push('*');
        }

        Self { glob }
    }

    /// The compiled `GLOB` operand
    pub fn as_glob(&self) -> &str {
        &self.glob
    }
}

/// Response index view over a connection or transaction
pub struct ResponseIndex<'a> {
    conn: &'a Connection,
}

impl<'a> ResponseIndex<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Append an entry unconditionally
    pub fn insert(&self, entry: &ResponseIndexEntry) -> Result<()> {
        self.conn.execute(
            "INSERT INTO responses_index (url, response_id, http_status, payload_hash)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.url,
                entry.record_id,
                entry.http_status,
                entry.payload_digest.as_ref().map(ContentDigest::as_str),
            ],
        )?;
        Ok(())
    }

    /// All indexed URLs matching `pattern`, duplicates included, unordered
    pub fn find_by_url_pattern(&self, pattern: &UrlPattern) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url FROM responses_index WHERE url GLOB ?1")?;
        let rows = stmt.query_map(params![pattern.as_glob()], |row| row.get(0))?;

        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }

    /// Every capture of exactly `url`
    pub fn entries_for_url(&self, url: &str) -> Result<Vec<ResponseIndexEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, response_id, http_status, payload_hash
             FROM responses_index
             WHERE url = ?1",
        )?;
        let rows = stmt.query_map(params![url], |row| {
            let payload_hash: Option<String> = row.get(3)?;
            Ok(ResponseIndexEntry {
                url: row.get(0)?,
                record_id: row.get(1)?,
                http_status: row.get(2)?,
                payload_digest: payload_hash.map(ContentDigest::new),
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn count(&self) -> Result<u64> {
        super::count_rows(self.conn, "responses_index")
    }
}
