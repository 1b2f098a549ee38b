//! Archive records as produced by a record source.

use serde::{Deserialize, Serialize};

use super::digest::ContentDigest;

/// WARC record type (`WARC-Type`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum RecordType {
    Warcinfo,
    Response,
    Resource,
    Request,
    Metadata,
    Revisit,
    Conversion,
    Continuation,

    /// Any type not defined by WARC 1.1
    Other(String),
}

impl RecordType {
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::Warcinfo => "warcinfo",
            RecordType::Response => "response",
            RecordType::Resource => "resource",
            RecordType::Request => "request",
            RecordType::Metadata => "metadata",
            RecordType::Revisit => "revisit",
            RecordType::Conversion => "conversion",
            RecordType::Continuation => "continuation",
            RecordType::Other(other) => other,
        }
    }

    /// Only responses are indexed by URL
    pub fn is_response(&self) -> bool {
        matches!(self, RecordType::Response)
    }
}

impl From<&str> for RecordType {
    fn from(s: &str) -> Self {
        match s.trim() {
            "warcinfo" => RecordType::Warcinfo,
            "response" => RecordType::Response,
            "resource" => RecordType::Resource,
            "request" => RecordType::Request,
            "metadata" => RecordType::Metadata,
            "revisit" => RecordType::Revisit,
            "conversion" => RecordType::Conversion,
            "continuation" => RecordType::Continuation,
            other => RecordType::Other(other.to_string()),
        }
    }
}

impl From<String> for RecordType {
    fn from(s: String) -> Self {
        RecordType::from(s.as_str())
    }
}

impl From<RecordType> for String {
    fn from(t: RecordType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payload carried by a record, with the digest it is deduplicated under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPayload {
    pub digest: ContentDigest,
    pub bytes: Vec<u8>,
}

/// One captured transaction unit read from an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRecord {
    /// `WARC-Record-ID`, unique per source record
    pub record_id: String,

    pub record_type: RecordType,

    /// Raw WARC header lines
    pub header_text: String,

    /// `WARC-Target-URI`
    pub target_url: Option<String>,

    /// Status code from the HTTP status line, if the block is an HTTP message
    pub http_status: Option<u16>,

    /// HTTP status line and headers, if the block is an HTTP message
    pub protocol_header_text: Option<String>,

    pub payload: Option<RecordPayload>,
}

impl ArchiveRecord {
    /// Create a record with no URL, protocol headers or payload
    pub fn new(record_type: RecordType, record_id: impl Into<String>) -> Self {
        let record_id = record_id.into();
        let header_text = format!(
            "WARC-Type: {}\r\nWARC-Record-ID: {}\r\n",
            record_type, record_id
        );

        Self {
            record_id,
            record_type,
            header_text,
            target_url: None,
            http_status: None,
            protocol_header_text: None,
            payload: None,
        }
    }

    /// Shorthand for an HTTP response capture of `url`
    pub fn response(
        record_id: impl Into<String>,
        url: impl Into<String>,
        status: u16,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self::new(RecordType::Response, record_id)
            .with_target_url(url)
            .with_http_status(status)
            .with_protocol_headers(format!("HTTP/1.1 {}\r\n", status))
            .with_payload(body)
    }

    pub fn with_header_text(mut self, header_text: impl Into<String>) -> Self {
        self.header_text = header_text.into();
        self
    }

    pub fn with_target_url(mut self, url: impl Into<String>) -> Self {
        self.target_url = Some(url.into());
        self
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn with_protocol_headers(mut self, headers: impl Into<String>) -> Self {
        self.protocol_header_text = Some(headers.into());
        self
    }

    /// Attach a payload, digesting it with sha256
    pub fn with_payload(self, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let digest = ContentDigest::compute(&bytes);
        self.with_digested_payload(digest, bytes)
    }

    /// Attach a payload under a digest supplied by the archive
    pub fn with_digested_payload(
        mut self,
        digest: impl Into<ContentDigest>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        self.payload = Some(RecordPayload {
            digest: digest.into(),
            bytes: bytes.into(),
        });
        self
    }

    pub fn payload_digest(&self) -> Option<&ContentDigest> {
        self.payload.as_ref().map(|p| &p.digest)
    }
}
