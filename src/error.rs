//! Error taxonomy for ingestion and queries.
//!
//! Query misses are not errors: lookups that find nothing return an empty
//! `Vec`. The two sanctioned no-ops (payload dedup, catalog skip) are
//! reported through [`InsertOutcome`](crate::domain::InsertOutcome).

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by the store, the archive source and the engines
#[derive(Debug, Error)]
pub enum Error {
    /// The backing store could not be opened or locked
    #[error("Store unavailable at {path}: {source}")]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The archive stream violates the record format
    #[error("Malformed record in {path}: {reason}")]
    MalformedRecord { path: PathBuf, reason: String },

    /// Strict-mode conflict on a record id
    #[error("Record already exists: {record_id}")]
    DuplicateRecord { record_id: String },

    /// Payload lookup by digest found nothing
    #[error("Payload not found: {0}")]
    PayloadNotFound(String),

    /// A fatal error while ingesting one input file
    #[error("Failed to ingest {path}: {source}")]
    Ingest {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl Error {
    /// Attach the input file being ingested
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            // Already carries its file
            err @ (Error::Ingest { .. } | Error::MalformedRecord { .. }) => err,
            other => Error::Ingest {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, looking through per-file wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::Ingest { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this is (or wraps) a strict-mode duplicate
    pub fn is_duplicate(&self) -> bool {
        matches!(self.root(), Error::DuplicateRecord { .. })
    }

    /// Whether this is (or wraps) a malformed archive record
    pub fn is_malformed(&self) -> bool {
        matches!(self.root(), Error::MalformedRecord { .. })
    }
}
