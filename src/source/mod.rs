//! Archive record sources.
//!
//! A source is a lazy, forward-only sequence of [`ArchiveRecord`]s read
//! from one input stream. The ingester consumes any [`RecordSource`]; the
//! WARC reader is the production one and tests feed plain vectors.

pub mod http;
pub mod tracking;
pub mod warc;

use crate::domain::ArchiveRecord;
use crate::error::Result;

pub use self::warc::WarcFileSource;

/// Trait for archive record streams
pub trait RecordSource: Iterator<Item = Result<ArchiveRecord>> {
    /// Bytes consumed from the underlying stream so far
    fn bytes_read(&self) -> u64 {
        0
    }
}

impl RecordSource for std::vec::IntoIter<Result<ArchiveRecord>> {}
