//! Byte accounting and header capture for archive input streams.

use std::io::{BufRead, BufReader, Read};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// A BufReader wrapper that tracks total bytes consumed.
/// The counter is shared, so it can be read after the reader moved into a decoder.
pub struct CountingReader<R> {
    inner: BufReader<R>,
    consumed: Arc<AtomicU64>,
}

impl<R: Read> CountingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::with_capacity(1024 * 1024, inner),
            consumed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.consumed)
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

impl<R: Read> BufRead for CountingReader<R> {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.consumed.fetch_add(amt as u64, Ordering::Relaxed);
        self.inner.consume(amt)
    }
}

/// Bytes of the record header section currently being read
#[derive(Debug, Default)]
pub struct HeaderSection {
    bytes: Vec<u8>,
    complete: bool,
}

impl HeaderSection {
    fn push(&mut self, data: &[u8]) {
        if self.complete {
            return;
        }
        self.bytes.extend_from_slice(data);
        // A header section ends at its first empty line
        if self.bytes.ends_with(b"\r\n\r\n") {
            self.complete = true;
        }
    }

    /// Take the captured section (blank line included) and re-arm for the next record
    pub fn take(&mut self) -> Vec<u8> {
        self.complete = false;
        std::mem::take(&mut self.bytes)
    }
}

/// A BufRead wrapper that keeps the raw header section of each record.
/// Bodies pass through without being copied.
pub struct HeaderCapture<R> {
    inner: R,
    section: Arc<Mutex<HeaderSection>>,
}

impl<R: BufRead> HeaderCapture<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            section: Arc::new(Mutex::new(HeaderSection::default())),
        }
    }

    pub fn section(&self) -> Arc<Mutex<HeaderSection>> {
        Arc::clone(&self.section)
    }
}

/// Lock a captured section; a poisoned lock still holds valid bytes
pub fn lock_section(section: &Mutex<HeaderSection>) -> MutexGuard<'_, HeaderSection> {
    section.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<R: BufRead> Read for HeaderCapture<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        lock_section(&self.section).push(&buf[..n]);
        Ok(n)
    }
}

impl<R: BufRead> BufRead for HeaderCapture<R> {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        // Already buffered after the caller's fill_buf, so this does no I/O
        if let Ok(buf) = self.inner.fill_buf() {
            let n = amt.min(buf.len());
            lock_section(&self.section).push(&buf[..n]);
        }
        self.inner.consume(amt)
    }
}
