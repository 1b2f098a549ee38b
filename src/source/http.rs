//! Splitting captured HTTP messages into head and payload.

use std::borrow::Cow;

/// An HTTP message embedded in a WARC block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpMessage<'a> {
    /// Start line and header lines, without the blank separator line
    pub head: String,

    /// Status code, for responses only
    pub status: Option<u16>,

    /// Entity body, with chunked transfer coding removed
    pub body: Cow<'a, [u8]>,
}

/// Split `block` at the first blank line.
///
/// A block without a blank line is all head and no body.
pub fn split_message(block: &[u8]) -> HttpMessage<'_> {
    let (head, body) = match find_separator(block) {
        Some((at, len)) => (&block[..at], &block[at + len..]),
        None => (block, &block[block.len()..]),
    };

    let head = String::from_utf8_lossy(head).into_owned();
    let status = head.lines().next().and_then(parse_status_line);

    let body = if is_chunked(&head) {
        // Framing that does not parse is kept as captured
        decode_chunked(body).map_or(Cow::Borrowed(body), Cow::Owned)
    } else {
        Cow::Borrowed(body)
    };

    HttpMessage { head, status, body }
}

/// Whether the last transfer coding in the head is `chunked`
fn is_chunked(head: &str) -> bool {
    head.lines().skip(1).any(|line| {
        let Some((name, value)) = line.split_once(':') else {
            return false;
        };
        name.trim().eq_ignore_ascii_case("transfer-encoding")
            && value
                .rsplit(',')
                .next()
                .is_some_and(|coding| coding.trim().eq_ignore_ascii_case("chunked"))
    })
}

/// Decode a chunked body; `None` if the framing is broken.
///
/// Chunk extensions and trailers are dropped. A body cut off after whole
/// chunks (no last-chunk) keeps what was read.
fn decode_chunked(mut data: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());

    while !data.is_empty() {
        let line_end = data.windows(2).position(|w| w == b"\r\n")?;
        let size_line = std::str::from_utf8(&data[..line_end]).ok()?;
        let size_hex = size_line.split(';').next()?.trim();
        let size = usize::from_str_radix(size_hex, 16).ok()?;
        data = &data[line_end + 2..];

        if size == 0 {
            return Some(out);
        }

        let chunk = data.get(..size)?;
        out.extend_from_slice(chunk);
        data = &data[size..];
        data = data.strip_prefix(b"\r\n").unwrap_or(data);
    }

    Some(out)
}

/// Position and length of the head/body separator (CRLF CRLF, or bare LF LF)
fn find_separator(data: &[u8]) -> Option<(usize, usize)> {
    let crlf = data.windows(4).position(|w| w == b"\r\n\r\n").map(|p| (p, 4));
    let lf = data.windows(2).position(|w| w == b"\n\n").map(|p| (p, 2));

    match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Parse "HTTP/1.1 200 OK" → 200
fn parse_status_line(line: &str) -> Option<u16> {
    let mut parts = line.split_whitespace();
    let version = parts.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}
