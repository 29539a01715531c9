//! SSE frame splitting and encoding.
//!
//! Upstream bytes arrive in arbitrary chunks; [`SseFrameSplitter`] keeps the
//! unterminated tail (the carry) between chunks and only hands out frames
//! whose terminating blank line has been seen.
use bytes::{Bytes, BytesMut};
use memchr::memmem;
use std::sync::LazyLock;

pub const DONE_FRAME: &[u8] = b"data: [DONE]\n\n";

const DATA_PREFIX: &[u8] = b"data:";
const DONE_TOKEN: &[u8] = b"[DONE]";

/// One complete frame as received, including its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    bytes: Bytes,
    body_len: usize,
}

impl RawFrame {
    /// Frame text without the terminating blank line.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.bytes[..self.body_len]
    }

    /// Frame text exactly as received.
    #[must_use]
    pub fn raw(&self) -> &Bytes {
        &self.bytes
    }

    #[must_use]
    pub fn into_raw(self) -> Bytes {
        self.bytes
    }
}

/// Incremental frame splitter over raw bytes.
///
/// Splitting happens before any UTF-8 decoding, so a multi-byte character
/// cut across two chunks is reassembled intact.
#[derive(Debug, Default)]
pub struct SseFrameSplitter {
    carry: BytesMut,
    scan_from: usize,
}

impl SseFrameSplitter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            carry: BytesMut::with_capacity(4096),
            scan_from: 0,
        }
    }

    /// Append a newly received chunk to the carry.
    pub fn push(&mut self, chunk: &[u8]) {
        self.carry.extend_from_slice(chunk);
    }

    /// Pop the next complete frame, if the carry holds one.
    pub fn next_frame(&mut self) -> Option<RawFrame> {
        match find_sse_frame_terminator_from(&self.carry, self.scan_from) {
            Some((frame_start, terminator_len)) => {
                let bytes = self.carry.split_to(frame_start + terminator_len).freeze();
                self.scan_from = 0;
                Some(RawFrame {
                    bytes,
                    body_len: frame_start,
                })
            }
            None => {
                // A terminator may straddle the next chunk boundary.
                self.scan_from = self.carry.len().saturating_sub(3);
                None
            }
        }
    }

    /// Take whatever unterminated bytes remain. Whitespace-only tails count
    /// as nothing.
    pub fn take_remainder(&mut self) -> Option<Bytes> {
        self.scan_from = 0;
        let rest = self.carry.split().freeze();
        if rest.trim_ascii().is_empty() {
            None
        } else {
            Some(rest)
        }
    }
}

#[inline]
fn find_sse_frame_terminator_from(buffer: &[u8], scan_from: usize) -> Option<(usize, usize)> {
    static LF_LF_FINDER: LazyLock<memmem::Finder<'static>> =
        LazyLock::new(|| memmem::Finder::new(b"\n\n"));
    static CRLF_CRLF_FINDER: LazyLock<memmem::Finder<'static>> =
        LazyLock::new(|| memmem::Finder::new(b"\r\n\r\n"));

    let scan_from = scan_from.min(buffer.len());
    let haystack = &buffer[scan_from..];
    let lf_lf_pos = LF_LF_FINDER.find(haystack).map(|rel| scan_from + rel);
    let crlf_crlf_pos = CRLF_CRLF_FINDER.find(haystack).map(|rel| scan_from + rel);

    match (lf_lf_pos, crlf_crlf_pos) {
        (Some(lf_pos), Some(crlf_pos)) => {
            if lf_pos <= crlf_pos {
                Some((lf_pos, 2))
            } else {
                Some((crlf_pos, 4))
            }
        }
        (Some(lf_pos), None) => Some((lf_pos, 2)),
        (None, Some(crlf_pos)) => Some((crlf_pos, 4)),
        (None, None) => None,
    }
}

/// Lines of a frame body, split on `\n` with a trailing `\r` removed.
pub fn frame_lines(body: &[u8]) -> impl Iterator<Item = &[u8]> + '_ {
    body.split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
}

/// Payload of a `data:` line, with the one optional space after the colon
/// removed. `None` for any other line.
#[must_use]
pub fn data_payload(line: &[u8]) -> Option<&[u8]> {
    let value = line.strip_prefix(DATA_PREFIX)?;
    Some(value.strip_prefix(b" ").unwrap_or(value))
}

#[inline]
#[must_use]
pub fn is_done_payload(payload: &[u8]) -> bool {
    payload.trim_ascii() == DONE_TOKEN
}

/// `data: <json>\n\n`
#[must_use]
pub fn data_frame(json: &[u8]) -> Bytes {
    data_frame_with_fields(&[], json)
}

/// `<fields>data: <json>\n\n`, where `fields` holds complete `\n`-terminated
/// field lines (`event:`, `id:`, comments) carried over from the upstream event.
#[must_use]
pub fn data_frame_with_fields(fields: &[u8], json: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(fields.len() + 8 + json.len());
    out.extend_from_slice(fields);
    out.extend_from_slice(b"data: ");
    out.extend_from_slice(json);
    out.extend_from_slice(b"\n\n");
    out.freeze()
}

/// `<fields><line>\n\n`: one upstream line re-terminated as its own frame.
#[must_use]
pub fn line_frame(fields: &[u8], line: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(fields.len() + line.len() + 2);
    out.extend_from_slice(fields);
    out.extend_from_slice(line);
    out.extend_from_slice(b"\n\n");
    out.freeze()
}

#[inline]
#[must_use]
pub fn done_frame() -> Bytes {
    Bytes::from_static(DONE_FRAME)
}

/// `data: {"error":{"message":...}}\n\n`
#[must_use]
pub fn error_frame(message: &str) -> Bytes {
    let payload = crate::protocol::error_shapes::stream_error_payload(message);
    data_frame(payload.to_string().as_bytes())
}
