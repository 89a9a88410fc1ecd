//! The wire frame: a header/body packet and its incremental decoder.
//!
//! Wire format (see spec §4.1):
//!
//! ```text
//! key1: value1\n
//! key2: value2\n
//! \n
//! <content-length bytes of body>
//! ```

use std::collections::BTreeMap;

use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;

/// `content-length` is the one header every frame must carry.
pub const CONTENT_LENGTH: &str = "content-length";

#[derive(Debug, Error)]
pub enum PacketError {
    #[error("missing `{CONTENT_LENGTH}` header")]
    MissingContentLength,
    #[error("invalid `{CONTENT_LENGTH}` header: {0:?}")]
    InvalidContentLength(String),
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),
}

/// One request/response frame: a header map plus an opaque body.
///
/// Header order is not significant (a `BTreeMap` is used so tests and debug
/// output are deterministic, not because order carries meaning).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packet {
    headers: BTreeMap<String, String>,
    body: Bytes,
}

impl Packet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a packet with a body already set, auto-deriving `content-length`.
    pub fn with_body(body: impl Into<Bytes>) -> Self {
        let mut pkt = Self::new();
        pkt.set_body(body);
        pkt
    }

    /// Set (or overwrite) a header. To omit a header entirely, simply don't
    /// call this for it — the encoder only ever emits headers that were set.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(key.into(), value.into());
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(key, value);
        self
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Replace the body and recompute `content-length` automatically —
    /// callers never set `content-length` themselves.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        let body = body.into();
        self.set_header(CONTENT_LENGTH, body.len().to_string());
        self.body = body;
    }

    /// `true` iff `content-length` is present, parses as an integer, and
    /// equals the current body length exactly.
    pub fn check(&self) -> Result<bool, PacketError> {
        let declared = self.declared_len()?;
        Ok(self.body.len() == declared)
    }

    fn declared_len(&self) -> Result<usize, PacketError> {
        let raw = self.header(CONTENT_LENGTH).ok_or(PacketError::MissingContentLength)?;
        raw.parse::<usize>()
            .map_err(|_| PacketError::InvalidContentLength(raw.to_string()))
    }

    /// Serialize headers and body to bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64 + self.body.len());
        for (k, v) in &self.headers {
            out.extend_from_slice(k.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(v.as_bytes());
            out.push(b'\n');
        }
        out.push(b'\n');
        out.extend_from_slice(&self.body);
        out
    }
}

/// Headers parsed for the frame currently being assembled, once its
/// `\n\n` terminator has been seen.
#[derive(Debug)]
struct PendingHeaders {
    headers: BTreeMap<String, String>,
    content_length: usize,
}

/// Incremental reassembly buffer: feed it arbitrarily-chunked bytes off the
/// wire and drain whatever complete packets have accumulated. All
/// unconsumed bytes (partial headers, partial body, or the start of the
/// next frame) live in one contiguous buffer between calls.
#[derive(Debug, Default)]
pub struct PacketDecoder {
    buf: BytesMut,
    pending: Option<PendingHeaders>,
}

impl PacketDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes as read from the transport. Returns every
    /// packet that became complete as a result, in arrival order.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Packet>, PacketError> {
        self.buf.extend_from_slice(chunk);
        let mut completed = Vec::new();

        loop {
            if self.pending.is_none() {
                let Some(term) = find_header_terminator(&self.buf) else {
                    break;
                };
                let header_bytes = self.buf.split_to(term);
                self.buf.advance(2); // consume the `\n\n` terminator
                let headers = parse_headers(&header_bytes)?;
                let content_length = headers
                    .get(CONTENT_LENGTH)
                    .ok_or(PacketError::MissingContentLength)?
                    .parse::<usize>()
                    .map_err(|_| {
                        PacketError::InvalidContentLength(
                            headers.get(CONTENT_LENGTH).cloned().unwrap_or_default(),
                        )
                    })?;
                self.pending = Some(PendingHeaders { headers, content_length });
            }

            let pending = self.pending.as_ref().expect("set above");
            if self.buf.len() < pending.content_length {
                break; // need more bytes for the body
            }

            let PendingHeaders { headers, content_length } = self.pending.take().expect("checked above");
            let body = self.buf.split_to(content_length).freeze();
            let mut pkt = Packet::new();
            for (k, v) in headers {
                pkt.set_header(k, v);
            }
            pkt.set_body(body);
            completed.push(pkt);
        }

        Ok(completed)
    }
}

fn find_header_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

fn parse_headers(buf: &[u8]) -> Result<BTreeMap<String, String>, PacketError> {
    let text = String::from_utf8_lossy(buf);
    let mut headers = BTreeMap::new();
    for line in text.split('\n') {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            tracing::warn!(line, "malformed header line");
            return Err(PacketError::MalformedHeader(line.to_string()));
        };
        headers.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let mut pkt = Packet::new()
            .with_header("controller", "dir")
            .with_header("action", "list");
        pkt.set_body(Bytes::from_static(b"hello world"));

        let bytes = pkt.encode();
        let mut decoder = PacketDecoder::new();
        let mut out = decoder.feed(&bytes).unwrap();
        assert_eq!(out.len(), 1);
        let decoded = out.remove(0);
        assert_eq!(decoded.header("controller"), Some("dir"));
        assert_eq!(decoded.header("action"), Some("list"));
        assert_eq!(decoded.body().as_ref(), b"hello world");
        assert_eq!(decoded.header(CONTENT_LENGTH), Some("11"));
    }

    #[test]
    fn incremental_decode_matches_whole() {
        let pkt = Packet::with_body(Bytes::from_static(b"partial read test"))
            .with_header("controller", "file");
        let bytes = pkt.encode();

        for split in 0..=bytes.len() {
            let (a, b) = bytes.split_at(split);
            let mut decoder = PacketDecoder::new();
            let mut out = decoder.feed(a).unwrap();
            out.extend(decoder.feed(b).unwrap());
            assert_eq!(out.len(), 1, "split at {split} produced {} packets", out.len());
            assert_eq!(out[0].body().as_ref(), b"partial read test");
        }
    }

    #[test]
    fn multiple_frames_in_one_chunk_are_both_decoded() {
        let a = Packet::with_body(Bytes::from_static(b"first")).with_header("action", "a");
        let b = Packet::with_body(Bytes::from_static(b"second")).with_header("action", "b");
        let mut bytes = a.encode();
        bytes.extend(b.encode());

        let mut decoder = PacketDecoder::new();
        let out = decoder.feed(&bytes).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].body().as_ref(), b"first");
        assert_eq!(out[1].body().as_ref(), b"second");
    }

    #[test]
    fn missing_content_length_is_an_error() {
        let mut decoder = PacketDecoder::new();
        let err = decoder.feed(b"controller: dir\n\nbody").unwrap_err();
        assert!(matches!(err, PacketError::MissingContentLength));
    }

    #[test]
    fn check_reflects_completeness() {
        let mut pkt = Packet::new();
        pkt.set_header(CONTENT_LENGTH, "5");
        assert!(!pkt.check().unwrap());
        pkt.set_body(Bytes::from_static(b"hello"));
        assert!(pkt.check().unwrap());
    }
}
