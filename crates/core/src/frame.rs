//! Splitting a raw body into line-delimited records.

use std::error::Error;
use std::fmt;

use bytes::{Bytes, BytesMut};

/// The default bound on a single buffered line.
pub const DEFAULT_MAX_LINE_LEN: usize = 1024 * 1024;

const DATA_PREFIX: &str = "data: ";
const SENTINEL: &str = "[DONE]";

/// One complete line of the body.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FramedRecord {
    /// A `data: ` line other than the sentinel, carrying its payload.
    Data(String),
    /// The `data: [DONE]` line.
    Sentinel,
    /// Any other line: blank separators, comments, keep-alives and
    /// fields we don't consume.
    Ignored(String),
}

impl FramedRecord {
    fn from_line(line: &str) -> Self {
        match line.strip_prefix(DATA_PREFIX) {
            Some(SENTINEL) => Self::Sentinel,
            Some(payload) => Self::Data(payload.to_owned()),
            None => Self::Ignored(line.to_owned()),
        }
    }
}

/// A single line grew past the configured bound before it was
/// terminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameTooLarge {
    /// The configured bound, in bytes.
    pub limit: usize,
}

impl fmt::Display for FrameTooLarge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line exceeds {} bytes without a terminator", self.limit)
    }
}

impl Error for FrameTooLarge {}

/// Reassembles records from chunks of a body.
///
/// Chunks are pushed in arrival order and records are pulled out one by
/// one. Where the chunk boundaries fall has no effect on the records
/// produced. Lines are split on `\n` before they are decoded, so a UTF-8
/// sequence split across two chunks still comes out whole. A `\r` right
/// before the `\n` is dropped.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    // Bytes at the front of `buf` that are known to hold no `\n`.
    scanned: usize,
    max_line_len: usize,
}

impl FrameDecoder {
    /// Creates a decoder that refuses lines longer than `max_line_len`
    /// bytes.
    #[inline]
    pub fn new(max_line_len: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            scanned: 0,
            max_line_len,
        }
    }

    /// Buffers the next chunk of the body.
    #[inline]
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pulls out the next complete record, if the buffer holds one.
    pub fn next_record(
        &mut self,
    ) -> Result<Option<FramedRecord>, FrameTooLarge> {
        let Some(offset) =
            self.buf[self.scanned..].iter().position(|b| *b == b'\n')
        else {
            // Whatever is buffered is one unterminated line.
            self.scanned = self.buf.len();
            if self.buf.len() > self.max_line_len {
                return Err(FrameTooLarge {
                    limit: self.max_line_len,
                });
            }
            return Ok(None);
        };

        let eol_idx = self.scanned + offset;
        if eol_idx > self.max_line_len {
            return Err(FrameTooLarge {
                limit: self.max_line_len,
            });
        }

        let line = self.buf.split_to(eol_idx + 1);
        self.scanned = 0;
        let mut line = &line[..eol_idx];
        if let [rest @ .., b'\r'] = line {
            line = rest;
        }
        Ok(Some(FramedRecord::from_line(&String::from_utf8_lossy(line))))
    }

    /// Ends the body, returning the unterminated trailing fragment if
    /// there is one.
    ///
    /// The fragment is never turned into a record: a line that was cut
    /// off can't be trusted to be complete.
    pub fn finish(&mut self) -> Option<Bytes> {
        self.scanned = 0;
        if self.buf.is_empty() {
            return None;
        }
        Some(self.buf.split().freeze())
    }
}

impl Default for FrameDecoder {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = ": keep-alive\n\
        data: {\"choices\":[{\"delta\":{\"content\":\"Snow\"}}]}\n\
        \n\
        data: in Zürich\r\n\
        event: ping\n\
        data: [DONE]\n";

    fn decode<'a>(
        chunks: impl IntoIterator<Item = &'a [u8]>,
    ) -> (Vec<FramedRecord>, Option<Bytes>) {
        let mut decoder = FrameDecoder::default();
        let mut records = vec![];
        for chunk in chunks {
            decoder.push(chunk);
            while let Some(record) = decoder.next_record().unwrap() {
                records.push(record);
            }
        }
        (records, decoder.finish())
    }

    #[test]
    fn test_records() {
        let (records, rest) = decode([BODY.as_bytes()]);
        assert_eq!(
            records,
            vec![
                FramedRecord::Ignored(": keep-alive".to_owned()),
                FramedRecord::Data(
                    "{\"choices\":[{\"delta\":{\"content\":\"Snow\"}}]}"
                        .to_owned()
                ),
                FramedRecord::Ignored(String::new()),
                FramedRecord::Data("in Zürich".to_owned()),
                FramedRecord::Ignored("event: ping".to_owned()),
                FramedRecord::Sentinel,
            ]
        );
        assert_eq!(rest, None);
    }

    #[test]
    fn test_chunk_boundaries_do_not_matter() {
        let bytes = BODY.as_bytes();
        let (expected, _) = decode([bytes]);

        // Every single split point, including ones inside `ü`.
        for idx in 0..=bytes.len() {
            let (head, tail) = bytes.split_at(idx);
            assert_eq!(decode([head, tail]).0, expected, "split at {idx}");
        }

        // One byte at a time, with empty chunks in between.
        let byte_chunks = bytes.chunks(1).flat_map(|b| [b, &b""[..]]);
        assert_eq!(decode(byte_chunks).0, expected);
    }

    #[test]
    fn test_trailing_fragment_is_discarded() {
        let (records, rest) = decode([&b"data: one\ndata: tw"[..]]);
        assert_eq!(records, vec![FramedRecord::Data("one".to_owned())]);
        assert_eq!(rest.as_deref(), Some(&b"data: tw"[..]));
    }

    #[test]
    fn test_prefix_must_include_space() {
        let (records, _) = decode([&b"data:hello\ndata: \n"[..]]);
        assert_eq!(
            records,
            vec![
                FramedRecord::Ignored("data:hello".to_owned()),
                FramedRecord::Data(String::new()),
            ]
        );
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let (records, _) = decode([&b"data: caf\xff\n"[..]]);
        assert_eq!(records, vec![FramedRecord::Data("caf\u{fffd}".to_owned())]);
    }

    #[test]
    fn test_line_too_large() {
        let mut decoder = FrameDecoder::new(8);
        decoder.push(b"data: ok\n");
        assert_eq!(
            decoder.next_record().unwrap(),
            Some(FramedRecord::Data("ok".to_owned()))
        );

        // Terminated, but too long.
        decoder.push(b"data: too long\n");
        assert_eq!(decoder.next_record(), Err(FrameTooLarge { limit: 8 }));

        // Never terminated, reported as soon as the bound is crossed.
        let mut decoder = FrameDecoder::new(8);
        decoder.push(b"data: ");
        assert_eq!(decoder.next_record(), Ok(None));
        decoder.push(b"abc");
        assert_eq!(decoder.next_record(), Err(FrameTooLarge { limit: 8 }));
    }
}
