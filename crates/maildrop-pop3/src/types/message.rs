//! Retrieved message content.

use std::io::Cursor;

use bytes::Bytes;

/// Content returned by RETR or TOP: the dot-unstuffed lines of the
/// multi-line response, rejoined with CRLF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBody {
    data: Bytes,
}

impl MessageBody {
    /// Builds a body from response lines. Every line, including the
    /// last, is CRLF-terminated in the result.
    #[must_use]
    pub fn from_lines(lines: &[String]) -> Self {
        let mut data = Vec::with_capacity(lines.iter().map(|line| line.len() + 2).sum());
        for line in lines {
            data.extend_from_slice(line.as_bytes());
            data.extend_from_slice(b"\r\n");
        }
        Self { data: data.into() }
    }

    /// Body length in bytes.
    ///
    /// This counts the bytes actually transferred after dot-unstuffing;
    /// it can differ from the octet count the scan listing reports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the body is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the body, returning its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// A reader over the body, usable with both `std::io::Read` and
    /// `tokio::io::AsyncRead`.
    #[must_use]
    pub fn reader(&self) -> Cursor<Bytes> {
        Cursor::new(self.data.clone())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_rejoined_with_crlf() {
        let body = MessageBody::from_lines(&[
            "From: tim@example.net".to_string(),
            String::new(),
            "hello".to_string(),
        ]);
        assert_eq!(body.as_bytes(), b"From: tim@example.net\r\n\r\nhello\r\n");
        assert_eq!(body.len(), 32);
    }

    #[test]
    fn empty_body() {
        let body = MessageBody::from_lines(&[]);
        assert!(body.is_empty());
    }
}
