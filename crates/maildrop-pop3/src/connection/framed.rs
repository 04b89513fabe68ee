//! Framed I/O for the POP3 wire protocol.
//!
//! Commands and single-line responses are CRLF-terminated lines.
//! Multi-line responses are a sequence of lines terminated by a line
//! containing only `.`; lines beginning with `.` are byte-stuffed with
//! an extra leading `.` (RFC 1939 §3).

#![allow(clippy::missing_errors_doc)]

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{Error, Result};

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Maximum line length to prevent memory exhaustion.
const MAX_LINE_LENGTH: usize = 1024 * 1024; // 1 MB

/// Maximum multi-line block size to prevent memory exhaustion.
const MAX_BLOCK_SIZE: usize = 100 * 1024 * 1024; // 100 MB

/// Framed connection for the POP3 protocol.
///
/// Handles CRLF line reading, dot-terminated blocks with unstuffing,
/// and buffered command writing.
pub struct FramedStream<S> {
    reader: BufReader<S>,
    write_buffer: BytesMut,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new framed stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
            write_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
        }
    }

    /// Reads a single CRLF-terminated line, without the terminator.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = Vec::new();

        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }

            // A CRLF split across reads: the CR is already accumulated
            // and only the LF is in the fresh buffer.
            if line.last() == Some(&b'\r') && buf[0] == b'\n' {
                line.pop();
                self.reader.consume(1);
                break;
            }

            if let Some(pos) = find_crlf(buf) {
                line.extend_from_slice(&buf[..pos]);
                self.reader.consume(pos + 2);
                break;
            }

            let len = buf.len();
            line.extend_from_slice(buf);
            self.reader.consume(len);

            if line.len() > MAX_LINE_LENGTH {
                return Err(Error::Protocol("line too long".to_string()));
            }
        }

        String::from_utf8(line)
            .map_err(|_| Error::Protocol("response line is not valid UTF-8".to_string()))
    }

    /// Reads a multi-line block up to (excluding) the `.` terminator,
    /// removing byte-stuffing.
    pub async fn read_block(&mut self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        let mut total = 0usize;

        loop {
            let line = self.read_line().await?;

            if line == "." {
                return Ok(lines);
            }

            total += line.len();
            if total > MAX_BLOCK_SIZE {
                return Err(Error::Protocol("multi-line response too large".to_string()));
            }

            // Any non-terminator line starting with '.' was byte-stuffed.
            let unstuffed = line.strip_prefix('.').unwrap_or(&line);

            lines.push(unstuffed.to_string());
        }
    }

    /// Writes a command line to the stream and flushes it.
    pub async fn write_line(&mut self, data: &[u8]) -> Result<()> {
        self.write_buffer.clear();
        self.write_buffer.extend_from_slice(data);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buffer).await?;
        stream.flush().await?;

        Ok(())
    }

    /// Gets a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        self.reader.get_ref()
    }

    /// Gets a mutable reference to the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        self.reader.get_mut()
    }

    /// Consumes the framed stream and returns the inner stream.
    ///
    /// Note: Any buffered data will be lost. Only call this at a
    /// protocol synchronization point (immediately after a complete
    /// response), as STLS does.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }
}

/// Finds the position of the first CRLF in the buffer.
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
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

    #[tokio::test]
    async fn read_line_strips_crlf() {
        use tokio_test::io::Builder;

        let mock = Builder::new().read(b"+OK POP3 server ready\r\n").build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(framed.read_line().await.unwrap(), "+OK POP3 server ready");
    }

    #[tokio::test]
    async fn read_line_spanning_reads() {
        use tokio_test::io::Builder;

        let mock = Builder::new().read(b"+OK POP3 ").read(b"ready\r\n").build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(framed.read_line().await.unwrap(), "+OK POP3 ready");
    }

    #[tokio::test]
    async fn read_line_with_crlf_split_across_reads() {
        use tokio_test::io::Builder;

        let mock = Builder::new()
            .read(b"+OK first\r")
            .read(b"\n+OK second\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(framed.read_line().await.unwrap(), "+OK first");
        assert_eq!(framed.read_line().await.unwrap(), "+OK second");
    }

    #[tokio::test]
    async fn read_block_terminates_on_dot() {
        use tokio_test::io::Builder;

        let mock = Builder::new().read(b"1 120\r\n2 200\r\n.\r\n").build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(
            framed.read_block().await.unwrap(),
            vec!["1 120".to_string(), "2 200".to_string()]
        );
    }

    #[tokio::test]
    async fn read_block_unstuffs_leading_dots() {
        use tokio_test::io::Builder;

        let mock = Builder::new()
            .read(b"..hidden\r\n...two\r\nplain\r\n.\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(
            framed.read_block().await.unwrap(),
            vec![".hidden".to_string(), "..two".to_string(), "plain".to_string()]
        );
    }

    #[tokio::test]
    async fn write_line_flushes_whole_command() {
        use tokio_test::io::Builder;

        let mock = Builder::new().write(b"STAT\r\n").build();
        let mut framed = FramedStream::new(mock);

        framed.write_line(b"STAT\r\n").await.unwrap();
    }

    #[tokio::test]
    async fn eof_is_an_io_error() {
        use tokio_test::io::Builder;

        let mock = Builder::new().read(b"+OK partial").build();
        let mut framed = FramedStream::new(mock);

        assert!(matches!(
            framed.read_line().await,
            Err(Error::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof
        ));
    }
}
