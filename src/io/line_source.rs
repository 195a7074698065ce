//! Line-oriented input for the block extractor
//!
//! A `LineSource` yields decoded, whitespace-trimmed text lines. Decoding is
//! total: bytes that are not valid UTF-8 are dropped from the line.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use tracing::{debug, trace, warn};

/// Longest line kept in the pending buffer before it is dropped
pub const MAX_LINE_BYTES: usize = 4096;

/// Stream conditions that end a read cycle
#[derive(Debug)]
pub enum ReadError {
    /// The underlying stream reached end of input
    Closed,
    /// The device or file returned an I/O error
    Io(std::io::Error),
    /// No terminal line arrived within the configured block deadline
    BlockTimeout { sentinel: String, waited: Duration },
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::Closed => write!(f, "line stream closed"),
            ReadError::Io(e) => write!(f, "line stream error: {}", e),
            ReadError::BlockTimeout { sentinel, waited } => {
                write!(f, "no complete {:?} block after {}ms", sentinel, waited.as_millis())
            }
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReadError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ReadError {
    fn from(e: std::io::Error) -> Self {
        ReadError::Io(e)
    }
}

/// Source of text lines (serial port, capture file, scripted fake)
#[async_trait]
pub trait LineSource: Send {
    /// Wait for the next line.
    ///
    /// Returns `Ok(None)` when the per-line timeout elapsed with no complete
    /// line; the caller decides whether to keep waiting.
    async fn read_line(&mut self) -> Result<Option<String>, ReadError>;

    /// Human-readable name of the source for logs and the status header
    fn describe(&self) -> &str;
}

#[async_trait]
impl<T: LineSource + ?Sized> LineSource for Box<T> {
    async fn read_line(&mut self) -> Result<Option<String>, ReadError> {
        (**self).read_line().await
    }

    fn describe(&self) -> &str {
        (**self).describe()
    }
}

/// Decode a raw line, dropping invalid UTF-8 sequences, and trim whitespace
pub fn decode_line(raw: &[u8]) -> String {
    let mut out = String::with_capacity(raw.len());
    for chunk in raw.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out.trim().to_string()
}

/// Newline-delimited reader over any buffered async byte stream.
///
/// Partial lines survive a per-line timeout: bytes read so far stay in the
/// persistent buffer and the next call continues from them.
pub struct StreamLineReader<R> {
    name: String,
    reader: R,
    line_timeout: Option<Duration>,
    /// Bytes of the line currently being received
    pending: Vec<u8>,
    max_line_bytes: usize,
    /// Set after an overlong line was dropped, until its newline arrives
    discarding: bool,
    eof: bool,
}

impl<R: AsyncBufRead + Unpin + Send> StreamLineReader<R> {
    pub fn new(name: impl Into<String>, reader: R, line_timeout: Option<Duration>) -> Self {
        Self {
            name: name.into(),
            reader,
            line_timeout,
            pending: Vec::with_capacity(256),
            max_line_bytes: MAX_LINE_BYTES,
            discarding: false,
            eof: false,
        }
    }

    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes.max(1);
        self
    }

    fn drop_overlong(&mut self) {
        if !self.discarding {
            warn!(source = %self.name, max_line_bytes = self.max_line_bytes, "line_too_long_dropped");
        }
        self.pending.clear();
        self.discarding = true;
    }

    fn take_line(&mut self) -> String {
        let line = decode_line(&self.pending);
        self.pending.clear();
        trace!(source = %self.name, line = %line, "line_received");
        line
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> LineSource for StreamLineReader<R> {
    async fn read_line(&mut self) -> Result<Option<String>, ReadError> {
        if self.eof {
            return Err(ReadError::Closed);
        }

        let room = self.max_line_bytes.saturating_sub(self.pending.len()).max(1) as u64;
        let mut limited = (&mut self.reader).take(room);
        let read = limited.read_until(b'\n', &mut self.pending);
        let result = match self.line_timeout {
            Some(limit) => match tokio::time::timeout(limit, read).await {
                Ok(result) => result,
                Err(_) => return Ok(None),
            },
            None => read.await,
        };

        match result {
            Ok(0) => {
                self.eof = true;
                if self.discarding {
                    self.pending.clear();
                }
                if self.pending.is_empty() {
                    debug!(source = %self.name, "line_source_closed");
                    Err(ReadError::Closed)
                } else {
                    // Final line without a trailing newline
                    Ok(Some(self.take_line()))
                }
            }
            Ok(_) if self.pending.last() == Some(&b'\n') => {
                if self.discarding {
                    // Tail of a dropped line
                    self.pending.clear();
                    self.discarding = false;
                    return Ok(None);
                }
                Ok(Some(self.take_line()))
            }
            Ok(_) if self.pending.len() >= self.max_line_bytes => {
                self.drop_overlong();
                Ok(None)
            }
            Ok(_) => {
                // Stream ended mid-line; the next read reports the close
                self.eof = true;
                if self.discarding {
                    self.pending.clear();
                    return Ok(None);
                }
                Ok(Some(self.take_line()))
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(ReadError::Io(e)),
        }
    }

    fn describe(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_line_drops_invalid_bytes() {
        assert_eq!(decode_line(b"  12,\xff34\r\n"), "12,34");
        assert_eq!(decode_line(b"\xc3\x28&"), "(&");
        assert_eq!(decode_line(b"\r\n"), "");
    }

    #[tokio::test]
    async fn test_stream_reader_lines_then_closed() {
        let data: &[u8] = b"&,\r\n10,20\n\n30&";
        let mut reader = StreamLineReader::new("mem", data, None);

        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("&,"));
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("10,20"));
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some(""));
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("30&"));
        assert!(matches!(reader.read_line().await, Err(ReadError::Closed)));
        assert!(matches!(reader.read_line().await, Err(ReadError::Closed)));
    }

    #[tokio::test]
    async fn test_stream_reader_timeout_keeps_partial_line() {
        let (client, server) = tokio::io::duplex(64);
        let mut reader = StreamLineReader::new(
            "duplex",
            tokio::io::BufReader::new(server),
            Some(Duration::from_millis(20)),
        );
        let mut client = client;

        use tokio::io::AsyncWriteExt;
        client.write_all(b"10,2").await.unwrap();
        assert_eq!(reader.read_line().await.unwrap(), None);

        client.write_all(b"0\n").await.unwrap();
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("10,20"));
    }

    #[tokio::test]
    async fn test_overlong_line_is_dropped() {
        let data: &[u8] = b"0123456789abcdef\n10,20\n";
        let mut reader = StreamLineReader::new("mem", data, None).with_max_line_bytes(8);

        assert_eq!(reader.read_line().await.unwrap(), None);
        assert_eq!(reader.read_line().await.unwrap(), None);
        assert_eq!(reader.read_line().await.unwrap(), None);
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("10,20"));
        assert!(matches!(reader.read_line().await, Err(ReadError::Closed)));
    }

    #[tokio::test]
    async fn test_line_at_limit_is_kept() {
        let data: &[u8] = b"1,2,3\n";
        let mut reader = StreamLineReader::new("mem", data, None).with_max_line_bytes(6);
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("1,2,3"));
    }

    #[test]
    fn test_read_error_display() {
        let err = ReadError::BlockTimeout {
            sentinel: "$".to_string(),
            waited: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "no complete \"$\" block after 1500ms");
        assert_eq!(ReadError::Closed.to_string(), "line stream closed");
    }
}
