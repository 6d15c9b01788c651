//! Line framing for the subscriber connection
//!
//! Inbound: newline-terminated command lines with a length limit.
//! Outbound: one JSON object per update, newline-terminated.

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::error::{ProtocolError, Result};
use crate::registry::Update;

/// Wire form of an update
#[derive(Debug, Serialize)]
struct UpdateMessage<'a> {
    key: &'a str,
    value: &'a str,
}

/// Serialize an update as a JSON line
///
/// Keys and values are rendered as UTF-8; invalid sequences are replaced.
pub fn encode_update(update: &Update) -> Result<Bytes> {
    let key = String::from_utf8_lossy(&update.key);
    let value = String::from_utf8_lossy(&update.value);

    let mut buf = BytesMut::with_capacity(key.len() + value.len() + 24).writer();
    serde_json::to_writer(
        &mut buf,
        &UpdateMessage {
            key: &key,
            value: &value,
        },
    )?;

    let mut buf = buf.into_inner();
    buf.put_u8(b'\n');
    Ok(buf.freeze())
}

/// Reads newline-terminated lines with a length limit
///
/// [`next_line`](LineReader::next_line) is cancel safe: a partially read
/// line is kept and completed by the next call, so it can sit in a
/// `tokio::select!` next to the outbox.
pub struct LineReader<R> {
    reader: BufReader<R>,
    line: Vec<u8>,
    max_length: usize,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Create a reader that rejects lines longer than `max_length` bytes
    pub fn new(inner: R, max_length: usize) -> Self {
        Self {
            reader: BufReader::new(inner),
            line: Vec::new(),
            max_length,
        }
    }

    /// Read the next line, without its terminator
    ///
    /// Returns `Ok(None)` at end of stream; an unterminated trailing line is
    /// discarded.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                self.line.clear();
                return Ok(None);
            }

            let (chunk, consumed, complete) = match available.iter().position(|&b| b == b'\n') {
                Some(pos) => (&available[..pos], pos + 1, true),
                None => (available, available.len(), false),
            };

            if self.line.len() + chunk.len() > self.max_length {
                return Err(ProtocolError::LineTooLong {
                    limit: self.max_length,
                }
                .into());
            }
            self.line.extend_from_slice(chunk);
            self.reader.consume(consumed);

            if complete {
                let line = std::mem::take(&mut self.line);
                return String::from_utf8(line)
                    .map(Some)
                    .map_err(|_| ProtocolError::InvalidUtf8.into());
            }
        }
    }
}
