//! Module `frame`
//!
//! One frame is one UTF-8 line terminated by `\n`. A trailing `\r` is stripped
//! and blank lines are skipped. Oversize, non-UTF-8, and unterminated frames
//! are reported as [`FrameError`]s without closing the stream.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::FrameError;

/// Outcome of reading one frame from the stream.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameEvent {
    Frame(String),
    Malformed(FrameError),
    EndOfStream,
}

/// Reads bounded, newline-delimited frames from a buffered reader.
pub struct FrameReader<R> {
    inner: R,
    max_len: usize,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    pub fn new(inner: R, max_len: usize) -> Self {
        Self {
            inner,
            max_len,
            buf: Vec::new(),
        }
    }

    /// Reads the next frame. `max_len` excludes the `\r\n` or `\n` terminator;
    /// at most one extra byte is buffered to hold a pending `\r`.
    pub async fn next_event(&mut self) -> io::Result<FrameEvent> {
        let limit = self.max_len + 1;
        loop {
            self.buf.clear();
            let mut overflowed = false;

            let terminated = loop {
                let available = self.inner.fill_buf().await?;
                if available.is_empty() {
                    break false;
                }

                let (chunk, found) = match available.iter().position(|&b| b == b'\n') {
                    Some(pos) => (&available[..pos], true),
                    None => (available, false),
                };
                let chunk_len = chunk.len();

                if !overflowed {
                    if self.buf.len() + chunk_len > limit {
                        overflowed = true;
                        self.buf.clear();
                    } else {
                        self.buf.extend_from_slice(chunk);
                    }
                }

                self.inner.consume(chunk_len + usize::from(found));
                if found {
                    break true;
                }
            };

            if overflowed {
                return Ok(FrameEvent::Malformed(FrameError::TooLong(self.max_len)));
            }

            if !terminated {
                if self.buf.is_empty() {
                    return Ok(FrameEvent::EndOfStream);
                }
                let len = self.buf.len();
                self.buf.clear();
                return Ok(FrameEvent::Malformed(FrameError::Truncated(len)));
            }

            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
            if self.buf.len() > self.max_len {
                return Ok(FrameEvent::Malformed(FrameError::TooLong(self.max_len)));
            }
            if self.buf.is_empty() {
                continue;
            }

            return Ok(match std::str::from_utf8(&self.buf) {
                Ok(text) => FrameEvent::Frame(text.to_string()),
                Err(_) => FrameEvent::Malformed(FrameError::InvalidUtf8),
            });
        }
    }
}

/// Writes one payload as a single newline-terminated frame and flushes it.
pub async fn write_frame<W>(writer: &mut W, payload: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut encoded = Vec::with_capacity(payload.len() + 1);
    encoded.extend_from_slice(payload.as_bytes());
    encoded.push(b'\n');
    writer.write_all(&encoded).await?;
    writer.flush().await
}
