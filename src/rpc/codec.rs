//! Message framing on a byte stream.
//!
//! `Content-Length` framing is what LSP-style clients speak: a header block
//! ended by an empty line, then exactly that many bytes of JSON. Newline
//! framing puts one JSON message per line.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Largest message body accepted by default.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Framing {
    ContentLength,
    Newline,
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Framing::ContentLength => write!(f, "content-length"),
            Framing::Newline => write!(f, "newline"),
        }
    }
}

impl Framing {
    /// Wrap a serialized message in this framing.
    pub fn encode(self, body: &str) -> Vec<u8> {
        match self {
            Framing::ContentLength => {
                format!("Content-Length: {}\r\n\r\n{}", body.len(), body).into_bytes()
            }
            Framing::Newline => format!("{body}\n").into_bytes(),
        }
    }
}

fn invalid(message: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.into())
}

/// Reads framed messages from a buffered stream.
///
/// A frame that cannot be decoded yields an `InvalidData` error; the reader
/// stays usable and the next call starts at the following frame.
pub struct FrameReader<R> {
    reader: R,
    framing: Framing,
    max_len: usize,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    pub fn new(reader: R, framing: Framing) -> Self {
        Self {
            reader,
            framing,
            max_len: MAX_FRAME_LEN,
        }
    }

    /// Reject `Content-Length` bodies larger than `max_len` bytes.
    pub fn with_max_frame_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// The next message body, or `None` at end of input.
    pub async fn next_frame(&mut self) -> io::Result<Option<String>> {
        match self.framing {
            Framing::Newline => self.next_line().await,
            Framing::ContentLength => self.next_content().await,
        }
    }

    async fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                return Ok(None);
            }
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_string()));
            }
        }
    }

    async fn next_content(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        let mut length: Option<Result<usize, String>> = None;
        let mut in_headers = false;
        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                if in_headers {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "input ended inside a header block",
                    ));
                }
                return Ok(None);
            }
            let header = line.trim_end_matches(&['\r', '\n'][..]);
            if header.is_empty() {
                if in_headers {
                    break;
                }
                continue;
            }
            in_headers = true;
            if let Some((name, value)) = header.split_once(':') {
                if name.trim().eq_ignore_ascii_case("content-length") {
                    let value = value.trim();
                    length = Some(
                        value
                            .parse::<usize>()
                            .map_err(|_| format!("bad Content-Length: {value}")),
                    );
                }
            }
        }

        let length = match length {
            Some(Ok(length)) => length,
            Some(Err(message)) => return Err(invalid(message)),
            None => return Err(invalid("missing Content-Length header")),
        };
        if length > self.max_len {
            // Skip the body unread so the next frame starts in the right place.
            let mut body = (&mut self.reader).take(length as u64);
            tokio::io::copy(&mut body, &mut tokio::io::sink()).await?;
            return Err(invalid(format!(
                "Content-Length {length} exceeds the {} byte limit",
                self.max_len
            )));
        }
        let mut body = vec![0u8; length];
        self.reader.read_exact(&mut body).await?;
        String::from_utf8(body)
            .map(Some)
            .map_err(|_| invalid("message body is not UTF-8"))
    }
}
