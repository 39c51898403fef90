//! Request and response channels.
//!
//! The engine reads one request at a time from a [`RequestChannel`] and writes
//! each payload to a [`ResponseChannel`]. Any `std::io::Write` is a response
//! channel; [`DelimitedReader`] turns any `BufRead` into a request channel.

use std::io::{self, BufRead, Read, Write};
use tracing::warn;

/// Default cap on a single request, delimiter excluded
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Source of request texts
pub trait RequestChannel {
    /// Next request, `None` at end of stream
    fn read_request(&mut self) -> io::Result<Option<String>>;
}

/// Sink for response payloads
pub trait ResponseChannel {
    fn write_response(&mut self, payload: &[u8]) -> io::Result<()>;
}

impl<W: Write + ?Sized> ResponseChannel for W {
    fn write_response(&mut self, payload: &[u8]) -> io::Result<()> {
        self.write_all(payload)?;
        self.flush()
    }
}

/// Splits a byte stream into requests on a delimiter.
///
/// The delimiter may span several bytes (`"\r\n"`, `"\n\n"`, ...). A trailing
/// fragment without delimiter at end of stream is returned as a final request.
/// Invalid UTF-8 is replaced rather than rejected. A request longer than the
/// configured maximum fails the read with `InvalidData`.
pub struct DelimitedReader<R> {
    inner: R,
    delimiter: Vec<u8>,
    max_request_bytes: usize,
    buffer: Vec<u8>,
}

impl<R: BufRead> DelimitedReader<R> {
    pub fn new(inner: R, delimiter: impl AsRef<[u8]>) -> Self {
        let delimiter = delimiter.as_ref().to_vec();
        Self {
            inner,
            delimiter: if delimiter.is_empty() {
                b"\n".to_vec()
            } else {
                delimiter
            },
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            buffer: Vec::new(),
        }
    }

    pub fn with_max_request_bytes(mut self, max_request_bytes: usize) -> Self {
        self.max_request_bytes = max_request_bytes;
        self
    }

    pub fn max_request_bytes(&self) -> usize {
        self.max_request_bytes
    }

    pub fn delimiter(&self) -> &[u8] {
        &self.delimiter
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: BufRead> RequestChannel for DelimitedReader<R> {
    fn read_request(&mut self) -> io::Result<Option<String>> {
        let last = self.delimiter[self.delimiter.len() - 1];
        let limit = self.max_request_bytes.saturating_add(self.delimiter.len());
        loop {
            let remaining = limit.saturating_sub(self.buffer.len());
            if remaining == 0 {
                let buffered = self.buffer.len();
                self.buffer.clear();
                warn!(
                    "Request exceeds {} bytes without a delimiter ({} buffered), rejecting",
                    self.max_request_bytes, buffered
                );
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("request exceeds {} bytes", self.max_request_bytes),
                ));
            }

            let read = (&mut self.inner)
                .take(remaining as u64)
                .read_until(last, &mut self.buffer)?;
            if read == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let request = String::from_utf8_lossy(&self.buffer).into_owned();
                self.buffer.clear();
                return Ok(Some(request));
            }

            if self.buffer.ends_with(&self.delimiter) {
                let end = self.buffer.len() - self.delimiter.len();
                let request = String::from_utf8_lossy(&self.buffer[..end]).into_owned();
                self.buffer.clear();
                return Ok(Some(request));
            }
        }
    }
}
