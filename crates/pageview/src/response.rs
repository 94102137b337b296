//! Response shell handed out by views.
//!
//! A [`ResponseShell`] is the outbound half of a request as far as rendering
//! is concerned: a status code, headers, and a rewindable in-memory [`Body`].
//! Rendering writes into the body; the caller rewinds it and reads the content
//! back, or converts the whole shell into an [`http::Response`].

use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

use http::{HeaderMap, StatusCode};

/// In-memory response body with stream semantics.
///
/// Writes happen at the cursor position, reads continue from it. After writing,
/// call [`rewind`](Body::rewind) to read the body from offset 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    inner: Cursor<Vec<u8>>,
}

impl Body {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the cursor back to the start of the body.
    pub fn rewind(&mut self) {
        self.inner.set_position(0);
    }

    /// Reads everything from the cursor to the end as UTF-8 text.
    pub fn contents(&mut self) -> io::Result<String> {
        let mut out = String::new();
        self.inner.read_to_string(&mut out)?;
        Ok(out)
    }

    /// The complete body, regardless of the cursor position.
    pub fn as_bytes(&self) -> &[u8] {
        self.inner.get_ref()
    }

    pub fn len(&self) -> usize {
        self.inner.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.get_ref().is_empty()
    }

    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.inner.into_inner()
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for Body {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for Body {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

/// Status, headers and body of an outgoing response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseShell {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
}

impl ResponseShell {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Body::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Sets the status, returning `self` for chaining.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Converts into an [`http::Response`] carrying the full body.
    pub fn into_http(self) -> http::Response<Vec<u8>> {
        let mut response = http::Response::new(self.body.into_bytes());
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
