//! Response head construction.
//!
//! Grounded on the teacher's `parser::h1::response::Response` skeleton, extended with a
//! `serialize_head` method: the teacher never finished serialization, and the original
//! C++ server's `HttpConn::MakeResponse` never needed one because it wrote status line,
//! headers and body through the same buffer. Here the head is kept separate from the
//! body so `Connection::write` (`crate::connection`) can hand the body off as its own
//! `IoSlice` — either inline bytes or an mmap'd file region — without copying it
//! through the head buffer.

use super::status::Status;
use super::version::Version;

/// A response head plus an optional inline body. A response serving a static file
/// leaves `body` empty and stores the mapped region on the connection instead.
#[derive(Debug)]
pub struct Response {
    version: Version,
    status: Status,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    /// Starts a response with no headers and an empty body.
    pub fn new(version: Version, status: Status) -> Self {
        Self {
            version,
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Appends a header line.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets an inline body and its `Content-Length`.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self = self.header("Content-Length", body.len().to_string());
        self.body = body;
        self
    }

    /// Declares the body's length without supplying it inline (used when the body will
    /// be written separately, e.g. from an mmap'd file).
    pub fn content_length(self, len: usize) -> Self {
        self.header("Content-Length", len.to_string())
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// The inline body, if any (empty for static-file responses).
    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }

    /// Serializes the status line and headers, terminated by a blank line. Does not
    /// include `body_bytes()` — the caller writes that separately.
    pub fn serialize_head(&self) -> Vec<u8> {
        let mut head = Vec::with_capacity(128);
        head.extend_from_slice(self.version.to_string().as_bytes());
        head.push(b' ');
        head.extend_from_slice(self.status.to_string().as_bytes());
        head.extend_from_slice(b"\r\n");

        for (name, value) in &self.headers {
            head.extend_from_slice(name.as_bytes());
            head.extend_from_slice(b": ");
            head.extend_from_slice(value.as_bytes());
            head.extend_from_slice(b"\r\n");
        }

        head.extend_from_slice(b"\r\n");
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_status_line_and_headers() {
        let resp = Response::new(Version::H1_1, Status::Ok)
            .header("Content-Type", "text/html")
            .body(b"hi".to_vec());

        let head = String::from_utf8(resp.serialize_head()).unwrap();
        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(head.contains("Content-Type: text/html\r\n"));
        assert!(head.contains("Content-Length: 2\r\n"));
        assert!(head.ends_with("\r\n\r\n"));
        assert_eq!(b"hi", resp.body_bytes());
    }

    #[test]
    fn content_length_without_inline_body_declares_length_only() {
        let resp = Response::new(Version::H1_1, Status::Ok).content_length(4096);
        assert!(resp.body_bytes().is_empty());
        assert!(String::from_utf8(resp.serialize_head())
            .unwrap()
            .contains("Content-Length: 4096\r\n"));
    }
}
