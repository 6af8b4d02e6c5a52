//! Request-line + header parsing.
//!
//! Unlike `rask`'s `H1Request<'buf, 'headers>`, which borrows straight out of the input
//! slice, a connection's read buffer is repeatedly mutated and compacted across I/O
//! phases (`Buffer::retrieve`/`compact` in `crate::buffer`), so fields are copied out
//! into an owned [`Request`] once a complete request is in hand. The byte-scanning
//! itself reuses the teacher's `RawRequest` cursor idiom (`crate::http::raw`).
//!
//! The header terminator `b"\r\n\r\n"` is located first so that "not enough bytes yet"
//! (`Incomplete`) can be told apart from "will never be valid" (`Malformed`) — the
//! teacher's parser never needed this distinction because it only ever ran over a
//! buffer already known to hold a full request.

use std::collections::HashMap;

use super::method::Method;
use super::raw::RawRequest;
use super::version::Version;

/// Upper bound on the request line + header block, mirroring the original server's
/// fixed-size per-connection read buffer. A head that grows past this without a
/// terminator is rejected rather than left `Incomplete` forever.
pub const MAX_HEAD_BYTES: usize = 8 * 1024;

/// A fully parsed request line and header block.
#[derive(Debug, Clone)]
pub struct Request {
    /// Request method.
    pub method: Method,
    /// Request target, e.g. `"/index.html"`. Always begins with `/` or is `*`.
    pub path: String,
    /// Request HTTP version.
    pub version: Version,
    /// Header name (lowercased) to value, last occurrence wins.
    pub headers: HashMap<String, String>,
    /// Whether the connection should persist after this request's response.
    pub keep_alive: bool,
    /// `Content-Length` header value, or 0 if absent.
    pub content_length: usize,
}

impl Request {
    /// Looks up a header by lowercased name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Result of attempting to parse a request out of a connection's read buffer.
#[derive(Debug)]
pub enum ParseOutcome {
    /// A full request line and header block were found. `consumed` is the number of
    /// bytes (including the terminating `\r\n\r\n`) the caller should retire from the
    /// read buffer; the request body, if any, follows immediately after.
    Complete { request: Request, consumed: usize },
    /// The buffer does not yet contain a full header block; the caller should keep
    /// reading.
    Incomplete,
    /// The bytes present can never form a valid request.
    Malformed,
}

/// Scans `buf` for a complete HTTP/1.1 request line and header block.
pub fn parse(buf: &[u8]) -> ParseOutcome {
    let Some(head_end) = find_header_terminator(buf) else {
        return if buf.len() > MAX_HEAD_BYTES {
            ParseOutcome::Malformed
        } else {
            ParseOutcome::Incomplete
        };
    };

    if head_end > MAX_HEAD_BYTES {
        return ParseOutcome::Malformed;
    }

    let head = &buf[..head_end];
    let mut cursor = RawRequest::new(head);

    let Some(method) = parse_method(&mut cursor) else {
        return ParseOutcome::Malformed;
    };
    let Some(path) = parse_target(&mut cursor) else {
        return ParseOutcome::Malformed;
    };
    let Some(version) = parse_version(&mut cursor) else {
        return ParseOutcome::Malformed;
    };
    let Some(headers) = parse_headers(&mut cursor) else {
        return ParseOutcome::Malformed;
    };

    let keep_alive = match headers.get("connection").map(String::as_str) {
        Some(v) if v.eq_ignore_ascii_case("close") => false,
        Some(v) if v.eq_ignore_ascii_case("keep-alive") => true,
        _ => version.keep_alive_by_default(),
    };

    let content_length = headers
        .get("content-length")
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    ParseOutcome::Complete {
        request: Request {
            method,
            path,
            version,
            headers,
            keep_alive,
            content_length,
        },
        consumed: head_end,
    }
}

/// Returns the index just past the first `b"\r\n\r\n"` in `buf`, if present.
fn find_header_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

fn parse_method(cursor: &mut RawRequest<'_>) -> Option<Method> {
    let token = cursor.take_until(|b| b == b' ')?;
    cursor.advance(1);
    Method::from_bytes(token)
}

fn parse_target(cursor: &mut RawRequest<'_>) -> Option<String> {
    let token = cursor.take_until(|b| b == b' ')?;
    if token.is_empty() || !token.is_ascii() {
        return None;
    }
    cursor.advance(1);
    Some(String::from_utf8_lossy(token).into_owned())
}

fn parse_version(cursor: &mut RawRequest<'_>) -> Option<Version> {
    let token = cursor.take_until(|b| b == b'\r')?;
    let suffix = token.strip_prefix(b"HTTP/")?;
    let version = Version::from_bytes(suffix)?;
    cursor.advance(1); // '\r'
    if cursor.peek() != Some(b'\n') {
        return None;
    }
    cursor.advance(1); // '\n'
    cursor.slice();
    Some(version)
}

fn parse_headers(cursor: &mut RawRequest<'_>) -> Option<HashMap<String, String>> {
    let mut headers = HashMap::new();

    loop {
        if cursor.peek() == Some(b'\r') {
            cursor.advance(1);
            if cursor.peek() != Some(b'\n') {
                return None;
            }
            cursor.advance(1);
            cursor.slice();
            return Some(headers);
        }

        let name = cursor.take_until(|b| b == b':')?;
        if name.is_empty() || !name.is_ascii() {
            return None;
        }
        cursor.advance(1); // ':'

        let value = cursor.take_until(|b| b == b'\r')?;
        cursor.advance(1); // '\r'
        if cursor.peek() != Some(b'\n') {
            return None;
        }
        cursor.advance(1); // '\n'
        cursor.slice();

        let name = String::from_utf8_lossy(name).trim().to_ascii_lowercase();
        let value = String::from_utf8_lossy(value).trim().to_string();
        headers.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_request_without_terminator() {
        let outcome = parse(b"GET / HTTP/1.1\r\nHost: example.com\r\n");
        assert!(matches!(outcome, ParseOutcome::Incomplete));
    }

    #[test]
    fn complete_get_request_with_headers() {
        let raw = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\nConnection: keep-alive\r\n\r\n";
        let outcome = parse(raw);
        let ParseOutcome::Complete { request, consumed } = outcome else {
            panic!("expected Complete");
        };
        assert_eq!(consumed, raw.len());
        assert_eq!(Method::Get, request.method);
        assert_eq!("/index.html", request.path);
        assert_eq!(Version::H1_1, request.version);
        assert_eq!(Some("example.com"), request.header("host"));
        assert!(request.keep_alive);
    }

    #[test]
    fn connection_close_overrides_http_1_1_default() {
        let raw = b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n";
        let ParseOutcome::Complete { request, .. } = parse(raw) else {
            panic!("expected Complete");
        };
        assert!(!request.keep_alive);
    }

    #[test]
    fn http_1_0_defaults_to_no_keep_alive() {
        let raw = b"GET / HTTP/1.0\r\n\r\n";
        let ParseOutcome::Complete { request, .. } = parse(raw) else {
            panic!("expected Complete");
        };
        assert!(!request.keep_alive);
    }

    #[test]
    fn content_length_is_parsed_for_a_post_body() {
        let raw = b"POST /login HTTP/1.1\r\nContent-Length: 11\r\n\r\n";
        let ParseOutcome::Complete { request, .. } = parse(raw) else {
            panic!("expected Complete");
        };
        assert_eq!(11, request.content_length);
    }

    #[test]
    fn unknown_method_is_malformed() {
        let raw = b"PATCH / HTTP/1.1\r\n\r\n";
        assert!(matches!(parse(raw), ParseOutcome::Malformed));
    }

    #[test]
    fn unknown_version_is_malformed() {
        let raw = b"GET / HTTP/2.0\r\n\r\n";
        assert!(matches!(parse(raw), ParseOutcome::Malformed));
    }

    #[test]
    fn oversized_head_without_terminator_is_malformed() {
        let mut raw = b"GET /".to_vec();
        raw.extend(std::iter::repeat(b'a').take(MAX_HEAD_BYTES + 1));
        assert!(matches!(parse(&raw), ParseOutcome::Malformed));
    }
}
