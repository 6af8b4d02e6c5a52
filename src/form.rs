//! `POST /login` — the one demo form route carried over from the original server's
//! `HttpConn::MakeResponse`/`HttpConn::ParseFromCgi`-adjacent CGI-form handling, named
//! explicitly in the supplemented-features section of the expanded spec. Nothing else
//! is routed: nameless paths and every other method fall through to static-file lookup
//! or 404 in `crate::connection`.

use crate::db::DbPool;
use crate::http::{Response, Status, Version};

/// Handles a submitted login form body (`application/x-www-form-urlencoded`:
/// `user=...&password=...`), checking it against `pool`.
pub fn handle_login(pool: &DbPool, body: &[u8]) -> Response {
    let fields = parse_form_body(body);
    let user = fields.get("user").map(String::as_str).unwrap_or("");
    let password = fields.get("password").map(String::as_str).unwrap_or("");

    let conn = pool.checkout();
    if conn.authenticate(user, password) {
        Response::new(Version::H1_1, Status::Ok).body(b"login succeeded".to_vec())
    } else {
        Response::new(Version::H1_1, Status::Forbidden).body(b"login failed".to_vec())
    }
}

fn parse_form_body(body: &[u8]) -> std::collections::HashMap<String, String> {
    let body = String::from_utf8_lossy(body);
    body.split('&')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            Some((percent_decode(name), percent_decode(value)))
        })
        .collect()
}

/// Decodes `+` as space and `%XX` escapes. Malformed escapes pass through unchanged
/// rather than erroring — a malformed login form simply fails authentication. Works on
/// raw bytes throughout, never slicing `input` by offset, since a `%` can be followed by
/// bytes belonging to a multi-byte UTF-8 sequence that don't fall on a char boundary.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => match (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                (Some(hi), Some(lo)) => {
                    out.push(hi * 16 + lo);
                    i += 3;
                }
                _ => {
                    out.push(bytes[i]);
                    i += 1;
                }
            },
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_credentials_succeed() {
        let pool = DbPool::new(1);
        let resp = handle_login(&pool, b"user=admin&password=admin");
        assert_eq!(Status::Ok, resp.status());
    }

    #[test]
    fn wrong_credentials_are_forbidden() {
        let pool = DbPool::new(1);
        let resp = handle_login(&pool, b"user=admin&password=wrong");
        assert_eq!(Status::Forbidden, resp.status());
    }

    #[test]
    fn percent_decode_handles_escapes_and_plus() {
        assert_eq!("a b+c", percent_decode("a%20b%2Bc"));
    }

    #[test]
    fn percent_decode_does_not_panic_on_non_ascii_after_percent() {
        assert_eq!("a%€", percent_decode("a%€"));
    }
}
