//! HTTP status codes.
//! [RFC 9110 Section 15](https://www.rfc-editor.org/rfc/rfc9110#section-15)

use std::fmt::Display;

/// HTTP status code and its canonical reason phrase.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// 15.3.1
    Ok = 200,
    /// 15.3.5
    NoContent = 204,
    /// 15.5.1
    BadRequest = 400,
    /// 15.5.4
    Forbidden = 403,
    /// 15.5.5
    NotFound = 404,
    /// 15.6.1
    InternalServerError = 500,
    /// 15.6.4
    ServiceUnavailable = 503,
}

impl Status {
    /// The canonical reason phrase, e.g. `"OK"` for 200.
    pub fn reason_phrase(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NoContent => "No Content",
            Self::BadRequest => "Bad Request",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
            Self::InternalServerError => "Internal Server Error",
            Self::ServiceUnavailable => "Service Unavailable",
        }
    }

    /// Per spec.md §6: "A request producing status >= 500 and unknown paths map to
    /// 404"; this reports whether `self` is in the range that should instead present
    /// as 404 to the client.
    pub fn collapses_to_not_found(self) -> bool {
        (self as u16) >= 500
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", *self as u16, self.reason_phrase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_code_and_reason_phrase() {
        assert_eq!("200 OK", Status::Ok.to_string());
        assert_eq!("404 Not Found", Status::NotFound.to_string());
    }

    #[test]
    fn server_errors_collapse_to_not_found() {
        assert!(Status::InternalServerError.collapses_to_not_found());
        assert!(Status::ServiceUnavailable.collapses_to_not_found());
        assert!(!Status::BadRequest.collapses_to_not_found());
    }
}
