//! Request routing: static-file lookup plus the one demo form endpoint.
//!
//! Grounded on `HttpConn::MakeResponse`'s status-to-page mapping: anything that isn't a
//! known static file, and any response that would carry a server error status, is
//! collapsed to a fixed in-memory 404 page rather than leaking error detail to the
//! client (SPEC_FULL.md's supplemented status-to-page mapping).

use std::path::{Path, PathBuf};

use crate::db::DbPool;
use crate::form;
use crate::http::{Method, Request, Response, Status, Version};
use crate::static_file::{self, StaticFile};

/// Owns the static-file root and the demo login form's connection pool; shared
/// read-only across worker threads.
pub struct Router {
    static_root: PathBuf,
    db: DbPool,
}

impl Router {
    pub fn new(static_root: PathBuf, conn_pool_num: usize) -> Self {
        Self {
            static_root,
            db: DbPool::new(conn_pool_num),
        }
    }

    /// Builds a response for `request`. `body` is whatever request-body bytes had
    /// already arrived by the time headers were parsed (see
    /// `crate::connection::Connection::take_body`).
    pub fn route(&self, request: &Request, body: Vec<u8>) -> (Response, Option<StaticFile>) {
        let (response, file) = self.route_inner(request, body);
        if response.status().collapses_to_not_found() {
            (not_found(request.version, request.keep_alive), None)
        } else {
            (response, file)
        }
    }

    fn route_inner(&self, request: &Request, body: Vec<u8>) -> (Response, Option<StaticFile>) {
        if request.method == Method::Post && request.path == "/login" {
            let response = form::handle_login(&self.db, &body)
                .header("Connection", connection_value(request.keep_alive));
            return (response, None);
        }

        if !matches!(request.method, Method::Get | Method::Head) {
            return (not_found(request.version, request.keep_alive), None);
        }

        self.serve_static(request)
    }

    fn serve_static(&self, request: &Request) -> (Response, Option<StaticFile>) {
        let Some(path) = static_file::resolve(&self.static_root, &request.path) else {
            return (not_found(request.version, request.keep_alive), None);
        };

        match StaticFile::open(&path) {
            Ok(file) => {
                let response = Response::new(request.version, Status::Ok)
                    .header("Content-Type", content_type(&path))
                    .header("Connection", connection_value(request.keep_alive))
                    .content_length(file.len());
                (response, Some(file))
            }
            Err(_) => (not_found(request.version, request.keep_alive), None),
        }
    }
}

const NOT_FOUND_BODY: &[u8] = b"<html><body><h1>404 Not Found</h1></body></html>";

fn not_found(version: Version, keep_alive: bool) -> Response {
    Response::new(version, Status::NotFound)
        .header("Content-Type", "text/html")
        .header("Connection", connection_value(keep_alive))
        .body(NOT_FOUND_BODY.to_vec())
}

/// `Connection` header value reflecting the request's negotiated keep-alive state
/// (spec.md §6).
fn connection_value(keep_alive: bool) -> &'static str {
    if keep_alive {
        "keep-alive"
    } else {
        "close"
    }
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html" | "htm") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_path_maps_to_404() {
        let router = Router::new(PathBuf::from("/nonexistent-root"), 1);
        let request = Request {
            method: Method::Get,
            path: "/missing.html".to_string(),
            version: Version::H1_1,
            headers: Default::default(),
            keep_alive: true,
            content_length: 0,
        };
        let (response, file) = router.route(&request, Vec::new());
        assert_eq!(Status::NotFound, response.status());
        assert!(file.is_none());
    }

    #[test]
    fn post_to_unrouted_path_is_404() {
        let router = Router::new(PathBuf::from("/nonexistent-root"), 1);
        let request = Request {
            method: Method::Post,
            path: "/submit".to_string(),
            version: Version::H1_1,
            headers: Default::default(),
            keep_alive: true,
            content_length: 0,
        };
        let (response, _) = router.route(&request, Vec::new());
        assert_eq!(Status::NotFound, response.status());
    }

    #[test]
    fn connection_header_reflects_request_keep_alive() {
        let router = Router::new(PathBuf::from("/nonexistent-root"), 1);
        let mut request = Request {
            method: Method::Get,
            path: "/missing.html".to_string(),
            version: Version::H1_1,
            headers: Default::default(),
            keep_alive: false,
            content_length: 0,
        };

        let (response, _) = router.route(&request, Vec::new());
        let head = String::from_utf8(response.serialize_head()).unwrap();
        assert!(head.contains("Connection: close\r\n"));

        request.keep_alive = true;
        let (response, _) = router.route(&request, Vec::new());
        let head = String::from_utf8(response.serialize_head()).unwrap();
        assert!(head.contains("Connection: keep-alive\r\n"));
    }
}
