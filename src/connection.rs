//! C4 — per-connection state machine.
//!
//! Replaces the teacher's generic `Connection<S>`/`PlainConnection<S>`/`TlsConnection<S>`
//! trio (TLS is a non-goal here) with one concrete type over `mio::net::TcpStream`,
//! cycling `Reading -> Processing -> Writing -> (Reading | Closed)` per spec.md §3-4.4.
//! Reads and writes are hand-rolled against the socket directly rather than through
//! `crate::buffer::Buffer::append_from`, because the reactor needs to tell "peer closed
//! (`Ok(0)`)" apart from "drained for now (`WouldBlock`)" — a distinction
//! `append_from`'s collapsed return value doesn't preserve.

use std::io::{self, ErrorKind, IoSlice, Read, Write};
use std::net::SocketAddr;

use mio::net::TcpStream;
use mio::Token;

use crate::buffer::Buffer;
use crate::http::request::{self, ParseOutcome};
use crate::http::{Request, Response, Status, Version};
use crate::poller::{connection_interest, Poller};
use crate::static_file::StaticFile;

/// Body for the synthesized 400 sent when a request can never parse, mirroring
/// `HttpConn::process`'s `response_.Init(srcDir, request_.path(), false, 400)` in
/// original_source/.
const BAD_REQUEST_BODY: &[u8] = b"<html><body><h1>400 Bad Request</h1></body></html>";

/// Matches `ToWriteBytes() > 10240` in the original: once a single write pass has
/// pushed this many bytes, yield back to the reactor rather than draining forever, so
/// one connection can't starve the rest of the ready queue.
pub const ET_WRITE_DRAIN_THRESHOLD: usize = 10 * 1024;

const READ_BUF_INITIAL: usize = 2 * 1024;
const WRITE_BUF_INITIAL: usize = 2 * 1024;
const READ_CHUNK: usize = 16 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Reading,
    Writing,
}

/// Outcome of one `read`/`write` pass, telling the reactor what to do next.
#[derive(Debug, PartialEq, Eq)]
pub enum Progress {
    /// No full request/response yet; re-arm for the same interest and keep waiting.
    Pending,
    /// A full request was parsed; the caller should route it and call
    /// [`Connection::prepare_response`].
    RequestReady,
    /// The response finished sending; the connection is back in the Reading phase.
    ResponseSent,
    /// The peer closed, or an unrecoverable error occurred; the caller should close.
    Closed,
}

/// One accepted connection: its socket, buffers, and where it sits in the
/// request/response cycle.
pub struct Connection {
    token: Token,
    stream: TcpStream,
    peer: SocketAddr,
    read_buf: Buffer,
    write_buf: Buffer,
    static_file: Option<StaticFile>,
    file_offset: usize,
    phase: Phase,
    edge_triggered: bool,
    keep_alive: bool,
    pending_request: Option<Request>,
}

impl Connection {
    /// Wraps a freshly accepted stream. `edge_triggered` comes from
    /// `TriggerMode::connection_edge_triggered` and decides whether `read`/`write` loop
    /// to `WouldBlock` or stop after a single pass (spec.md §4.1, §4.4); either way the
    /// registration itself is the same (`poller::connection_interest`).
    pub fn new(token: Token, stream: TcpStream, peer: SocketAddr, edge_triggered: bool) -> Self {
        Self {
            token,
            stream,
            peer,
            read_buf: Buffer::new(READ_BUF_INITIAL),
            write_buf: Buffer::new(WRITE_BUF_INITIAL),
            static_file: None,
            file_offset: 0,
            phase: Phase::Reading,
            edge_triggered,
            keep_alive: true,
            pending_request: None,
        }
    }

    pub fn token(&self) -> Token {
        self.token
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Whether the connection is in the Writing phase — the reactor uses this to pick
    /// `read()` vs `write()` when dispatching a readiness notification to a worker.
    pub fn wants_write(&self) -> bool {
        matches!(self.phase, Phase::Writing)
    }

    /// One-shot registers for the connection's current phase.
    pub fn register(&mut self, poller: &Poller) -> io::Result<()> {
        poller.register(&mut self.stream, self.token, connection_interest(false))
    }

    /// Re-arms the one-shot registration for the connection's current phase. Must be
    /// called after every `read`/`write` pass, per spec.md §4.1's re-arm discipline.
    pub fn rearm(&mut self, poller: &Poller) -> io::Result<()> {
        let want_write = matches!(self.phase, Phase::Writing);
        poller.modify(&mut self.stream, self.token, connection_interest(want_write))
    }

    pub fn deregister(&mut self, poller: &Poller) -> io::Result<()> {
        poller.unregister(&mut self.stream)
    }

    /// Reads available bytes into the read buffer and attempts to parse a request out
    /// of it, per spec.md §4.4's Reading phase.
    pub fn read(&mut self) -> io::Result<Progress> {
        debug_assert_eq!(Phase::Reading, self.phase);

        let peer_closed = if self.edge_triggered {
            self.read_drain()?
        } else {
            self.read_once()?
        };

        match request::parse(self.read_buf.peek()) {
            ParseOutcome::Incomplete => {
                if peer_closed {
                    Ok(Progress::Closed)
                } else {
                    Ok(Progress::Pending)
                }
            }
            ParseOutcome::Malformed => {
                self.prepare_bad_request_response();
                Ok(Progress::Pending)
            }
            ParseOutcome::Complete { request, consumed } => {
                self.read_buf.retrieve(consumed);
                self.keep_alive = request.keep_alive;
                self.pending_request = Some(request);
                Ok(Progress::RequestReady)
            }
        }
    }

    /// Loops until the socket reports `WouldBlock` or EOF (edge-triggered mode).
    /// Returns whether the peer closed its write half.
    fn read_drain(&mut self) -> io::Result<bool> {
        let mut scratch = [0u8; READ_CHUNK];
        loop {
            match self.stream.read(&mut scratch) {
                Ok(0) => return Ok(true),
                Ok(n) => self.read_buf.write_all(&scratch[..n])?,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(false),
                Err(e) => return Err(e),
            }
        }
    }

    /// A single read attempt (level-triggered mode): the reactor trusts the next
    /// readiness notification to tell it more is waiting, rather than draining now.
    fn read_once(&mut self) -> io::Result<bool> {
        let mut scratch = [0u8; READ_CHUNK];
        loop {
            return match self.stream.read(&mut scratch) {
                Ok(0) => Ok(true),
                Ok(n) => {
                    self.read_buf.write_all(&scratch[..n])?;
                    Ok(false)
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(false),
                Err(e) => Err(e),
            };
        }
    }

    /// Takes the request parsed by the most recent `read`. Only valid to call once,
    /// right after `Progress::RequestReady`.
    pub fn take_request(&mut self) -> Option<Request> {
        self.pending_request.take()
    }

    /// Takes up to `len` already-buffered bytes following the header block, for a
    /// request body. Request bodies beyond whatever already arrived alongside the
    /// headers are out of scope (chunked/streamed bodies are a non-goal; the one body
    /// consumer, `crate::form`'s login route, only ever sees small same-packet
    /// payloads) — a body split across multiple reads comes back short.
    pub fn take_body(&mut self, len: usize) -> Vec<u8> {
        let available = self.read_buf.readable().min(len);
        let body = self.read_buf.peek()[..available].to_vec();
        self.read_buf.retrieve(available);
        body
    }

    /// Synthesizes a 400 response and switches into the Writing phase, instead of
    /// closing on zero response bytes, matching `HttpConn::process`'s unconditional
    /// `response_.Init(..., false, 400)` before `response_.MakeResponse` in
    /// original_source/. Marks the connection non-keep-alive so it closes once the
    /// response has been flushed (spec.md §4.4, §7).
    fn prepare_bad_request_response(&mut self) {
        let response = Response::new(Version::H1_1, Status::BadRequest)
            .header("Content-Type", "text/html")
            .header("Connection", "close")
            .body(BAD_REQUEST_BODY.to_vec());
        self.keep_alive = false;
        self.prepare_response(&response, None);
    }

    /// Loads `response`'s serialized head (and inline body, if `file` is `None`) into
    /// the write buffer, stashes `file` as a parallel gather-write slice otherwise, and
    /// switches into the Writing phase, per spec.md §4's gather-write design.
    pub fn prepare_response(&mut self, response: &Response, file: Option<StaticFile>) {
        self.write_buf.retrieve_all();
        let _ = self.write_buf.write_all(&response.serialize_head());
        if file.is_none() {
            let _ = self.write_buf.write_all(response.body_bytes());
        }
        self.static_file = file;
        self.file_offset = 0;
        self.phase = Phase::Writing;
    }

    /// Writes as much of the pending head (+ file) as the socket accepts, per spec.md
    /// §4.4's Writing phase and the `ET_WRITE_DRAIN_THRESHOLD` yield rule.
    pub fn write(&mut self) -> io::Result<Progress> {
        debug_assert_eq!(Phase::Writing, self.phase);

        let mut written_this_pass = 0usize;
        loop {
            if self.write_buf.readable() == 0 && self.file_remaining() == 0 {
                return Ok(self.finish_response());
            }

            let head = self.write_buf.peek();
            let file_tail = self
                .static_file
                .as_ref()
                .map(|f| &f.as_bytes()[self.file_offset..]);

            let result = match file_tail {
                Some(file) if !file.is_empty() => {
                    self.stream.write_vectored(&[IoSlice::new(head), IoSlice::new(file)])
                }
                _ => self.stream.write(head),
            };

            match result {
                Ok(0) => return Ok(Progress::Closed),
                Ok(n) => {
                    written_this_pass += n;
                    self.advance_write_cursors(n);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(Progress::Pending),
                Err(e) => return Err(e),
            }

            if self.write_buf.readable() == 0 && self.file_remaining() == 0 {
                return Ok(self.finish_response());
            }

            if !self.edge_triggered || written_this_pass >= ET_WRITE_DRAIN_THRESHOLD {
                return Ok(Progress::Pending);
            }
        }
    }

    fn file_remaining(&self) -> usize {
        self.static_file.as_ref().map_or(0, |f| f.len() - self.file_offset)
    }

    fn advance_write_cursors(&mut self, n: usize) {
        let head_len = self.write_buf.readable();
        if n <= head_len {
            self.write_buf.retrieve(n);
            return;
        }
        self.write_buf.retrieve(head_len);
        self.file_offset += n - head_len;
    }

    fn finish_response(&mut self) -> Progress {
        self.static_file = None;
        self.file_offset = 0;
        self.write_buf.retrieve_all();
        self.read_buf.retrieve_all();
        self.phase = Phase::Reading;
        Progress::ResponseSent
    }
}
