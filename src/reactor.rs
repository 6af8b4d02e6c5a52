//! C5 — the single-reactor event loop.
//!
//! Generalizes the teacher's `Listener`/`Worker` split (`src/listener.rs`,
//! `src/worker.rs`): one thread owns the `Poller`/`TimerHeap`/listening socket and the
//! connection table, workers in `crate::pool::WorkerPool` run each connection's
//! read/write pass, and a `crossbeam_channel` + `mio::Waker` pair (here carrying a
//! [`Signal`] instead of a bare `Token`, so the reactor knows whether to rearm or close
//! without re-locking the connection) reports outcomes back to the reactor thread —
//! the only thread allowed to touch `Poller`/`TimerHeap`/the connection table.

use std::io::{self, ErrorKind, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use mio::{Token, Waker};
use slab::Slab;

use crate::config::{Config, TriggerMode};
use crate::connection::{Connection, Progress};
use crate::error::{ServerError, ServerResult};
use crate::net;
use crate::poller::Poller;
use crate::pool::WorkerPool;
use crate::router::Router;
use crate::timer::TimerHeap;

const LISTEN_TOKEN: Token = Token(usize::MAX);
const WAKE_TOKEN: Token = Token(usize::MAX - 1);

/// Upper bound on how long a `poller.wait()` call blocks even with no timer deadline
/// pending, so `Reactor::run`'s shutdown flag is checked at a steady cadence.
const SHUTDOWN_POLL_MS: u64 = 1000;

/// Literal bytes sent, with no HTTP framing, to a connection refused for being over
/// capacity — unchanged from the original's admission-control message.
const BUSY_MESSAGE: &[u8] = b"Server busy!";

/// What a worker reports back about a connection it just drove one step forward.
enum Signal {
    /// Re-arm for the connection's (possibly new) phase and keep going.
    Continue(Token),
    /// Close and tear the connection down.
    Close(Token),
}

/// Ties C1-C4 together into the running server.
pub struct Reactor {
    poller: Poller,
    timer: TimerHeap,
    pool: WorkerPool,
    listener: mio::net::TcpListener,
    connections: Slab<Arc<Mutex<Connection>>>,
    listener_edge_triggered: bool,
    connection_edge_triggered: bool,
    idle_timeout: Option<Duration>,
    max_conn: usize,
    router: Arc<Router>,
    completions_tx: Sender<Signal>,
    completions_rx: Receiver<Signal>,
    waker: Arc<Waker>,
}

impl Reactor {
    /// Builds and binds the reactor: listening socket, readiness multiplexer, worker
    /// pool, and the shared router. Nothing is accepted until [`Reactor::run`] is
    /// called.
    pub fn new(config: &Config, mode: TriggerMode, static_root: std::path::PathBuf) -> ServerResult<Self> {
        let mut listener = net::bind_listener(config.port, config.opt_linger)?;
        let poller = Poller::new(1024).map_err(ServerError::Poller)?;

        poller
            .register(&mut listener, LISTEN_TOKEN, mio::Interest::READABLE)
            .map_err(ServerError::Poller)?;
        let waker = Arc::new(poller.make_waker(WAKE_TOKEN).map_err(ServerError::Poller)?);

        let (completions_tx, completions_rx) = bounded(4096);
        let idle_timeout = (config.timeout_ms > 0).then(|| Duration::from_millis(config.timeout_ms as u64));

        Ok(Self {
            poller,
            timer: TimerHeap::new(),
            pool: WorkerPool::new(config.thread_num, 4096),
            listener,
            connections: Slab::new(),
            listener_edge_triggered: mode.listener_edge_triggered(),
            connection_edge_triggered: mode.connection_edge_triggered(),
            idle_timeout,
            max_conn: config.max_conn,
            router: Arc::new(Router::new(static_root, config.conn_pool_num)),
            completions_tx,
            completions_rx,
            waker,
        })
    }

    /// Runs the event loop until `shutdown` is set. Returns once every in-flight
    /// connection has been torn down and the worker pool has drained and joined.
    pub fn run(mut self, shutdown: &AtomicBool) -> io::Result<()> {
        while !shutdown.load(Ordering::Relaxed) {
            let wait_ms = self.next_wait_ms();
            let events = self.poller.wait(Some(wait_ms))?;

            for (token, readiness) in events {
                match token {
                    LISTEN_TOKEN => {
                        if let Err(e) = self.accept() {
                            tracing::error!(error = %e, "accept loop failed");
                        }
                    }
                    WAKE_TOKEN => self.drain_completions(),
                    _ => self.dispatch(token, readiness),
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    fn next_wait_ms(&mut self) -> u64 {
        let now = Instant::now();
        let mut expired = Vec::new();
        let next_deadline_ms = self.timer.tick(now, |token| expired.push(token));
        for token in expired {
            tracing::debug!(?token, "connection idle timeout");
            self.close_connection(token);
        }
        next_deadline_ms.map_or(SHUTDOWN_POLL_MS, |ms| ms.min(SHUTDOWN_POLL_MS))
    }

    /// Accepts per the configured listener trigger mode: drains to `WouldBlock` when
    /// edge-triggered, or accepts at most once per wakeup when level-triggered, mirroring
    /// `Connection::read`'s `read_drain`/`read_once` split for the same reason (spec.md
    /// §4.1, §4.4).
    fn accept(&mut self) -> io::Result<()> {
        if self.listener_edge_triggered {
            self.accept_drain()
        } else {
            self.accept_once()
        }
    }

    fn accept_drain(&mut self) -> io::Result<()> {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => self.admit(stream, peer),
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    fn accept_once(&mut self) -> io::Result<()> {
        match self.listener.accept() {
            Ok((stream, peer)) => {
                self.admit(stream, peer);
                Ok(())
            }
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn admit(&mut self, mut stream: mio::net::TcpStream, peer: SocketAddr) {
        if self.connections.len() >= self.max_conn {
            let _ = stream.write_all(BUSY_MESSAGE);
            let _ = stream.flush();
            tracing::warn!(%peer, "connection refused: server at capacity");
            return;
        }

        let entry = self.connections.vacant_entry();
        let token = Token(entry.key());
        let mut connection = Connection::new(token, stream, peer, self.connection_edge_triggered);

        if let Err(e) = connection.register(&self.poller) {
            tracing::warn!(error = %e, %peer, "failed to register accepted connection");
            return;
        }

        if let Some(ttl) = self.idle_timeout {
            self.timer.add(token, ttl, Instant::now());
        }

        entry.insert(Arc::new(Mutex::new(connection)));
        tracing::debug!(%peer, ?token, "accepted connection");
    }

    fn dispatch(&mut self, token: Token, readiness: crate::poller::Readiness) {
        let Some(conn_arc) = self.connections.get(token.0).cloned() else {
            return;
        };

        if readiness.is_close_signal() {
            self.close_connection(token);
            return;
        }

        let router = self.router.clone();
        let completions = self.completions_tx.clone();
        let waker = self.waker.clone();

        self.pool.submit(Box::new(move || {
            let signal = run_one_step(&conn_arc, &router, token);
            if completions.send(signal).is_ok() {
                let _ = waker.wake();
            }
        }));
    }

    fn drain_completions(&mut self) {
        loop {
            match self.completions_rx.try_recv() {
                Ok(Signal::Continue(token)) => self.handle_continue(token),
                Ok(Signal::Close(token)) => self.close_connection(token),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn handle_continue(&mut self, token: Token) {
        let Some(conn_arc) = self.connections.get(token.0).cloned() else {
            return;
        };

        if let Some(ttl) = self.idle_timeout {
            self.timer.adjust(token, ttl, Instant::now());
        }

        let rearm_result = {
            let mut conn = conn_arc.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            conn.rearm(&self.poller)
        };

        if let Err(e) = rearm_result {
            tracing::warn!(error = %e, ?token, "failed to rearm connection");
            self.close_connection(token);
        }
    }

    fn close_connection(&mut self, token: Token) {
        self.timer.cancel(token);
        if let Some(conn_arc) = self.connections.try_remove(token.0) {
            let mut conn = conn_arc.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let _ = conn.deregister(&self.poller);
        }
    }

    fn shutdown(self) {
        tracing::info!("reactor shutting down, draining worker pool");
        self.pool.shutdown();
    }
}

/// Runs one read-or-write pass for a connection on a worker thread, routing and
/// preparing a response when a request completes, per spec.md §4.3-4.4.
fn run_one_step(conn_arc: &Arc<Mutex<Connection>>, router: &Router, token: Token) -> Signal {
    let mut conn = conn_arc.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let progress = if conn.wants_write() { conn.write() } else { conn.read() };

    match progress {
        Ok(Progress::Pending) => Signal::Continue(token),
        Ok(Progress::RequestReady) => {
            if let Some(request) = conn.take_request() {
                let body = conn.take_body(request.content_length);
                let (response, file) = router.route(&request, body);
                conn.prepare_response(&response, file);
            }
            Signal::Continue(token)
        }
        Ok(Progress::ResponseSent) => {
            if conn.is_keep_alive() {
                Signal::Continue(token)
            } else {
                Signal::Close(token)
            }
        }
        Ok(Progress::Closed) => Signal::Close(token),
        Err(e) => {
            tracing::debug!(error = %e, ?token, "connection io error");
            Signal::Close(token)
        }
    }
}
