//! Listening-socket setup.
//!
//! `mio::net::TcpListener` doesn't expose `SO_REUSEADDR`/`SO_LINGER`/backlog, so the
//! socket is built with `socket2` and then handed to mio, mirroring
//! `WebServer::InitSocket_` in the original source (bind/listen/setsockopt, then
//! register with the event loop).

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};

use crate::error::{ServerError, ServerResult};

/// `listen()` backlog, unchanged from spec.md §6.
const BACKLOG: i32 = 6;

/// Binds, configures, and begins listening on `INADDR_ANY:port`.
///
/// `linger` enables `SO_LINGER` with a 1 second linger, per spec.md §6's `optLinger`.
pub fn bind_listener(port: u16, linger: bool) -> ServerResult<mio::net::TcpListener> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP)).map_err(ServerError::Socket)?;

    socket.set_reuse_address(true).map_err(ServerError::Socket)?;
    if linger {
        socket
            .set_linger(Some(Duration::from_secs(1)))
            .map_err(ServerError::Socket)?;
    }

    let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
    socket.bind(&addr.into()).map_err(ServerError::Socket)?;
    socket.listen(BACKLOG).map_err(ServerError::Socket)?;
    socket.set_nonblocking(true).map_err(ServerError::Socket)?;

    Ok(mio::net::TcpListener::from_std(socket.into()))
}
