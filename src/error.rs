//! Crate-wide error type

use std::io;

/// Errors surfaced at server setup time (spec.md §7 "Setup-time fatal").
///
/// These are the only errors that unwind out of the run loop; everything else observed
/// once the reactor is running is recorded on the offending connection and surfaced
/// through the normal close path instead.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// `port` fell outside `[1024, 65535]`.
    #[error("port {0} out of range [1024, 65535]")]
    InvalidPort(u16),

    /// `trigMode` was not one of the four documented codes.
    #[error("trigger mode {0} is not one of 0, 1, 2, 3")]
    InvalidTriggerMode(u8),

    /// Binding, listening, or registering the listening socket failed.
    #[error("failed to set up listening socket: {0}")]
    Socket(#[source] io::Error),

    /// The readiness multiplexer could not be created.
    #[error("failed to initialize readiness multiplexer: {0}")]
    Poller(#[source] io::Error),
}

/// Result alias for setup-time fallible operations.
pub type ServerResult<T> = std::result::Result<T, ServerError>;
