//! Process-wide logging setup.
//!
//! Stands in for the spec's opaque "Logger" collaborator: a level-filtered,
//! line-oriented sink that never blocks the reactor or a worker. `tracing-appender`'s
//! non-blocking writer gives us the bounded async queue the original described via
//! `logQueSize`.

use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

/// Initializes the global `tracing` subscriber per the server's logging configuration.
///
/// Returns a [`WorkerGuard`] that must be kept alive for the process lifetime; dropping
/// it flushes and stops the background logging thread.
///
/// When `open_log` is false, the filter is set to `off` entirely, mirroring the
/// original's `if(openLog) { ... }` guard around `Log::Instance()->init(...)`.
pub fn init(config: &Config) -> WorkerGuard {
    let filter = if config.open_log {
        EnvFilter::try_new(config.log_level.as_filter_directive())
            .unwrap_or_else(|_| EnvFilter::new("info"))
    } else {
        EnvFilter::new("off")
    };

    let (writer, guard) = NonBlockingBuilder::default()
        .buffered_lines_limit(config.log_que_size.max(1))
        .finish(std::io::stdout());

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("logging subscriber installed more than once");

    guard
}
