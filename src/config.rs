//! Startup configuration.
//!
//! Every parameter in spec.md §6 is surfaced here as a `clap` flag. Validation that the
//! original performed inline (`WebServer::WebServer`, `InitSocket_`) happens in
//! [`Config::validate`] so a bad flag fails before the listener is ever created.

use clap::{Parser, ValueEnum};

use crate::error::{ServerError, ServerResult};

/// `(listener ET?, connection ET?)` selection. Named after the original's four
/// `trigMode` values (spec.md §4.1, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    /// Listener level-triggered, connections level-triggered.
    LevelLevel,
    /// Listener level-triggered, connections edge-triggered.
    LevelEdge,
    /// Listener edge-triggered, connections level-triggered.
    EdgeLevel,
    /// Listener edge-triggered, connections edge-triggered.
    EdgeEdge,
}

impl TriggerMode {
    /// Maps the CLI's `0..=3` code to a mode, matching `WebServer::InitEventMode_`.
    ///
    /// Unlike the original, an out-of-range code is rejected rather than silently
    /// falling through to edge/edge — a CLI flag should fail closed on bad input.
    pub fn from_code(code: u8) -> ServerResult<Self> {
        match code {
            0 => Ok(Self::LevelLevel),
            1 => Ok(Self::LevelEdge),
            2 => Ok(Self::EdgeLevel),
            3 => Ok(Self::EdgeEdge),
            other => Err(ServerError::InvalidTriggerMode(other)),
        }
    }

    /// Whether the listening socket should be registered edge-triggered.
    pub fn listener_edge_triggered(self) -> bool {
        matches!(self, Self::EdgeLevel | Self::EdgeEdge)
    }

    /// Whether connection sockets should be registered edge-triggered.
    pub fn connection_edge_triggered(self) -> bool {
        matches!(self, Self::LevelEdge | Self::EdgeEdge)
    }
}

/// Log verbosity, passed through to the `tracing` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Errors only.
    Error,
    /// Warnings and errors.
    Warn,
    /// Informational, warnings, and errors.
    Info,
    /// Verbose debugging output.
    Debug,
}

impl LogLevel {
    /// Renders as an `EnvFilter` directive string.
    pub fn as_filter_directive(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

/// All startup parameters from spec.md §6, parsed from the process's command line.
#[derive(Debug, Clone, Parser)]
#[command(name = "reactord", about = "Single-reactor, multi-worker HTTP/1.1 server")]
pub struct Config {
    /// TCP listen port; must be in [1024, 65535].
    #[arg(long, default_value_t = 9006)]
    pub port: u16,

    /// (listener ET?, connection ET?) selector in {0,1,2,3}.
    #[arg(long = "trig-mode", default_value_t = 0)]
    pub trig_mode: u8,

    /// Idle timeout in milliseconds; `<= 0` disables idle eviction entirely.
    #[arg(long = "timeout-ms", default_value_t = 60_000)]
    pub timeout_ms: i64,

    /// Enable `SO_LINGER` with a 1 second linger for graceful close.
    #[arg(long = "opt-linger", default_value_t = false)]
    pub opt_linger: bool,

    /// Database host/port for the demo login-form connection pool.
    #[arg(long = "sql-port", default_value_t = 3306)]
    pub sql_port: u16,

    /// Database user for the demo login-form connection pool.
    #[arg(long = "sql-user", default_value = "root")]
    pub sql_user: String,

    /// Database password for the demo login-form connection pool.
    #[arg(long = "sql-pwd", default_value = "")]
    pub sql_pwd: String,

    /// Database name for the demo login-form connection pool.
    #[arg(long = "db-name", default_value = "reactord")]
    pub db_name: String,

    /// Number of pooled DB connections.
    #[arg(long = "conn-pool-num", default_value_t = 4)]
    pub conn_pool_num: usize,

    /// Number of worker threads draining the readiness queue.
    #[arg(long = "thread-num", default_value_t = 4)]
    pub thread_num: usize,

    /// Enable logging at all.
    #[arg(long = "open-log", default_value_t = true)]
    pub open_log: bool,

    /// Logging verbosity.
    #[arg(long = "log-level", value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Bound on the logger's internal async queue.
    #[arg(long = "log-que-size", default_value_t = 1024)]
    pub log_que_size: usize,

    /// Maximum number of simultaneously live connections; admission is refused above it.
    #[arg(long = "max-conn", default_value_t = 65536)]
    pub max_conn: usize,
}

impl Config {
    /// Validates cross-field constraints the way `WebServer`'s constructor and
    /// `InitSocket_` did, before any socket or thread is created.
    pub fn validate(&self) -> ServerResult<TriggerMode> {
        if !(1024..=65535).contains(&self.port) {
            return Err(ServerError::InvalidPort(self.port));
        }
        TriggerMode::from_code(self.trig_mode)
    }
}
