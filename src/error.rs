//! Startup error types.
//!
//! Every variant is fatal: `main` prints the diagnostic and exits non-zero.
//! Per-request failures never surface here, they become HTTP statuses.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Error raised while loading configuration or bringing the listener up.
#[derive(Debug)]
pub enum StartupError {
    /// Configuration sources could not be read or deserialized
    Config(config::ConfigError),
    /// A configuration value was rejected by validation
    Invalid(String),
    /// Root directory is missing or is not a directory
    InvalidRoot { path: PathBuf, reason: String },
    /// Listening socket could not be created or bound
    Bind { addr: SocketAddr, source: io::Error },
    /// Log files could not be opened
    Logger(io::Error),
    /// Tokio runtime could not be built
    Runtime(io::Error),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "failed to load configuration: {e}"),
            Self::Invalid(msg) => write!(f, "invalid configuration: {msg}"),
            Self::InvalidRoot { path, reason } => {
                write!(f, "invalid root directory '{}': {reason}", path.display())
            }
            Self::Bind { addr, source } => write!(f, "failed to bind {addr}: {source}"),
            Self::Logger(e) => write!(f, "failed to open log file: {e}"),
            Self::Runtime(e) => write!(f, "failed to build runtime: {e}"),
        }
    }
}

impl std::error::Error for StartupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Bind { source, .. } => Some(source),
            Self::Logger(e) | Self::Runtime(e) => Some(e),
            Self::Invalid(_) | Self::InvalidRoot { .. } => None,
        }
    }
}

impl From<config::ConfigError> for StartupError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e)
    }
}
