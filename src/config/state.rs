// Application state module
// Read-only state shared by every connection

use std::path::PathBuf;
use std::time::Duration;

use super::types::{Config, HttpConfig};
use crate::error::StartupError;

/// Application state
///
/// Built once at startup and never mutated, so connections share it
/// through an `Arc` without any locking.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Canonical root directory
    pub root: PathBuf,
    pub http: HttpConfig,
    pub access_log: bool,
    pub access_log_format: String,
    pub keep_alive: bool,
    /// `None` when connections may stay open indefinitely
    pub request_timeout: Option<Duration>,
}

impl AppState {
    /// Create `AppState`, resolving the root directory
    pub fn new(config: &Config) -> Result<Self, StartupError> {
        let timeout = config.performance.request_timeout;
        Ok(Self {
            root: config.root_dir()?,
            http: config.http.clone(),
            access_log: config.logging.access_log,
            access_log_format: config.logging.access_log_format.clone(),
            keep_alive: config.performance.keep_alive,
            request_timeout: (timeout > 0).then(|| Duration::from_secs(timeout)),
        })
    }
}
