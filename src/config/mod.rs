// Configuration module entry point
// Loads layered configuration and validates it before the server starts

mod state;
mod types;

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

use crate::error::StartupError;
use crate::logger::Level;

// Re-export public types
pub use state::AppState;
pub use types::{Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig};

/// Prefix for environment overrides, e.g. `NOCACHE_SERVER__PORT=8080`
const ENV_PREFIX: &str = "NOCACHE";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "nocache.toml"; a missing file is not an error
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("server.root", "build/web")?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "common")?
            .set_default("http.server_name", "nocache-server")?
            .set_default("http.directory_listing", true)?
            .set_default("performance.keep_alive", false)?
            .set_default("performance.request_timeout", 30)?
            .build()?;

        settings.try_deserialize()
    }

    /// Resolve host and port into the address the listener binds to
    pub fn socket_addr(&self) -> Result<SocketAddr, StartupError> {
        let host = self.server.host.as_str();
        (host, self.server.port)
            .to_socket_addrs()
            .map_err(|e| StartupError::Invalid(format!("invalid host '{host}': {e}")))?
            .next()
            .ok_or_else(|| StartupError::Invalid(format!("host '{host}' resolved to no address")))
    }

    /// Canonical root directory; the directory is never created implicitly
    pub fn root_dir(&self) -> Result<PathBuf, StartupError> {
        let root = &self.server.root;
        let canonical = root
            .canonicalize()
            .map_err(|e| StartupError::InvalidRoot {
                path: root.clone(),
                reason: e.to_string(),
            })?;

        if !canonical.is_dir() {
            return Err(StartupError::InvalidRoot {
                path: root.clone(),
                reason: "not a directory".to_string(),
            });
        }

        Ok(canonical)
    }

    /// Check every value that would otherwise fail later at runtime
    pub fn validate(&self) -> Result<(), StartupError> {
        if self.server.workers == Some(0) {
            return Err(StartupError::Invalid(
                "server.workers must be at least 1".to_string(),
            ));
        }

        if Level::parse(&self.logging.level).is_none() {
            return Err(StartupError::Invalid(format!(
                "unknown logging.level '{}' (expected error, warn or info)",
                self.logging.level
            )));
        }

        if self.logging.access_log_format.trim().is_empty() {
            return Err(StartupError::Invalid(
                "logging.access_log_format must not be empty".to_string(),
            ));
        }

        self.socket_addr()?;
        self.root_dir()?;
        Ok(())
    }
}
