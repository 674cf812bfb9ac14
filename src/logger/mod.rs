//! Logger module
//!
//! Provides logging utilities for the server including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Error and warning logging
//! - File-based logging support
//!
//! Before `init()` runs (or in tests) everything goes to stdout/stderr.

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::LoggingConfig;
use std::net::SocketAddr;
use std::path::Path;

/// Log severity, ordered from least to most verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Error,
    Warn,
    Info,
}

impl Level {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            _ => None,
        }
    }
}

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &LoggingConfig) -> std::io::Result<()> {
    writer::init(
        config.access_log_file.as_deref(),
        config.error_log_file.as_deref(),
        Level::parse(&config.level).unwrap_or(Level::Info),
    )
}

fn enabled(level: Level) -> bool {
    writer::get().map_or(true, |w| w.enabled(level))
}

/// Write to info/access log
fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

/// Write lifecycle lines that show regardless of log level
fn write_notice(message: &str) {
    match writer::get() {
        Some(w) => w.write_notice(message),
        None => println!("{message}"),
    }
}

/// Write to error log
fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

/// Write to access log specifically
fn write_access(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, root: &Path, config: &LoggingConfig) {
    write_notice("======================================");
    write_notice(&format!("Serving {} at http://{addr}", root.display()));
    write_notice("Caching disabled: every response is sent with no-cache headers");
    write_info(&format!("Log level: {}", config.level));
    if let Some(ref path) = config.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_notice("======================================\n");
}

pub fn log_shutdown(active_connections: usize) {
    write_info(&format!(
        "[Shutdown] Listener closed, waiting on {active_connections} active connection(s)"
    ));
}

pub fn log_connection_error(err: &impl std::fmt::Display) {
    write_error(&format!("[ERROR] Failed to serve connection: {err}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    if enabled(Level::Warn) {
        write_error(&format!("[WARN] {message}"));
    }
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_access(&entry.format(format));
}
