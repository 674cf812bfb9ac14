//! Command line arguments
//!
//! Flags take precedence over the config file and `NOCACHE_*` environment
//! variables.
//!
//! ```bash
//! nocache-server --port 8080 --root dist
//! NOCACHE_SERVER__PORT=8080 nocache-server
//! ```

use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;

#[derive(Debug, Clone, Parser)]
#[command(name = "nocache-server")]
#[command(about = "Serve a built web bundle with caching disabled on every response")]
#[command(version)]
pub struct Args {
    /// Config file path without extension
    #[arg(short, long, default_value = "nocache", env = "NOCACHE_CONFIG")]
    pub config: String,

    /// Address to listen on
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory to serve
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Tokio worker threads (defaults to CPU cores)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Disable the per-request access log
    #[arg(short, long)]
    pub quiet: bool,
}

impl Config {
    /// Overlay command line flags onto loaded configuration
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = &args.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(root) = &args.root {
            self.server.root.clone_from(root);
        }
        if args.workers.is_some() {
            self.server.workers = args.workers;
        }
        if args.quiet {
            self.logging.access_log = false;
        }
    }
}
