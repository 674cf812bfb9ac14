//! Server module
//!
//! Binds the listener, runs the accept loop and owns shutdown.

pub mod connection;
pub mod listener;
pub mod signal;

// `loop` is a keyword, so the module is exposed as server_loop
#[path = "loop.rs"]
pub mod server_loop;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::config::{AppState, Config};
use crate::error::StartupError;
use crate::logger;

pub use listener::create_reusable_listener;
pub use server_loop::{drain_connections, start_server_loop};

/// Grace period for in-flight connections when no request timeout is set
const DEFAULT_DRAIN: Duration = Duration::from_secs(30);

/// A bound, not yet running static asset server
pub struct Server {
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
}

impl Server {
    /// Resolve the root directory and bind the listening socket.
    ///
    /// Must be called inside a Tokio runtime. Port `0` binds an ephemeral
    /// port, see [`Server::local_addr`].
    pub fn bind(config: &Config) -> Result<Self, StartupError> {
        let state = AppState::new(config)?;
        let addr = config.socket_addr()?;
        let listener = create_reusable_listener(addr)
            .map_err(|source| StartupError::Bind { addr, source })?;

        Ok(Self {
            listener,
            state: Arc::new(state),
            active_connections: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Address actually bound
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Canonical directory being served
    pub fn root(&self) -> &std::path::Path {
        &self.state.root
    }

    /// Serve until SIGINT/SIGTERM
    pub async fn run(self) {
        self.run_until(signal::shutdown_signal()).await;
    }

    /// Serve until `shutdown` resolves, then give in-flight connections
    /// up to the request timeout to finish
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let drain_limit = self.state.request_timeout.unwrap_or(DEFAULT_DRAIN);
        let active = Arc::clone(&self.active_connections);

        start_server_loop(self.listener, self.state, self.active_connections, shutdown).await;

        let left = drain_connections(&active, drain_limit).await;
        if left > 0 {
            logger::log_warning(&format!("Exiting with {left} connection(s) still open"));
        }
    }
}
