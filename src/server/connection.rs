// Connection handling module
// Serves one accepted TCP connection in its own task

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;

use crate::config::AppState;
use crate::handler;
use crate::http::NoCache;
use crate::logger;

/// Keeps the active connection count accurate even if the task unwinds
struct ConnectionGuard(Arc<AtomicUsize>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Count the connection and hand it to a spawned task.
///
/// Returns immediately so the accept loop is never blocked by a request.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `state` - Shared application state
/// * `conn_counter` - Active connection counter
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
) {
    conn_counter.fetch_add(1, Ordering::SeqCst);
    let guard = ConnectionGuard(Arc::clone(conn_counter));
    let state = Arc::clone(state);

    tokio::spawn(async move {
        let _guard = guard;
        handle_connection(stream, peer_addr, state).await;
    });
}

/// Serve a single connection.
///
/// Each request goes through the static file handler wrapped in `NoCache`,
/// so every response, errors included, leaves with the no-cache headers.
async fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, state: Arc<AppState>) {
    let io = TokioIo::new(stream);

    let handler_state = Arc::clone(&state);
    let service = NoCache::new(service_fn(move |req| {
        handler::handle_request(req, Arc::clone(&handler_state), peer_addr)
    }));

    // The limit covers reading the request head, not writing the response
    let mut builder = http1::Builder::new();
    builder
        .timer(TokioTimer::new())
        .header_read_timeout(state.request_timeout)
        .keep_alive(state.keep_alive);
    let result = builder.serve_connection(io, service).await;

    if let Err(err) = result {
        if err.is_timeout() {
            logger::log_warning(&format!(
                "Connection from {peer_addr} timed out waiting for request headers"
            ));
        } else if !err.is_incomplete_message() {
            // Clients hanging up mid-request are routine
            logger::log_connection_error(&err);
        }
    }
}
