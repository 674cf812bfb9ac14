// Server loop module
// Accepts connections until shutdown, then drains the ones in flight

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Pause after a failed `accept` (e.g. out of file descriptors)
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// How often the drain checks the connection counter
const DRAIN_POLL: Duration = Duration::from_millis(25);

/// Accept connections until `shutdown` resolves.
///
/// Accept errors are logged and never end the loop. The listener is dropped
/// on return, so the port is released before in-flight connections finish.
pub async fn start_server_loop<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                }
            }

            () = &mut shutdown => break,
        }
    }

    drop(listener);
    logger::log_shutdown(active_connections.load(Ordering::SeqCst));
}

/// Wait until no connection is active or `limit` elapses.
///
/// Returns the number of connections still open when it gave up.
pub async fn drain_connections(active_connections: &AtomicUsize, limit: Duration) -> usize {
    let deadline = tokio::time::Instant::now() + limit;

    loop {
        let active = active_connections.load(Ordering::SeqCst);
        if active == 0 || tokio::time::Instant::now() >= deadline {
            return active;
        }
        tokio::time::sleep(DRAIN_POLL).await;
    }
}
