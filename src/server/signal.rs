// Signal handling module
//
// SIGINT (Ctrl+C) and SIGTERM stop the accept loop; the process then exits 0.

use crate::logger;

/// Resolve once the process is asked to terminate
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            logger::log_error(&format!("Failed to register SIGTERM handler: {e}"));
            ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        () = ctrl_c() => {}
        _ = sigterm.recv() => {
            logger::log_warning("SIGTERM received, shutting down");
        }
    }
}

/// Windows fallback - only handles Ctrl+C
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => logger::log_warning("SIGINT received, shutting down"),
        Err(e) => {
            // Without a handler only an external kill stops the server
            logger::log_error(&format!("Failed to listen for Ctrl+C: {e}"));
            std::future::pending::<()>().await;
        }
    }
}
