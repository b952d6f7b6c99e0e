//! HTTP server.
//!
//! This module provides:
//! - Configuration types (`config`)
//! - Shared service state (`state`)
//! - The axum routes (`routes`)
//! - [`serve`], which runs the router until Ctrl-C or SIGTERM

pub mod config;
pub mod routes;
pub mod state;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::Result;

pub use routes::{PING_MESSAGE, router};
pub use state::{AppState, ServiceState};

/// Serve `router` on `listener` until a shutdown signal arrives.
///
/// In-flight requests are allowed to finish before this returns.
pub async fn serve(listener: TcpListener, router: Router) -> Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
