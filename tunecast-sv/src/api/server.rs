//! HTTP server startup

use std::future::Future;
use tokio::net::TcpListener;
use tracing::info;

use super::{create_router, AppContext};
use crate::error::{Error, Result};

/// Run the HTTP server until `shutdown` resolves
pub async fn run<F>(bind_addr: &str, ctx: AppContext, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", bind_addr, e)))?;

    info!("Starting HTTP server on {}. WS on /ws", bind_addr);

    axum::serve(listener, create_router(ctx))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    Ok(())
}
