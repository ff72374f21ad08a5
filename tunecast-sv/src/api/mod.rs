//! HTTP control surface
//!
//! Thin request/response wrappers around the playback controller, plus the
//! WebSocket stream endpoint and the SSE station event feed.

pub mod handlers;
pub mod server;
pub mod sse;
pub mod ws;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tunecast_common::RadioEvent;

use crate::controller::PlaybackController;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub controller: PlaybackController,
    /// Station events for SSE listeners
    pub events: broadcast::Sender<RadioEvent>,
    /// Frames a WebSocket listener may fall behind before it is dropped
    pub client_queue_frames: usize,
}

/// Build the application router
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::get_status))
        .route("/play", post(handlers::play))
        .route("/track", get(handlers::get_track))
        .route("/tracks", get(handlers::get_tracks))
        .route("/ws", get(ws::stream_socket))
        .route("/events", get(sse::event_stream))
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
