//! HTTP request handlers
//!
//! Implements the control endpoints: set track, query track, query catalog.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use tunecast_common::AudioFormat;

use super::AppContext;
use crate::catalog::{Track, TrackList};
use crate::error::Error;
use crate::playback::EngineState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

/// POST /play body
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayRequest {
    pub folder: String,
    /// Track file name; `.pcm` suffix optional
    pub track: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    state: EngineState,
    track: Option<Track>,
    listeners: usize,
    format: AudioFormat,
    frame_bytes: usize,
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "tunecast-sv".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Playback Endpoints
// ============================================================================

/// POST /play - Switch the active track
///
/// 400 for a malformed body or names, 404 when the file does not exist.
pub async fn play(
    State(ctx): State<AppContext>,
    body: Result<Json<PlayRequest>, JsonRejection>,
) -> Result<(StatusCode, &'static str), Error> {
    let Json(req) = body.map_err(|e| {
        warn!("Rejected play request: {}", e.body_text());
        Error::BadRequest(format!("Invalid request body: {}", e.body_text()))
    })?;

    ctx.controller.play(&req.folder, &req.track).await?;
    Ok((StatusCode::OK, "Track set and streaming initiated."))
}

/// GET /track - Active track, or 204 when idle
pub async fn get_track(State(ctx): State<AppContext>) -> Result<Response, Error> {
    match ctx.controller.status().await? {
        Some(track) => Ok(Json(track).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// GET /tracks - Folders and tracks in the catalog
pub async fn get_tracks(State(ctx): State<AppContext>) -> Result<Json<TrackList>, Error> {
    let list = ctx.controller.catalog().await.map_err(|e| {
        warn!("Failed to load tracks: {}", e);
        e
    })?;
    Ok(Json(list))
}

/// GET /status - Station overview
///
/// 500 when the active track can no longer be described, like `/track`.
pub async fn get_status(State(ctx): State<AppContext>) -> Result<Json<StatusResponse>, Error> {
    let format = ctx.controller.format();
    Ok(Json(StatusResponse {
        state: ctx.controller.engine_state().await,
        track: ctx.controller.status().await?,
        listeners: ctx.controller.listener_count().await?,
        format,
        frame_bytes: format.frame_bytes(),
    }))
}
