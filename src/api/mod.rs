//! REST + WebSocket API surface (§4.10, §4.11).
//!
//! Transport is a collaborator, not the core: this module translates HTTP
//! JSON and WebSocket frames into calls against [`crate::mission::MissionRegistry`]
//! and [`crate::store::Store`], nothing more.

mod error;
mod rest;
mod ws;

pub use error::ApiError;

use crate::mission::MissionRegistry;
use crate::store::Store;
use axum::routing::{get, patch, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub registry: Arc<MissionRegistry>,
}

/// Build the complete application router.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/missions", post(rest::create_mission).get(rest::list_missions))
        .route("/api/v1/missions/:id", get(rest::get_mission))
        .route("/api/v1/missions/:id/status", patch(rest::update_mission_status))
        .route("/api/v1/diagnostics", post(rest::create_diagnostic).get(rest::list_diagnostics))
        .route("/api/v1/diagnostics/:id", get(rest::get_diagnostic))
        .route("/ws", get(ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
