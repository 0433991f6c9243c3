//! HTTP control surface
//!
//! Hosts one loopback session and exposes every peer's entry points, queries
//! and signal stream. Each request locks the session, applies one call and
//! pumps the network until it is idle, so responses reflect the settled
//! state.

pub mod handlers;
pub mod sse;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{Error, Result};
use crate::playback::SimulatedDevice;
use crate::session::Session;

/// Session type hosted by the service
pub type SharedSession = Arc<Mutex<Session<SimulatedDevice>>>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub session: SharedSession,
    /// Server port
    pub port: u16,
}

impl AppState {
    pub fn new(session: Session<SimulatedDevice>, port: u16) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            port,
        }
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/session", get(handlers::get_session))
        .route("/peers", post(handlers::join_peer))
        .route("/peers/:id", delete(handlers::leave_peer))
        .route("/peers/:id/elevated", post(handlers::set_elevated))
        // Queue
        .route(
            "/peers/:id/queue",
            get(handlers::get_queue).post(handlers::queue_video),
        )
        .route("/peers/:id/queue/clear", post(handlers::clear_queue))
        .route("/peers/:id/queue/:index", delete(handlers::remove_video))
        .route("/peers/:id/queue/:index/move", post(handlers::move_video))
        .route("/peers/:id/config", post(handlers::update_config))
        // Device
        .route("/peers/:id/device", get(handlers::get_device))
        .route("/peers/:id/device/:event", post(handlers::device_event))
        // SSE
        .route("/peers/:id/events", get(sse::event_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API on `state.port` until `shutdown` resolves
pub async fn run(
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.port));
    let app = create_router(state);

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    info!("Server shutdown complete");
    Ok(())
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "vq-peer",
        "version": env!("CARGO_PKG_VERSION"),
        "git_hash": env!("GIT_HASH"),
        "build_timestamp": env!("BUILD_TIMESTAMP"),
        "build_profile": env!("BUILD_PROFILE"),
        "port": state.port
    }))
}
