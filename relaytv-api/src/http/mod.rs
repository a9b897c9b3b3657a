// Module: http
// HTTP/JSON API: session control, live delivery, playlist export, the
// Xtream-compatible catalog endpoint, and the operator admin channel.

pub mod admin;
pub mod auth;
pub mod error;
pub mod health;
pub mod live;
pub mod middleware;
pub mod playlist;
pub mod session;
pub mod xtream;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use relaytv_core::{
    bootstrap::Services,
    repository::{ChannelRepository, StreamRepository},
    service::{
        EntitlementGate, RemoteExecutionService, StreamLifecycleManager, TokenService,
        TranscodeSupervisor,
    },
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<EntitlementGate>,
    pub lifecycle: Arc<StreamLifecycleManager>,
    pub supervisor: Arc<TranscodeSupervisor>,
    pub remote_exec: Arc<RemoteExecutionService>,
    pub channels: ChannelRepository,
    pub streams: StreamRepository,
    pub tokens: TokenService,
    /// Public base URL embedded in playlist and delivery URLs.
    pub public_base_url: String,
}

/// Create the HTTP router with all routes
pub fn create_router(services: Services, public_base_url: String) -> Router {
    let state = AppState {
        gate: services.gate,
        lifecycle: services.lifecycle,
        supervisor: services.supervisor,
        remote_exec: services.remote_exec,
        channels: services.channels,
        streams: services.streams,
        tokens: services.tokens,
        public_base_url,
    };

    let router = Router::new()
        // Health check endpoint (for monitoring probes)
        .merge(health::create_health_router())
        // Authentication
        .route("/api/auth/login", post(auth::login))
        // Session control (start/stop/status)
        .route("/api/stream", post(session::control))
        // Live delivery: path credentials or query credentials
        .route(
            "/live/{username}/{password}/{channel}",
            get(live::serve_with_path_credentials),
        )
        .route("/live/{channel}", get(live::serve_with_query_credentials))
        // Bulk playlist export
        .route("/get.php", get(playlist::get_playlist))
        // Xtream-compatible catalog API
        .route("/player_api.php", get(xtream::player_api))
        // Operator channel
        .route(
            "/api/admin/servers/{server_id}",
            post(admin::server_action),
        )
        .route(
            "/api/admin/streams/{stream_id}/logs",
            get(admin::stream_logs),
        );

    // Apply layers before state
    let router = router
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    router.with_state(state)
}
