use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use tunelink_core::health::{healthz, readyz};
use tunelink_core::middleware::request_id_layer;

use crate::handlers::{
    otp::{request_otp, verify_otp},
    spotify::{begin_link, complete_link, get_profile, list_playlists},
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Phone OTP
        .route("/request_otp", post(request_otp))
        .route("/verify_otp", post(verify_otp))
        // Spotify linking
        .route("/spotify/link", post(begin_link))
        .route("/spotify/callback", post(complete_link))
        .route("/spotify/me", get(get_profile))
        .route("/spotify/playlists", get(list_playlists))
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
        .with_state(state)
}
