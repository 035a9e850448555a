use std::time::Duration;

use sea_orm::Database;
use tracing::info;

use tunelink_api::config::ApiConfig;
use tunelink_api::router::build_router;
use tunelink_api::state::AppState;
use tunelink_core::tracing::init_tracing;

/// Timeout for every outbound call (token endpoint, delegated API). A timed
/// out refresh writes nothing — rotation is transactional.
const HTTP_TIMEOUT_SECS: u64 = 10;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = ApiConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .expect("failed to build http client");

    let state = AppState {
        db,
        http,
        spotify: config.spotify.clone(),
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.api_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("api service listening on {addr}");
    axum::serve(listener, router).await.expect("server error");
}
