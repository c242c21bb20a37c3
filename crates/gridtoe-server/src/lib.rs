pub mod config;
pub mod controller;
pub mod health;
pub mod registry;
pub mod state;
pub mod ws;

use std::time::Duration;

use axum::Router;
use axum::http::Method;
use tower_http::cors::{Any, CorsLayer};

use config::ServerConfig;
use state::AppState;

/// Build the Axum router and application state from a config.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let state = AppState::new(config);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST]);

    let app = Router::new()
        .route("/ws", axum::routing::get(ws::ws_handler))
        .route("/health", axum::routing::get(health::health_check))
        .layer(cors)
        .with_state(state.clone());

    (app, state)
}

/// Background task that periodically drops rooms idle past
/// `rooms.idle_timeout_secs`.
pub fn spawn_room_sweeper(state: AppState) -> tokio::task::JoinHandle<()> {
    let max_idle = Duration::from_secs(state.config.rooms.idle_timeout_secs);
    let period = Duration::from_secs(state.config.rooms.idle_check_interval_secs);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // First tick fires immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = state.sessions.write().await.cleanup_idle_rooms(max_idle);
            if removed > 0 {
                tracing::info!(removed, "Removed idle rooms");
            }
        }
    })
}
