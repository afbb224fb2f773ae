use std::sync::Arc;

use turgo_types::GameError;
use warp::Filter;
use warp::http::StatusCode;

use crate::session_registry::SessionRegistry;
use crate::websocket::{ConnectionManager, RateLimiter};

pub mod config;
pub mod session_registry;
pub mod timers;
pub mod websocket;

pub fn create_routes(
    connection_manager: Arc<ConnectionManager>,
    registry: Arc<SessionRegistry>,
    rate_limiter: RateLimiter,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let connection_manager_filter = warp::any().map({
        let connection_manager = connection_manager.clone();
        move || connection_manager.clone()
    });

    let registry_filter = warp::any().map({
        let registry = registry.clone();
        move || registry.clone()
    });

    let rate_limiter_filter = warp::any().map(move || rate_limiter.clone());

    // WebSocket endpoint
    let websocket = warp::path("ws")
        .and(warp::ws())
        .and(connection_manager_filter)
        .and(registry_filter.clone())
        .and(rate_limiter_filter)
        .map(|ws: warp::ws::Ws, conn_mgr, registry, limiter| {
            ws.on_upgrade(move |socket| {
                websocket::handle_connection(socket, conn_mgr, registry, limiter)
            })
        });

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    let game_state = warp::path!("api" / "games" / String)
        .and(warp::get())
        .and(registry_filter.clone())
        .and_then(handle_game_state_request);

    let stats = warp::path!("api" / "stats")
        .and(warp::get())
        .and(registry_filter)
        .and_then(handle_stats_request);

    // CORS configuration
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET"]);

    websocket
        .or(health)
        .or(game_state)
        .or(stats)
        .with(cors)
        .with(warp::log("turgo"))
}

async fn handle_game_state_request(
    code: String,
    registry: Arc<SessionRegistry>,
) -> Result<impl warp::Reply, warp::Rejection> {
    match registry.snapshot(&code).await {
        Ok(snapshot) => Ok(warp::reply::with_status(
            warp::reply::json(&snapshot),
            StatusCode::OK,
        )),
        Err(e @ GameError::SessionNotFound { .. }) => Ok(warp::reply::with_status(
            warp::reply::json(&serde_json::json!({ "error": e.to_string() })),
            StatusCode::NOT_FOUND,
        )),
        Err(e) => {
            tracing::error!("Failed to load game {}: {}", code, e);
            Ok(warp::reply::with_status(
                warp::reply::json(&serde_json::json!({ "error": e.to_string() })),
                StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}

async fn handle_stats_request(
    registry: Arc<SessionRegistry>,
) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&registry.stats().await))
}
