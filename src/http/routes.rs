//! HTTP route definitions

use std::sync::atomic::Ordering;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::app::AppState;
use crate::game::PlayerStatus;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins(&state.config.client_origin))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/ws", get(ws_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// "*" allows any origin, otherwise a comma-separated list
fn allowed_origins(client_origin: &str) -> AllowOrigin {
    if client_origin.trim() == "*" {
        return AllowOrigin::any();
    }

    let origins: Vec<HeaderValue> = client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();
    AllowOrigin::list(origins)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_connections: usize,
    forwarded_messages: u64,
    dropped_messages: u64,
    game_running: bool,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_connections: state.relay_stats.active_connections.load(Ordering::Relaxed),
        forwarded_messages: state.forwarder.forwarded(),
        dropped_messages: state.relay_stats.dropped_messages.load(Ordering::Relaxed),
        game_running: state.player_status.read().is_some(),
    })
}

// ============================================================================
// Player status endpoint
// ============================================================================

async fn status_handler(State(state): State<AppState>) -> Json<Option<PlayerStatus>> {
    Json(state.player_status.read().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::game::motion::MotionConfig;
    use crate::input::LatchResetPolicy;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use parking_lot::RwLock;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn test_state() -> AppState {
        let config = Config {
            log_level: "debug".to_string(),
            receiver_addr: "127.0.0.1:0".parse().unwrap(),
            receiver_read_timeout: Duration::from_millis(100),
            udp_target: "127.0.0.1:9".parse().unwrap(),
            relay_addr: "127.0.0.1:0".parse().unwrap(),
            client_origin: "*".to_string(),
            relay_enabled: true,
            game_enabled: false,
            latch_reset: LatchResetPolicy::ResetEveryConsume,
            motion: MotionConfig::default(),
        };
        AppState::new(config, Arc::new(RwLock::new(None))).await.unwrap()
    }

    async fn get_json(router: Router, uri: &str) -> serde_json::Value {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_counters() {
        let router = build_router(test_state().await);
        let health = get_json(router, "/health").await;

        assert_eq!(health["status"], "ok");
        assert_eq!(health["forwarded_messages"], 0);
        assert_eq!(health["game_running"], false);
    }

    #[tokio::test]
    async fn test_status_reflects_game_host() {
        let state = test_state().await;
        let status = state.player_status.clone();

        let empty = get_json(build_router(state.clone()), "/status").await;
        assert!(empty.is_null());

        *status.write() = Some(PlayerStatus {
            frame: 42,
            height: 1.5,
            ..Default::default()
        });
        let live = get_json(build_router(state), "/status").await;
        assert_eq!(live["frame"], 42);
        assert_eq!(live["height"], 1.5);
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin_by_default() {
        let router = build_router(test_state().await);
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }
}
