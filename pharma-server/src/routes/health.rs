//! Health and Metrics Routes
//!
//! Public routes (no auth). `/metrics` exposes the session count so
//! operators can watch abandoned-session growth; expired sessions are
//! reclaimed lazily, never by a background sweep.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_seconds: u64,
}

#[derive(Serialize)]
pub struct MetricsResponse {
    timestamp: u64,
    uptime_seconds: u64,
    environment: String,
    /// Session records held, including expired ones not yet evicted
    active_sessions: usize,
    registered_users: usize,
}

// Server start time (lazily initialized on first probe)
static START_TIME: std::sync::OnceLock<SystemTime> = std::sync::OnceLock::new();

fn get_uptime_seconds() -> u64 {
    let start = START_TIME.get_or_init(SystemTime::now);
    SystemTime::now()
        .duration_since(*start)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: get_uptime_seconds(),
    })
}

pub async fn metrics(State(state): State<ServerState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        timestamp: current_timestamp(),
        uptime_seconds: get_uptime_seconds(),
        environment: state.config.environment.clone(),
        active_sessions: state.sessions.session_count(),
        registered_users: state.credentials.user_count(),
    })
}
