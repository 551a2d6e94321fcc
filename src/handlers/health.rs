use crate::handlers::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
    Degraded,
}

/// Individual component health details
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Full health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub version: String,
    pub timestamp: String,
    pub uptime_secs: u64,
    pub details: HealthDetails,
    pub response_time_ms: u128,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthDetails {
    pub database: ComponentHealth,
    /// Cascades waiting for the next reconciliation sweep
    pub rollup: ComponentHealth,
}

/// Tracks application start time for uptime calculation
static START_TIME: OnceCell<Instant> = OnceCell::new();

/// Initialize the start time (call this on application startup)
pub fn init_start_time() {
    let _ = START_TIME.get_or_init(Instant::now);
}

fn get_uptime_secs() -> u64 {
    START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

/// Liveness probe: the process is up and serving.
async fn liveness_check() -> impl IntoResponse {
    Json(json!({
        "status": "up",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Readiness probe: the store answers.
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let db_result = crate::db::check_connection(&state.db).await;
    let db_latency = start.elapsed().as_millis() as u64;

    match db_result {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "checks": {
                    "database": { "status": "up", "latency_ms": db_latency }
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not_ready",
                "checks": {
                    "database": { "status": "down", "error": e.to_string() }
                }
            })),
        ),
    }
}

/// Store connectivity plus the rollup retry backlog.
async fn detailed_health_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();

    let db_result = crate::db::check_connection(&state.db).await;
    let db_latency = start.elapsed().as_millis() as u64;
    let db_up = db_result.is_ok();

    let database = ComponentHealth {
        status: if db_up {
            ComponentStatus::Up
        } else {
            ComponentStatus::Down
        },
        message: db_result.map_or_else(
            |e| format!("Connection failed: {}", e),
            |_| "Connection successful".to_string(),
        ),
        latency_ms: Some(db_latency),
    };

    let backlog = state.services.rollup.pending_retry_count();
    let rollup = ComponentHealth {
        status: if backlog == 0 {
            ComponentStatus::Up
        } else {
            ComponentStatus::Degraded
        },
        message: format!("{} cascade(s) awaiting reconciliation", backlog),
        latency_ms: None,
    };

    let overall = match (db_up, rollup.status) {
        (false, _) => ComponentStatus::Down,
        (true, ComponentStatus::Up) => ComponentStatus::Up,
        (true, _) => ComponentStatus::Degraded,
    };
    let status_code = if overall == ComponentStatus::Down {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    let response = HealthResponse {
        status: overall,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_secs: get_uptime_secs(),
        details: HealthDetails { database, rollup },
        response_time_ms: start.elapsed().as_millis(),
    };

    (status_code, Json(response))
}

/// Creates the router for health check endpoints
///
/// Endpoints:
/// - GET /health          - Liveness probe
/// - GET /health/ready    - Readiness probe (checks database connectivity)
/// - GET /health/detailed - Database and rollup backlog
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(liveness_check))
        .route("/ready", get(readiness_check))
        .route("/detailed", get(detailed_health_check))
}
