use super::common::{map_service_error, success_response};
use crate::{auth::AuthenticatedActor, errors::ApiError, handlers::AppState};
use axum::{extract::State, response::IntoResponse, routing::post, Router};
use tracing::info;

/// Run a reconciliation sweep now
#[utoipa::path(
    post,
    path = "/api/v1/reconciliation/run",
    responses(
        (status = 200, description = "Sweep finished", body = crate::ApiResponse<serde_json::Value>),
        (status = 401, description = "Missing actor identity", body = crate::errors::ErrorResponse)
    ),
    tag = "reconciliation"
)]
pub async fn run_reconciliation(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
) -> Result<impl IntoResponse, ApiError> {
    info!(actor_id = %actor.actor_id, "Reconciliation sweep requested");

    let report = state
        .services
        .reconciliation
        .sweep_once()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(report))
}

pub fn reconciliation_routes() -> Router<AppState> {
    Router::new().route("/run", post(run_reconciliation))
}
