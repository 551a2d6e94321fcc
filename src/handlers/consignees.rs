use super::common::{map_service_error, success_response};
use crate::{
    auth::AuthenticatedActor,
    commands::consignees::{CorrectConsigneeStatusCommand, StageUpdate, UpdateConsigneeStageCommand},
    errors::ApiError,
    handlers::AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusCorrectionRequest {
    /// Processing, Dispatched, Delivered, Installed or Invoiced
    pub status: String,
    pub reason: String,
}

/// Get a consignee with its four stage records
#[utoipa::path(
    get,
    path = "/api/v1/consignees/{id}",
    params(("id" = Uuid, Path, description = "Consignee ID")),
    responses(
        (status = 200, description = "Consignee fetched", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Consignee not found", body = crate::errors::ErrorResponse)
    ),
    tag = "consignees"
)]
pub async fn get_consignee(
    State(state): State<AppState>,
    Path(consignee_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let consignee = state
        .services
        .consignees
        .get_consignee(consignee_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(consignee))
}

/// Record or amend one delivery stage of a consignee
///
/// The body carries a `stage` discriminator: `logistics`, `challan_receipt`,
/// `installation` or `invoice`.
#[utoipa::path(
    put,
    path = "/api/v1/consignees/{id}/stage",
    request_body = StageUpdate,
    params(("id" = Uuid, Path, description = "Consignee ID")),
    responses(
        (status = 200, description = "Stage stored; statuses rolled up", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid stage fields", body = crate::errors::ErrorResponse),
        (status = 404, description = "Consignee not found", body = crate::errors::ErrorResponse)
    ),
    tag = "consignees"
)]
pub async fn update_stage(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(consignee_id): Path<Uuid>,
    Json(update): Json<StageUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let stage = update.stage();
    let outcome = state
        .services
        .consignees
        .update_stage(UpdateConsigneeStageCommand {
            actor_id: actor.actor_id,
            consignee_id,
            update,
        })
        .await
        .map_err(map_service_error)?;

    info!(%consignee_id, %stage, "Consignee stage recorded");
    Ok(success_response(outcome))
}

/// Move a consignee back to an earlier status its stage records still allow
#[utoipa::path(
    post,
    path = "/api/v1/consignees/{id}/status-correction",
    request_body = StatusCorrectionRequest,
    params(("id" = Uuid, Path, description = "Consignee ID")),
    responses(
        (status = 200, description = "Status corrected", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Unknown status or contradicted by stage records", body = crate::errors::ErrorResponse),
        (status = 404, description = "Consignee not found", body = crate::errors::ErrorResponse)
    ),
    tag = "consignees"
)]
pub async fn correct_status(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(consignee_id): Path<Uuid>,
    Json(payload): Json<StatusCorrectionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .services
        .consignees
        .correct_status(CorrectConsigneeStatusCommand {
            actor_id: actor.actor_id,
            consignee_id,
            status: payload.status,
            reason: payload.reason,
        })
        .await
        .map_err(map_service_error)?;

    Ok(success_response(result))
}

pub fn consignee_routes() -> Router<AppState> {
    Router::new()
        .route("/:id", get(get_consignee))
        .route("/:id/stage", put(update_stage))
        .route("/:id/status-correction", post(correct_status))
}
