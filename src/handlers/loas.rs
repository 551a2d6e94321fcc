use super::common::{
    created_response, map_service_error, no_content_response, parse_filter, success_response,
    PaginationParams,
};
use crate::{
    auth::AuthenticatedActor,
    commands::loas::{CreateLoaCommand, DeleteLoaCommand, UpdateLoaCommand, UploadLoaAcceptanceCommand},
    errors::ApiError,
    handlers::AppState,
    models::LoaStatus,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateLoaRequest {
    pub loa_number: String,
    pub tender_id: Uuid,
    pub issue_date: NaiveDate,
    /// Days the award stays valid
    pub validity_period: i32,
    pub total_value: Decimal,
    #[schema(value_type = Object)]
    pub equipment_details: serde_json::Value,
    pub terms_conditions: Option<String>,
    pub remarks: Option<String>,
    /// Draft, Issued, Expired or Cancelled; defaults to Draft
    pub status: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateLoaRequest {
    pub loa_number: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub validity_period: Option<i32>,
    pub total_value: Option<Decimal>,
    #[schema(value_type = Option<Object>)]
    pub equipment_details: Option<serde_json::Value>,
    pub terms_conditions: Option<String>,
    pub remarks: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoaAcceptanceRequest {
    /// Reference returned by the document store
    pub document_path: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct LoaListParams {
    pub status: Option<String>,
    pub tender_id: Option<Uuid>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Create a Letter of Award for a tender
#[utoipa::path(
    post,
    path = "/api/v1/loas",
    request_body = CreateLoaRequest,
    responses(
        (status = 201, description = "LOA created", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Tender not found", body = crate::errors::ErrorResponse)
    ),
    tag = "loas"
)]
pub async fn create_loa(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Json(payload): Json<CreateLoaRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = CreateLoaCommand {
        actor_id: actor.actor_id,
        loa_number: payload.loa_number,
        tender_id: payload.tender_id,
        issue_date: payload.issue_date,
        validity_period: payload.validity_period,
        total_value: payload.total_value,
        equipment_details: payload.equipment_details,
        terms_conditions: payload.terms_conditions,
        remarks: payload.remarks,
        status: payload.status,
    };

    let loa = state
        .services
        .loas
        .create_loa(command)
        .await
        .map_err(map_service_error)?;

    info!("LOA created: {}", loa.id);
    Ok(created_response(loa))
}

/// List LOAs, newest first
#[utoipa::path(
    get,
    path = "/api/v1/loas",
    params(LoaListParams),
    responses(
        (status = 200, description = "Page of LOAs", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Unknown status filter", body = crate::errors::ErrorResponse)
    ),
    tag = "loas"
)]
pub async fn list_loas(
    State(state): State<AppState>,
    Query(params): Query<LoaListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let status: Option<LoaStatus> = parse_filter("status", params.status.as_deref())?;
    let paging = PaginationParams {
        page: params.page,
        limit: params.limit,
    };

    let page = state
        .services
        .loas
        .list_loas(
            status,
            params.tender_id,
            paging.page(),
            state.config.page_size(paging.limit),
        )
        .await
        .map_err(map_service_error)?;

    Ok(success_response(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/loas/{id}",
    params(("id" = Uuid, Path, description = "LOA ID")),
    responses(
        (status = 200, description = "LOA fetched", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "LOA not found", body = crate::errors::ErrorResponse)
    ),
    tag = "loas"
)]
pub async fn get_loa(
    State(state): State<AppState>,
    Path(loa_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let loa = state
        .services
        .loas
        .get_loa(loa_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(loa))
}

/// Partially update an LOA
#[utoipa::path(
    put,
    path = "/api/v1/loas/{id}",
    request_body = UpdateLoaRequest,
    params(("id" = Uuid, Path, description = "LOA ID")),
    responses(
        (status = 200, description = "LOA updated", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid request or status", body = crate::errors::ErrorResponse),
        (status = 404, description = "LOA not found", body = crate::errors::ErrorResponse)
    ),
    tag = "loas"
)]
pub async fn update_loa(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(loa_id): Path<Uuid>,
    Json(payload): Json<UpdateLoaRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = UpdateLoaCommand {
        actor_id: actor.actor_id,
        loa_id,
        loa_number: payload.loa_number,
        issue_date: payload.issue_date,
        validity_period: payload.validity_period,
        total_value: payload.total_value,
        equipment_details: payload.equipment_details,
        terms_conditions: payload.terms_conditions,
        remarks: payload.remarks,
        status: payload.status,
    };

    let loa = state
        .services
        .loas
        .update_loa(command)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(loa))
}

/// Attach the signed acceptance document and mark the LOA Accepted
#[utoipa::path(
    post,
    path = "/api/v1/loas/{id}/acceptance",
    request_body = LoaAcceptanceRequest,
    params(("id" = Uuid, Path, description = "LOA ID")),
    responses(
        (status = 200, description = "LOA accepted", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "LOA is cancelled or expired", body = crate::errors::ErrorResponse),
        (status = 404, description = "LOA not found", body = crate::errors::ErrorResponse)
    ),
    tag = "loas"
)]
pub async fn upload_acceptance(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(loa_id): Path<Uuid>,
    Json(payload): Json<LoaAcceptanceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let loa = state
        .services
        .loas
        .upload_acceptance(UploadLoaAcceptanceCommand {
            actor_id: actor.actor_id,
            loa_id,
            document_path: payload.document_path,
        })
        .await
        .map_err(map_service_error)?;

    info!("LOA accepted: {}", loa_id);
    Ok(success_response(loa))
}

#[utoipa::path(
    delete,
    path = "/api/v1/loas/{id}",
    params(("id" = Uuid, Path, description = "LOA ID")),
    responses(
        (status = 204, description = "LOA deleted"),
        (status = 404, description = "LOA not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Purchase orders reference the LOA", body = crate::errors::ErrorResponse)
    ),
    tag = "loas"
)]
pub async fn delete_loa(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(loa_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .loas
        .delete_loa(DeleteLoaCommand {
            actor_id: actor.actor_id,
            loa_id,
        })
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

pub fn loa_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_loas).post(create_loa))
        .route("/:id", get(get_loa).put(update_loa).delete(delete_loa))
        .route("/:id/acceptance", post(upload_acceptance))
}
