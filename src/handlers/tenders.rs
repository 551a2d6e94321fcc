use super::common::{
    created_response, map_service_error, no_content_response, parse_filter, success_response,
    PaginationParams,
};
use crate::{
    auth::AuthenticatedActor,
    commands::{
        purchaseorders::DeliveryLocation,
        tenders::{CreateTenderCommand, DeleteTenderCommand, UpdateTenderFlagsCommand},
    },
    errors::ApiError,
    handlers::AppState,
    models::TenderStatus,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, patch},
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LocationRequest {
    pub district_name: String,
    pub block_name: String,
    pub facility_name: String,
}

impl From<LocationRequest> for DeliveryLocation {
    fn from(location: LocationRequest) -> Self {
        DeliveryLocation {
            district_name: location.district_name,
            block_name: location.block_name,
            facility_name: location.facility_name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateTenderRequest {
    pub tender_number: String,
    /// One of the known issuing bodies, e.g. `UPMSCL`
    pub authority_type: String,
    pub po_date: Option<NaiveDate>,
    pub contract_date: Option<NaiveDate>,
    pub lead_time_to_deliver: i32,
    pub lead_time_to_install: i32,
    pub equipment_name: String,
    pub remarks: Option<String>,
    #[serde(default)]
    pub has_accessories: bool,
    #[serde(default)]
    pub selected_accessories: Vec<String>,
    #[serde(default)]
    pub has_consumables: bool,
    #[serde(default)]
    pub selected_consumables: Vec<String>,
    #[serde(default)]
    pub locations: Vec<LocationRequest>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdatePendingFlagsRequest {
    pub accessories_pending: Option<bool>,
    pub consumables_pending: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TenderListParams {
    pub status: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Create a tender, optionally with tender-direct delivery locations
#[utoipa::path(
    post,
    path = "/api/v1/tenders",
    request_body = CreateTenderRequest,
    responses(
        (status = 201, description = "Tender created", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate tender number", body = crate::errors::ErrorResponse)
    ),
    tag = "tenders"
)]
pub async fn create_tender(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Json(payload): Json<CreateTenderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = CreateTenderCommand {
        actor_id: actor.actor_id,
        tender_number: payload.tender_number,
        authority_type: payload.authority_type,
        po_date: payload.po_date,
        contract_date: payload.contract_date,
        lead_time_to_deliver: payload.lead_time_to_deliver,
        lead_time_to_install: payload.lead_time_to_install,
        equipment_name: payload.equipment_name,
        remarks: payload.remarks,
        has_accessories: payload.has_accessories,
        selected_accessories: payload.selected_accessories,
        has_consumables: payload.has_consumables,
        selected_consumables: payload.selected_consumables,
        locations: payload.locations.into_iter().map(Into::into).collect(),
    };

    let created = state
        .services
        .tenders
        .create_tender(command)
        .await
        .map_err(map_service_error)?;

    info!("Tender created: {}", created.tender.id);
    Ok(created_response(created))
}

/// List tenders, newest first
#[utoipa::path(
    get,
    path = "/api/v1/tenders",
    params(TenderListParams),
    responses(
        (status = 200, description = "Page of tenders", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Unknown status filter", body = crate::errors::ErrorResponse)
    ),
    tag = "tenders"
)]
pub async fn list_tenders(
    State(state): State<AppState>,
    Query(params): Query<TenderListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let status: Option<TenderStatus> = parse_filter("status", params.status.as_deref())?;
    let paging = PaginationParams {
        page: params.page,
        limit: params.limit,
    };

    let page = state
        .services
        .tenders
        .list_tenders(status, paging.page(), state.config.page_size(paging.limit))
        .await
        .map_err(map_service_error)?;

    Ok(success_response(page))
}

/// Get a tender with its LOAs, purchase orders and tender-direct consignees
#[utoipa::path(
    get,
    path = "/api/v1/tenders/{id}",
    params(("id" = Uuid, Path, description = "Tender ID")),
    responses(
        (status = 200, description = "Tender fetched", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Tender not found", body = crate::errors::ErrorResponse)
    ),
    tag = "tenders"
)]
pub async fn get_tender(
    State(state): State<AppState>,
    Path(tender_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let tender = state
        .services
        .tenders
        .get_tender(tender_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(tender))
}

/// Flip the accessories/consumables pending flags
#[utoipa::path(
    patch,
    path = "/api/v1/tenders/{id}/pending-flags",
    request_body = UpdatePendingFlagsRequest,
    params(("id" = Uuid, Path, description = "Tender ID")),
    responses(
        (status = 200, description = "Flags updated and status re-derived", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "No flag given", body = crate::errors::ErrorResponse),
        (status = 404, description = "Tender not found", body = crate::errors::ErrorResponse)
    ),
    tag = "tenders"
)]
pub async fn update_pending_flags(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(tender_id): Path<Uuid>,
    Json(payload): Json<UpdatePendingFlagsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = UpdateTenderFlagsCommand {
        actor_id: actor.actor_id,
        tender_id,
        accessories_pending: payload.accessories_pending,
        consumables_pending: payload.consumables_pending,
    };

    let tender = state
        .services
        .tenders
        .update_pending_flags(command)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(tender))
}

/// Delete a tender that has no dependent records
#[utoipa::path(
    delete,
    path = "/api/v1/tenders/{id}",
    params(("id" = Uuid, Path, description = "Tender ID")),
    responses(
        (status = 204, description = "Tender deleted"),
        (status = 404, description = "Tender not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Tender still has LOAs, purchase orders or consignees", body = crate::errors::ErrorResponse)
    ),
    tag = "tenders"
)]
pub async fn delete_tender(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(tender_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .tenders
        .delete_tender(DeleteTenderCommand {
            actor_id: actor.actor_id,
            tender_id,
        })
        .await
        .map_err(map_service_error)?;

    info!("Tender deleted: {}", tender_id);
    Ok(no_content_response())
}

pub fn tender_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tenders).post(create_tender))
        .route("/:id", get(get_tender).delete(delete_tender))
        .route("/:id/pending-flags", patch(update_pending_flags))
}
