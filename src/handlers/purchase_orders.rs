use super::common::{created_response, map_service_error, parse_filter, success_response, PaginationParams};
use super::tenders::LocationRequest;
use crate::{
    auth::AuthenticatedActor,
    commands::purchaseorders::{CreatePurchaseOrderCommand, UpdatePurchaseOrderStatusCommand},
    errors::ApiError,
    handlers::AppState,
    models::PurchaseOrderStatus,
    services::procurement::PurchaseOrderSearch,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, patch, post},
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatePurchaseOrderRequest {
    pub tender_id: Uuid,
    pub loa_id: Option<Uuid>,
    pub po_number: String,
    pub po_date: NaiveDate,
    pub equipment_name: String,
    pub lead_time_to_deliver: i32,
    pub lead_time_to_install: i32,
    #[serde(default)]
    pub has_accessories: bool,
    #[serde(default)]
    pub accessories: Vec<String>,
    pub remarks: Option<String>,
    /// One consignee is created per location
    #[serde(default)]
    pub locations: Vec<LocationRequest>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdatePurchaseOrderStatusRequest {
    /// Draft, Active, Completed or Cancelled
    pub status: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PurchaseOrderSearchParams {
    /// Inclusive lower bound on po_date; used only together with end_date
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound on po_date; used only together with start_date
    pub end_date: Option<NaiveDate>,
    /// Substring of the PO number
    pub po_number: Option<String>,
    pub status: Option<String>,
    pub tender_id: Option<Uuid>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Create a purchase order together with its consignees
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders",
    request_body = CreatePurchaseOrderRequest,
    responses(
        (status = 201, description = "Purchase order and consignees created", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid request; details lists every problem", body = crate::errors::ErrorResponse),
        (status = 404, description = "Tender or LOA not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate PO number", body = crate::errors::ErrorResponse),
        (status = 500, description = "Rolled back; nothing was stored", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Json(payload): Json<CreatePurchaseOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = CreatePurchaseOrderCommand {
        actor_id: actor.actor_id,
        tender_id: payload.tender_id,
        loa_id: payload.loa_id,
        po_number: payload.po_number,
        po_date: payload.po_date,
        equipment_name: payload.equipment_name,
        lead_time_to_deliver: payload.lead_time_to_deliver,
        lead_time_to_install: payload.lead_time_to_install,
        has_accessories: payload.has_accessories,
        accessories: payload.accessories,
        remarks: payload.remarks,
        locations: payload.locations.into_iter().map(Into::into).collect(),
    };

    let created = state
        .services
        .procurement
        .create_purchase_order(command)
        .await
        .map_err(map_service_error)?;

    info!("Purchase order created: {}", created.purchase_order.id);
    Ok(created_response(created))
}

/// Search purchase orders
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/search",
    params(PurchaseOrderSearchParams),
    responses(
        (status = 200, description = "Page of purchase orders", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Unknown status filter", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn search_purchase_orders(
    State(state): State<AppState>,
    Query(params): Query<PurchaseOrderSearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let status: Option<PurchaseOrderStatus> = parse_filter("status", params.status.as_deref())?;
    let paging = PaginationParams {
        page: params.page,
        limit: params.limit,
    };

    let search = PurchaseOrderSearch {
        start_date: params.start_date,
        end_date: params.end_date,
        po_number: params.po_number,
        status,
        tender_id: params.tender_id,
    };

    let page = state
        .services
        .procurement
        .search_purchase_orders(search, paging.page(), state.config.page_size(paging.limit))
        .await
        .map_err(map_service_error)?;

    Ok(success_response(page))
}

/// Get a purchase order with every consignee and its stage records
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order fetched", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path(po_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let po = state
        .services
        .procurement
        .get_purchase_order(po_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(po))
}

/// Override a purchase order's status
#[utoipa::path(
    patch,
    path = "/api/v1/purchase-orders/{id}/status",
    request_body = UpdatePurchaseOrderStatusRequest,
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Status updated", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Unknown or disallowed status", body = crate::errors::ErrorResponse),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Status changed concurrently", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn update_purchase_order_status(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(po_id): Path<Uuid>,
    Json(payload): Json<UpdatePurchaseOrderStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .services
        .procurement
        .update_status(UpdatePurchaseOrderStatusCommand {
            actor_id: actor.actor_id,
            po_id,
            status: payload.status,
        })
        .await
        .map_err(map_service_error)?;

    Ok(success_response(result))
}

pub fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_purchase_order))
        .route("/search", get(search_purchase_orders))
        .route("/:id", get(get_purchase_order))
        .route("/:id/status", patch(update_purchase_order_status))
}
