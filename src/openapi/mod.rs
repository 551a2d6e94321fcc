use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tender Tracker API",
        version = "1.0.0",
        description = r#"
# Procurement lifecycle API

Tracks a procurement from tender to invoice:
Tender → Letter of Award → Purchase Order → Consignee → delivery stages
(logistics, challan receipt, installation, invoice).

Consignee, purchase order and tender statuses are derived from the stage
records below them and recomputed after every stage change.

## Identity

Authentication happens upstream. Every mutating request must carry the
authenticated actor in `x-actor-id` (UUID); `x-actor-roles` is optional.

## Errors

Every failure returns:

```json
{
  "error": "Bad Request",
  "message": "Validation failed",
  "details": ["po_number: must not be blank"],
  "request_id": "…",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

`details` lists every validation problem found, not only the first.
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "tenders", description = "Tenders and their pending flags"),
        (name = "loas", description = "Letters of Award and acceptance"),
        (name = "purchase-orders", description = "Purchase orders and consignee creation"),
        (name = "consignees", description = "Delivery stages and status corrections"),
        (name = "reconciliation", description = "Status rollup reconciliation")
    ),
    paths(
        crate::handlers::tenders::create_tender,
        crate::handlers::tenders::list_tenders,
        crate::handlers::tenders::get_tender,
        crate::handlers::tenders::update_pending_flags,
        crate::handlers::tenders::delete_tender,

        crate::handlers::loas::create_loa,
        crate::handlers::loas::list_loas,
        crate::handlers::loas::get_loa,
        crate::handlers::loas::update_loa,
        crate::handlers::loas::upload_acceptance,
        crate::handlers::loas::delete_loa,

        crate::handlers::purchase_orders::create_purchase_order,
        crate::handlers::purchase_orders::search_purchase_orders,
        crate::handlers::purchase_orders::get_purchase_order,
        crate::handlers::purchase_orders::update_purchase_order_status,

        crate::handlers::consignees::get_consignee,
        crate::handlers::consignees::update_stage,
        crate::handlers::consignees::correct_status,

        crate::handlers::reconciliation::run_reconciliation,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::handlers::tenders::CreateTenderRequest,
            crate::handlers::tenders::LocationRequest,
            crate::handlers::tenders::UpdatePendingFlagsRequest,
            crate::handlers::loas::CreateLoaRequest,
            crate::handlers::loas::UpdateLoaRequest,
            crate::handlers::loas::LoaAcceptanceRequest,
            crate::handlers::purchase_orders::CreatePurchaseOrderRequest,
            crate::handlers::purchase_orders::UpdatePurchaseOrderStatusRequest,
            crate::handlers::consignees::StatusCorrectionRequest,
            crate::commands::consignees::StageUpdate,
            crate::commands::consignees::LogisticsUpdate,
            crate::commands::consignees::ChallanReceiptUpdate,
            crate::commands::consignees::InstallationUpdate,
            crate::commands::consignees::InvoiceUpdate,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_lifecycle_routes() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string(&openapi).unwrap();
        assert!(json.contains("Tender Tracker API"));
        assert!(json.contains("/api/v1/purchase-orders/search"));
        assert!(json.contains("/api/v1/consignees/{id}/stage"));
    }
}
