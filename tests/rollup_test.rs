mod common;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use sea_orm::{sea_query::Expr, ColumnTrait, EntityTrait, QueryFilter};
use serde_json::{json, Value};
use tender_tracker_api::{
    commands::consignees::{StageUpdate, UpdateConsigneeStageCommand},
    errors::ServiceError,
    models::{
        audit_log, consignee, purchase_order, tender, ConsignmentStatus, PurchaseOrderStatus,
        TenderStatus,
    },
};
use uuid::Uuid;

use common::{complete_stage_payload, str_field, TestApp};

fn uuid_of(value: &Value, field: &str) -> Uuid {
    Uuid::parse_str(str_field(value, field)).expect("uuid field")
}

fn stage_command(actor_id: Uuid, consignee_id: Uuid, stage: &str) -> UpdateConsigneeStageCommand {
    let update: StageUpdate =
        serde_json::from_value(complete_stage_payload(stage)).expect("stage payload decodes");
    UpdateConsigneeStageCommand {
        actor_id,
        consignee_id,
        update,
    }
}

/// Tender with one purchase order of `locations` sites: (tender id, po id, consignee ids).
async fn seeded_order(app: &TestApp, number: &str, locations: usize) -> (Uuid, Uuid, Vec<Uuid>) {
    let tender = app.create_tender(&format!("TN-{number}")).await;
    let tender_id = uuid_of(&tender["tender"], "id");
    let po = app
        .create_purchase_order(&tender_id.to_string(), &format!("PO-{number}"), locations)
        .await;
    let po_id = uuid_of(&po["purchase_order"], "id");
    let consignees = po["consignees"]
        .as_array()
        .expect("consignees")
        .iter()
        .map(|c| uuid_of(c, "id"))
        .collect();
    (tender_id, po_id, consignees)
}

#[tokio::test]
async fn concurrent_stage_updates_under_one_order_are_all_counted() {
    let app = TestApp::new().await;
    let (_, po_id, consignees) = seeded_order(&app, "CONC-1", 2).await;
    let service = app.state.services.consignees.clone();
    let actor = app.actor_id;

    let progress = |consignee_id: Uuid| {
        let service = service.clone();
        async move {
            for stage in ["logistics", "challan_receipt", "installation", "invoice"] {
                service
                    .update_stage(stage_command(actor, consignee_id, stage))
                    .await
                    .expect("stage update succeeds");
            }
        }
    };

    let first = tokio::spawn(progress(consignees[0]));
    let second = tokio::spawn(progress(consignees[1]));
    first.await.expect("first task");
    second.await.expect("second task");

    let po = purchase_order::Entity::find_by_id(po_id)
        .one(app.db())
        .await
        .expect("query")
        .expect("po exists");
    assert_eq!(po.status, PurchaseOrderStatus::Completed);

    let statuses: Vec<_> = consignee::Entity::find()
        .filter(consignee::Column::PoId.eq(po_id))
        .all(app.db())
        .await
        .expect("query")
        .into_iter()
        .map(|c| c.consignment_status)
        .collect();
    assert_eq!(statuses, vec![ConsignmentStatus::Invoiced; 2]);
    assert_eq!(app.state.services.rollup.pending_retry_count(), 0);
}

#[tokio::test]
async fn second_rollup_pass_changes_nothing() {
    let app = TestApp::new().await;
    let (tender_id, po_id, consignees) = seeded_order(&app, "IDEM-1", 2).await;
    app.complete_stage(&consignees[0].to_string(), "logistics").await;

    let rollup = &app.state.services.rollup;
    for _ in 0..2 {
        assert_eq!(rollup.rollup_consignee(consignees[0]).await.expect("consignee"), None);
        assert_eq!(rollup.rollup_consignee(consignees[1]).await.expect("consignee"), None);
        assert_eq!(rollup.rollup_purchase_order(po_id).await.expect("po"), None);
        assert_eq!(rollup.rollup_tender(tender_id).await.expect("tender"), None);
    }

    let report = app
        .state
        .services
        .reconciliation
        .sweep_once()
        .await
        .expect("sweep");
    assert_eq!(report.changed(), 0);
    assert_eq!(report.failures, 0);
}

#[tokio::test]
async fn incomplete_stage_edit_never_lowers_a_consignee() {
    let app = TestApp::new().await;
    let (_, _, consignees) = seeded_order(&app, "MONO-1", 1).await;
    let consignee_id = consignees[0].to_string();
    app.complete_all_stages(&consignee_id).await;

    // Clearing the logistics documents makes that record incomplete.
    let (status, body) = app
        .update_stage(
            &consignee_id,
            json!({
                "stage": "logistics",
                "dispatch_date": common::PAST_DATE,
                "courier_name": "BlueDart",
                "docket_number": "BD-1001",
                "documents": []
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["complete"], false);
    assert_eq!(body["data"]["consignee"]["consignment_status"], "Invoiced");
}

#[tokio::test]
async fn blank_document_reference_clears_the_stored_one() {
    let app = TestApp::new().await;
    let (_, _, consignees) = seeded_order(&app, "DOC-1", 1).await;
    let consignee_id = consignees[0].to_string();
    app.complete_stage(&consignee_id, "challan_receipt").await;

    // Omitted reference keeps the stored document.
    let (_, body) = app
        .update_stage(
            &consignee_id,
            json!({ "stage": "challan_receipt", "receipt_date": common::PAST_DATE }),
        )
        .await;
    assert_eq!(body["data"]["complete"], true);
    assert_eq!(
        body["data"]["record"]["document_path"],
        "uploads/challan/ch-1001.pdf"
    );

    let (_, body) = app
        .update_stage(
            &consignee_id,
            json!({
                "stage": "challan_receipt",
                "receipt_date": common::PAST_DATE,
                "document_path": ""
            }),
        )
        .await;
    assert_eq!(body["data"]["complete"], false);
    assert!(body["data"]["record"]["document_path"].is_null());
}

#[tokio::test]
async fn stage_update_for_unknown_consignee_is_not_found() {
    let app = TestApp::new().await;
    let (status, _) = app
        .update_stage(&Uuid::new_v4().to_string(), complete_stage_payload("invoice"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.count_rows("invoices").await, 0);
}

#[tokio::test]
async fn future_dated_stage_is_rejected() {
    let app = TestApp::new().await;
    let (_, _, consignees) = seeded_order(&app, "FUT-1", 1).await;
    let tomorrow = (chrono::Utc::now().date_naive() + chrono::Duration::days(1)).to_string();

    let (status, body) = app
        .update_stage(
            &consignees[0].to_string(),
            json!({
                "stage": "installation",
                "installation_date": tomorrow,
                "document_path": "uploads/ir.pdf"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(app.count_rows("installation_reports").await, 0);
}

#[tokio::test]
async fn purchase_order_override_rules() {
    let app = TestApp::new().await;
    let (tender_id, po_id, consignees) = seeded_order(&app, "OVR-1", 1).await;
    let uri = format!("/api/v1/purchase-orders/{po_id}/status");

    // Unknown value lists the accepted ones.
    let (status, body) = app
        .send(Method::PATCH, &uri, Some(json!({ "status": "Shipped" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(str_field(&body, "message").contains("Cancelled"), "{body}");

    // Completed needs every consignee invoiced.
    let (status, _) = app
        .send(Method::PATCH, &uri, Some(json!({ "status": "Completed" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(Method::PATCH, &uri, Some(json!({ "status": "Cancelled" })))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["changed"], true);
    assert_eq!(body["data"]["previous_status"], "Active");

    // A cancelled order no longer counts for the tender.
    let tender = app.tender(&tender_id.to_string()).await;
    assert_eq!(tender["status"], "Draft");

    // Cancelled is terminal, for overrides and for rollup alike.
    let (status, _) = app
        .send(Method::PATCH, &uri, Some(json!({ "status": "Active" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.complete_all_stages(&consignees[0].to_string()).await;
    let po = app.purchase_order(&po_id.to_string()).await;
    assert_eq!(po["status"], "Cancelled");

    let audits = audit_log::Entity::find()
        .filter(audit_log::Column::Action.eq("purchase_order.status.update"))
        .all(app.db())
        .await
        .expect("audit query");
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].actor_id, app.actor_id);

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/api/v1/purchase-orders/{}/status", Uuid::new_v4()),
            Some(json!({ "status": "Active" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn overrides_the_rollup_would_undo_are_refused() {
    let app = TestApp::new().await;
    let (_, po_id, consignees) = seeded_order(&app, "OVR-2", 1).await;
    let uri = format!("/api/v1/purchase-orders/{po_id}/status");

    // Draft while a site is already dispatched.
    app.complete_stage(&consignees[0].to_string(), "logistics").await;
    let (status, body) = app
        .send(Method::PATCH, &uri, Some(json!({ "status": "Draft" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let report = app
        .state
        .services
        .reconciliation
        .sweep_once()
        .await
        .expect("sweep runs");
    assert_eq!(report.purchase_orders_changed, 0);
    assert_eq!(app.purchase_order(&po_id.to_string()).await["status"], "Active");

    // Active once every site is invoiced.
    for stage in ["challan_receipt", "installation", "invoice"] {
        app.complete_stage(&consignees[0].to_string(), stage).await;
    }
    assert_eq!(app.purchase_order(&po_id.to_string()).await["status"], "Completed");
    let (status, body) = app
        .send(Method::PATCH, &uri, Some(json!({ "status": "Active" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(app.purchase_order(&po_id.to_string()).await["status"], "Completed");
}

#[tokio::test]
async fn correction_respects_complete_stage_records() {
    let app = TestApp::new().await;
    let (_, po_id, consignees) = seeded_order(&app, "CORR-1", 2).await;
    let invoiced = consignees[0];
    let reworked = consignees[1];
    app.complete_all_stages(&invoiced.to_string()).await;

    // Stage records prove Invoiced; a lower status is refused.
    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/consignees/{invoiced}/status-correction"),
            Some(json!({ "status": "Delivered", "reason": "paperwork mix-up" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    // Nothing recorded yet, so the site cannot be corrected forward.
    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/consignees/{reworked}/status-correction"),
            Some(json!({ "status": "Invoiced", "reason": "invoiced offline" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let po = app.purchase_order(&po_id.to_string()).await;
    assert_eq!(po["status"], "Active");
    let site = app.consignee(&reworked.to_string()).await;
    assert_eq!(site["consignment_status"], "Processing");
    assert!(site["invoice"].is_null());

    // Finish the site, then withdraw its invoice document.
    app.complete_all_stages(&reworked.to_string()).await;
    let po = app.purchase_order(&po_id.to_string()).await;
    assert_eq!(po["status"], "Completed");

    let (status, body) = app
        .update_stage(
            &reworked.to_string(),
            json!({
                "stage": "invoice",
                "invoice_number": "INV-1001",
                "invoice_date": common::PAST_DATE,
                "document_path": ""
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["consignee"]["consignment_status"], "Invoiced");

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/consignees/{reworked}/status-correction"),
            Some(json!({ "status": "Installed", "reason": "invoice returned by the consignee" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["changed"], true);
    assert_eq!(body["data"]["consignee"]["consignment_status"], "Installed");
    assert_eq!(body["data"]["previous_status"], "Invoiced");

    // The order reopens once a site is no longer invoiced.
    let po = app.purchase_order(&po_id.to_string()).await;
    assert_eq!(po["status"], "Active");

    // Back to Invoiced needs a complete invoice record again.
    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/v1/consignees/{reworked}/status-correction"),
            Some(json!({ "status": "Invoiced", "reason": "changed my mind" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let audits = audit_log::Entity::find()
        .filter(audit_log::Column::Action.eq("consignee.status.correct"))
        .all(app.db())
        .await
        .expect("audit query");
    assert_eq!(audits.len(), 1);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/v1/consignees/{reworked}/status-correction"),
            Some(json!({ "status": "Delivered", "reason": "   " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reconciliation_repairs_statuses_written_behind_its_back() {
    let app = TestApp::new().await;
    let (tender_id, po_id, consignees) = seeded_order(&app, "REC-1", 1).await;
    app.complete_stage(&consignees[0].to_string(), "logistics").await;

    // Simulate a lost cascade: the order and tender no longer match their children.
    purchase_order::Entity::update_many()
        .col_expr(
            purchase_order::Column::Status,
            Expr::value(PurchaseOrderStatus::Completed),
        )
        .filter(purchase_order::Column::Id.eq(po_id))
        .exec(app.db())
        .await
        .expect("po overwritten");
    tender::Entity::update_many()
        .col_expr(tender::Column::Status, Expr::value(TenderStatus::Draft))
        .col_expr(tender::Column::InstallationPending, Expr::value(false))
        .filter(tender::Column::Id.eq(tender_id))
        .exec(app.db())
        .await
        .expect("tender overwritten");

    let (status, body) = app
        .send(Method::POST, "/api/v1/reconciliation/run", None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["purchase_orders_changed"], 1);
    assert_eq!(body["data"]["tenders_changed"], 1);
    assert_eq!(body["data"]["failures"], 0);

    let po = app.purchase_order(&po_id.to_string()).await;
    assert_eq!(po["status"], "Active");
    let tender = app.tender(&tender_id.to_string()).await;
    assert_eq!(tender["status"], "In Progress");
    assert_eq!(tender["installation_pending"], true);

    // A second sweep finds nothing left to do.
    let report = app
        .state
        .services
        .reconciliation
        .sweep_once()
        .await
        .expect("sweep");
    assert_eq!(report.changed(), 0);
}

#[tokio::test]
async fn rollup_of_missing_entities_reports_not_found() {
    let app = TestApp::new().await;
    let rollup = &app.state.services.rollup;

    assert_matches!(
        rollup.rollup_consignee(Uuid::new_v4()).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        rollup.rollup_purchase_order(Uuid::new_v4()).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        rollup.rollup_tender(Uuid::new_v4()).await,
        Err(ServiceError::NotFound(_))
    );

    // Cascades swallow the failure and queue it for reconciliation.
    let report = rollup.cascade_from_consignee(Uuid::new_v4()).await;
    assert!(report.failed);
    assert_eq!(rollup.pending_retry_count(), 1);

    let sweep = app
        .state
        .services
        .reconciliation
        .sweep_once()
        .await
        .expect("sweep");
    assert_eq!(sweep.failures, 0);
    assert_eq!(rollup.pending_retry_count(), 0);
}
