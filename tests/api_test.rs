mod common;

use axum::{
    body,
    http::{Method, StatusCode},
};
use serde_json::json;
use tender_tracker_api::middleware_helpers::request_id::REQUEST_ID_HEADER;

use common::{loa_payload, response_json, str_field, tender_payload, TestApp};

#[tokio::test]
async fn mutations_require_an_actor_identity() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/tenders",
            Some(tender_payload("TN-AUTH-1")),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.count_rows("tenders").await, 0);

    let response = app
        .request(Method::POST, "/api/v1/reconciliation/run", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Reads need no identity.
    let response = app.request(Method::GET, "/api/v1/tenders", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn tender_creation_lists_every_problem() {
    let app = TestApp::new().await;
    let mut payload = tender_payload("  ");
    payload["authority_type"] = json!("NOPE");
    payload["lead_time_to_install"] = json!(0);
    payload["has_consumables"] = json!(true);

    let (status, body) = app.send(Method::POST, "/api/v1/tenders", Some(payload)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let details = body["details"].as_array().expect("details");
    assert_eq!(details.len(), 4, "{details:?}");
}

#[tokio::test]
async fn duplicate_tender_number_conflicts() {
    let app = TestApp::new().await;
    app.create_tender("TN-DUP-1").await;

    let (status, body) = app
        .send(Method::POST, "/api/v1/tenders", Some(tender_payload("TN-DUP-1")))
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert_eq!(app.count_rows("tenders").await, 1);
}

#[tokio::test]
async fn tenders_list_with_status_filter_and_paging() {
    let app = TestApp::new().await;
    let first = app.create_tender("TN-LIST-1").await;
    app.create_tender("TN-LIST-2").await;
    app.create_tender("TN-LIST-3").await;
    app.create_purchase_order(str_field(&first["tender"], "id"), "PO-LIST-1", 1)
        .await;

    let page = app.get_data("/api/v1/tenders?limit=2").await;
    assert_eq!(page["total"], 3);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["items"].as_array().map(Vec::len), Some(2));

    let page = app.get_data("/api/v1/tenders?status=In%20Progress").await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["tender_number"], "TN-LIST-1");

    let (status, body) = app
        .send(Method::GET, "/api/v1/tenders?status=Closed", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}

#[tokio::test]
async fn tender_delete_is_blocked_by_children() {
    let app = TestApp::new().await;
    let busy = app.create_tender("TN-DEL-1").await;
    let empty = app.create_tender("TN-DEL-2").await;
    let busy_id = str_field(&busy["tender"], "id");
    let empty_id = str_field(&empty["tender"], "id");
    app.create_purchase_order(busy_id, "PO-DEL-1", 1).await;

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/v1/tenders/{busy_id}"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/v1/tenders/{empty_id}"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .send(Method::GET, &format!("/api/v1/tenders/{empty_id}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn loa_status_rules() {
    let app = TestApp::new().await;
    let tender = app.create_tender("TN-LOA-1").await;
    let tender_id = str_field(&tender["tender"], "id");

    // Accepted is reachable only through acceptance.
    let mut payload = loa_payload(tender_id, "LOA-ACC-0");
    payload["status"] = json!("Accepted");
    let (status, _) = app.send(Method::POST, "/api/v1/loas", Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(Method::POST, "/api/v1/loas", Some(loa_payload(tender_id, "LOA-ACC-1")))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let loa_id = str_field(&body["data"], "id").to_string();

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/api/v1/loas/{loa_id}"),
            Some(json!({ "status": "Accepted" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/v1/loas/{loa_id}"),
            Some(json!({ "status": "Issued", "remarks": "sent to supplier" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "Issued");
    assert_eq!(body["data"]["remarks"], "sent to supplier");
    assert_eq!(body["data"]["loa_number"], "LOA-ACC-1");

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/api/v1/loas/{loa_id}"),
            Some(json!({ "status": "Cancelled" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/loas/{loa_id}/acceptance"),
            Some(json!({ "document_path": "uploads/loa/late.pdf" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let loa = app.get_data(&format!("/api/v1/loas/{loa_id}")).await;
    assert_eq!(loa["status"], "Cancelled");
    assert!(loa["acceptance_document_path"].is_null());
}

#[tokio::test]
async fn accepted_loa_keeps_its_acceptance_together() {
    let app = TestApp::new().await;
    let tender = app.create_tender("TN-LOA-2").await;
    let tender_id = str_field(&tender["tender"], "id");

    let (status, body) = app
        .send(Method::POST, "/api/v1/loas", Some(loa_payload(tender_id, "LOA-ACC-2")))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let loa_id = str_field(&body["data"], "id").to_string();

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/loas/{loa_id}/acceptance"),
            Some(json!({ "document_path": "uploads/loa/acceptance-2.pdf" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    for target in ["Draft", "Issued", "Cancelled"] {
        let (status, body) = app
            .send(
                Method::PUT,
                &format!("/api/v1/loas/{loa_id}"),
                Some(json!({ "status": target })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{target}: {body}");
    }

    // Other fields stay editable.
    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/v1/loas/{loa_id}"),
            Some(json!({ "remarks": "countersigned" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let loa = app.get_data(&format!("/api/v1/loas/{loa_id}")).await;
    assert_eq!(loa["status"], "Accepted");
    assert_eq!(loa["remarks"], "countersigned");
    assert_eq!(loa["acceptance_document_path"], "uploads/loa/acceptance-2.pdf");
    assert!(loa["acceptance_date"].is_string());
}

#[tokio::test]
async fn loa_listing_and_deletion() {
    let app = TestApp::new().await;
    let tender = app.create_tender("TN-LOA-2").await;
    let other = app.create_tender("TN-LOA-3").await;
    let tender_id = str_field(&tender["tender"], "id");
    let other_id = str_field(&other["tender"], "id");

    let (_, used) = app
        .send(Method::POST, "/api/v1/loas", Some(loa_payload(tender_id, "LOA-L-1")))
        .await;
    let (_, spare) = app
        .send(Method::POST, "/api/v1/loas", Some(loa_payload(tender_id, "LOA-L-2")))
        .await;
    app.send(Method::POST, "/api/v1/loas", Some(loa_payload(other_id, "LOA-L-3")))
        .await;
    let used_id = str_field(&used["data"], "id").to_string();
    let spare_id = str_field(&spare["data"], "id").to_string();

    let page = app
        .get_data(&format!("/api/v1/loas?tender_id={tender_id}"))
        .await;
    assert_eq!(page["total"], 2);

    app.send(
        Method::POST,
        &format!("/api/v1/loas/{used_id}/acceptance"),
        Some(json!({ "document_path": "uploads/loa/l1.pdf" })),
    )
    .await;
    let page = app.get_data("/api/v1/loas?status=Accepted").await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["id"], used_id.as_str());

    let mut po = common::po_payload(tender_id, "PO-LOA-2", 1);
    po["loa_id"] = json!(used_id);
    let (status, _) = app.send(Method::POST, "/api/v1/purchase-orders", Some(po)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/v1/loas/{used_id}"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/v1/loas/{spare_id}"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.count_rows("loas").await, 2);
}

#[tokio::test]
async fn purchase_order_search_filters() {
    let app = TestApp::new().await;
    let first = app.create_tender("TN-SRCH-1").await;
    let second = app.create_tender("TN-SRCH-2").await;
    let first_id = str_field(&first["tender"], "id");
    let second_id = str_field(&second["tender"], "id");

    app.create_purchase_order(first_id, "PO-NORTH-001", 1).await;
    app.create_purchase_order(first_id, "PO-NORTH-002", 2).await;
    let south = app.create_purchase_order(second_id, "PO-SOUTH-001", 1).await;

    let page = app
        .get_data("/api/v1/purchase-orders/search?po_number=NORTH")
        .await;
    assert_eq!(page["total"], 2);

    let page = app
        .get_data(&format!("/api/v1/purchase-orders/search?tender_id={second_id}"))
        .await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["id"], south["purchase_order"]["id"]);

    let page = app
        .get_data("/api/v1/purchase-orders/search?start_date=2024-03-01&end_date=2024-03-31")
        .await;
    assert_eq!(page["total"], 3);

    let page = app
        .get_data("/api/v1/purchase-orders/search?start_date=2025-01-01&end_date=2025-12-31")
        .await;
    assert_eq!(page["total"], 0);

    // A lone bound is ignored.
    let page = app
        .get_data("/api/v1/purchase-orders/search?start_date=2030-01-01")
        .await;
    assert_eq!(page["total"], 3);

    let page = app
        .get_data("/api/v1/purchase-orders/search?limit=1&page=2")
        .await;
    assert_eq!(page["total"], 3);
    assert_eq!(page["total_pages"], 3);
    assert_eq!(page["page"], 2);
    assert_eq!(page["items"].as_array().map(Vec::len), Some(1));

    let page = app
        .get_data("/api/v1/purchase-orders/search?status=Completed")
        .await;
    assert_eq!(page["total"], 0);

    let (status, body) = app
        .send(Method::GET, "/api/v1/purchase-orders/search?status=Lost", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"][0].as_str().unwrap_or_default().starts_with("status:"));
}

#[tokio::test]
async fn oversized_page_numbers_are_rejected() {
    let app = TestApp::new().await;
    app.create_tender("TN-PAGE-1").await;

    for uri in [
        "/api/v1/purchase-orders/search?page=18446744073709551615",
        "/api/v1/tenders?page=18446744073709551615",
        "/api/v1/loas?page=1000001",
    ] {
        let (status, body) = app.send(Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}: {body}");
        assert!(body["details"][0].as_str().unwrap_or_default().starts_with("page:"));
    }

    // A far but valid page is simply empty.
    let page = app.get_data("/api/v1/tenders?page=1000000").await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn purchase_order_view_includes_stage_records() {
    let app = TestApp::new().await;
    let tender = app.create_tender("TN-VIEW-1").await;
    let po = app
        .create_purchase_order(str_field(&tender["tender"], "id"), "PO-VIEW-1", 2)
        .await;
    let po_id = str_field(&po["purchase_order"], "id");
    let consignee_id = str_field(&po["consignees"][1], "id");
    app.complete_stage(consignee_id, "logistics").await;

    let view = app.purchase_order(po_id).await;
    assert_eq!(view["po_number"], "PO-VIEW-1");
    let consignees = view["consignees"].as_array().expect("consignees");
    assert_eq!(consignees[0]["sr_no"], "1");
    assert!(consignees[0]["logistics"].is_null());
    assert_eq!(consignees[1]["logistics"]["courier_name"], "BlueDart");

    let (status, _) = app
        .send(
            Method::GET,
            &format!("/api/v1/purchase-orders/{}", uuid::Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_metrics_and_docs_are_served() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    let body = response_json(response).await;
    assert_eq!(body["status"], "up");

    let response = app.request(Method::GET, "/health/ready", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.request(Method::GET, "/metrics", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("metrics body");
    assert!(String::from_utf8_lossy(&bytes).contains("lifecycle_po_creations_total"));

    let response = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let doc = response_json(response).await;
    assert!(doc["paths"]["/api/v1/tenders"].is_object());

    let status = app.get_data("/api/v1/status").await;
    assert_eq!(status["status"], "ok");
}
