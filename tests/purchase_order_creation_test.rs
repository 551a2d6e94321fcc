mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use common::{po_payload, str_field, TestApp};

#[tokio::test]
async fn creates_one_consignee_per_location_in_order() {
    let app = TestApp::new().await;
    let tender = app.create_tender("TN-PO-001").await;
    let tender_id = str_field(&tender["tender"], "id");

    let created = app.create_purchase_order(tender_id, "PO-001", 3).await;

    assert_eq!(created["purchase_order"]["status"], "Active");
    assert_eq!(created["purchase_order"]["tender_id"], tender_id);
    let consignees = created["consignees"].as_array().expect("consignees array");
    assert_eq!(consignees.len(), 3);
    for (index, consignee) in consignees.iter().enumerate() {
        assert_eq!(consignee["sr_no"], (index + 1).to_string());
        assert_eq!(consignee["consignment_status"], "Processing");
        assert_eq!(consignee["po_id"], created["purchase_order"]["id"]);
        assert_eq!(consignee["facility_name"], format!("Facility {}", index + 1));
    }

    assert_eq!(app.count_rows("purchase_orders").await, 1);
    assert_eq!(app.count_rows("consignees").await, 3);

    // The tender picks up its first live purchase order.
    let tender = app.tender(tender_id).await;
    assert_eq!(tender["status"], "In Progress");
    assert_eq!(tender["installation_pending"], true);
    assert_eq!(tender["invoice_pending"], true);
}

#[tokio::test]
async fn reports_every_validation_problem_at_once() {
    let app = TestApp::new().await;
    let tender = app.create_tender("TN-PO-002").await;
    let tender_id = str_field(&tender["tender"], "id");

    let tomorrow = (Utc::now().date_naive() + Duration::days(1)).to_string();
    let payload = json!({
        "tender_id": tender_id,
        "po_number": "   ",
        "po_date": tomorrow,
        "equipment_name": "Ventilator",
        "lead_time_to_deliver": 0,
        "lead_time_to_install": 15,
        "locations": []
    });

    let (status, body) = app
        .send(Method::POST, "/api/v1/purchase-orders", Some(payload))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let details: Vec<&str> = body["details"]
        .as_array()
        .expect("details listed")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(details.len(), 4, "{details:?}");
    for field in ["po_number:", "po_date:", "lead_time_to_deliver:", "locations:"] {
        assert!(
            details.iter().any(|d| d.starts_with(field)),
            "missing {field} in {details:?}"
        );
    }

    assert_eq!(app.count_rows("purchase_orders").await, 0);
    assert_eq!(app.count_rows("consignees").await, 0);
}

#[tokio::test]
async fn failure_while_inserting_consignees_leaves_nothing_behind() {
    let app = TestApp::new().await;
    let tender = app.create_tender("TN-PO-003").await;
    let tender_id = str_field(&tender["tender"], "id");

    app.execute_sql(
        "CREATE TRIGGER fail_consignee_insert BEFORE INSERT ON consignees \
         WHEN NEW.facility_name = 'BOOM' \
         BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
    )
    .await;

    let mut payload = po_payload(tender_id, "PO-003", 2);
    payload["locations"][1]["facility_name"] = json!("BOOM");

    let (status, body) = app
        .send(Method::POST, "/api/v1/purchase-orders", Some(payload))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{body}");
    assert_eq!(app.count_rows("purchase_orders").await, 0);
    assert_eq!(app.count_rows("consignees").await, 0);

    // The tender never saw a purchase order.
    let tender = app.tender(tender_id).await;
    assert_eq!(tender["status"], "Draft");
    assert_eq!(tender["purchase_orders"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn unknown_tender_is_not_found() {
    let app = TestApp::new().await;
    let payload = po_payload(&uuid::Uuid::new_v4().to_string(), "PO-404", 1);

    let (status, _) = app
        .send(Method::POST, "/api/v1/purchase-orders", Some(payload))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.count_rows("purchase_orders").await, 0);
}

#[tokio::test]
async fn duplicate_po_number_conflicts_without_partial_state() {
    let app = TestApp::new().await;
    let tender = app.create_tender("TN-PO-004").await;
    let tender_id = str_field(&tender["tender"], "id");

    app.create_purchase_order(tender_id, "PO-DUP", 1).await;
    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(po_payload(tender_id, "PO-DUP", 2)),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(app.count_rows("purchase_orders").await, 1);
    assert_eq!(app.count_rows("consignees").await, 1);
}

#[tokio::test]
async fn loa_must_belong_to_the_same_tender() {
    let app = TestApp::new().await;
    let first = app.create_tender("TN-PO-005").await;
    let second = app.create_tender("TN-PO-006").await;
    let first_id = str_field(&first["tender"], "id");
    let second_id = str_field(&second["tender"], "id");

    let (status, loa) = app
        .send(
            Method::POST,
            "/api/v1/loas",
            Some(common::loa_payload(first_id, "LOA-005")),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{loa}");

    let mut payload = po_payload(second_id, "PO-005", 1);
    payload["loa_id"] = loa["data"]["id"].clone();
    let (status, _) = app
        .send(Method::POST, "/api/v1/purchase-orders", Some(payload))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.count_rows("purchase_orders").await, 0);
}
