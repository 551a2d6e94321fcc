#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use sea_orm::{ConnectionTrait, DatabaseBackend as DbBackend, DatabaseConnection, Statement};
use serde_json::{json, Value};
use tender_tracker_api::{
    auth::ACTOR_ID_HEADER,
    build_router,
    config::AppConfig,
    db,
    events::{self, EventSender},
    handlers::AppServices,
    logging::{discard_logger, LoggingState},
    services::audit::{AuditSink, DatabaseAuditSink},
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Past date accepted by every "not in the future" check.
pub const PAST_DATE: &str = "2024-03-15";

/// Full application over a private in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub actor_id: Uuid,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.cors_allow_any_origin = true;
        cfg.reconciliation_interval_secs = 0;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let audit: Arc<dyn AuditSink> = Arc::new(DatabaseAuditSink::new(db_arc.clone()));
        let services = AppServices::new(
            db_arc.clone(),
            event_sender.clone(),
            audit,
            cfg.rollup_max_retries,
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = build_router(state.clone(), Arc::new(LoggingState::new(discard_logger())));

        Self {
            router,
            state,
            actor_id: Uuid::new_v4(),
            _event_task: event_task,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        self.state.db.as_ref()
    }

    /// Sends a request, optionally carrying an actor identity.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        actor: Option<Uuid>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(actor) = actor {
            builder = builder.header(ACTOR_ID_HEADER, actor.to_string());
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Request as the default actor, returning status and decoded body.
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.request(method, uri, body, Some(self.actor_id)).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    pub async fn execute_sql(&self, sql: &str) {
        self.db()
            .execute(Statement::from_string(DbBackend::Sqlite, sql.to_string()))
            .await
            .expect("raw sql executes");
    }

    pub async fn count_rows(&self, table: &str) -> i64 {
        let row = self
            .db()
            .query_one(Statement::from_string(
                DbBackend::Sqlite,
                format!("SELECT COUNT(*) AS n FROM {table}"),
            ))
            .await
            .expect("count query")
            .expect("count row");
        row.try_get::<i64>("", "n").expect("count column")
    }

    /// Creates a tender through the API and returns its `data` payload.
    pub async fn create_tender(&self, tender_number: &str) -> Value {
        self.create_tender_with(tender_payload(tender_number)).await
    }

    pub async fn create_tender_with(&self, payload: Value) -> Value {
        let (status, body) = self.send(Method::POST, "/api/v1/tenders", Some(payload)).await;
        assert_eq!(status, StatusCode::CREATED, "tender creation failed: {body}");
        body["data"].clone()
    }

    /// Creates a purchase order with `locations` delivery sites.
    pub async fn create_purchase_order(
        &self,
        tender_id: &str,
        po_number: &str,
        locations: usize,
    ) -> Value {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/purchase-orders",
                Some(po_payload(tender_id, po_number, locations)),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "purchase order creation failed: {body}");
        body["data"].clone()
    }

    pub async fn update_stage(&self, consignee_id: &str, payload: Value) -> (StatusCode, Value) {
        self.send(
            Method::PUT,
            &format!("/api/v1/consignees/{consignee_id}/stage"),
            Some(payload),
        )
        .await
    }

    /// Records a complete stage record and asserts it was accepted.
    pub async fn complete_stage(&self, consignee_id: &str, stage: &str) -> Value {
        let (status, body) = self
            .update_stage(consignee_id, complete_stage_payload(stage))
            .await;
        assert_eq!(status, StatusCode::OK, "stage {stage} update failed: {body}");
        body["data"].clone()
    }

    pub async fn complete_all_stages(&self, consignee_id: &str) {
        for stage in ["logistics", "challan_receipt", "installation", "invoice"] {
            self.complete_stage(consignee_id, stage).await;
        }
    }

    pub async fn get_data(&self, uri: &str) -> Value {
        let (status, body) = self.send(Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::OK, "GET {uri} failed: {body}");
        body["data"].clone()
    }

    pub async fn tender(&self, tender_id: &str) -> Value {
        self.get_data(&format!("/api/v1/tenders/{tender_id}")).await
    }

    pub async fn purchase_order(&self, po_id: &str) -> Value {
        self.get_data(&format!("/api/v1/purchase-orders/{po_id}")).await
    }

    pub async fn consignee(&self, consignee_id: &str) -> Value {
        self.get_data(&format!("/api/v1/consignees/{consignee_id}")).await
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("json response")
}

pub fn tender_payload(tender_number: &str) -> Value {
    json!({
        "tender_number": tender_number,
        "authority_type": "UPMSCL",
        "po_date": PAST_DATE,
        "contract_date": PAST_DATE,
        "lead_time_to_deliver": 30,
        "lead_time_to_install": 15,
        "equipment_name": "Ventilator",
        "remarks": "Critical care equipment"
    })
}

pub fn po_payload(tender_id: &str, po_number: &str, locations: usize) -> Value {
    let locations: Vec<Value> = (1..=locations)
        .map(|i| {
            json!({
                "district_name": format!("District {i}"),
                "block_name": format!("Block {i}"),
                "facility_name": format!("Facility {i}"),
            })
        })
        .collect();

    json!({
        "tender_id": tender_id,
        "po_number": po_number,
        "po_date": PAST_DATE,
        "equipment_name": "Ventilator",
        "lead_time_to_deliver": 30,
        "lead_time_to_install": 15,
        "locations": locations,
    })
}

pub fn loa_payload(tender_id: &str, loa_number: &str) -> Value {
    json!({
        "loa_number": loa_number,
        "tender_id": tender_id,
        "issue_date": PAST_DATE,
        "validity_period": 90,
        "total_value": "50000",
        "equipment_details": { "model": "VX-200", "quantity": 2 }
    })
}

/// A stage update carrying every field its record needs to count as complete.
pub fn complete_stage_payload(stage: &str) -> Value {
    match stage {
        "logistics" => json!({
            "stage": "logistics",
            "dispatch_date": PAST_DATE,
            "courier_name": "BlueDart",
            "docket_number": "BD-1001",
            "documents": ["uploads/logistics/lr-1001.pdf"]
        }),
        "challan_receipt" => json!({
            "stage": "challan_receipt",
            "receipt_date": PAST_DATE,
            "document_path": "uploads/challan/ch-1001.pdf"
        }),
        "installation" => json!({
            "stage": "installation",
            "installation_date": PAST_DATE,
            "document_path": "uploads/installation/ir-1001.pdf"
        }),
        "invoice" => json!({
            "stage": "invoice",
            "invoice_number": "INV-1001",
            "invoice_date": PAST_DATE,
            "amount": "25000",
            "document_path": "uploads/invoice/inv-1001.pdf"
        }),
        other => panic!("unknown stage {other}"),
    }
}

pub fn str_field<'a>(value: &'a Value, field: &str) -> &'a str {
    value[field]
        .as_str()
        .unwrap_or_else(|| panic!("field {field} missing in {value}"))
}
