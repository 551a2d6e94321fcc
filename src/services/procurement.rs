use crate::{
    commands::{
        purchaseorders::{
            CreatePurchaseOrderCommand, CreatePurchaseOrderResult,
            UpdatePurchaseOrderStatusCommand, UpdatePurchaseOrderStatusResult,
        },
        Command,
    },
    db::DbPool,
    errors::ServiceError,
    events::EventSender,
    models::{consignee, purchase_order, PurchaseOrderStatus},
    services::{
        audit::{AuditEntry, AuditSink},
        consignees::{load_consignee_details, ConsigneeDetails},
        rollup::{EntityKind, StatusRollupEngine},
        checked_page, Page,
    },
};
use chrono::NaiveDate;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// A purchase order with every consignee and their stage records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrderDetails {
    #[serde(flatten)]
    pub purchase_order: purchase_order::Model,
    pub consignees: Vec<ConsigneeDetails>,
}

/// Purchase order search filters. The date range applies only when both
/// ends are given and is inclusive on `po_date`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PurchaseOrderSearch {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub po_number: Option<String>,
    pub status: Option<PurchaseOrderStatus>,
    pub tender_id: Option<Uuid>,
}

/// Orders consignees by their numeric serial.
pub(crate) fn sort_by_serial(consignees: &mut [consignee::Model]) {
    consignees.sort_by_key(|c| c.sr_no.parse::<u32>().unwrap_or(u32::MAX));
}

/// Service for purchase orders and their delivery locations
#[derive(Clone)]
pub struct ProcurementService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    rollup: StatusRollupEngine,
    audit: Arc<dyn AuditSink>,
}

impl ProcurementService {
    /// Creates a new procurement service instance
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        rollup: StatusRollupEngine,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            rollup,
            audit,
        }
    }

    /// Creates a purchase order together with one consignee per location.
    /// Either everything is stored or nothing is.
    #[instrument(skip(self, command), fields(po_number = %command.po_number, tender_id = %command.tender_id))]
    pub async fn create_purchase_order(
        &self,
        command: CreatePurchaseOrderCommand,
    ) -> Result<CreatePurchaseOrderResult, ServiceError> {
        let result = command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;

        self.rollup.cascade_from_tender(command.tender_id).await;

        self.audit
            .record(
                AuditEntry::new(
                    command.actor_id,
                    "purchase_order.create",
                    "purchase_order",
                    Some(result.purchase_order.id),
                )
                .with_details(serde_json::json!({
                    "po_number": result.purchase_order.po_number,
                    "tender_id": result.purchase_order.tender_id,
                    "consignees": result.consignees.len(),
                })),
            )
            .await;

        info!(
            po_id = %result.purchase_order.id,
            consignees = result.consignees.len(),
            "Purchase order created"
        );
        Ok(result)
    }

    #[instrument(skip(self))]
    pub async fn get_purchase_order(
        &self,
        po_id: Uuid,
    ) -> Result<PurchaseOrderDetails, ServiceError> {
        let db = self.db_pool.as_ref();

        let purchase_order = purchase_order::Entity::find_by_id(po_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Purchase order {}", po_id)))?;

        let mut consignees = consignee::Entity::find()
            .filter(consignee::Column::PoId.eq(po_id))
            .all(db)
            .await?;
        sort_by_serial(&mut consignees);

        let consignees = load_consignee_details(db, consignees).await?;

        Ok(PurchaseOrderDetails {
            purchase_order,
            consignees,
        })
    }

    /// Searches purchase orders, newest first.
    #[instrument(skip(self))]
    pub async fn search_purchase_orders(
        &self,
        search: PurchaseOrderSearch,
        page: u64,
        limit: u64,
    ) -> Result<Page<purchase_order::Model>, ServiceError> {
        let page = checked_page(page, limit)?;
        let db = self.db_pool.as_ref();

        let mut query = purchase_order::Entity::find();

        if let (Some(start), Some(end)) = (search.start_date, search.end_date) {
            query = query.filter(purchase_order::Column::PoDate.between(start, end));
        }
        if let Some(po_number) = search
            .po_number
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            query = query.filter(purchase_order::Column::PoNumber.contains(po_number));
        }
        if let Some(status) = search.status {
            query = query.filter(purchase_order::Column::Status.eq(status));
        }
        if let Some(tender_id) = search.tender_id {
            query = query.filter(purchase_order::Column::TenderId.eq(tender_id));
        }

        let paginator = query
            .order_by_desc(purchase_order::Column::CreatedAt)
            .paginate(db, limit);

        let total = paginator.num_items().await.map_err(|e| {
            error!("Failed to count purchase orders: {}", e);
            ServiceError::db_error(e)
        })?;
        let items = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!("Failed to fetch purchase orders page {}: {}", page, e);
            ServiceError::db_error(e)
        })?;

        Ok(Page::new(items, total, page, limit))
    }

    /// Explicit status override. Tender rollup follows when the status moved.
    #[instrument(skip(self, command), fields(po_id = %command.po_id, status = %command.status))]
    pub async fn update_status(
        &self,
        command: UpdatePurchaseOrderStatusCommand,
    ) -> Result<UpdatePurchaseOrderStatusResult, ServiceError> {
        let result = {
            let _guard = self
                .rollup
                .locks()
                .lock(EntityKind::PurchaseOrder, command.po_id)
                .await;
            command
                .execute(self.db_pool.clone(), self.event_sender.clone())
                .await?
        };

        if result.changed {
            self.rollup
                .cascade_from_tender(result.purchase_order.tender_id)
                .await;

            self.audit
                .record(
                    AuditEntry::new(
                        command.actor_id,
                        "purchase_order.status.update",
                        "purchase_order",
                        Some(command.po_id),
                    )
                    .with_details(serde_json::json!({
                        "from": result.previous_status,
                        "to": result.purchase_order.status,
                    })),
                )
                .await;
        }

        Ok(result)
    }
}
