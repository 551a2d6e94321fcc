use crate::{
    commands::{
        tenders::{
            CreateTenderCommand, CreateTenderResult, DeleteTenderCommand, UpdateTenderFlagsCommand,
        },
        Command,
    },
    db::DbPool,
    errors::ServiceError,
    events::EventSender,
    models::{consignee, loa, purchase_order, tender, TenderStatus},
    services::{
        audit::{AuditEntry, AuditSink},
        procurement::sort_by_serial,
        rollup::{EntityKind, StatusRollupEngine},
        checked_page, Page,
    },
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// A tender with its LOAs, purchase orders and tender-direct consignees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenderDetails {
    #[serde(flatten)]
    pub tender: tender::Model,
    pub loas: Vec<loa::Model>,
    pub purchase_orders: Vec<purchase_order::Model>,
    pub consignees: Vec<consignee::Model>,
}

/// Service for managing tenders
#[derive(Clone)]
pub struct TenderService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    rollup: StatusRollupEngine,
    audit: Arc<dyn AuditSink>,
}

impl TenderService {
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

    /// Creates a tender in Draft, together with any tender-direct locations.
    #[instrument(skip(self, command), fields(tender_number = %command.tender_number))]
    pub async fn create_tender(
        &self,
        command: CreateTenderCommand,
    ) -> Result<CreateTenderResult, ServiceError> {
        let result = command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;

        self.audit
            .record(
                AuditEntry::new(command.actor_id, "tender.create", "tender", Some(result.tender.id))
                    .with_details(serde_json::json!({
                        "tender_number": result.tender.tender_number,
                        "consignees": result.consignees.len(),
                    })),
            )
            .await;

        info!(tender_id = %result.tender.id, "Tender created");
        Ok(result)
    }

    #[instrument(skip(self))]
    pub async fn get_tender(&self, tender_id: Uuid) -> Result<TenderDetails, ServiceError> {
        let db = self.db_pool.as_ref();

        let tender = tender::Entity::find_by_id(tender_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Tender {}", tender_id)))?;

        let loas = loa::Entity::find()
            .filter(loa::Column::TenderId.eq(tender_id))
            .order_by_asc(loa::Column::CreatedAt)
            .all(db)
            .await?;

        let purchase_orders = purchase_order::Entity::find()
            .filter(purchase_order::Column::TenderId.eq(tender_id))
            .order_by_asc(purchase_order::Column::CreatedAt)
            .all(db)
            .await?;

        let mut consignees = consignee::Entity::find()
            .filter(consignee::Column::TenderId.eq(tender_id))
            .filter(consignee::Column::PoId.is_null())
            .all(db)
            .await?;
        sort_by_serial(&mut consignees);

        Ok(TenderDetails {
            tender,
            loas,
            purchase_orders,
            consignees,
        })
    }

    /// Lists tenders newest first, optionally filtered by status.
    #[instrument(skip(self))]
    pub async fn list_tenders(
        &self,
        status: Option<TenderStatus>,
        page: u64,
        limit: u64,
    ) -> Result<Page<tender::Model>, ServiceError> {
        let page = checked_page(page, limit)?;
        let db = self.db_pool.as_ref();

        let mut query = tender::Entity::find();
        if let Some(status) = status {
            query = query.filter(tender::Column::Status.eq(status));
        }

        let paginator = query
            .order_by_desc(tender::Column::CreatedAt)
            .paginate(db, limit);

        let total = paginator.num_items().await.map_err(|e| {
            error!("Failed to count tenders: {}", e);
            ServiceError::db_error(e)
        })?;
        let items = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!("Failed to fetch tenders page {}: {}", page, e);
            ServiceError::db_error(e)
        })?;

        Ok(Page::new(items, total, page, limit))
    }

    /// Sets the accessories/consumables pending flags and re-derives the
    /// tender status, which depends on them.
    #[instrument(skip(self, command), fields(tender_id = %command.tender_id))]
    pub async fn update_pending_flags(
        &self,
        command: UpdateTenderFlagsCommand,
    ) -> Result<tender::Model, ServiceError> {
        {
            let _guard = self
                .rollup
                .locks()
                .lock(EntityKind::Tender, command.tender_id)
                .await;
            command
                .execute(self.db_pool.clone(), self.event_sender.clone())
                .await?;
        }

        self.rollup.cascade_from_tender(command.tender_id).await;

        self.audit
            .record(
                AuditEntry::new(
                    command.actor_id,
                    "tender.flags.update",
                    "tender",
                    Some(command.tender_id),
                )
                .with_details(serde_json::json!({
                    "accessories_pending": command.accessories_pending,
                    "consumables_pending": command.consumables_pending,
                })),
            )
            .await;

        tender::Entity::find_by_id(command.tender_id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Tender {}", command.tender_id)))
    }

    /// Deletes a tender that has no LOAs, purchase orders or consignees.
    #[instrument(skip(self, command), fields(tender_id = %command.tender_id))]
    pub async fn delete_tender(&self, command: DeleteTenderCommand) -> Result<(), ServiceError> {
        {
            let _guard = self
                .rollup
                .locks()
                .lock(EntityKind::Tender, command.tender_id)
                .await;
            command
                .execute(self.db_pool.clone(), self.event_sender.clone())
                .await?;
        }

        self.audit
            .record(AuditEntry::new(
                command.actor_id,
                "tender.delete",
                "tender",
                Some(command.tender_id),
            ))
            .await;
        Ok(())
    }
}
