use crate::{
    commands::{
        loas::{CreateLoaCommand, DeleteLoaCommand, UpdateLoaCommand, UploadLoaAcceptanceCommand},
        Command,
    },
    db::DbPool,
    errors::ServiceError,
    events::EventSender,
    models::{loa, LoaStatus},
    services::{
        audit::{AuditEntry, AuditSink},
        checked_page, Page,
    },
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::{error, instrument};
use uuid::Uuid;

/// Service for Letters of Award
#[derive(Clone)]
pub struct LoaService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    audit: Arc<dyn AuditSink>,
}

impl LoaService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            audit,
        }
    }

    #[instrument(skip(self, command), fields(loa_number = %command.loa_number))]
    pub async fn create_loa(&self, command: CreateLoaCommand) -> Result<loa::Model, ServiceError> {
        let created = command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;

        self.audit
            .record(
                AuditEntry::new(command.actor_id, "loa.create", "loa", Some(created.id))
                    .with_details(serde_json::json!({
                        "loa_number": created.loa_number,
                        "tender_id": created.tender_id,
                    })),
            )
            .await;
        Ok(created)
    }

    #[instrument(skip(self, command), fields(loa_id = %command.loa_id))]
    pub async fn update_loa(&self, command: UpdateLoaCommand) -> Result<loa::Model, ServiceError> {
        let updated = command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;

        self.audit
            .record(AuditEntry::new(
                command.actor_id,
                "loa.update",
                "loa",
                Some(command.loa_id),
            ))
            .await;
        Ok(updated)
    }

    /// Records the acceptance document and marks the LOA Accepted.
    #[instrument(skip(self, command), fields(loa_id = %command.loa_id))]
    pub async fn upload_acceptance(
        &self,
        command: UploadLoaAcceptanceCommand,
    ) -> Result<loa::Model, ServiceError> {
        let accepted = command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;

        self.audit
            .record(
                AuditEntry::new(command.actor_id, "loa.accept", "loa", Some(command.loa_id))
                    .with_details(serde_json::json!({ "document_path": command.document_path })),
            )
            .await;
        Ok(accepted)
    }

    #[instrument(skip(self))]
    pub async fn get_loa(&self, loa_id: Uuid) -> Result<loa::Model, ServiceError> {
        loa::Entity::find_by_id(loa_id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("LOA {}", loa_id)))
    }

    #[instrument(skip(self))]
    pub async fn list_loas(
        &self,
        status: Option<LoaStatus>,
        tender_id: Option<Uuid>,
        page: u64,
        limit: u64,
    ) -> Result<Page<loa::Model>, ServiceError> {
        let page = checked_page(page, limit)?;
        let db = self.db_pool.as_ref();

        let mut query = loa::Entity::find();
        if let Some(status) = status {
            query = query.filter(loa::Column::Status.eq(status));
        }
        if let Some(tender_id) = tender_id {
            query = query.filter(loa::Column::TenderId.eq(tender_id));
        }

        let paginator = query.order_by_desc(loa::Column::CreatedAt).paginate(db, limit);
        let total = paginator.num_items().await.map_err(|e| {
            error!("Failed to count LOAs: {}", e);
            ServiceError::db_error(e)
        })?;
        let items = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(Page::new(items, total, page, limit))
    }

    #[instrument(skip(self, command), fields(loa_id = %command.loa_id))]
    pub async fn delete_loa(&self, command: DeleteLoaCommand) -> Result<(), ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;

        self.audit
            .record(AuditEntry::new(
                command.actor_id,
                "loa.delete",
                "loa",
                Some(command.loa_id),
            ))
            .await;
        Ok(())
    }
}
