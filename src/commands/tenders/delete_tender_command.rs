use crate::{
    commands::Command,
    db::{with_transaction, DbPool},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{consignee, loa, purchase_order, tender},
};
use sea_orm::{ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Deletes a tender that has no LOAs, purchase orders or consignees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteTenderCommand {
    pub actor_id: Uuid,
    pub tender_id: Uuid,
}

#[async_trait::async_trait]
impl Command for DeleteTenderCommand {
    type Result = ();

    #[instrument(skip(self, db_pool, event_sender), fields(tender_id = %self.tender_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let tender_id = self.tender_id;

        with_transaction::<_, _, ServiceError>(db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let existing = tender::Entity::find_by_id(tender_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("Tender {}", tender_id)))?;

                let loas = loa::Entity::find()
                    .filter(loa::Column::TenderId.eq(tender_id))
                    .count(txn)
                    .await?;
                let purchase_orders = purchase_order::Entity::find()
                    .filter(purchase_order::Column::TenderId.eq(tender_id))
                    .count(txn)
                    .await?;
                let consignees = consignee::Entity::find()
                    .filter(consignee::Column::TenderId.eq(tender_id))
                    .count(txn)
                    .await?;

                if loas + purchase_orders + consignees > 0 {
                    return Err(ServiceError::Conflict(format!(
                        "tender {} still has {} LOA(s), {} purchase order(s) and {} consignee(s)",
                        existing.tender_number, loas, purchase_orders, consignees
                    )));
                }

                existing.delete(txn).await?;
                Ok(())
            })
        })
        .await?;

        info!(actor_id = %self.actor_id, "Tender deleted");
        event_sender.send_or_log(Event::TenderDeleted(tender_id)).await;
        Ok(())
    }
}
