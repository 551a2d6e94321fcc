use crate::{
    commands::Command,
    db::{with_transaction, DbPool},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{loa, purchase_order},
};
use sea_orm::{ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteLoaCommand {
    pub actor_id: Uuid,
    pub loa_id: Uuid,
}

#[async_trait::async_trait]
impl Command for DeleteLoaCommand {
    type Result = ();

    #[instrument(skip(self, db_pool, event_sender), fields(loa_id = %self.loa_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let loa_id = self.loa_id;

        with_transaction::<_, _, ServiceError>(db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let existing = loa::Entity::find_by_id(loa_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("LOA {}", loa_id)))?;

                let purchase_orders = purchase_order::Entity::find()
                    .filter(purchase_order::Column::LoaId.eq(loa_id))
                    .count(txn)
                    .await?;
                if purchase_orders > 0 {
                    return Err(ServiceError::Conflict(format!(
                        "LOA {} is referenced by {} purchase order(s)",
                        existing.loa_number, purchase_orders
                    )));
                }

                existing.delete(txn).await?;
                Ok(())
            })
        })
        .await?;

        info!(actor_id = %self.actor_id, "LOA deleted");
        event_sender.send_or_log(Event::LoaDeleted(loa_id)).await;
        Ok(())
    }
}
