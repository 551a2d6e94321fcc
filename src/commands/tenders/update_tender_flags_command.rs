use crate::{
    commands::Command,
    db::DbPool,
    errors::ServiceError,
    events::EventSender,
    models::tender,
};
use chrono::Utc;
use sea_orm::{sea_query::Expr, ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Flips the accessory/consumable pending flags of a tender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTenderFlagsCommand {
    pub actor_id: Uuid,
    pub tender_id: Uuid,
    pub accessories_pending: Option<bool>,
    pub consumables_pending: Option<bool>,
}

#[async_trait::async_trait]
impl Command for UpdateTenderFlagsCommand {
    type Result = tender::Model;

    #[instrument(skip(self, db_pool, _event_sender), fields(tender_id = %self.tender_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        _event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        if self.accessories_pending.is_none() && self.consumables_pending.is_none() {
            return Err(ServiceError::ValidationError(
                "provide accessories_pending and/or consumables_pending".to_string(),
            ));
        }

        let db = db_pool.as_ref();
        let mut update = tender::Entity::update_many()
            .col_expr(tender::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(tender::Column::Id.eq(self.tender_id));
        if let Some(flag) = self.accessories_pending {
            update = update.col_expr(tender::Column::AccessoriesPending, Expr::value(flag));
        }
        if let Some(flag) = self.consumables_pending {
            update = update.col_expr(tender::Column::ConsumablesPending, Expr::value(flag));
        }

        let result = update.exec(db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Tender {}", self.tender_id)));
        }

        let updated = tender::Entity::find_by_id(self.tender_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Tender {}", self.tender_id)))?;

        info!(
            actor_id = %self.actor_id,
            accessories_pending = updated.accessories_pending,
            consumables_pending = updated.consumables_pending,
            "Tender pending flags updated"
        );
        Ok(updated)
    }
}
