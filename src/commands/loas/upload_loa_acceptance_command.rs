use crate::{
    commands::{not_blank, Command},
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{loa, LoaStatus},
};
use chrono::Utc;
use sea_orm::{sea_query::Expr, ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Records the acceptance document of an LOA. Path, date and status are set
/// by a single conditional UPDATE, so no reader sees one without the others.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UploadLoaAcceptanceCommand {
    pub actor_id: Uuid,
    pub loa_id: Uuid,
    #[validate(length(max = 1024), custom = "not_blank")]
    pub document_path: String,
}

#[async_trait::async_trait]
impl Command for UploadLoaAcceptanceCommand {
    type Result = loa::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(loa_id = %self.loa_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;
        let db = db_pool.as_ref();
        let document_path = self.document_path.trim().to_string();
        let now = Utc::now();

        let result = loa::Entity::update_many()
            .col_expr(loa::Column::AcceptanceDocumentPath, Expr::value(document_path.clone()))
            .col_expr(loa::Column::AcceptanceDate, Expr::value(now.date_naive()))
            .col_expr(loa::Column::Status, Expr::value(LoaStatus::Accepted))
            .col_expr(loa::Column::UpdatedAt, Expr::value(now))
            .filter(loa::Column::Id.eq(self.loa_id))
            .filter(loa::Column::Status.is_not_in([LoaStatus::Cancelled, LoaStatus::Expired]))
            .exec(db)
            .await?;

        let current = loa::Entity::find_by_id(self.loa_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("LOA {}", self.loa_id)))?;

        if result.rows_affected == 0 {
            return Err(ServiceError::InvalidStatus(format!(
                "LOA {} is {}; acceptance can no longer be recorded",
                current.loa_number, current.status
            )));
        }

        info!(actor_id = %self.actor_id, document_path = %document_path, "LOA acceptance recorded");
        event_sender
            .send_or_log(Event::LoaAccepted {
                loa_id: self.loa_id,
                document_path,
            })
            .await;
        Ok(current)
    }
}
