use super::{check_status_change, positive_amount, structured_details, writable_status};
use crate::{
    commands::{not_blank, not_in_future, Command},
    db::{with_transaction, DbPool},
    errors::ServiceError,
    events::{Event, EventSender},
    models::loa,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Partial LOA update. Acceptance fields are not writable here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateLoaCommand {
    pub actor_id: Uuid,
    pub loa_id: Uuid,
    #[validate(length(max = 64), custom = "not_blank")]
    pub loa_number: Option<String>,
    #[validate(custom = "not_in_future")]
    pub issue_date: Option<NaiveDate>,
    #[validate(range(min = 1, message = "must be at least 1 day"))]
    pub validity_period: Option<i32>,
    #[validate(custom = "positive_amount")]
    pub total_value: Option<Decimal>,
    #[validate(custom = "structured_details")]
    pub equipment_details: Option<serde_json::Value>,
    pub terms_conditions: Option<String>,
    #[validate(length(max = 2000))]
    pub remarks: Option<String>,
    pub status: Option<String>,
}

#[async_trait::async_trait]
impl Command for UpdateLoaCommand {
    type Result = loa::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(loa_id = %self.loa_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;
        let status = self.status.as_deref().map(writable_status).transpose()?;

        let command = self.clone();
        let updated = with_transaction::<_, _, ServiceError>(db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let existing = loa::Entity::find_by_id(command.loa_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("LOA {}", command.loa_id)))?;
                if let Some(status) = status {
                    check_status_change(existing.status, status)?;
                }

                let mut active = existing.into_active_model();
                if let Some(number) = &command.loa_number {
                    active.loa_number = Set(number.trim().to_string());
                }
                if let Some(date) = command.issue_date {
                    active.issue_date = Set(date);
                }
                if let Some(days) = command.validity_period {
                    active.validity_period = Set(days);
                }
                if let Some(value) = command.total_value {
                    active.total_value = Set(value);
                }
                if let Some(details) = &command.equipment_details {
                    active.equipment_details = Set(details.clone());
                }
                if let Some(terms) = &command.terms_conditions {
                    active.terms_conditions = Set(Some(terms.clone()));
                }
                if let Some(remarks) = &command.remarks {
                    active.remarks = Set(Some(remarks.clone()));
                }
                if let Some(status) = status {
                    active.status = Set(status);
                }
                active.updated_at = Set(Utc::now());

                Ok(active.update(txn).await?)
            })
        })
        .await?;

        info!(actor_id = %self.actor_id, status = %updated.status, "LOA updated");
        event_sender.send_or_log(Event::LoaUpdated(updated.id)).await;
        Ok(updated)
    }
}
