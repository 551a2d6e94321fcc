use super::{positive_amount, structured_details, writable_status};
use crate::{
    commands::{not_blank, not_in_future, Command},
    db::{with_transaction, DbPool},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{loa, tender, LoaStatus},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateLoaCommand {
    pub actor_id: Uuid,
    #[validate(length(max = 64), custom = "not_blank")]
    pub loa_number: String,
    pub tender_id: Uuid,
    #[validate(custom = "not_in_future")]
    pub issue_date: NaiveDate,
    #[validate(range(min = 1, message = "must be at least 1 day"))]
    pub validity_period: i32,
    #[validate(custom = "positive_amount")]
    pub total_value: Decimal,
    #[validate(custom = "structured_details")]
    pub equipment_details: serde_json::Value,
    pub terms_conditions: Option<String>,
    #[validate(length(max = 2000))]
    pub remarks: Option<String>,
    pub status: Option<String>,
}

#[async_trait::async_trait]
impl Command for CreateLoaCommand {
    type Result = loa::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(loa_number = %self.loa_number))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;
        let status = match self.status.as_deref() {
            Some(raw) => writable_status(raw)?,
            None => LoaStatus::Draft,
        };

        let command = self.clone();
        let created = with_transaction::<_, _, ServiceError>(db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                tender::Entity::find_by_id(command.tender_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("Tender {}", command.tender_id)))?;

                let now = Utc::now();
                let created = loa::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    loa_number: Set(command.loa_number.trim().to_string()),
                    tender_id: Set(command.tender_id),
                    issue_date: Set(command.issue_date),
                    validity_period: Set(command.validity_period),
                    total_value: Set(command.total_value),
                    equipment_details: Set(command.equipment_details.clone()),
                    terms_conditions: Set(command.terms_conditions.clone()),
                    status: Set(status),
                    acceptance_date: Set(None),
                    acceptance_document_path: Set(None),
                    remarks: Set(command.remarks.clone()),
                    created_by: Set(command.actor_id),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(txn)
                .await?;
                Ok(created)
            })
        })
        .await?;

        info!(loa_id = %created.id, tender_id = %created.tender_id, "LOA created");
        event_sender.send_or_log(Event::LoaCreated(created.id)).await;
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn command() -> CreateLoaCommand {
        CreateLoaCommand {
            actor_id: Uuid::new_v4(),
            loa_number: "LOA-1".into(),
            tender_id: Uuid::new_v4(),
            issue_date: Utc::now().date_naive(),
            validity_period: 90,
            total_value: dec!(50000),
            equipment_details: serde_json::json!({"name": "CT scanner"}),
            terms_conditions: None,
            remarks: None,
            status: None,
        }
    }

    #[test]
    fn total_value_and_details_are_required() {
        let mut cmd = command();
        cmd.total_value = Decimal::ZERO;
        cmd.equipment_details = serde_json::Value::Null;
        let err: ServiceError = cmd.validate().unwrap_err().into();
        assert_matches!(err, ServiceError::ValidationErrors(details) if details.len() == 2);
    }

    #[test]
    fn accepted_cannot_be_chosen_at_creation() {
        assert_matches!(writable_status("Accepted"), Err(ServiceError::InvalidStatus(_)));
        assert_eq!(writable_status("issued").unwrap(), LoaStatus::Issued);
    }
}
