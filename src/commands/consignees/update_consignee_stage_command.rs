use crate::{
    commands::{loas::positive_amount, not_blank, not_in_future, Command},
    db::{with_transaction, DbPool},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        challan_receipt, consignee, installation_report, invoice, logistics_details, StageType,
    },
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, IntoActiveModel, QueryFilter,
    Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Stage-specific fields. Document references that are omitted keep the
/// stored ones; an empty reference clears them.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageUpdate {
    Logistics(LogisticsUpdate),
    ChallanReceipt(ChallanReceiptUpdate),
    Installation(InstallationUpdate),
    Invoice(InvoiceUpdate),
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LogisticsUpdate {
    #[validate(custom = "not_in_future")]
    pub dispatch_date: NaiveDate,
    #[validate(length(max = 255), custom = "not_blank")]
    pub courier_name: String,
    #[validate(length(max = 128), custom = "not_blank")]
    pub docket_number: String,
    pub documents: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ChallanReceiptUpdate {
    #[validate(custom = "not_in_future")]
    pub receipt_date: NaiveDate,
    #[validate(length(max = 1024))]
    pub document_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct InstallationUpdate {
    #[validate(custom = "not_in_future")]
    pub installation_date: NaiveDate,
    #[validate(length(max = 1024))]
    pub document_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct InvoiceUpdate {
    #[validate(length(max = 128), custom = "not_blank")]
    pub invoice_number: String,
    #[validate(custom = "not_in_future")]
    pub invoice_date: NaiveDate,
    #[validate(custom = "positive_amount")]
    pub amount: Option<Decimal>,
    #[validate(length(max = 1024))]
    pub document_path: Option<String>,
}

impl StageUpdate {
    pub fn stage(&self) -> StageType {
        match self {
            StageUpdate::Logistics(_) => StageType::Logistics,
            StageUpdate::ChallanReceipt(_) => StageType::ChallanReceipt,
            StageUpdate::Installation(_) => StageType::Installation,
            StageUpdate::Invoice(_) => StageType::Invoice,
        }
    }

    fn validate_fields(&self) -> Result<(), validator::ValidationErrors> {
        match self {
            StageUpdate::Logistics(u) => u.validate(),
            StageUpdate::ChallanReceipt(u) => u.validate(),
            StageUpdate::Installation(u) => u.validate(),
            StageUpdate::Invoice(u) => u.validate(),
        }
    }
}

/// The stored stage record after the upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageRecord {
    Logistics(logistics_details::Model),
    ChallanReceipt(challan_receipt::Model),
    Installation(installation_report::Model),
    Invoice(invoice::Model),
}

impl StageRecord {
    pub fn is_complete(&self) -> bool {
        match self {
            StageRecord::Logistics(r) => r.is_complete(),
            StageRecord::ChallanReceipt(r) => r.is_complete(),
            StageRecord::Installation(r) => r.is_complete(),
            StageRecord::Invoice(r) => r.is_complete(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConsigneeStageResult {
    pub consignee_id: Uuid,
    pub stage: StageType,
    pub complete: bool,
    pub record: StageRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConsigneeStageCommand {
    pub actor_id: Uuid,
    pub consignee_id: Uuid,
    pub update: StageUpdate,
}

/// Keeps the stored reference when omitted, clears it when blank.
fn merge_path(stored: Option<String>, incoming: &Option<String>) -> Option<String> {
    match incoming {
        None => stored,
        Some(path) if path.trim().is_empty() => None,
        Some(path) => Some(path.trim().to_string()),
    }
}

fn merge_documents(stored: serde_json::Value, incoming: &Option<Vec<String>>) -> serde_json::Value {
    match incoming {
        None => stored,
        Some(paths) => serde_json::json!(paths
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()),
    }
}

#[async_trait::async_trait]
impl Command for UpdateConsigneeStageCommand {
    type Result = UpdateConsigneeStageResult;

    #[instrument(skip(self, db_pool, event_sender), fields(consignee_id = %self.consignee_id, stage = %self.update.stage()))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.update.validate_fields()?;

        let command = self.clone();
        let record = with_transaction::<_, _, ServiceError>(db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                consignee::Entity::find_by_id(command.consignee_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Consignee {}", command.consignee_id))
                    })?;
                command.upsert(txn).await
            })
        })
        .await?;

        let stage = self.update.stage();
        let complete = record.is_complete();
        info!(actor_id = %self.actor_id, complete, "Stage record saved");

        event_sender
            .send_or_log(Event::ConsigneeStageRecorded {
                consignee_id: self.consignee_id,
                stage,
                complete,
            })
            .await;

        Ok(UpdateConsigneeStageResult {
            consignee_id: self.consignee_id,
            stage,
            complete,
            record,
        })
    }
}

impl UpdateConsigneeStageCommand {
    async fn upsert(&self, txn: &DatabaseTransaction) -> Result<StageRecord, ServiceError> {
        let now = Utc::now();
        let consignee_id = self.consignee_id;

        let record = match &self.update {
            StageUpdate::Logistics(u) => {
                let existing = logistics_details::Entity::find()
                    .filter(logistics_details::Column::ConsigneeId.eq(consignee_id))
                    .one(txn)
                    .await?;
                let saved = match existing {
                    Some(model) => {
                        let documents = merge_documents(model.documents.clone(), &u.documents);
                        let mut active = model.into_active_model();
                        active.dispatch_date = Set(Some(u.dispatch_date));
                        active.courier_name = Set(Some(u.courier_name.trim().to_string()));
                        active.docket_number = Set(Some(u.docket_number.trim().to_string()));
                        active.documents = Set(documents);
                        active.updated_by = Set(self.actor_id);
                        active.updated_at = Set(now);
                        active.update(txn).await?
                    }
                    None => {
                        logistics_details::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            consignee_id: Set(consignee_id),
                            dispatch_date: Set(Some(u.dispatch_date)),
                            courier_name: Set(Some(u.courier_name.trim().to_string())),
                            docket_number: Set(Some(u.docket_number.trim().to_string())),
                            documents: Set(merge_documents(serde_json::json!([]), &u.documents)),
                            updated_by: Set(self.actor_id),
                            created_at: Set(now),
                            updated_at: Set(now),
                        }
                        .insert(txn)
                        .await?
                    }
                };
                StageRecord::Logistics(saved)
            }
            StageUpdate::ChallanReceipt(u) => {
                let existing = challan_receipt::Entity::find()
                    .filter(challan_receipt::Column::ConsigneeId.eq(consignee_id))
                    .one(txn)
                    .await?;
                let saved = match existing {
                    Some(model) => {
                        let path = merge_path(model.document_path.clone(), &u.document_path);
                        let mut active = model.into_active_model();
                        active.receipt_date = Set(Some(u.receipt_date));
                        active.document_path = Set(path);
                        active.updated_by = Set(self.actor_id);
                        active.updated_at = Set(now);
                        active.update(txn).await?
                    }
                    None => {
                        challan_receipt::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            consignee_id: Set(consignee_id),
                            receipt_date: Set(Some(u.receipt_date)),
                            document_path: Set(merge_path(None, &u.document_path)),
                            updated_by: Set(self.actor_id),
                            created_at: Set(now),
                            updated_at: Set(now),
                        }
                        .insert(txn)
                        .await?
                    }
                };
                StageRecord::ChallanReceipt(saved)
            }
            StageUpdate::Installation(u) => {
                let existing = installation_report::Entity::find()
                    .filter(installation_report::Column::ConsigneeId.eq(consignee_id))
                    .one(txn)
                    .await?;
                let saved = match existing {
                    Some(model) => {
                        let path = merge_path(model.document_path.clone(), &u.document_path);
                        let mut active = model.into_active_model();
                        active.installation_date = Set(Some(u.installation_date));
                        active.document_path = Set(path);
                        active.updated_by = Set(self.actor_id);
                        active.updated_at = Set(now);
                        active.update(txn).await?
                    }
                    None => {
                        installation_report::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            consignee_id: Set(consignee_id),
                            installation_date: Set(Some(u.installation_date)),
                            document_path: Set(merge_path(None, &u.document_path)),
                            updated_by: Set(self.actor_id),
                            created_at: Set(now),
                            updated_at: Set(now),
                        }
                        .insert(txn)
                        .await?
                    }
                };
                StageRecord::Installation(saved)
            }
            StageUpdate::Invoice(u) => {
                let existing = invoice::Entity::find()
                    .filter(invoice::Column::ConsigneeId.eq(consignee_id))
                    .one(txn)
                    .await?;
                let saved = match existing {
                    Some(model) => {
                        let path = merge_path(model.document_path.clone(), &u.document_path);
                        let amount = u.amount.or(model.amount);
                        let mut active = model.into_active_model();
                        active.invoice_number = Set(Some(u.invoice_number.trim().to_string()));
                        active.invoice_date = Set(Some(u.invoice_date));
                        active.amount = Set(amount);
                        active.document_path = Set(path);
                        active.updated_by = Set(self.actor_id);
                        active.updated_at = Set(now);
                        active.update(txn).await?
                    }
                    None => {
                        invoice::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            consignee_id: Set(consignee_id),
                            invoice_number: Set(Some(u.invoice_number.trim().to_string())),
                            invoice_date: Set(Some(u.invoice_date)),
                            amount: Set(u.amount),
                            document_path: Set(merge_path(None, &u.document_path)),
                            updated_by: Set(self.actor_id),
                            created_at: Set(now),
                            updated_at: Set(now),
                        }
                        .insert(txn)
                        .await?
                    }
                };
                StageRecord::Invoice(saved)
            }
        };

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn stage_update_is_tagged_by_stage_name() {
        let update: StageUpdate = serde_json::from_value(serde_json::json!({
            "stage": "challan_receipt",
            "receipt_date": "2024-03-01",
            "document_path": "docs/challan-1.pdf"
        }))
        .unwrap();
        assert_eq!(update.stage(), StageType::ChallanReceipt);
    }

    #[test]
    fn future_stage_dates_are_rejected() {
        let update = StageUpdate::Installation(InstallationUpdate {
            installation_date: Utc::now().date_naive() + Duration::days(1),
            document_path: None,
        });
        assert!(update.validate_fields().is_err());
    }

    #[test]
    fn omitted_references_are_kept_and_blank_ones_cleared() {
        let stored = Some("docs/a.pdf".to_string());
        assert_eq!(merge_path(stored.clone(), &None), stored);
        assert_eq!(merge_path(stored.clone(), &Some(" ".into())), None);
        assert_eq!(
            merge_path(stored, &Some("docs/b.pdf".into())).as_deref(),
            Some("docs/b.pdf")
        );

        let docs = serde_json::json!(["one.pdf"]);
        assert_eq!(merge_documents(docs.clone(), &None), docs);
        assert_eq!(
            merge_documents(docs, &Some(vec!["".into(), "two.pdf".into()])),
            serde_json::json!(["two.pdf"])
        );
    }
}
