use crate::{
    commands::{not_blank, not_in_future, purchaseorders::DeliveryLocation, Command},
    db::{with_transaction, DbPool},
    errors::{flatten_validation_errors, ServiceError},
    events::{Event, EventSender},
    models::{consignee, tender, AuthorityType, ConsignmentStatus, TenderStatus},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use std::{str::FromStr, sync::Arc};
use strum::VariantNames;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTenderCommand {
    pub actor_id: Uuid,
    #[validate(length(max = 64), custom = "not_blank")]
    pub tender_number: String,
    #[validate(custom = "known_authority_type")]
    pub authority_type: String,
    #[validate(custom = "not_in_future")]
    pub po_date: Option<NaiveDate>,
    #[validate(custom = "not_in_future")]
    pub contract_date: Option<NaiveDate>,
    #[validate(range(min = 1, message = "must be at least 1 day"))]
    pub lead_time_to_deliver: i32,
    #[validate(range(min = 1, message = "must be at least 1 day"))]
    pub lead_time_to_install: i32,
    #[validate(length(max = 255), custom = "not_blank")]
    pub equipment_name: String,
    #[validate(length(max = 2000))]
    pub remarks: Option<String>,
    pub has_accessories: bool,
    pub selected_accessories: Vec<String>,
    pub has_consumables: bool,
    pub selected_consumables: Vec<String>,
    /// Tender-direct consignees for accessory and consumable tracking.
    #[validate]
    pub locations: Vec<DeliveryLocation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenderResult {
    pub tender: tender::Model,
    pub consignees: Vec<consignee::Model>,
}

fn known_authority_type(value: &str) -> Result<(), ValidationError> {
    if AuthorityType::from_str(value.trim()).is_ok() {
        return Ok(());
    }
    let mut err = ValidationError::new("authority_type");
    err.message = Some(format!("must be one of {}", AuthorityType::VARIANTS.join(", ")).into());
    Err(err)
}

fn selection_json(enabled: bool, items: &[String]) -> Option<serde_json::Value> {
    enabled.then(|| serde_json::json!(items))
}

impl CreateTenderCommand {
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => flatten_validation_errors(&e),
        };
        if self.has_accessories && self.selected_accessories.is_empty() {
            errors.push("selected_accessories: select at least one accessory".to_string());
        }
        if self.has_consumables && self.selected_consumables.is_empty() {
            errors.push("selected_consumables: select at least one consumable".to_string());
        }
        errors.sort();
        errors
    }
}

#[async_trait::async_trait]
impl Command for CreateTenderCommand {
    type Result = CreateTenderResult;

    #[instrument(skip(self, db_pool, event_sender), fields(tender_number = %self.tender_number))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let errors = self.validation_errors();
        if !errors.is_empty() {
            return Err(ServiceError::ValidationErrors(errors));
        }
        let authority_type = AuthorityType::from_str(self.authority_type.trim())
            .map_err(|e| ServiceError::ValidationError(format!("authority_type: {}", e)))?;

        let command = self.clone();
        let created = with_transaction::<_, _, ServiceError>(db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let now = Utc::now();
                let tender_id = Uuid::new_v4();
                let tender = tender::ActiveModel {
                    id: Set(tender_id),
                    tender_number: Set(command.tender_number.trim().to_string()),
                    authority_type: Set(authority_type),
                    po_date: Set(command.po_date),
                    contract_date: Set(command.contract_date),
                    lead_time_to_deliver: Set(command.lead_time_to_deliver),
                    lead_time_to_install: Set(command.lead_time_to_install),
                    equipment_name: Set(command.equipment_name.trim().to_string()),
                    remarks: Set(command.remarks.clone()),
                    has_accessories: Set(command.has_accessories),
                    selected_accessories: Set(selection_json(
                        command.has_accessories,
                        &command.selected_accessories,
                    )),
                    has_consumables: Set(command.has_consumables),
                    selected_consumables: Set(selection_json(
                        command.has_consumables,
                        &command.selected_consumables,
                    )),
                    status: Set(TenderStatus::Draft),
                    accessories_pending: Set(command.has_accessories),
                    consumables_pending: Set(command.has_consumables),
                    installation_pending: Set(true),
                    invoice_pending: Set(true),
                    created_by: Set(command.actor_id),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(txn)
                .await?;

                let mut consignees = Vec::with_capacity(command.locations.len());
                for (index, location) in command.locations.iter().enumerate() {
                    let consignee = consignee::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        tender_id: Set(tender_id),
                        po_id: Set(None),
                        sr_no: Set((index + 1).to_string()),
                        district_name: Set(location.district_name.trim().to_string()),
                        block_name: Set(location.block_name.trim().to_string()),
                        facility_name: Set(location.facility_name.trim().to_string()),
                        consignment_status: Set(ConsignmentStatus::Processing),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await?;
                    consignees.push(consignee);
                }

                Ok(CreateTenderResult { tender, consignees })
            })
        })
        .await
        .map_err(ServiceError::into_transaction_failure)?;

        info!(tender_id = %created.tender.id, consignees = created.consignees.len(), "Tender created");
        event_sender
            .send_or_log(Event::TenderCreated(created.tender.id))
            .await;

        Ok(created)
    }
}
