use crate::{
    commands::{not_blank, not_in_future, Command},
    db::{with_transaction, DbPool},
    errors::{flatten_validation_errors, ServiceError},
    events::{Event, EventSender},
    metrics::{PO_CREATIONS, PO_CREATION_FAILURES},
    models::{consignee, loa, purchase_order, tender, ConsignmentStatus, PurchaseOrderStatus},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePurchaseOrderCommand {
    pub actor_id: Uuid,
    pub tender_id: Uuid,
    pub loa_id: Option<Uuid>,
    #[validate(length(max = 64), custom = "not_blank")]
    pub po_number: String,
    #[validate(custom = "not_in_future")]
    pub po_date: NaiveDate,
    #[validate(length(max = 255), custom = "not_blank")]
    pub equipment_name: String,
    #[validate(range(min = 1, message = "must be at least 1 day"))]
    pub lead_time_to_deliver: i32,
    #[validate(range(min = 1, message = "must be at least 1 day"))]
    pub lead_time_to_install: i32,
    pub has_accessories: bool,
    pub accessories: Vec<String>,
    #[validate(length(max = 2000))]
    pub remarks: Option<String>,
    #[validate]
    pub locations: Vec<DeliveryLocation>,
}

/// One delivery site; becomes one consignee.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DeliveryLocation {
    #[validate(length(max = 255), custom = "not_blank")]
    pub district_name: String,
    #[validate(length(max = 255), custom = "not_blank")]
    pub block_name: String,
    #[validate(length(max = 255), custom = "not_blank")]
    pub facility_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePurchaseOrderResult {
    pub purchase_order: purchase_order::Model,
    pub consignees: Vec<consignee::Model>,
}

impl CreatePurchaseOrderCommand {
    /// Every problem with the input, not just the first.
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => flatten_validation_errors(&e),
        };
        if self.locations.is_empty() {
            errors.push("locations: at least one delivery location is required".to_string());
        }
        if self.has_accessories && self.accessories.iter().all(|a| a.trim().is_empty()) {
            errors.push("accessories: select at least one accessory when has_accessories is set".to_string());
        }
        errors.sort();
        errors
    }

    fn accessories_json(&self) -> Option<serde_json::Value> {
        if self.has_accessories {
            Some(serde_json::json!(self.accessories))
        } else {
            None
        }
    }
}

#[async_trait::async_trait]
impl Command for CreatePurchaseOrderCommand {
    type Result = CreatePurchaseOrderResult;

    #[instrument(skip(self, db_pool, event_sender), fields(po_number = %self.po_number, tender_id = %self.tender_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let errors = self.validation_errors();
        if !errors.is_empty() {
            PO_CREATION_FAILURES.with_label_values(&["validation_error"]).inc();
            return Err(ServiceError::ValidationErrors(errors));
        }

        let created = self.create_in_transaction(db_pool.as_ref()).await.map_err(|e| {
            let label = match &e {
                ServiceError::NotFound(_) => "not_found",
                ServiceError::Conflict(_) => "conflict",
                ServiceError::ValidationError(_) | ServiceError::ValidationErrors(_) => {
                    "validation_error"
                }
                _ => "transaction_failure",
            };
            PO_CREATION_FAILURES.with_label_values(&[label]).inc();
            error!(po_number = %self.po_number, error = %e, "Purchase order creation rolled back");
            e.into_transaction_failure()
        })?;

        PO_CREATIONS.inc();
        info!(
            po_id = %created.purchase_order.id,
            consignees = created.consignees.len(),
            "Purchase order created with its consignees"
        );

        event_sender
            .send_or_log(Event::PurchaseOrderCreated {
                po_id: created.purchase_order.id,
                tender_id: self.tender_id,
                consignee_count: created.consignees.len(),
            })
            .await;

        Ok(created)
    }
}

impl CreatePurchaseOrderCommand {
    async fn create_in_transaction(
        &self,
        db: &DbPool,
    ) -> Result<CreatePurchaseOrderResult, ServiceError> {
        let command = self.clone();

        with_transaction::<_, _, ServiceError>(db, move |txn| {
            Box::pin(async move {
                tender::Entity::find_by_id(command.tender_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("Tender {}", command.tender_id)))?;

                if let Some(loa_id) = command.loa_id {
                    let loa = loa::Entity::find_by_id(loa_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::NotFound(format!("LOA {}", loa_id)))?;
                    if loa.tender_id != command.tender_id {
                        return Err(ServiceError::ValidationError(format!(
                            "loa_id: LOA {} belongs to a different tender",
                            loa_id
                        )));
                    }
                }

                let now = Utc::now();
                let po_id = Uuid::new_v4();
                let purchase_order = purchase_order::ActiveModel {
                    id: Set(po_id),
                    po_number: Set(command.po_number.trim().to_string()),
                    tender_id: Set(command.tender_id),
                    loa_id: Set(command.loa_id),
                    po_date: Set(command.po_date),
                    equipment_name: Set(command.equipment_name.trim().to_string()),
                    lead_time_to_deliver: Set(command.lead_time_to_deliver),
                    lead_time_to_install: Set(command.lead_time_to_install),
                    has_accessories: Set(command.has_accessories),
                    accessories: Set(command.accessories_json()),
                    remarks: Set(command.remarks.clone()),
                    status: Set(PurchaseOrderStatus::Active),
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
                        tender_id: Set(command.tender_id),
                        po_id: Set(Some(po_id)),
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

                Ok(CreatePurchaseOrderResult {
                    purchase_order,
                    consignees,
                })
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn command() -> CreatePurchaseOrderCommand {
        CreatePurchaseOrderCommand {
            actor_id: Uuid::new_v4(),
            tender_id: Uuid::new_v4(),
            loa_id: None,
            po_number: "PO-1".into(),
            po_date: Utc::now().date_naive(),
            equipment_name: "Ventilator".into(),
            lead_time_to_deliver: 30,
            lead_time_to_install: 15,
            has_accessories: false,
            accessories: vec![],
            remarks: None,
            locations: vec![DeliveryLocation {
                district_name: "Lucknow".into(),
                block_name: "Chinhat".into(),
                facility_name: "CHC Chinhat".into(),
            }],
        }
    }

    #[test]
    fn valid_command_has_no_errors() {
        assert!(command().validation_errors().is_empty());
    }

    #[test]
    fn every_problem_is_reported() {
        let mut cmd = command();
        cmd.po_number = "  ".into();
        cmd.po_date = Utc::now().date_naive() + Duration::days(2);
        cmd.lead_time_to_deliver = 0;
        cmd.locations.clear();

        let errors = cmd.validation_errors();
        assert_eq!(errors.len(), 4, "{errors:?}");
        assert!(errors.iter().any(|e| e.starts_with("po_date:")));
        assert!(errors.iter().any(|e| e.starts_with("locations:")));
    }

    #[test]
    fn nested_location_fields_are_checked() {
        let mut cmd = command();
        cmd.locations.push(DeliveryLocation {
            district_name: "Agra".into(),
            block_name: "".into(),
            facility_name: "PHC".into(),
        });
        let errors = cmd.validation_errors();
        assert_eq!(errors, vec!["locations[1].block_name: must not be blank".to_string()]);
    }
}
