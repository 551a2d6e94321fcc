use crate::{
    commands::{
        consignees::{
            CorrectConsigneeStatusCommand, CorrectConsigneeStatusResult,
            UpdateConsigneeStageCommand, UpdateConsigneeStageResult,
        },
        Command,
    },
    db::DbPool,
    errors::ServiceError,
    events::EventSender,
    models::{challan_receipt, consignee, installation_report, invoice, logistics_details},
    services::{
        audit::{AuditEntry, AuditSink},
        rollup::{EntityKind, StatusRollupEngine},
    },
};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tracing::instrument;
use uuid::Uuid;

/// A consignee together with its four stage records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsigneeDetails {
    #[serde(flatten)]
    pub consignee: consignee::Model,
    pub logistics: Option<logistics_details::Model>,
    pub challan_receipt: Option<challan_receipt::Model>,
    pub installation_report: Option<installation_report::Model>,
    pub invoice: Option<invoice::Model>,
}

/// Result of a stage upsert with the consignee as it stands after rollup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageUpdateOutcome {
    #[serde(flatten)]
    pub stage: UpdateConsigneeStageResult,
    pub consignee: consignee::Model,
}

/// Loads the stage records of `consignees` with one query per stage table.
pub async fn load_consignee_details<C>(
    db: &C,
    consignees: Vec<consignee::Model>,
) -> Result<Vec<ConsigneeDetails>, ServiceError>
where
    C: ConnectionTrait,
{
    let ids: Vec<Uuid> = consignees.iter().map(|c| c.id).collect();
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut logistics: HashMap<Uuid, logistics_details::Model> = logistics_details::Entity::find()
        .filter(logistics_details::Column::ConsigneeId.is_in(ids.clone()))
        .all(db)
        .await?
        .into_iter()
        .map(|r| (r.consignee_id, r))
        .collect();
    let mut challans: HashMap<Uuid, challan_receipt::Model> = challan_receipt::Entity::find()
        .filter(challan_receipt::Column::ConsigneeId.is_in(ids.clone()))
        .all(db)
        .await?
        .into_iter()
        .map(|r| (r.consignee_id, r))
        .collect();
    let mut installations: HashMap<Uuid, installation_report::Model> =
        installation_report::Entity::find()
            .filter(installation_report::Column::ConsigneeId.is_in(ids.clone()))
            .all(db)
            .await?
            .into_iter()
            .map(|r| (r.consignee_id, r))
            .collect();
    let mut invoices: HashMap<Uuid, invoice::Model> = invoice::Entity::find()
        .filter(invoice::Column::ConsigneeId.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|r| (r.consignee_id, r))
        .collect();

    Ok(consignees
        .into_iter()
        .map(|c| ConsigneeDetails {
            logistics: logistics.remove(&c.id),
            challan_receipt: challans.remove(&c.id),
            installation_report: installations.remove(&c.id),
            invoice: invoices.remove(&c.id),
            consignee: c,
        })
        .collect())
}

/// Service for consignee stage progress and corrections
#[derive(Clone)]
pub struct ConsigneeService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    rollup: StatusRollupEngine,
    audit: Arc<dyn AuditSink>,
}

impl ConsigneeService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        rollup: StatusRollupEngine,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            rollup,
            audit,
        }
    }

    #[instrument(skip(self))]
    pub async fn get_consignee(&self, consignee_id: Uuid) -> Result<ConsigneeDetails, ServiceError> {
        let db = self.db_pool.as_ref();
        let found = consignee::Entity::find_by_id(consignee_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Consignee {}", consignee_id)))?;

        load_consignee_details(db, vec![found])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::NotFound(format!("Consignee {}", consignee_id)))
    }

    /// Upserts one stage record, then rolls consignee, purchase order and
    /// tender up in that order.
    #[instrument(skip(self, command), fields(consignee_id = %command.consignee_id))]
    pub async fn update_stage(
        &self,
        command: UpdateConsigneeStageCommand,
    ) -> Result<StageUpdateOutcome, ServiceError> {
        let result = {
            let _guard = self
                .rollup
                .locks()
                .lock(EntityKind::Consignee, command.consignee_id)
                .await;
            command
                .execute(self.db_pool.clone(), self.event_sender.clone())
                .await?
        };

        self.rollup.cascade_from_consignee(command.consignee_id).await;

        self.audit
            .record(
                AuditEntry::new(
                    command.actor_id,
                    "consignee.stage.update",
                    "consignee",
                    Some(command.consignee_id),
                )
                .with_details(serde_json::json!({
                    "stage": result.stage,
                    "complete": result.complete,
                })),
            )
            .await;

        let consignee = consignee::Entity::find_by_id(command.consignee_id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Consignee {}", command.consignee_id)))?;

        Ok(StageUpdateOutcome {
            stage: result,
            consignee,
        })
    }

    /// Explicit correction; re-runs purchase order and tender rollup only.
    #[instrument(skip(self, command), fields(consignee_id = %command.consignee_id))]
    pub async fn correct_status(
        &self,
        command: CorrectConsigneeStatusCommand,
    ) -> Result<CorrectConsigneeStatusResult, ServiceError> {
        let result = {
            let _guard = self
                .rollup
                .locks()
                .lock(EntityKind::Consignee, command.consignee_id)
                .await;
            command
                .execute(self.db_pool.clone(), self.event_sender.clone())
                .await?
        };

        if result.changed {
            self.rollup
                .cascade_from_corrected_consignee(result.consignee.po_id, result.consignee.tender_id)
                .await;

            self.audit
                .record(
                    AuditEntry::new(
                        command.actor_id,
                        "consignee.status.correct",
                        "consignee",
                        Some(command.consignee_id),
                    )
                    .with_details(serde_json::json!({
                        "from": result.previous_status,
                        "to": result.consignee.consignment_status,
                        "reason": command.reason,
                    })),
                )
                .await;
        }

        Ok(result)
    }
}
