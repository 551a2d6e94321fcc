use crate::{
    commands::{not_blank, parse_enum, Command},
    db::{with_transaction, DbPool},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{consignee, ConsignmentStatus},
};
use chrono::Utc;
use sea_orm::{sea_query::Expr, ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Explicit correction of a consignee's status. This is the only path that
/// may move a consignee backwards; it cannot go below what its complete stage
/// records already prove, nor forward past them.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CorrectConsigneeStatusCommand {
    pub actor_id: Uuid,
    pub consignee_id: Uuid,
    pub status: String,
    #[validate(length(max = 1000), custom = "not_blank")]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectConsigneeStatusResult {
    pub consignee: consignee::Model,
    pub previous_status: ConsignmentStatus,
    pub changed: bool,
}

/// Bounds a correction by the stage records: never below the furthest complete
/// stage, never above the stored or proven status.
pub fn check_correction(
    stored: ConsignmentStatus,
    proven: ConsignmentStatus,
    target: ConsignmentStatus,
) -> Result<(), ServiceError> {
    if target < proven {
        return Err(ServiceError::InvalidStatus(format!(
            "complete stage records put this consignee at {}; amend them before correcting to {}",
            proven, target
        )));
    }

    let ceiling = stored.max(proven);
    if target > ceiling {
        return Err(ServiceError::InvalidStatus(format!(
            "consignee cannot be corrected forward to {}; record the stage instead (furthest reached: {})",
            target, ceiling
        )));
    }

    Ok(())
}

#[async_trait::async_trait]
impl Command for CorrectConsigneeStatusCommand {
    type Result = CorrectConsigneeStatusResult;

    #[instrument(skip(self, db_pool, event_sender), fields(consignee_id = %self.consignee_id, status = %self.status))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;
        let target: ConsignmentStatus = parse_enum("status", &self.status)?;
        let consignee_id = self.consignee_id;

        let result = with_transaction::<_, _, ServiceError>(db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let current = consignee::Entity::find_by_id(consignee_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("Consignee {}", consignee_id)))?;

                if current.consignment_status == target {
                    return Ok(CorrectConsigneeStatusResult {
                        previous_status: current.consignment_status,
                        consignee: current,
                        changed: false,
                    });
                }

                let proven = crate::services::rollup::stage_completion(txn, consignee_id)
                    .await?
                    .furthest_stage();
                check_correction(current.consignment_status, proven, target)?;

                let updated = consignee::Entity::update_many()
                    .col_expr(consignee::Column::ConsignmentStatus, Expr::value(target))
                    .col_expr(consignee::Column::UpdatedAt, Expr::value(Utc::now()))
                    .filter(consignee::Column::Id.eq(consignee_id))
                    .filter(consignee::Column::ConsignmentStatus.eq(current.consignment_status))
                    .exec(txn)
                    .await?;
                if updated.rows_affected == 0 {
                    return Err(ServiceError::ConcurrentModification(consignee_id));
                }

                let consignee = consignee::Entity::find_by_id(consignee_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("Consignee {}", consignee_id)))?;

                Ok(CorrectConsigneeStatusResult {
                    previous_status: current.consignment_status,
                    consignee,
                    changed: true,
                })
            })
        })
        .await?;

        if result.changed {
            info!(
                actor_id = %self.actor_id,
                old = %result.previous_status,
                new = %result.consignee.consignment_status,
                reason = %self.reason,
                "Consignee status corrected"
            );
            event_sender
                .send_or_log(Event::ConsigneeStatusChanged {
                    consignee_id,
                    old_status: result.previous_status,
                    new_status: result.consignee.consignment_status,
                })
                .await;
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use ConsignmentStatus::*;

    #[test]
    fn correction_moves_backwards_within_the_records() {
        assert!(check_correction(Invoiced, Dispatched, Delivered).is_ok());
        assert!(check_correction(Installed, Processing, Processing).is_ok());
        assert_matches!(
            check_correction(Installed, Delivered, Dispatched),
            Err(ServiceError::InvalidStatus(_))
        );
    }

    #[test]
    fn correction_never_runs_ahead_of_the_records() {
        assert_matches!(
            check_correction(Processing, Processing, Invoiced),
            Err(ServiceError::InvalidStatus(msg)) if msg.contains("forward")
        );
        assert_matches!(
            check_correction(Delivered, Dispatched, Installed),
            Err(ServiceError::InvalidStatus(_))
        );
        // A status the records prove but rollup has not written yet is reachable.
        assert!(check_correction(Dispatched, Delivered, Delivered).is_ok());
    }
}
