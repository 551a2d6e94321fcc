use crate::{
    commands::{parse_enum, Command},
    db::{with_transaction, DbPool},
    errors::ServiceError,
    events::{Event, EventSender, StatusChangeSource},
    models::{consignee, purchase_order, ConsignmentStatus, PurchaseOrderStatus},
    services::status_rules,
};
use chrono::Utc;
use sea_orm::{sea_query::Expr, ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Direct status override by an authorised actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePurchaseOrderStatusCommand {
    pub actor_id: Uuid,
    pub po_id: Uuid,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePurchaseOrderStatusResult {
    pub purchase_order: purchase_order::Model,
    pub previous_status: PurchaseOrderStatus,
    pub changed: bool,
}

/// Checks an override against the stored status and the consignees' state.
/// A target the rollup rule would immediately recompute to something else is
/// refused, so an accepted override is never undone by the next rollup.
pub fn check_override(
    current: PurchaseOrderStatus,
    target: PurchaseOrderStatus,
    consignees: &[ConsignmentStatus],
) -> Result<(), ServiceError> {
    if current == PurchaseOrderStatus::Cancelled && target != PurchaseOrderStatus::Cancelled {
        return Err(ServiceError::InvalidStatus(format!(
            "purchase order is Cancelled; cannot move to {}",
            target
        )));
    }

    if target == PurchaseOrderStatus::Completed {
        let open = consignees
            .iter()
            .filter(|s| **s != ConsignmentStatus::Invoiced)
            .count();
        if consignees.is_empty() || open > 0 {
            return Err(ServiceError::InvalidStatus(format!(
                "purchase order cannot be Completed: {} of {} consignees are not Invoiced",
                if consignees.is_empty() { 0 } else { open },
                consignees.len()
            )));
        }
    }

    let derived = status_rules::purchase_order_status(target, consignees);
    if derived != target {
        return Err(ServiceError::InvalidStatus(format!(
            "purchase order cannot be {} while its consignees put it at {}",
            target, derived
        )));
    }

    Ok(())
}

#[async_trait::async_trait]
impl Command for UpdatePurchaseOrderStatusCommand {
    type Result = UpdatePurchaseOrderStatusResult;

    #[instrument(skip(self, db_pool, event_sender), fields(po_id = %self.po_id, status = %self.status))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let target: PurchaseOrderStatus = parse_enum("status", &self.status)?;
        let po_id = self.po_id;

        let result = with_transaction::<_, _, ServiceError>(db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let current = purchase_order::Entity::find_by_id(po_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("Purchase order {}", po_id)))?;

                if current.status == target {
                    return Ok(UpdatePurchaseOrderStatusResult {
                        previous_status: current.status,
                        purchase_order: current,
                        changed: false,
                    });
                }

                let consignees: Vec<ConsignmentStatus> = consignee::Entity::find()
                    .filter(consignee::Column::PoId.eq(po_id))
                    .all(txn)
                    .await?
                    .into_iter()
                    .map(|c| c.consignment_status)
                    .collect();
                check_override(current.status, target, &consignees)?;

                let updated = purchase_order::Entity::update_many()
                    .col_expr(purchase_order::Column::Status, Expr::value(target))
                    .col_expr(purchase_order::Column::UpdatedAt, Expr::value(Utc::now()))
                    .filter(purchase_order::Column::Id.eq(po_id))
                    .filter(purchase_order::Column::Status.eq(current.status))
                    .exec(txn)
                    .await?;
                if updated.rows_affected == 0 {
                    return Err(ServiceError::ConcurrentModification(po_id));
                }

                let purchase_order = purchase_order::Entity::find_by_id(po_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("Purchase order {}", po_id)))?;

                Ok(UpdatePurchaseOrderStatusResult {
                    previous_status: current.status,
                    purchase_order,
                    changed: true,
                })
            })
        })
        .await
        .map_err(|e| {
            warn!(%po_id, error = %e, "Purchase order status override refused");
            e
        })?;

        if result.changed {
            info!(
                %po_id,
                actor_id = %self.actor_id,
                old = %result.previous_status,
                new = %result.purchase_order.status,
                "Purchase order status overridden"
            );
            event_sender
                .send_or_log(Event::PurchaseOrderStatusChanged {
                    po_id,
                    old_status: result.previous_status,
                    new_status: result.purchase_order.status,
                    source: StatusChangeSource::Override,
                })
                .await;
        }

        Ok(result)
    }
}
