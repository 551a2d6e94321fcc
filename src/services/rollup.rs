//! Status rollup engine.
//!
//! Each level (consignee, purchase order, tender) is recomputed under its own
//! keyed lock, inside a transaction that re-reads every child, and written
//! with a compare-and-set on the previously read status. Levels are run one
//! after another and locks are never held across levels.

use crate::{
    db::{with_transaction, DbPool},
    errors::ServiceError,
    events::{Event, EventSender, StatusChangeSource},
    metrics::{ROLLUP_FAILURES, ROLLUP_WRITES},
    models::{
        challan_receipt, consignee, installation_report, invoice, logistics_details,
        purchase_order, tender, ConsignmentStatus, PurchaseOrderStatus, TenderStatus,
    },
    services::status_rules::{self, StageCompletion},
};
use chrono::Utc;
use dashmap::{DashMap, DashSet};
use metrics::histogram;
use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
};
use std::{fmt, sync::Arc, time::Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Consignee,
    PurchaseOrder,
    Tender,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Consignee => "consignee",
            EntityKind::PurchaseOrder => "purchase_order",
            EntityKind::Tender => "tender",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One async mutex per (kind, id). Writers to the same parent queue up here.
#[derive(Default)]
pub struct KeyedLocks {
    locks: DashMap<(EntityKind, Uuid), Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, kind: EntityKind, id: Uuid) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry((kind, id))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    /// Drops entries nobody holds or waits on.
    pub fn prune(&self) {
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange<S> {
    pub old: S,
    pub new: S,
}

enum CasOutcome<S> {
    Unchanged,
    Written(Option<StatusChange<S>>),
    Lost,
}

/// Statuses changed by one cascade, level by level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CascadeReport {
    pub consignee: Option<StatusChange<ConsignmentStatus>>,
    pub purchase_order: Option<StatusChange<PurchaseOrderStatus>>,
    pub tender: Option<StatusChange<TenderStatus>>,
    pub failed: bool,
}

#[derive(Clone)]
pub struct StatusRollupEngine {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    locks: Arc<KeyedLocks>,
    pending_retries: Arc<DashSet<(EntityKind, Uuid)>>,
    max_retries: u32,
}

impl StatusRollupEngine {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, max_retries: u32) -> Self {
        Self {
            db_pool,
            event_sender,
            locks: Arc::new(KeyedLocks::new()),
            pending_retries: Arc::new(DashSet::new()),
            max_retries: max_retries.max(1),
        }
    }

    pub fn locks(&self) -> &KeyedLocks {
        &self.locks
    }

    /// Takes every remembered failed cascade out of the retry set.
    pub fn take_pending_retries(&self) -> Vec<(EntityKind, Uuid)> {
        let keys: Vec<_> = self.pending_retries.iter().map(|k| *k).collect();
        for key in &keys {
            self.pending_retries.remove(key);
        }
        keys
    }

    pub fn pending_retry_count(&self) -> usize {
        self.pending_retries.len()
    }

    pub(crate) fn remember_failure(&self, kind: EntityKind, id: Uuid, err: &ServiceError) {
        ROLLUP_FAILURES.with_label_values(&[kind.as_str()]).inc();
        error!(entity = %kind, id = %id, error = %err, "Status rollup failed; queued for reconciliation");
        self.pending_retries.insert((kind, id));
    }

    /// Recomputes a consignee from its stage records.
    #[instrument(skip(self))]
    pub async fn rollup_consignee(
        &self,
        consignee_id: Uuid,
    ) -> Result<Option<StatusChange<ConsignmentStatus>>, ServiceError> {
        let _guard = self.locks.lock(EntityKind::Consignee, consignee_id).await;
        let started = Instant::now();

        for attempt in 1..=self.max_retries {
            let outcome = with_transaction::<_, _, ServiceError>(self.db_pool.as_ref(), move |txn| {
                Box::pin(async move {
                    let current = consignee::Entity::find_by_id(consignee_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Consignee {}", consignee_id))
                        })?;

                    let stages = stage_completion(txn, consignee_id).await?;
                    let next = status_rules::consignee_status(current.consignment_status, stages);
                    if next == current.consignment_status {
                        return Ok(CasOutcome::Unchanged);
                    }

                    let result = consignee::Entity::update_many()
                        .col_expr(consignee::Column::ConsignmentStatus, Expr::value(next))
                        .col_expr(consignee::Column::UpdatedAt, Expr::value(Utc::now()))
                        .filter(consignee::Column::Id.eq(consignee_id))
                        .filter(consignee::Column::ConsignmentStatus.eq(current.consignment_status))
                        .exec(txn)
                        .await?;

                    Ok::<_, ServiceError>(if result.rows_affected == 0 {
                        CasOutcome::Lost
                    } else {
                        CasOutcome::Written(Some(StatusChange {
                            old: current.consignment_status,
                            new: next,
                        }))
                    })
                })
            })
            .await?;

            match outcome {
                CasOutcome::Unchanged => return Ok(None),
                CasOutcome::Written(change) => {
                    histogram!("tender_rollup.consignee.duration", started.elapsed());
                    if let Some(change) = change {
                        ROLLUP_WRITES.with_label_values(&[EntityKind::Consignee.as_str()]).inc();
                        info!(%consignee_id, old = %change.old, new = %change.new, "Consignee status rolled up");
                        self.event_sender
                            .send_or_log(Event::ConsigneeStatusChanged {
                                consignee_id,
                                old_status: change.old,
                                new_status: change.new,
                            })
                            .await;
                    }
                    return Ok(change);
                }
                CasOutcome::Lost => {
                    warn!(%consignee_id, attempt, "Consignee status changed underneath rollup; retrying");
                }
            }
        }

        Err(ServiceError::ConcurrentModification(consignee_id))
    }

    /// Recomputes a purchase order from its consignees.
    #[instrument(skip(self))]
    pub async fn rollup_purchase_order(
        &self,
        po_id: Uuid,
    ) -> Result<Option<StatusChange<PurchaseOrderStatus>>, ServiceError> {
        let _guard = self.locks.lock(EntityKind::PurchaseOrder, po_id).await;
        let started = Instant::now();

        for attempt in 1..=self.max_retries {
            let outcome = with_transaction::<_, _, ServiceError>(self.db_pool.as_ref(), move |txn| {
                Box::pin(async move {
                    let po = purchase_order::Entity::find_by_id(po_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::NotFound(format!("Purchase order {}", po_id)))?;

                    let statuses: Vec<ConsignmentStatus> = consignee::Entity::find()
                        .filter(consignee::Column::PoId.eq(po_id))
                        .all(txn)
                        .await?
                        .into_iter()
                        .map(|c| c.consignment_status)
                        .collect();

                    let next = status_rules::purchase_order_status(po.status, &statuses);
                    if next == po.status {
                        return Ok(CasOutcome::Unchanged);
                    }

                    let result = purchase_order::Entity::update_many()
                        .col_expr(purchase_order::Column::Status, Expr::value(next))
                        .col_expr(purchase_order::Column::UpdatedAt, Expr::value(Utc::now()))
                        .filter(purchase_order::Column::Id.eq(po_id))
                        .filter(purchase_order::Column::Status.eq(po.status))
                        .exec(txn)
                        .await?;

                    Ok::<_, ServiceError>(if result.rows_affected == 0 {
                        CasOutcome::Lost
                    } else {
                        CasOutcome::Written(Some(StatusChange {
                            old: po.status,
                            new: next,
                        }))
                    })
                })
            })
            .await?;

            match outcome {
                CasOutcome::Unchanged => return Ok(None),
                CasOutcome::Written(change) => {
                    histogram!("tender_rollup.purchase_order.duration", started.elapsed());
                    if let Some(change) = change {
                        ROLLUP_WRITES
                            .with_label_values(&[EntityKind::PurchaseOrder.as_str()])
                            .inc();
                        info!(%po_id, old = %change.old, new = %change.new, "Purchase order status rolled up");
                        self.event_sender
                            .send_or_log(Event::PurchaseOrderStatusChanged {
                                po_id,
                                old_status: change.old,
                                new_status: change.new,
                                source: StatusChangeSource::Rollup,
                            })
                            .await;
                    }
                    return Ok(change);
                }
                CasOutcome::Lost => {
                    warn!(%po_id, attempt, "Purchase order status changed underneath rollup; retrying");
                }
            }
        }

        Err(ServiceError::ConcurrentModification(po_id))
    }

    /// Recomputes a tender from its purchase orders, its consignees and its
    /// own supply flags. A flag-only refresh is written but raises no event.
    #[instrument(skip(self))]
    pub async fn rollup_tender(
        &self,
        tender_id: Uuid,
    ) -> Result<Option<StatusChange<TenderStatus>>, ServiceError> {
        let _guard = self.locks.lock(EntityKind::Tender, tender_id).await;
        let started = Instant::now();

        for attempt in 1..=self.max_retries {
            let outcome = with_transaction::<_, _, ServiceError>(self.db_pool.as_ref(), move |txn| {
                Box::pin(async move {
                    let current = tender::Entity::find_by_id(tender_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::NotFound(format!("Tender {}", tender_id)))?;

                    let po_statuses: Vec<PurchaseOrderStatus> = purchase_order::Entity::find()
                        .filter(purchase_order::Column::TenderId.eq(tender_id))
                        .all(txn)
                        .await?
                        .into_iter()
                        .map(|po| po.status)
                        .collect();

                    let consignee_statuses: Vec<ConsignmentStatus> = consignee::Entity::find()
                        .filter(consignee::Column::TenderId.eq(tender_id))
                        .all(txn)
                        .await?
                        .into_iter()
                        .map(|c| c.consignment_status)
                        .collect();

                    let next = status_rules::tender_rollup(
                        &po_statuses,
                        &consignee_statuses,
                        current.accessories_pending,
                        current.consumables_pending,
                    );

                    if next.status == current.status
                        && next.installation_pending == current.installation_pending
                        && next.invoice_pending == current.invoice_pending
                    {
                        return Ok(CasOutcome::Unchanged);
                    }

                    let result = tender::Entity::update_many()
                        .col_expr(tender::Column::Status, Expr::value(next.status))
                        .col_expr(
                            tender::Column::InstallationPending,
                            Expr::value(next.installation_pending),
                        )
                        .col_expr(tender::Column::InvoicePending, Expr::value(next.invoice_pending))
                        .col_expr(tender::Column::UpdatedAt, Expr::value(Utc::now()))
                        .filter(tender::Column::Id.eq(tender_id))
                        .filter(tender::Column::Status.eq(current.status))
                        .filter(tender::Column::AccessoriesPending.eq(current.accessories_pending))
                        .filter(tender::Column::ConsumablesPending.eq(current.consumables_pending))
                        .exec(txn)
                        .await?;

                    Ok::<_, ServiceError>(if result.rows_affected == 0 {
                        CasOutcome::Lost
                    } else if next.status == current.status {
                        CasOutcome::Written(None)
                    } else {
                        CasOutcome::Written(Some(StatusChange {
                            old: current.status,
                            new: next.status,
                        }))
                    })
                })
            })
            .await?;

            match outcome {
                CasOutcome::Unchanged => return Ok(None),
                CasOutcome::Written(change) => {
                    histogram!("tender_rollup.tender.duration", started.elapsed());
                    ROLLUP_WRITES.with_label_values(&[EntityKind::Tender.as_str()]).inc();
                    match change {
                        Some(change) => {
                            info!(%tender_id, old = %change.old, new = %change.new, "Tender status rolled up");
                            self.event_sender
                                .send_or_log(Event::TenderStatusChanged {
                                    tender_id,
                                    old_status: change.old,
                                    new_status: change.new,
                                })
                                .await;
                        }
                        None => debug!(%tender_id, "Tender pending flags refreshed"),
                    }
                    return Ok(change);
                }
                CasOutcome::Lost => {
                    warn!(%tender_id, attempt, "Tender changed underneath rollup; retrying");
                }
            }
        }

        Err(ServiceError::ConcurrentModification(tender_id))
    }

    /// Consignee → purchase order (when owned by one) → tender. Failures are
    /// logged, counted and queued for reconciliation; they are never returned.
    #[instrument(skip(self))]
    pub async fn cascade_from_consignee(&self, consignee_id: Uuid) -> CascadeReport {
        let mut report = CascadeReport::default();

        let parents = consignee::Entity::find_by_id(consignee_id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
            .and_then(|found| {
                found
                    .map(|c| (c.po_id, c.tender_id))
                    .ok_or_else(|| ServiceError::NotFound(format!("Consignee {}", consignee_id)))
            });
        let (po_id, tender_id) = match parents {
            Ok(parents) => parents,
            Err(e) => {
                self.remember_failure(EntityKind::Consignee, consignee_id, &e);
                report.failed = true;
                return report;
            }
        };

        match self.rollup_consignee(consignee_id).await {
            Ok(change) => report.consignee = change,
            Err(e) => {
                self.remember_failure(EntityKind::Consignee, consignee_id, &e);
                report.failed = true;
                return report;
            }
        }

        self.cascade_parents(po_id, tender_id, report).await
    }

    /// Purchase order and tender rollup after a consignee was corrected by hand.
    pub async fn cascade_from_corrected_consignee(
        &self,
        po_id: Option<Uuid>,
        tender_id: Uuid,
    ) -> CascadeReport {
        self.cascade_parents(po_id, tender_id, CascadeReport::default())
            .await
    }

    /// Purchase order → tender.
    #[instrument(skip(self))]
    pub async fn cascade_from_purchase_order(&self, po_id: Uuid, tender_id: Uuid) -> CascadeReport {
        self.cascade_parents(Some(po_id), tender_id, CascadeReport::default())
            .await
    }

    /// Tender only; used after explicit PO overrides and flag flips.
    #[instrument(skip(self))]
    pub async fn cascade_from_tender(&self, tender_id: Uuid) -> CascadeReport {
        let mut report = CascadeReport::default();
        match self.rollup_tender(tender_id).await {
            Ok(change) => report.tender = change,
            Err(e) => {
                self.remember_failure(EntityKind::Tender, tender_id, &e);
                report.failed = true;
            }
        }
        report
    }

    async fn cascade_parents(
        &self,
        po_id: Option<Uuid>,
        tender_id: Uuid,
        mut report: CascadeReport,
    ) -> CascadeReport {
        if let Some(po_id) = po_id {
            match self.rollup_purchase_order(po_id).await {
                Ok(change) => report.purchase_order = change,
                Err(e) => {
                    self.remember_failure(EntityKind::PurchaseOrder, po_id, &e);
                    report.failed = true;
                    return report;
                }
            }
        }

        let tender_report = self.cascade_from_tender(tender_id).await;
        report.tender = tender_report.tender;
        report.failed |= tender_report.failed;
        report
    }
}

/// Completeness of the four stage records of one consignee.
pub(crate) async fn stage_completion<C>(db: &C, consignee_id: Uuid) -> Result<StageCompletion, ServiceError>
where
    C: ConnectionTrait,
{
    let logistics = logistics_details::Entity::find()
        .filter(logistics_details::Column::ConsigneeId.eq(consignee_id))
        .one(db)
        .await?;
    let challan = challan_receipt::Entity::find()
        .filter(challan_receipt::Column::ConsigneeId.eq(consignee_id))
        .one(db)
        .await?;
    let installation = installation_report::Entity::find()
        .filter(installation_report::Column::ConsigneeId.eq(consignee_id))
        .one(db)
        .await?;
    let invoice = invoice::Entity::find()
        .filter(invoice::Column::ConsigneeId.eq(consignee_id))
        .one(db)
        .await?;

    Ok(StageCompletion {
        logistics: logistics.map(|r| r.is_complete()).unwrap_or(false),
        challan_receipt: challan.map(|r| r.is_complete()).unwrap_or(false),
        installation: installation.map(|r| r.is_complete()).unwrap_or(false),
        invoice: invoice.map(|r| r.is_complete()).unwrap_or(false),
    })
}
