//! Periodic reconciliation.
//!
//! A sweep first retries cascades that failed after their triggering write
//! committed, then re-runs rollup for every consignee, purchase order and
//! tender, bottom-up. Rollup is idempotent, so a sweep over a consistent
//! store changes nothing.

use crate::{
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::RECONCILIATION_RUNS,
    models::{consignee, purchase_order, tender},
    services::rollup::{EntityKind, StatusRollupEngine},
};
use sea_orm::{EntityTrait, QuerySelect};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub consignees_changed: usize,
    pub purchase_orders_changed: usize,
    pub tenders_changed: usize,
    pub failures: usize,
}

impl ReconciliationReport {
    pub fn changed(&self) -> usize {
        self.consignees_changed + self.purchase_orders_changed + self.tenders_changed
    }
}

pub struct ReconciliationService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    rollup: StatusRollupEngine,
}

impl ReconciliationService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        rollup: StatusRollupEngine,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            rollup,
        }
    }

    /// Runs one full sweep. Individual rollup failures are counted and
    /// remembered for the next sweep; only failing to list ids is an error.
    #[instrument(skip(self))]
    pub async fn sweep_once(&self) -> Result<ReconciliationReport, ServiceError> {
        let mut report = ReconciliationReport::default();

        for (kind, id) in self.rollup.take_pending_retries() {
            self.run(kind, id, &mut report).await;
        }

        let db = self.db_pool.as_ref();
        let consignee_ids: Vec<Uuid> = consignee::Entity::find()
            .select_only()
            .column(consignee::Column::Id)
            .into_tuple()
            .all(db)
            .await?;
        for id in consignee_ids {
            self.run(EntityKind::Consignee, id, &mut report).await;
        }

        let po_ids: Vec<Uuid> = purchase_order::Entity::find()
            .select_only()
            .column(purchase_order::Column::Id)
            .into_tuple()
            .all(db)
            .await?;
        for id in po_ids {
            self.run(EntityKind::PurchaseOrder, id, &mut report).await;
        }

        let tender_ids: Vec<Uuid> = tender::Entity::find()
            .select_only()
            .column(tender::Column::Id)
            .into_tuple()
            .all(db)
            .await?;
        for id in tender_ids {
            self.run(EntityKind::Tender, id, &mut report).await;
        }

        self.rollup.locks().prune();
        RECONCILIATION_RUNS.inc();

        info!(
            consignees_changed = report.consignees_changed,
            purchase_orders_changed = report.purchase_orders_changed,
            tenders_changed = report.tenders_changed,
            failures = report.failures,
            "Reconciliation sweep finished"
        );

        self.event_sender
            .send_or_log(Event::ReconciliationCompleted {
                consignees_changed: report.consignees_changed,
                purchase_orders_changed: report.purchase_orders_changed,
                tenders_changed: report.tenders_changed,
                failures: report.failures,
            })
            .await;

        Ok(report)
    }

    async fn run(&self, kind: EntityKind, id: Uuid, report: &mut ReconciliationReport) {
        let outcome = match kind {
            EntityKind::Consignee => self
                .rollup
                .rollup_consignee(id)
                .await
                .map(|change| change.is_some()),
            EntityKind::PurchaseOrder => self
                .rollup
                .rollup_purchase_order(id)
                .await
                .map(|change| change.is_some()),
            EntityKind::Tender => self
                .rollup
                .rollup_tender(id)
                .await
                .map(|change| change.is_some()),
        };

        match outcome {
            Ok(true) => match kind {
                EntityKind::Consignee => report.consignees_changed += 1,
                EntityKind::PurchaseOrder => report.purchase_orders_changed += 1,
                EntityKind::Tender => report.tenders_changed += 1,
            },
            Ok(false) => {}
            // Removed between listing and rollup.
            Err(ServiceError::NotFound(_)) => {}
            Err(e) => {
                report.failures += 1;
                self.rollup.remember_failure(kind, id, &e);
            }
        }
    }

    /// Spawns the periodic sweep. A zero interval disables it.
    pub fn start_worker(self: Arc<Self>, interval: Duration) -> Option<JoinHandle<()>> {
        if interval.is_zero() {
            info!("Reconciliation worker disabled");
            return None;
        }

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; skip it so startup is not a sweep.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep_once().await {
                    error!("reconciliation worker error: {}", e);
                }
            }
        }))
    }
}
