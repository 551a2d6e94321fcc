pub mod common;
pub mod consignees;
pub mod health;
pub mod loas;
pub mod purchase_orders;
pub mod reconciliation;
pub mod tenders;

use crate::{
    db::DbPool,
    events::EventSender,
    services::{
        audit::AuditSink, consignees::ConsigneeService, loas::LoaService,
        procurement::ProcurementService, reconciliation::ReconciliationService,
        rollup::StatusRollupEngine, tenders::TenderService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub tenders: Arc<TenderService>,
    pub loas: Arc<LoaService>,
    pub procurement: Arc<ProcurementService>,
    pub consignees: Arc<ConsigneeService>,
    pub reconciliation: Arc<ReconciliationService>,
    pub rollup: StatusRollupEngine,
}

impl AppServices {
    /// Builds every service around one shared rollup engine, so they all
    /// serialise on the same keyed locks.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        audit: Arc<dyn AuditSink>,
        rollup_max_retries: u32,
    ) -> Self {
        let rollup = StatusRollupEngine::new(
            db_pool.clone(),
            event_sender.clone(),
            rollup_max_retries,
        );

        let tenders = Arc::new(TenderService::new(
            db_pool.clone(),
            event_sender.clone(),
            rollup.clone(),
            audit.clone(),
        ));
        let loas = Arc::new(LoaService::new(
            db_pool.clone(),
            event_sender.clone(),
            audit.clone(),
        ));
        let procurement = Arc::new(ProcurementService::new(
            db_pool.clone(),
            event_sender.clone(),
            rollup.clone(),
            audit.clone(),
        ));
        let consignees = Arc::new(ConsigneeService::new(
            db_pool.clone(),
            event_sender.clone(),
            rollup.clone(),
            audit,
        ));
        let reconciliation = Arc::new(ReconciliationService::new(
            db_pool,
            event_sender,
            rollup.clone(),
        ));

        Self {
            tenders,
            loas,
            procurement,
            consignees,
            reconciliation,
            rollup,
        }
    }
}
