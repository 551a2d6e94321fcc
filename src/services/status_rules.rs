//! Pure status derivation rules for the consignee → purchase order → tender
//! chain. Nothing here touches the store; the rollup engine feeds these
//! functions freshly read child state and persists whatever they return.

use crate::models::{ConsignmentStatus, PurchaseOrderStatus, TenderStatus};

/// Which of a consignee's four stage records are present and complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageCompletion {
    pub logistics: bool,
    pub challan_receipt: bool,
    pub installation: bool,
    pub invoice: bool,
}

impl StageCompletion {
    /// Furthest stage whose record is complete, `Processing` when none is.
    pub fn furthest_stage(&self) -> ConsignmentStatus {
        if self.invoice {
            ConsignmentStatus::Invoiced
        } else if self.installation {
            ConsignmentStatus::Installed
        } else if self.challan_receipt {
            ConsignmentStatus::Delivered
        } else if self.logistics {
            ConsignmentStatus::Dispatched
        } else {
            ConsignmentStatus::Processing
        }
    }
}

/// Automatic consignee rollup never moves backwards.
pub fn consignee_status(stored: ConsignmentStatus, stages: StageCompletion) -> ConsignmentStatus {
    stored.max(stages.furthest_stage())
}

pub fn purchase_order_status(
    stored: PurchaseOrderStatus,
    consignees: &[ConsignmentStatus],
) -> PurchaseOrderStatus {
    if stored.is_terminal() {
        return stored;
    }

    if !consignees.is_empty() && consignees.iter().all(|s| *s == ConsignmentStatus::Invoiced) {
        return PurchaseOrderStatus::Completed;
    }

    if consignees.iter().any(|s| *s > ConsignmentStatus::Processing) {
        return PurchaseOrderStatus::Active;
    }

    match stored {
        // Completion no longer holds once a consignee was corrected backwards.
        PurchaseOrderStatus::Completed => PurchaseOrderStatus::Active,
        other => other,
    }
}

/// Derived tender state: status plus the installation/invoice flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenderRollup {
    pub status: TenderStatus,
    pub installation_pending: bool,
    pub invoice_pending: bool,
}

pub fn tender_status(
    purchase_orders: &[PurchaseOrderStatus],
    accessories_pending: bool,
    consumables_pending: bool,
) -> TenderStatus {
    let supplies_pending = accessories_pending || consumables_pending;

    if purchase_orders.is_empty() {
        return TenderStatus::Draft;
    }

    let live: Vec<PurchaseOrderStatus> = purchase_orders
        .iter()
        .copied()
        .filter(|s| *s != PurchaseOrderStatus::Cancelled)
        .collect();

    if live.is_empty() {
        return if supplies_pending {
            TenderStatus::Pending
        } else {
            TenderStatus::Draft
        };
    }

    let completed = live
        .iter()
        .filter(|s| **s == PurchaseOrderStatus::Completed)
        .count();

    if completed == live.len() {
        if supplies_pending {
            TenderStatus::Pending
        } else {
            TenderStatus::Completed
        }
    } else if completed > 0 {
        TenderStatus::PartiallyCompleted
    } else {
        TenderStatus::InProgress
    }
}

/// Full tender rollup. `consignees` covers every consignee of the tender,
/// PO-owned and tender-direct alike.
pub fn tender_rollup(
    purchase_orders: &[PurchaseOrderStatus],
    consignees: &[ConsignmentStatus],
    accessories_pending: bool,
    consumables_pending: bool,
) -> TenderRollup {
    let installation_pending =
        consignees.is_empty() || consignees.iter().any(|s| *s < ConsignmentStatus::Installed);
    let invoice_pending =
        consignees.is_empty() || consignees.iter().any(|s| *s < ConsignmentStatus::Invoiced);

    TenderRollup {
        status: tender_status(purchase_orders, accessories_pending, consumables_pending),
        installation_pending,
        invoice_pending,
    }
}
