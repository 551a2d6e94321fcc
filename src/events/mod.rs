use crate::models::{ConsignmentStatus, PurchaseOrderStatus, StageType, TenderStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What moved a purchase order's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusChangeSource {
    Rollup,
    Override,
}

/// Lifecycle events, emitted only after the change they describe committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    TenderCreated(Uuid),
    TenderStatusChanged {
        tender_id: Uuid,
        old_status: TenderStatus,
        new_status: TenderStatus,
    },
    TenderDeleted(Uuid),

    LoaCreated(Uuid),
    LoaUpdated(Uuid),
    LoaAccepted {
        loa_id: Uuid,
        document_path: String,
    },
    LoaDeleted(Uuid),

    PurchaseOrderCreated {
        po_id: Uuid,
        tender_id: Uuid,
        consignee_count: usize,
    },
    PurchaseOrderStatusChanged {
        po_id: Uuid,
        old_status: PurchaseOrderStatus,
        new_status: PurchaseOrderStatus,
        source: StatusChangeSource,
    },

    ConsigneeStageRecorded {
        consignee_id: Uuid,
        stage: StageType,
        complete: bool,
    },
    ConsigneeStatusChanged {
        consignee_id: Uuid,
        old_status: ConsignmentStatus,
        new_status: ConsignmentStatus,
    },

    ReconciliationCompleted {
        consignees_changed: usize,
        purchase_orders_changed: usize,
        tenders_changed: usize,
        failures: usize,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::TenderCreated(_) => "tender_created",
            Event::TenderStatusChanged { .. } => "tender_status_changed",
            Event::TenderDeleted(_) => "tender_deleted",
            Event::LoaCreated(_) => "loa_created",
            Event::LoaUpdated(_) => "loa_updated",
            Event::LoaAccepted { .. } => "loa_accepted",
            Event::LoaDeleted(_) => "loa_deleted",
            Event::PurchaseOrderCreated { .. } => "purchase_order_created",
            Event::PurchaseOrderStatusChanged { .. } => "purchase_order_status_changed",
            Event::ConsigneeStageRecorded { .. } => "consignee_stage_recorded",
            Event::ConsigneeStatusChanged { .. } => "consignee_status_changed",
            Event::ReconciliationCompleted { .. } => "reconciliation_completed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is closed.
    pub async fn send_or_log(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event).await {
            warn!(event = name, error = %e, "Dropped lifecycle event");
        }
    }
}

/// Drains the event channel until every sender is gone.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::TenderStatusChanged {
                tender_id,
                old_status,
                new_status,
            } => info!(%tender_id, %old_status, %new_status, "Tender status changed"),
            Event::PurchaseOrderStatusChanged {
                po_id,
                old_status,
                new_status,
                source,
            } => info!(%po_id, %old_status, %new_status, ?source, "Purchase order status changed"),
            Event::ConsigneeStatusChanged {
                consignee_id,
                old_status,
                new_status,
            } => info!(%consignee_id, %old_status, %new_status, "Consignee status changed"),
            Event::ReconciliationCompleted {
                consignees_changed,
                purchase_orders_changed,
                tenders_changed,
                failures,
            } => info!(
                consignees_changed,
                purchase_orders_changed,
                tenders_changed,
                failures,
                "Reconciliation sweep finished"
            ),
            other => debug!(event = other.name(), payload = ?other, "Received event"),
        }
    }

    info!("Event channel closed; event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_or_log_survives_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        assert!(sender.send(Event::TenderCreated(Uuid::new_v4())).await.is_err());
        sender.send_or_log(Event::LoaDeleted(Uuid::new_v4())).await;
    }

    #[tokio::test]
    async fn events_arrive_in_send_order() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let id = Uuid::new_v4();
        sender.send_or_log(Event::LoaCreated(id)).await;
        sender.send_or_log(Event::LoaUpdated(id)).await;
        assert_eq!(rx.recv().await, Some(Event::LoaCreated(id)));
        assert_eq!(rx.recv().await, Some(Event::LoaUpdated(id)));
    }
}
