//! Persistent lifecycle records. Every child carries its parent id explicitly;
//! parents never embed children.

pub mod audit_log;
pub mod challan_receipt;
pub mod consignee;
pub mod installation_report;
pub mod invoice;
pub mod loa;
pub mod logistics_details;
pub mod purchase_order;
pub mod tender;

use serde::{Deserialize, Serialize};

pub use consignee::ConsignmentStatus;
pub use loa::LoaStatus;
pub use purchase_order::PurchaseOrderStatus;
pub use tender::{AuthorityType, TenderStatus};

/// The four per-consignee stage records, in delivery order.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StageType {
    Logistics,
    ChallanReceipt,
    Installation,
    Invoice,
}

impl StageType {
    /// Consignee status reached once this stage's record is complete.
    pub fn reached_status(&self) -> ConsignmentStatus {
        match self {
            StageType::Logistics => ConsignmentStatus::Dispatched,
            StageType::ChallanReceipt => ConsignmentStatus::Delivered,
            StageType::Installation => ConsignmentStatus::Installed,
            StageType::Invoice => ConsignmentStatus::Invoiced,
        }
    }
}
