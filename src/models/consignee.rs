use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Furthest delivery stage a consignee has reached. Variant order is stage order.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[strum(ascii_case_insensitive)]
pub enum ConsignmentStatus {
    #[sea_orm(string_value = "Processing")]
    Processing,
    #[sea_orm(string_value = "Dispatched")]
    Dispatched,
    #[sea_orm(string_value = "Delivered")]
    Delivered,
    #[sea_orm(string_value = "Installed")]
    Installed,
    #[sea_orm(string_value = "Invoiced")]
    Invoiced,
}

/// One delivery site under a purchase order, or directly under a tender when
/// `po_id` is empty.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "consignees")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tender_id: Uuid,
    pub po_id: Option<Uuid>,
    pub sr_no: String,
    pub district_name: String,
    pub block_name: String,
    pub facility_name: String,
    pub consignment_status: ConsignmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tender::Entity",
        from = "Column::TenderId",
        to = "super::tender::Column::Id"
    )]
    Tender,
    #[sea_orm(
        belongs_to = "super::purchase_order::Entity",
        from = "Column::PoId",
        to = "super::purchase_order::Column::Id"
    )]
    PurchaseOrder,
    #[sea_orm(has_one = "super::logistics_details::Entity")]
    LogisticsDetails,
    #[sea_orm(has_one = "super::challan_receipt::Entity")]
    ChallanReceipt,
    #[sea_orm(has_one = "super::installation_report::Entity")]
    InstallationReport,
    #[sea_orm(has_one = "super::invoice::Entity")]
    Invoice,
}

impl Related<super::tender::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tender.def()
    }
}

impl Related<super::purchase_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrder.def()
    }
}

impl Related<super::logistics_details::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LogisticsDetails.def()
    }
}

impl Related<super::challan_receipt::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChallanReceipt.def()
    }
}

impl Related<super::installation_report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InstallationReport.def()
    }
}

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoice.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
