use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuing-body category of a tender.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum AuthorityType {
    #[sea_orm(string_value = "UPMSCL")]
    Upmscl,
    #[sea_orm(string_value = "UPSMC")]
    Upsmc,
    #[sea_orm(string_value = "UKSMC")]
    Uksmc,
    #[sea_orm(string_value = "SGPGIMS")]
    Sgpgims,
    #[sea_orm(string_value = "AUTONOMOUS")]
    Autonomous,
    #[sea_orm(string_value = "CMSD")]
    Cmsd,
    #[sea_orm(string_value = "DGME")]
    Dgme,
    #[sea_orm(string_value = "AIIMS")]
    Aiims,
    #[sea_orm(string_value = "SGPGI")]
    Sgpgi,
    #[sea_orm(string_value = "KGMU")]
    Kgmu,
    #[sea_orm(string_value = "BHU")]
    Bhu,
    #[sea_orm(string_value = "BMSICL")]
    Bmsicl,
    #[sea_orm(string_value = "OSMCL")]
    Osmcl,
    #[sea_orm(string_value = "TRADE")]
    Trade,
    #[sea_orm(string_value = "GDMC")]
    Gdmc,
    #[sea_orm(string_value = "AMSCL")]
    Amscl,
}

/// Tender lifecycle status. Only the rollup engine moves a tender between these.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
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
pub enum TenderStatus {
    #[sea_orm(string_value = "Draft")]
    #[serde(rename = "Draft")]
    #[strum(serialize = "Draft")]
    Draft,
    #[sea_orm(string_value = "In Progress")]
    #[serde(rename = "In Progress")]
    #[strum(serialize = "In Progress")]
    InProgress,
    #[sea_orm(string_value = "Partially Completed")]
    #[serde(rename = "Partially Completed")]
    #[strum(serialize = "Partially Completed")]
    PartiallyCompleted,
    #[sea_orm(string_value = "Pending")]
    #[serde(rename = "Pending")]
    #[strum(serialize = "Pending")]
    Pending,
    #[sea_orm(string_value = "Completed")]
    #[serde(rename = "Completed")]
    #[strum(serialize = "Completed")]
    Completed,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tenders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub tender_number: String,
    pub authority_type: AuthorityType,
    pub po_date: Option<NaiveDate>,
    pub contract_date: Option<NaiveDate>,
    pub lead_time_to_deliver: i32,
    pub lead_time_to_install: i32,
    pub equipment_name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub remarks: Option<String>,
    pub has_accessories: bool,
    pub selected_accessories: Option<Json>,
    pub has_consumables: bool,
    pub selected_consumables: Option<Json>,
    pub status: TenderStatus,
    pub accessories_pending: bool,
    pub consumables_pending: bool,
    pub installation_pending: bool,
    pub invoice_pending: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::loa::Entity")]
    Loas,
    #[sea_orm(has_many = "super::purchase_order::Entity")]
    PurchaseOrders,
    #[sea_orm(has_many = "super::consignee::Entity")]
    Consignees,
}

impl Related<super::loa::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loas.def()
    }
}

impl Related<super::purchase_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrders.def()
    }
}

impl Related<super::consignee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Consignees.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// True while accessory or consumable delivery is still outstanding.
    pub fn has_pending_supplies(&self) -> bool {
        self.accessories_pending || self.consumables_pending
    }
}
