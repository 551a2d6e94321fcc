use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

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
pub enum PurchaseOrderStatus {
    #[sea_orm(string_value = "Draft")]
    Draft,
    #[sea_orm(string_value = "Active")]
    Active,
    #[sea_orm(string_value = "Completed")]
    Completed,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PurchaseOrderStatus::Cancelled)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub po_number: String,
    pub tender_id: Uuid,
    pub loa_id: Option<Uuid>,
    pub po_date: NaiveDate,
    pub equipment_name: String,
    pub lead_time_to_deliver: i32,
    pub lead_time_to_install: i32,
    pub has_accessories: bool,
    pub accessories: Option<Json>,
    #[sea_orm(column_type = "Text", nullable)]
    pub remarks: Option<String>,
    pub status: PurchaseOrderStatus,
    pub created_by: Uuid,
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
        belongs_to = "super::loa::Entity",
        from = "Column::LoaId",
        to = "super::loa::Column::Id"
    )]
    Loa,
    #[sea_orm(has_many = "super::consignee::Entity")]
    Consignees,
}

impl Related<super::tender::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tender.def()
    }
}

impl Related<super::loa::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loa.def()
    }
}

impl Related<super::consignee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Consignees.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
