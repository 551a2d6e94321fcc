use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::logistics_details::has_text;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "challan_receipts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub consignee_id: Uuid,
    pub receipt_date: Option<NaiveDate>,
    pub document_path: Option<String>,
    pub updated_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::consignee::Entity",
        from = "Column::ConsigneeId",
        to = "super::consignee::Column::Id"
    )]
    Consignee,
}

impl Related<super::consignee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Consignee.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_complete(&self) -> bool {
        self.receipt_date.is_some() && has_text(&self.document_path)
    }
}
