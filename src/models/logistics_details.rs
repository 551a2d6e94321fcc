use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Dispatch record for a consignee. `documents` holds a JSON array of
/// document-store reference paths.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "logistics_details")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub consignee_id: Uuid,
    pub dispatch_date: Option<NaiveDate>,
    pub courier_name: Option<String>,
    pub docket_number: Option<String>,
    pub documents: Json,
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
    pub fn document_paths(&self) -> Vec<String> {
        self.documents
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .filter(|s| !s.trim().is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_complete(&self) -> bool {
        self.dispatch_date.is_some()
            && has_text(&self.courier_name)
            && has_text(&self.docket_number)
            && !self.document_paths().is_empty()
    }
}

pub(crate) fn has_text(value: &Option<String>) -> bool {
    value.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
}
