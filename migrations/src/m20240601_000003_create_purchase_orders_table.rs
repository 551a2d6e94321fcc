use sea_orm_migration::prelude::*;

use super::m20240601_000001_create_tenders_table::Tenders;
use super::m20240601_000002_create_loas_table::Loas;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PurchaseOrders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseOrders::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::PoNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(PurchaseOrders::TenderId).uuid().not_null())
                    .col(ColumnDef::new(PurchaseOrders::LoaId).uuid().null())
                    .col(ColumnDef::new(PurchaseOrders::PoDate).date().not_null())
                    .col(ColumnDef::new(PurchaseOrders::EquipmentName).string().not_null())
                    .col(
                        ColumnDef::new(PurchaseOrders::LeadTimeToDeliver)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::LeadTimeToInstall)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::HasAccessories)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(PurchaseOrders::Accessories).json().null())
                    .col(ColumnDef::new(PurchaseOrders::Remarks).text().null())
                    .col(
                        ColumnDef::new(PurchaseOrders::Status)
                            .string_len(32)
                            .not_null()
                            .default("Draft"),
                    )
                    .col(ColumnDef::new(PurchaseOrders::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(PurchaseOrders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_orders_tender_id")
                            .from(PurchaseOrders::Table, PurchaseOrders::TenderId)
                            .to(Tenders::Table, Tenders::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_orders_loa_id")
                            .from(PurchaseOrders::Table, PurchaseOrders::LoaId)
                            .to(Loas::Table, Loas::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_purchase_orders_tender_id")
                    .table(PurchaseOrders::Table)
                    .col(PurchaseOrders::TenderId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_purchase_orders_po_date")
                    .table(PurchaseOrders::Table)
                    .col(PurchaseOrders::PoDate)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum PurchaseOrders {
    Table,
    Id,
    PoNumber,
    TenderId,
    LoaId,
    PoDate,
    EquipmentName,
    LeadTimeToDeliver,
    LeadTimeToInstall,
    HasAccessories,
    Accessories,
    Remarks,
    Status,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}
