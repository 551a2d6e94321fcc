use sea_orm_migration::prelude::*;

use super::m20240601_000001_create_tenders_table::Tenders;
use super::m20240601_000003_create_purchase_orders_table::PurchaseOrders;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Consignees::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Consignees::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Consignees::TenderId).uuid().not_null())
                    .col(ColumnDef::new(Consignees::PoId).uuid().null())
                    .col(ColumnDef::new(Consignees::SrNo).string_len(16).not_null())
                    .col(ColumnDef::new(Consignees::DistrictName).string().not_null())
                    .col(ColumnDef::new(Consignees::BlockName).string().not_null())
                    .col(ColumnDef::new(Consignees::FacilityName).string().not_null())
                    .col(
                        ColumnDef::new(Consignees::ConsignmentStatus)
                            .string_len(32)
                            .not_null()
                            .default("Processing"),
                    )
                    .col(
                        ColumnDef::new(Consignees::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Consignees::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_consignees_tender_id")
                            .from(Consignees::Table, Consignees::TenderId)
                            .to(Tenders::Table, Tenders::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_consignees_po_id")
                            .from(Consignees::Table, Consignees::PoId)
                            .to(PurchaseOrders::Table, PurchaseOrders::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_consignees_po_id")
                    .table(Consignees::Table)
                    .col(Consignees::PoId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_consignees_tender_id")
                    .table(Consignees::Table)
                    .col(Consignees::TenderId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Consignees::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Consignees {
    Table,
    Id,
    TenderId,
    PoId,
    SrNo,
    DistrictName,
    BlockName,
    FacilityName,
    ConsignmentStatus,
    CreatedAt,
    UpdatedAt,
}
