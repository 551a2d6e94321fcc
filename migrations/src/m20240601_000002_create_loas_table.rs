use sea_orm_migration::prelude::*;

use super::m20240601_000001_create_tenders_table::Tenders;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Loas::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Loas::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Loas::LoaNumber).string().not_null().unique_key())
                    .col(ColumnDef::new(Loas::TenderId).uuid().not_null())
                    .col(ColumnDef::new(Loas::IssueDate).date().not_null())
                    .col(ColumnDef::new(Loas::ValidityPeriod).integer().not_null())
                    .col(ColumnDef::new(Loas::TotalValue).decimal_len(15, 2).not_null())
                    .col(ColumnDef::new(Loas::EquipmentDetails).json().not_null())
                    .col(ColumnDef::new(Loas::TermsConditions).text().null())
                    .col(
                        ColumnDef::new(Loas::Status)
                            .string_len(32)
                            .not_null()
                            .default("Draft"),
                    )
                    .col(ColumnDef::new(Loas::AcceptanceDate).date().null())
                    .col(ColumnDef::new(Loas::AcceptanceDocumentPath).string().null())
                    .col(ColumnDef::new(Loas::Remarks).text().null())
                    .col(ColumnDef::new(Loas::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(Loas::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Loas::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_loas_tender_id")
                            .from(Loas::Table, Loas::TenderId)
                            .to(Tenders::Table, Tenders::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_loas_tender_id")
                    .table(Loas::Table)
                    .col(Loas::TenderId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Loas::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Loas {
    Table,
    Id,
    LoaNumber,
    TenderId,
    IssueDate,
    ValidityPeriod,
    TotalValue,
    EquipmentDetails,
    TermsConditions,
    Status,
    AcceptanceDate,
    AcceptanceDocumentPath,
    Remarks,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}
