use sea_orm_migration::prelude::*;

use super::m20240601_000004_create_consignees_table::Consignees;

/// Stage records hang off a consignee, at most one per stage type.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LogisticsDetails::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LogisticsDetails::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LogisticsDetails::ConsigneeId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(LogisticsDetails::DispatchDate).date().null())
                    .col(ColumnDef::new(LogisticsDetails::CourierName).string().null())
                    .col(ColumnDef::new(LogisticsDetails::DocketNumber).string().null())
                    .col(ColumnDef::new(LogisticsDetails::Documents).json().not_null())
                    .col(ColumnDef::new(LogisticsDetails::UpdatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(LogisticsDetails::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LogisticsDetails::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_logistics_details_consignee_id")
                            .from(LogisticsDetails::Table, LogisticsDetails::ConsigneeId)
                            .to(Consignees::Table, Consignees::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChallanReceipts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChallanReceipts::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChallanReceipts::ConsigneeId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ChallanReceipts::ReceiptDate).date().null())
                    .col(ColumnDef::new(ChallanReceipts::DocumentPath).string().null())
                    .col(ColumnDef::new(ChallanReceipts::UpdatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(ChallanReceipts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChallanReceipts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_challan_receipts_consignee_id")
                            .from(ChallanReceipts::Table, ChallanReceipts::ConsigneeId)
                            .to(Consignees::Table, Consignees::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InstallationReports::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InstallationReports::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InstallationReports::ConsigneeId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(InstallationReports::InstallationDate)
                            .date()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InstallationReports::DocumentPath)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InstallationReports::UpdatedBy)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InstallationReports::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InstallationReports::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_installation_reports_consignee_id")
                            .from(
                                InstallationReports::Table,
                                InstallationReports::ConsigneeId,
                            )
                            .to(Consignees::Table, Consignees::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Invoices::Id).uuid().primary_key().not_null())
                    .col(
                        ColumnDef::new(Invoices::ConsigneeId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Invoices::InvoiceNumber).string().null())
                    .col(ColumnDef::new(Invoices::InvoiceDate).date().null())
                    .col(ColumnDef::new(Invoices::Amount).decimal_len(15, 2).null())
                    .col(ColumnDef::new(Invoices::DocumentPath).string().null())
                    .col(ColumnDef::new(Invoices::UpdatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(Invoices::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_consignee_id")
                            .from(Invoices::Table, Invoices::ConsigneeId)
                            .to(Consignees::Table, Consignees::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Invoices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InstallationReports::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChallanReceipts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LogisticsDetails::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum LogisticsDetails {
    Table,
    Id,
    ConsigneeId,
    DispatchDate,
    CourierName,
    DocketNumber,
    Documents,
    UpdatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ChallanReceipts {
    Table,
    Id,
    ConsigneeId,
    ReceiptDate,
    DocumentPath,
    UpdatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum InstallationReports {
    Table,
    Id,
    ConsigneeId,
    InstallationDate,
    DocumentPath,
    UpdatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Invoices {
    Table,
    Id,
    ConsigneeId,
    InvoiceNumber,
    InvoiceDate,
    Amount,
    DocumentPath,
    UpdatedBy,
    CreatedAt,
    UpdatedAt,
}
