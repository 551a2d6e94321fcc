use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tenders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tenders::Id).uuid().primary_key().not_null())
                    .col(
                        ColumnDef::new(Tenders::TenderNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Tenders::AuthorityType).string_len(32).not_null())
                    .col(ColumnDef::new(Tenders::PoDate).date().null())
                    .col(ColumnDef::new(Tenders::ContractDate).date().null())
                    .col(ColumnDef::new(Tenders::LeadTimeToDeliver).integer().not_null())
                    .col(ColumnDef::new(Tenders::LeadTimeToInstall).integer().not_null())
                    .col(ColumnDef::new(Tenders::EquipmentName).string().not_null())
                    .col(ColumnDef::new(Tenders::Remarks).text().null())
                    .col(
                        ColumnDef::new(Tenders::HasAccessories)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Tenders::SelectedAccessories).json().null())
                    .col(
                        ColumnDef::new(Tenders::HasConsumables)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Tenders::SelectedConsumables).json().null())
                    .col(
                        ColumnDef::new(Tenders::Status)
                            .string_len(32)
                            .not_null()
                            .default("Draft"),
                    )
                    .col(
                        ColumnDef::new(Tenders::AccessoriesPending)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Tenders::ConsumablesPending)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Tenders::InstallationPending)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Tenders::InvoicePending)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Tenders::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(Tenders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Tenders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tenders_status")
                    .table(Tenders::Table)
                    .col(Tenders::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tenders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Tenders {
    Table,
    Id,
    TenderNumber,
    AuthorityType,
    PoDate,
    ContractDate,
    LeadTimeToDeliver,
    LeadTimeToInstall,
    EquipmentName,
    Remarks,
    HasAccessories,
    SelectedAccessories,
    HasConsumables,
    SelectedConsumables,
    Status,
    AccessoriesPending,
    ConsumablesPending,
    InstallationPending,
    InvoicePending,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}
