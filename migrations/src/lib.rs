pub use sea_orm_migration::prelude::*;

mod m20240601_000001_create_tenders_table;
mod m20240601_000002_create_loas_table;
mod m20240601_000003_create_purchase_orders_table;
mod m20240601_000004_create_consignees_table;
mod m20240601_000005_create_stage_tables;
mod m20240601_000006_create_audit_logs_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_tenders_table::Migration),
            Box::new(m20240601_000002_create_loas_table::Migration),
            Box::new(m20240601_000003_create_purchase_orders_table::Migration),
            Box::new(m20240601_000004_create_consignees_table::Migration),
            Box::new(m20240601_000005_create_stage_tables::Migration),
            Box::new(m20240601_000006_create_audit_logs_table::Migration),
        ]
    }
}
