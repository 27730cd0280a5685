//! Migrator registering entity-specific migrations in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20240701_000001_create_account;
mod m20240701_000002_create_account_transaction;
mod m20240701_000003_create_document;
mod m20240701_000004_create_trust;
mod m20240701_000005_create_super_contribution;
mod m20240701_000006_create_xero;
mod m20240701_000007_create_ai_conversation;
mod m20240701_000008_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240701_000001_create_account::Migration),
            Box::new(m20240701_000002_create_account_transaction::Migration),
            Box::new(m20240701_000003_create_document::Migration),
            Box::new(m20240701_000004_create_trust::Migration),
            Box::new(m20240701_000005_create_super_contribution::Migration),
            Box::new(m20240701_000006_create_xero::Migration),
            Box::new(m20240701_000007_create_ai_conversation::Migration),
            // Indexes should always be applied last
            Box::new(m20240701_000008_add_indexes::Migration),
        ]
    }
}
