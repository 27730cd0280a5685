//! Create `account` table.
//!
//! Bank, card, loan, investment and super accounts tracked per user.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Account::Table)
                    .if_not_exists()
                    .col(uuid(Account::Id).primary_key())
                    .col(uuid(Account::UserId).not_null())
                    .col(string_len(Account::Name, 128).not_null())
                    .col(string_len(Account::AccountType, 32).not_null())
                    .col(string_len(Account::Institution, 128).not_null())
                    .col(
                        ColumnDef::new(Account::AccountNumber)
                            .string_len(64)
                            .null(),
                    )
                    .col(string_len(Account::Currency, 3).not_null())
                    .col(decimal_len(Account::OpeningBalance, 14, 2).not_null())
                    .col(boolean(Account::IsActive).not_null())
                    .col(timestamp_with_time_zone(Account::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Account::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Account::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Account {
    Table,
    Id,
    UserId,
    Name,
    AccountType,
    Institution,
    AccountNumber,
    Currency,
    OpeningBalance,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
