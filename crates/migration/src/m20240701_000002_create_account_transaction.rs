//! Create `account_transaction` table with FK to `account`.
//!
//! Signed amounts: negative values are outflows. `external_id` carries the
//! remote id for imported rows and is unique per account.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AccountTransaction::Table)
                    .if_not_exists()
                    .col(uuid(AccountTransaction::Id).primary_key())
                    .col(uuid(AccountTransaction::UserId).not_null())
                    .col(uuid(AccountTransaction::AccountId).not_null())
                    .col(date(AccountTransaction::TxnDate).not_null())
                    .col(string_len(AccountTransaction::Description, 512).not_null())
                    .col(decimal_len(AccountTransaction::Amount, 14, 2).not_null())
                    .col(
                        ColumnDef::new(AccountTransaction::Category)
                            .string_len(64)
                            .null(),
                    )
                    .col(string_len(AccountTransaction::Source, 16).not_null())
                    .col(
                        ColumnDef::new(AccountTransaction::ExternalId)
                            .string_len(128)
                            .null(),
                    )
                    .col(timestamp_with_time_zone(AccountTransaction::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_account_transaction_account")
                            .from(AccountTransaction::Table, AccountTransaction::AccountId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 导入去重：同一账户下 external_id 唯一（NULL 不参与唯一约束）
        manager
            .create_index(
                Index::create()
                    .name("uniq_account_transaction_external")
                    .table(AccountTransaction::Table)
                    .col(AccountTransaction::AccountId)
                    .col(AccountTransaction::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(AccountTransaction::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum AccountTransaction {
    Table,
    Id,
    UserId,
    AccountId,
    TxnDate,
    Description,
    Amount,
    Category,
    Source,
    ExternalId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Account { Table, Id }
