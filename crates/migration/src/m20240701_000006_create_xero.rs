//! Create `xero_connection` and `xero_account_mapping` tables.
//!
//! One connection per (user, Xero organisation); mappings link remote bank
//! accounts to local `account` rows (nullable until matched).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(XeroConnection::Table)
                    .if_not_exists()
                    .col(uuid(XeroConnection::Id).primary_key())
                    .col(uuid(XeroConnection::UserId).not_null())
                    .col(string_len(XeroConnection::XeroTenantId, 64).not_null())
                    .col(string_len(XeroConnection::TenantName, 256).not_null())
                    .col(text(XeroConnection::AccessToken).not_null())
                    .col(text(XeroConnection::RefreshToken).not_null())
                    .col(timestamp_with_time_zone(XeroConnection::ExpiresAt).not_null())
                    .col(string_len(XeroConnection::Status, 16).not_null())
                    .col(
                        ColumnDef::new(XeroConnection::LastSyncedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(timestamp_with_time_zone(XeroConnection::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(XeroConnection::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uniq_xero_connection_user_tenant")
                    .table(XeroConnection::Table)
                    .col(XeroConnection::UserId)
                    .col(XeroConnection::XeroTenantId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(XeroAccountMapping::Table)
                    .if_not_exists()
                    .col(uuid(XeroAccountMapping::Id).primary_key())
                    .col(uuid(XeroAccountMapping::ConnectionId).not_null())
                    .col(string_len(XeroAccountMapping::XeroAccountId, 64).not_null())
                    .col(string_len(XeroAccountMapping::XeroAccountName, 256).not_null())
                    .col(
                        ColumnDef::new(XeroAccountMapping::XeroAccountNumber)
                            .string_len(64)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(XeroAccountMapping::AccountId)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(XeroAccountMapping::MatchScore)
                            .decimal_len(5, 4)
                            .null(),
                    )
                    .col(boolean(XeroAccountMapping::AutoMatched).not_null())
                    .col(timestamp_with_time_zone(XeroAccountMapping::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(XeroAccountMapping::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_xero_mapping_connection")
                            .from(XeroAccountMapping::Table, XeroAccountMapping::ConnectionId)
                            .to(XeroConnection::Table, XeroConnection::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_xero_mapping_account")
                            .from(XeroAccountMapping::Table, XeroAccountMapping::AccountId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uniq_xero_mapping_connection_account")
                    .table(XeroAccountMapping::Table)
                    .col(XeroAccountMapping::ConnectionId)
                    .col(XeroAccountMapping::XeroAccountId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(XeroAccountMapping::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(XeroConnection::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum XeroConnection {
    Table,
    Id,
    UserId,
    XeroTenantId,
    TenantName,
    AccessToken,
    RefreshToken,
    ExpiresAt,
    Status,
    LastSyncedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum XeroAccountMapping {
    Table,
    Id,
    ConnectionId,
    XeroAccountId,
    XeroAccountName,
    XeroAccountNumber,
    AccountId,
    MatchScore,
    AutoMatched,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Account { Table, Id }
