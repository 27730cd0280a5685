//! Create `super_contribution` table.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SuperContribution::Table)
                    .if_not_exists()
                    .col(uuid(SuperContribution::Id).primary_key())
                    .col(uuid(SuperContribution::UserId).not_null())
                    .col(integer(SuperContribution::FinancialYear).not_null())
                    .col(string_len(SuperContribution::MemberName, 128).not_null())
                    .col(string_len(SuperContribution::FundName, 128).not_null())
                    .col(string_len(SuperContribution::ContributionType, 32).not_null())
                    .col(decimal_len(SuperContribution::Amount, 14, 2).not_null())
                    .col(date(SuperContribution::ContributionDate).not_null())
                    .col(timestamp_with_time_zone(SuperContribution::CreatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(SuperContribution::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum SuperContribution {
    Table,
    Id,
    UserId,
    FinancialYear,
    MemberName,
    FundName,
    ContributionType,
    Amount,
    ContributionDate,
    CreatedAt,
}
