//! Create `trust_income` and `trust_distribution` tables for the family trust module.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TrustIncome::Table)
                    .if_not_exists()
                    .col(uuid(TrustIncome::Id).primary_key())
                    .col(uuid(TrustIncome::UserId).not_null())
                    .col(integer(TrustIncome::FinancialYear).not_null())
                    .col(string_len(TrustIncome::Source, 128).not_null())
                    .col(string_len(TrustIncome::IncomeType, 32).not_null())
                    .col(decimal_len(TrustIncome::Amount, 14, 2).not_null())
                    .col(decimal_len(TrustIncome::FrankingCredits, 14, 2).not_null())
                    .col(date(TrustIncome::ReceivedDate).not_null())
                    .col(
                        ColumnDef::new(TrustIncome::Notes)
                            .text()
                            .null(),
                    )
                    .col(timestamp_with_time_zone(TrustIncome::CreatedAt).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TrustDistribution::Table)
                    .if_not_exists()
                    .col(uuid(TrustDistribution::Id).primary_key())
                    .col(uuid(TrustDistribution::UserId).not_null())
                    .col(integer(TrustDistribution::FinancialYear).not_null())
                    .col(string_len(TrustDistribution::BeneficiaryName, 128).not_null())
                    .col(decimal_len(TrustDistribution::Percentage, 7, 4).not_null())
                    .col(decimal_len(TrustDistribution::Amount, 14, 2).not_null())
                    .col(decimal_len(TrustDistribution::FrankingCredits, 14, 2).not_null())
                    .col(string_len(TrustDistribution::Status, 16).not_null())
                    .col(
                        ColumnDef::new(TrustDistribution::ResolutionDate)
                            .date()
                            .null(),
                    )
                    .col(timestamp_with_time_zone(TrustDistribution::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(TrustDistribution::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(TrustDistribution::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(TrustIncome::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum TrustIncome {
    Table,
    Id,
    UserId,
    FinancialYear,
    Source,
    IncomeType,
    Amount,
    FrankingCredits,
    ReceivedDate,
    Notes,
    CreatedAt,
}

#[derive(DeriveIden)]
enum TrustDistribution {
    Table,
    Id,
    UserId,
    FinancialYear,
    BeneficiaryName,
    Percentage,
    Amount,
    FrankingCredits,
    Status,
    ResolutionDate,
    CreatedAt,
    UpdatedAt,
}
