use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Account: index on user_id
        manager
            .create_index(
                Index::create()
                    .name("idx_account_user")
                    .table(Account::Table)
                    .col(Account::UserId)
                    .to_owned(),
            )
            .await?;

        // Transactions: per-account date scans
        manager
            .create_index(
                Index::create()
                    .name("idx_account_transaction_account_date")
                    .table(AccountTransaction::Table)
                    .col(AccountTransaction::AccountId)
                    .col(AccountTransaction::TxnDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_document_user")
                    .table(Document::Table)
                    .col(Document::UserId)
                    .to_owned(),
            )
            .await?;

        // Trust and super rows are always read per (user, financial year)
        manager
            .create_index(
                Index::create()
                    .name("idx_trust_income_user_fy")
                    .table(TrustIncome::Table)
                    .col(TrustIncome::UserId)
                    .col(TrustIncome::FinancialYear)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_trust_distribution_user_fy")
                    .table(TrustDistribution::Table)
                    .col(TrustDistribution::UserId)
                    .col(TrustDistribution::FinancialYear)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_super_contribution_user_fy")
                    .table(SuperContribution::Table)
                    .col(SuperContribution::UserId)
                    .col(SuperContribution::FinancialYear)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ai_message_conversation")
                    .table(AiMessage::Table)
                    .col(AiMessage::ConversationId)
                    .col(AiMessage::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_account_user").table(Account::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_account_transaction_account_date").table(AccountTransaction::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_document_user").table(Document::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_trust_income_user_fy").table(TrustIncome::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_trust_distribution_user_fy").table(TrustDistribution::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_super_contribution_user_fy").table(SuperContribution::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_ai_message_conversation").table(AiMessage::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Account { Table, UserId }

#[derive(DeriveIden)]
enum AccountTransaction { Table, AccountId, TxnDate }

#[derive(DeriveIden)]
enum Document { Table, UserId }

#[derive(DeriveIden)]
enum TrustIncome { Table, UserId, FinancialYear }

#[derive(DeriveIden)]
enum TrustDistribution { Table, UserId, FinancialYear }

#[derive(DeriveIden)]
enum SuperContribution { Table, UserId, FinancialYear }

#[derive(DeriveIden)]
enum AiMessage { Table, ConversationId, CreatedAt }
