//! Create `ai_conversation` and `ai_message` tables.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AiConversation::Table)
                    .if_not_exists()
                    .col(uuid(AiConversation::Id).primary_key())
                    .col(uuid(AiConversation::UserId).not_null())
                    .col(string_len(AiConversation::Title, 128).not_null())
                    .col(timestamp_with_time_zone(AiConversation::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(AiConversation::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AiMessage::Table)
                    .if_not_exists()
                    .col(uuid(AiMessage::Id).primary_key())
                    .col(uuid(AiMessage::ConversationId).not_null())
                    .col(string_len(AiMessage::Role, 16).not_null())
                    .col(text(AiMessage::Content).not_null())
                    .col(timestamp_with_time_zone(AiMessage::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ai_message_conversation")
                            .from(AiMessage::Table, AiMessage::ConversationId)
                            .to(AiConversation::Table, AiConversation::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(AiMessage::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(AiConversation::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum AiConversation { Table, Id, UserId, Title, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum AiMessage { Table, Id, ConversationId, Role, Content, CreatedAt }
