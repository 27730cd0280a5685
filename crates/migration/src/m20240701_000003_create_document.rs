//! Create `document` table.
//! Metadata for uploaded files; bytes live in the document store under `storage_key`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Document::Table)
                    .if_not_exists()
                    .col(uuid(Document::Id).primary_key())
                    .col(uuid(Document::UserId).not_null())
                    .col(string_len(Document::Title, 256).not_null())
                    .col(string_len(Document::FileName, 256).not_null())
                    .col(string_len(Document::MimeType, 128).not_null())
                    .col(big_integer(Document::SizeBytes).not_null())
                    .col(string_len(Document::StorageKey, 512).not_null())
                    .col(
                        ColumnDef::new(Document::Category)
                            .string_len(64)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Document::FinancialYear)
                            .integer()
                            .null(),
                    )
                    .col(text(Document::Tags).not_null())
                    .col(
                        ColumnDef::new(Document::ExtractedText)
                            .text()
                            .null(),
                    )
                    .col(timestamp_with_time_zone(Document::CreatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Document::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Document {
    Table,
    Id,
    UserId,
    Title,
    FileName,
    MimeType,
    SizeBytes,
    StorageKey,
    Category,
    FinancialYear,
    Tags,
    ExtractedText,
    CreatedAt,
}
