use crate::m20250301_000001_embeddings::IMAGE_EMBEDDING_DIM;
use crate::sea_orm::EnumIter;
use loco_rs::schema::*;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden, EnumIter)]
pub enum EraEmbeddings {
    Table,
    EraSlug,
    CreatedAt,
    UpdatedAt,
    EraName,
    RepresentativeDate,
    PromptCount,
    Model,
    Embedding,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, m: &SchemaManager) -> Result<(), DbErr> {
        m.create_table(
            Table::create()
                .table(EraEmbeddings::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(EraEmbeddings::EraSlug)
                        .string()
                        .not_null()
                        .primary_key(),
                )
                .col(
                    ColumnDef::new(EraEmbeddings::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::cust("CURRENT_TIMESTAMP")),
                )
                .col(
                    ColumnDef::new(EraEmbeddings::UpdatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::cust("CURRENT_TIMESTAMP")),
                )
                .col(ColumnDef::new(EraEmbeddings::EraName).string().not_null())
                .col(
                    ColumnDef::new(EraEmbeddings::RepresentativeDate)
                        .date()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(EraEmbeddings::PromptCount)
                        .integer()
                        .not_null(),
                )
                .col(ColumnDef::new(EraEmbeddings::Model).string().not_null())
                .col(
                    ColumnDef::new(EraEmbeddings::Embedding)
                        .vector(Some(u32::from(IMAGE_EMBEDDING_DIM)))
                        .not_null(),
                )
                .to_owned(),
        )
        .await
    }

    async fn down(&self, m: &SchemaManager) -> Result<(), DbErr> {
        m.drop_table(Table::drop().table(EraEmbeddings::Table).to_owned())
            .await
    }
}
