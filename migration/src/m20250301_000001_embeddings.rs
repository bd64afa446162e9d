use crate::sea_orm::EnumIter;
use loco_rs::schema::*;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Image-embedding vector width. Baked into the schema at first migration;
/// changing it requires a full reset (see `Settings::assert_dimensions`).
pub const IMAGE_EMBEDDING_DIM: u16 = 768;

#[derive(Iden, EnumIter)]
pub enum Embeddings {
    Table,
    PhotoUid,
    CreatedAt,
    UpdatedAt,
    Model,
    Pretrained,
    Dim,
    Embedding,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, m: &SchemaManager) -> Result<(), DbErr> {
        m.create_table(
            Table::create()
                .table(Embeddings::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(Embeddings::PhotoUid)
                        .string()
                        .not_null()
                        .primary_key(),
                )
                .col(
                    ColumnDef::new(Embeddings::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::cust("CURRENT_TIMESTAMP")),
                )
                .col(
                    ColumnDef::new(Embeddings::UpdatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::cust("CURRENT_TIMESTAMP")),
                )
                .col(ColumnDef::new(Embeddings::Model).string().not_null())
                .col(ColumnDef::new(Embeddings::Pretrained).string().not_null())
                .col(ColumnDef::new(Embeddings::Dim).integer().not_null())
                .col(
                    ColumnDef::new(Embeddings::Embedding)
                        .vector(Some(u32::from(IMAGE_EMBEDDING_DIM)))
                        .not_null(),
                )
                .to_owned(),
        )
        .await?;

        let db = m.get_connection();
        db.execute_unprepared(
            r"
                CREATE INDEX embeddings_emb_idx ON embeddings
                USING hnsw (embedding vector_cosine_ops)
                WITH (m = 16, ef_construction = 200)
                ",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, m: &SchemaManager) -> Result<(), DbErr> {
        m.drop_table(Table::drop().table(Embeddings::Table).to_owned())
            .await
    }
}
