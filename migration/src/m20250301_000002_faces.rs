use crate::sea_orm::EnumIter;
use loco_rs::schema::*;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Face-embedding vector width — distinct from the image-embedding width.
pub const FACE_EMBEDDING_DIM: u16 = 512;

#[derive(Iden, EnumIter)]
pub enum Faces {
    Table,
    Id,
    CreatedAt,
    UpdatedAt,
    PhotoUid,
    FaceIndex,
    Embedding,
    Model,
    Dim,
    BboxX1,
    BboxY1,
    BboxX2,
    BboxY2,
    DetScore,
    Width,
    Height,
    Orientation,
    FileUid,
    MarkerUid,
    SubjectUid,
    SubjectName,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, m: &SchemaManager) -> Result<(), DbErr> {
        m.create_table(
            Table::create()
                .table(Faces::Table)
                .if_not_exists()
                .col(pk_auto(Faces::Id))
                .col(
                    ColumnDef::new(Faces::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::cust("CURRENT_TIMESTAMP")),
                )
                .col(
                    ColumnDef::new(Faces::UpdatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::cust("CURRENT_TIMESTAMP")),
                )
                .col(ColumnDef::new(Faces::PhotoUid).string().not_null())
                .col(ColumnDef::new(Faces::FaceIndex).integer().not_null())
                .col(
                    ColumnDef::new(Faces::Embedding)
                        .vector(Some(u32::from(FACE_EMBEDDING_DIM)))
                        .not_null(),
                )
                .col(ColumnDef::new(Faces::Model).string().not_null())
                .col(ColumnDef::new(Faces::Dim).integer().not_null())
                .col(ColumnDef::new(Faces::BboxX1).float().not_null())
                .col(ColumnDef::new(Faces::BboxY1).float().not_null())
                .col(ColumnDef::new(Faces::BboxX2).float().not_null())
                .col(ColumnDef::new(Faces::BboxY2).float().not_null())
                .col(ColumnDef::new(Faces::DetScore).float().not_null())
                .col(ColumnDef::new(Faces::Width).integer().not_null())
                .col(ColumnDef::new(Faces::Height).integer().not_null())
                .col(ColumnDef::new(Faces::Orientation).integer().not_null())
                .col(ColumnDef::new(Faces::FileUid).string().not_null())
                .col(string_null(Faces::MarkerUid))
                .col(string_null(Faces::SubjectUid))
                .col(string_null(Faces::SubjectName))
                .to_owned(),
        )
        .await?;

        m.create_index(
            Index::create()
                .name("faces_photo_face_idx")
                .table(Faces::Table)
                .col(Faces::PhotoUid)
                .col(Faces::FaceIndex)
                .unique()
                .to_owned(),
        )
        .await?;

        let db = m.get_connection();
        db.execute_unprepared(
            r"
                CREATE INDEX faces_emb_idx ON faces
                USING hnsw (embedding vector_cosine_ops)
                WITH (m = 16, ef_construction = 200)
                ",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, m: &SchemaManager) -> Result<(), DbErr> {
        m.drop_table(Table::drop().table(Faces::Table).to_owned())
            .await
    }
}
