#![allow(elided_lifetimes_in_paths)]
#![allow(clippy::wildcard_imports)]
pub use sea_orm_migration::prelude::*;
mod m20200101_000001_pgvectors;
mod m20250301_000001_embeddings;
mod m20250301_000002_faces;
mod m20250301_000003_era_embeddings;

pub use m20250301_000001_embeddings::IMAGE_EMBEDDING_DIM;
pub use m20250301_000002_faces::FACE_EMBEDDING_DIM;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20200101_000001_pgvectors::Migration),
            Box::new(m20250301_000001_embeddings::Migration),
            Box::new(m20250301_000002_faces::Migration),
            Box::new(m20250301_000003_era_embeddings::Migration),
            // inject-above (do not remove this comment)
        ]
    }
}
