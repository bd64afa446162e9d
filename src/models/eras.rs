//! `EraRepo`: era centroids, consumed directly by C8 (no ANN
//! index — the era list is small enough for linear cosine ranking).

pub use super::_entities::era_embeddings::{ActiveModel, Entity, Model};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use sea_orm::ConnectionTrait;

use crate::common::errors::CoreResult;

pub type Eras = Entity;

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert && self.updated_at.is_unchanged() {
            let mut this = self;
            this.updated_at = Set(chrono::Utc::now().into());
            Ok(this)
        } else {
            Ok(self)
        }
    }
}

#[derive(Debug, Clone)]
pub struct EraRecord {
    pub era_slug: String,
    pub era_name: String,
    pub representative_date: chrono::NaiveDate,
    pub prompt_count: i32,
    pub model: String,
    pub embedding: Vec<f32>,
}

pub struct EraRepo<'a, C: ConnectionTrait> {
    pub db: &'a C,
}

impl<'a, C: ConnectionTrait> EraRepo<'a, C> {
    #[must_use]
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn save_era(&self, record: EraRecord) -> CoreResult<Model> {
        let now = chrono::Utc::now();
        let existing = Entity::find_by_id(record.era_slug.clone()).one(self.db).await?;
        let active = ActiveModel {
            era_slug: Set(record.era_slug),
            created_at: Set(existing.as_ref().map_or(now.into(), |m| m.created_at)),
            updated_at: Set(now.into()),
            era_name: Set(record.era_name),
            representative_date: Set(record.representative_date),
            prompt_count: Set(record.prompt_count),
            model: Set(record.model),
            embedding: Set(record.embedding),
        };
        let saved = if existing.is_some() {
            active.update(self.db).await?
        } else {
            active.insert(self.db).await?
        };
        Ok(saved)
    }

    pub async fn get_all_eras(&self) -> CoreResult<Vec<Model>> {
        Ok(Entity::find().all(self.db).await?)
    }

    /// Idempotent; deleting an absent slug is not an error.
    pub async fn delete_era(&self, slug: &str) -> CoreResult<()> {
        Entity::delete_by_id(slug.to_string()).exec(self.db).await?;
        Ok(())
    }

    /// Deletes every stored era whose slug is not in `current_slugs`,
    /// run after each `compute-eras` pass.
    pub async fn prune_stale(&self, current_slugs: &[String]) -> CoreResult<()> {
        let all = self.get_all_eras().await?;
        for era in all {
            if !current_slugs.contains(&era.era_slug) {
                self.delete_era(&era.era_slug).await?;
            }
        }
        Ok(())
    }
}
