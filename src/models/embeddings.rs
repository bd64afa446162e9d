//! `EmbeddingRepo`: durable store of per-photo image
//! embeddings, kept in lockstep with the C2 ANN index on every mutation.

pub use super::_entities::embeddings::{ActiveModel, Entity, Model};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use sea_orm::{ConnectionTrait, QueryOrder};

use crate::ann::AnnIndex;
use crate::common::errors::{CoreError, CoreResult};
use crate::vector;

pub type Embeddings = Entity;

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

/// Pairs the catalogue table with its ANN index so every mutating
/// operation keeps both in lockstep, taking the index as an explicit
/// dependency rather than reaching for a hidden global.
pub struct EmbeddingRepo<'a, C: ConnectionTrait> {
    pub db: &'a C,
    pub index: &'a AnnIndex<String>,
}

impl<'a, C: ConnectionTrait> EmbeddingRepo<'a, C> {
    #[must_use]
    pub fn new(db: &'a C, index: &'a AnnIndex<String>) -> Self {
        Self { db, index }
    }

    /// Upsert, replacing any prior record for `photo_uid`. Notifies C2.
    pub async fn save(
        &self,
        photo_uid: &str,
        embedding: Vec<f32>,
        model: &str,
        pretrained: &str,
        dim: i32,
    ) -> CoreResult<Model> {
        if embedding.len() != usize::try_from(dim).unwrap_or(0) {
            return Err(CoreError::Invalid(format!(
                "embedding has {} dims, declared dim is {dim}",
                embedding.len()
            )));
        }
        let now = chrono::Utc::now();
        let existing = Entity::find_by_id(photo_uid.to_string()).one(self.db).await?;
        let active = ActiveModel {
            photo_uid: Set(photo_uid.to_string()),
            created_at: Set(existing.as_ref().map_or(now.into(), |m| m.created_at)),
            updated_at: Set(now.into()),
            model: Set(model.to_string()),
            pretrained: Set(pretrained.to_string()),
            dim: Set(dim),
            embedding: Set(embedding.clone()),
        };
        let saved = if existing.is_some() {
            active.update(self.db).await?
        } else {
            active.insert(self.db).await?
        };
        self.index.insert(photo_uid.to_string(), &embedding)?;
        Ok(saved)
    }

    pub async fn get(&self, photo_uid: &str) -> CoreResult<Option<Model>> {
        Ok(Entity::find_by_id(photo_uid.to_string()).one(self.db).await?)
    }

    pub async fn has(&self, photo_uid: &str) -> CoreResult<bool> {
        Ok(self.get(photo_uid).await?.is_some())
    }

    /// Idempotent: deleting an absent record is not an error.
    pub async fn delete(&self, photo_uid: &str) -> CoreResult<()> {
        Entity::delete_by_id(photo_uid.to_string()).exec(self.db).await?;
        self.index.delete(&photo_uid.to_string());
        Ok(())
    }

    pub async fn count(&self) -> CoreResult<u64> {
        Ok(Entity::find().count(self.db).await?)
    }

    pub async fn unique_photo_uids(&self) -> CoreResult<Vec<String>> {
        let rows = Entity::find()
            .order_by_asc(super::_entities::embeddings::Column::PhotoUid)
            .all(self.db)
            .await?;
        Ok(rows.into_iter().map(|m| m.photo_uid).collect())
    }

    /// Cosine-distance k-NN, ascending, `distance <= max_distance`. Uses
    /// C2 when enabled, otherwise falls back to a full catalogue scan.
    pub async fn find_similar(
        &self,
        query: &[f32],
        k: usize,
        max_distance: f32,
    ) -> CoreResult<Vec<(Model, f32)>> {
        if self.index.is_enabled() {
            let hits = self.index.search(query, k, max_distance)?;
            let mut out = Vec::with_capacity(hits.len());
            for (photo_uid, distance) in hits {
                if let Some(record) = self.get(&photo_uid).await? {
                    out.push((record, distance));
                }
            }
            return Ok(out);
        }

        let all = Entity::find().all(self.db).await?;
        let mut scored: Vec<(Model, f32)> = all
            .into_iter()
            .map(|m| {
                let d = vector::cosine_distance(query, &m.embedding);
                (m, d)
            })
            .filter(|(_, d)| *d <= max_distance)
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

/// Bulk-loads every live embedding, for `AnnIndex::enable`/`rebuild` to
/// seed the in-memory index from the durable catalogue.
pub async fn all_vectors<C: ConnectionTrait>(db: &C) -> CoreResult<Vec<(String, Vec<f32>)>> {
    let rows = Entity::find().all(db).await?;
    Ok(rows.into_iter().map(|m| (m.photo_uid, m.embedding)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_is_generic_over_any_connection_trait() {
        fn assert_send<T: Send>() {}
        assert_send::<CoreError>();
    }
}
