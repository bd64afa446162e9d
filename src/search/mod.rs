//! Search Service (C3): combines C1 + C2 with deterministic ordering and
//! source-exclusion. Thin layer — the interesting contract
//! is the similarity semantics, not the plumbing.

use std::collections::HashSet;

use sea_orm::ConnectionTrait;

use crate::ann::AnnIndex;
use crate::common::errors::CoreResult;
use crate::models::embeddings::{EmbeddingRepo, Model as EmbeddingModel};
use crate::models::faces::{FaceRepo, Model as FaceModel};
use crate::vector::percent_to_max_distance;

/// A ranked hit, ascending by distance, ties broken by `photo_uid` (and
/// `face_index` for face searches) so ordering stays deterministic.
#[derive(Debug, Clone)]
pub struct Hit<M> {
    pub record: M,
    pub distance: f32,
}

fn dedup_order_embeddings(mut hits: Vec<(EmbeddingModel, f32)>) -> Vec<Hit<EmbeddingModel>> {
    hits.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.photo_uid.cmp(&b.0.photo_uid))
    });
    hits.into_iter()
        .map(|(record, distance)| Hit { record, distance })
        .collect()
}

fn dedup_order_faces(mut hits: Vec<(FaceModel, f32)>) -> Vec<Hit<FaceModel>> {
    hits.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.photo_uid.cmp(&b.0.photo_uid))
            .then_with(|| a.0.face_index.cmp(&b.0.face_index))
    });
    hits.into_iter()
        .map(|(record, distance)| Hit { record, distance })
        .collect()
}

/// Finds photos with image embeddings similar to `query`, at minimum
/// `min_similarity_percent` similarity, excluding any `photo_uid` in
/// `exclude`.
pub async fn similar_photos<C: ConnectionTrait>(
    db: &C,
    index: &AnnIndex<String>,
    query: &[f32],
    k: usize,
    min_similarity_percent: f32,
    exclude: &HashSet<String>,
) -> CoreResult<Vec<Hit<EmbeddingModel>>> {
    let max_distance = percent_to_max_distance(min_similarity_percent);
    let repo = EmbeddingRepo::new(db, index);
    // Over-fetch to leave room for source-exclusion truncation.
    let raw = repo.find_similar(query, k * 2 + exclude.len(), max_distance).await?;
    let filtered: Vec<_> = raw
        .into_iter()
        .filter(|(m, _)| !exclude.contains(&m.photo_uid))
        .collect();
    let mut ordered = dedup_order_embeddings(filtered);
    ordered.truncate(k);
    Ok(ordered)
}

/// Finds faces similar to `query`, excluding any hit whose `photo_uid` is
/// in `exclude` (used by person-search's vote-gathering phase).
pub async fn similar_faces<C: ConnectionTrait>(
    db: &C,
    index: &AnnIndex<(String, i32)>,
    query: &[f32],
    k: usize,
    min_similarity_percent: f32,
    exclude: &HashSet<String>,
) -> CoreResult<Vec<Hit<FaceModel>>> {
    let max_distance = percent_to_max_distance(min_similarity_percent);
    let repo = FaceRepo::new(db, index);
    let raw = repo.find_similar(query, k * 2 + exclude.len(), max_distance).await?;
    let filtered: Vec<_> = raw
        .into_iter()
        .filter(|(m, _)| !exclude.contains(&m.photo_uid))
        .collect();
    let mut ordered = dedup_order_faces(filtered);
    ordered.truncate(k);
    Ok(ordered)
}

/// `k' = k × 10` over-fetch used by callers that deduplicate downstream.
#[must_use]
pub fn overfetch_k(k: usize) -> usize {
    k.saturating_mul(10)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedding(photo_uid: &str) -> EmbeddingModel {
        EmbeddingModel {
            photo_uid: photo_uid.to_string(),
            created_at: chrono::Utc::now().into(),
            updated_at: chrono::Utc::now().into(),
            model: "clip".into(),
            pretrained: "openai".into(),
            dim: 3,
            embedding: vec![1.0, 0.0, 0.0],
        }
    }

    #[test]
    fn ordering_is_deterministic_on_ties() {
        let hits = vec![(embedding("b"), 0.1), (embedding("a"), 0.1)];
        let ordered = dedup_order_embeddings(hits);
        assert_eq!(ordered[0].record.photo_uid, "a");
        assert_eq!(ordered[1].record.photo_uid, "b");
    }

    #[test]
    fn overfetch_is_tenx() {
        assert_eq!(overfetch_k(5), 50);
        assert_eq!(overfetch_k(0), 0);
    }
}
