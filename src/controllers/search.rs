//! Thin HTTP surface over the Search Service (C3). Kept deliberately
//! minimal, one handler per component flow.

use std::collections::HashSet;

use axum::extract::{Query, State};
use loco_rs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::embeddings::EmbeddingRepo;
use crate::search::similar_photos;
use crate::state::services;

#[derive(Debug, Deserialize)]
pub struct SimilarQuery {
    photo_uid: String,
    #[serde(default = "default_min_similarity")]
    min_similarity_percent: f32,
    #[serde(default = "default_limit")]
    limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct TextSearchQuery {
    text: String,
    #[serde(default = "default_min_similarity")]
    min_similarity_percent: f32,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_min_similarity() -> f32 {
    70.0
}

fn default_limit() -> usize {
    50
}

#[derive(Debug, Serialize)]
pub struct SimilarPhotoResult {
    photo_uid: String,
    distance: f32,
}

/// "Similar to photo X" — the query photo itself is always excluded.
async fn similar(State(ctx): State<AppContext>, Query(query): Query<SimilarQuery>) -> Result<Response> {
    let svc = services();
    let embedding_repo = EmbeddingRepo::new(&ctx.db, &svc.ann.images);
    let Some(source) = embedding_repo.get(&query.photo_uid).await.map_err(to_loco_err)? else {
        return not_found();
    };

    let mut exclude = HashSet::new();
    exclude.insert(query.photo_uid.clone());
    let hits = similar_photos(
        &ctx.db,
        &svc.ann.images,
        &source.embedding,
        query.limit,
        query.min_similarity_percent.max(0.0),
        &exclude,
    )
    .await
    .map_err(to_loco_err)?;

    format::json(
        hits.into_iter()
            .map(|h| SimilarPhotoResult { photo_uid: h.record.photo_uid, distance: h.distance })
            .collect::<Vec<_>>(),
    )
}

/// Cross-modal search: embeds free text through the Embedder, then ranks
/// image embeddings by cosine similarity against it — the era
/// estimator's sibling flow, but for plain text rather than era prompts.
async fn text_search(State(ctx): State<AppContext>, Query(query): Query<TextSearchQuery>) -> Result<Response> {
    let svc = services();
    let response = svc.embedder.compute_text_embedding(&query.text).await.map_err(to_loco_err)?;

    let hits = similar_photos(
        &ctx.db,
        &svc.ann.images,
        &response.embedding,
        query.limit,
        query.min_similarity_percent.max(0.0),
        &HashSet::new(),
    )
    .await
    .map_err(to_loco_err)?;

    format::json(
        hits.into_iter()
            .map(|h| SimilarPhotoResult { photo_uid: h.record.photo_uid, distance: h.distance })
            .collect::<Vec<_>>(),
    )
}

fn to_loco_err(e: crate::common::errors::CoreError) -> Error {
    match e {
        crate::common::errors::CoreError::NotFound(_) => Error::NotFound,
        other => Error::BadRequest(other.to_string()),
    }
}

pub fn routes() -> Routes {
    Routes::new()
        .prefix("/api/v1/search")
        .add("/similar", get(similar))
        .add("/text", get(text_search))
}
