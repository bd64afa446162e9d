//! Thin HTTP surface over the Person-Search Pipeline (C6). Deliberately
//! minimal — the interesting work lives in `crate::person_search`.

use axum::extract::{Query, State};
use loco_rs::prelude::*;
use serde::Deserialize;

use crate::common::settings::Settings;
use crate::person_search::{run, Options};
use crate::state::services;

#[derive(Debug, Deserialize)]
pub struct PersonSearchQuery {
    name: String,
    #[serde(default = "default_min_similarity")]
    min_similarity_percent: f32,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    apply: bool,
    #[serde(default)]
    save_match_images: bool,
}

fn default_min_similarity() -> f32 {
    70.0
}

fn default_limit() -> usize {
    100
}

/// Runs the pipeline for a named person. `dry_run` mirrors `!apply` —
/// writes only happen when the caller explicitly asks for them.
async fn search(State(ctx): State<AppContext>, Query(query): Query<PersonSearchQuery>) -> Result<Response> {
    let settings = Settings::from_context(&ctx);
    let svc = services();

    let opts = Options {
        query_name: query.name,
        min_similarity_percent: query.min_similarity_percent.max(0.0),
        limit: query.limit,
        dry_run: !query.apply,
        apply: query.apply,
        save_match_images: query.save_match_images,
        min_person_search_votes: settings.min_person_search_votes,
    };

    let results = run(
        &ctx.db,
        &svc.host,
        &svc.ann.faces,
        settings.iou_threshold,
        &settings.match_images_dir,
        opts,
    )
    .await
    .map_err(|e| Error::BadRequest(e.to_string()))?;

    format::json(results.into_iter().map(ClassifiedCandidateJson::from).collect::<Vec<_>>())
}

#[derive(Debug, serde::Serialize)]
struct ClassifiedCandidateJson {
    photo_uid: String,
    best_distance: f32,
    action: String,
    marker_uid: Option<String>,
    applied: bool,
}

impl From<crate::person_search::ClassifiedCandidate> for ClassifiedCandidateJson {
    fn from(c: crate::person_search::ClassifiedCandidate) -> Self {
        let (action, marker_uid) = match c.action {
            crate::person_search::Action::CreateMarker => ("create_marker".to_string(), None),
            crate::person_search::Action::AssignPerson { marker_uid } => ("assign_person".to_string(), Some(marker_uid)),
            crate::person_search::Action::AlreadyDone { marker_uid } => ("already_done".to_string(), Some(marker_uid)),
        };
        Self { photo_uid: c.photo_uid, best_distance: c.best_distance, action, marker_uid, applied: c.applied }
    }
}

pub fn routes() -> Routes {
    Routes::new().prefix("/api/v1/person-search").add("/", get(search))
}
