//! Thin HTTP surface over the Era Estimator (C8).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use loco_rs::prelude::*;
use serde::Serialize;

use crate::common::errors::CoreError;
use crate::era::estimate_era;
use crate::state::services;

#[derive(Debug, Serialize)]
struct EraMatchJson {
    era_slug: String,
    era_name: String,
    similarity: f32,
}

#[derive(Debug, Serialize)]
struct EraEstimateJson {
    top_match: EraMatchJson,
    ranked: Vec<EraMatchJson>,
}

impl From<crate::era::EraMatch> for EraMatchJson {
    fn from(m: crate::era::EraMatch) -> Self {
        Self { era_slug: m.era_slug, era_name: m.era_name, similarity: m.similarity }
    }
}

/// `estimate-era(photo_uid)`: ranks every stored era centroid against the
/// photo's image embedding. Centroid computation itself (`compute-eras`)
/// is a batch job, not an HTTP flow — see `crate::workers::era_compute`.
async fn estimate(State(ctx): State<AppContext>, Path(photo_uid): Path<String>) -> Result<Response> {
    let svc = services();
    let estimate = match estimate_era(&ctx.db, &svc.ann.images, &photo_uid).await {
        Ok(estimate) => estimate,
        Err(CoreError::NotFound(_)) => return Err(Error::NotFound),
        Err(CoreError::IndexDegraded(msg)) => {
            return Ok((StatusCode::SERVICE_UNAVAILABLE, format::json(serde_json::json!({ "error": msg }))?)
                .into_response());
        }
        Err(other) => return Err(Error::BadRequest(other.to_string())),
    };

    format::json(EraEstimateJson {
        top_match: estimate.top_match.into(),
        ranked: estimate.ranked.into_iter().map(Into::into).collect(),
    })
}

pub fn routes() -> Routes {
    Routes::new().prefix("/api/v1/eras").add("/{photo_uid}", get(estimate))
}
