//! `Era-compute`: recomputes every configured era's text-prompt
//! centroid. Unlike the other batch jobs this isn't item-parallel over
//! photos — `era::compute_eras` already isolates failures per era, so
//! the worker just calls it once.

use loco_rs::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::era::{compute_eras, EraDefinition};
use crate::state::services;

pub struct EraComputeWorker {
    pub ctx: AppContext,
}

#[derive(Deserialize, Debug, Serialize)]
pub struct WorkerArgs {}

#[async_trait]
impl BackgroundWorker<WorkerArgs> for EraComputeWorker {
    fn build(ctx: &AppContext) -> Self {
        Self { ctx: ctx.clone() }
    }

    async fn perform(&self, _args: WorkerArgs) -> Result<()> {
        info!("=================EraCompute=======================");
        let svc = services();
        let eras = default_eras();
        let computed = compute_eras(&self.ctx.db, &svc.embedder, &eras).await?;
        info!("Computed {} era centroids", computed.len());
        Ok(())
    }
}

/// The static era catalogue driving `compute-eras`. Decades from the
/// 1950s through the 2010s, each with a handful of visual cues.
fn default_eras() -> Vec<EraDefinition> {
    let decade = |slug: &str, name: &str, year: i32, cues: &[&str]| EraDefinition {
        slug: slug.to_string(),
        name: name.to_string(),
        representative_date: chrono::NaiveDate::from_ymd_opt(year, 1, 1).expect("valid calendar date"),
        cues: cues.iter().map(ToString::to_string).collect(),
    };
    vec![
        decade("1950s", "1950s", 1955, &["poodle skirts", "diner booths", "black and white television"]),
        decade("1960s", "1960s", 1965, &["bouffant hairstyles", "mod fashion", "flower power"]),
        decade("1970s", "1970s", 1975, &["disco balls", "bell bottoms", "muscle cars"]),
        decade("1980s", "1980s", 1985, &["neon colors", "big hair", "boomboxes"]),
        decade("1990s", "1990s", 1995, &["grunge fashion", "flip phones", "dial-up modems"]),
        decade("2000s", "2000s", 2005, &["flip phones", "low-rise jeans", "early digital cameras"]),
        decade("2010s", "2010s", 2015, &["smartphones", "selfie sticks", "instagram filters"]),
    ]
}
