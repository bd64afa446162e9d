//! Era Estimator (C8): prompt generation, text-embedding averaging to
//! centroids, and cosine-similarity ranking against image embeddings.

use sea_orm::ConnectionTrait;

use crate::common::errors::{CoreError, CoreResult};
use crate::embedder::EmbedderClient;
use crate::models::embeddings::EmbeddingRepo;
use crate::models::eras::{EraRecord, EraRepo};
use crate::vector::{cosine_similarity, l2_normalize, mean};

/// A static era definition driving `compute-eras`.
#[derive(Debug, Clone)]
pub struct EraDefinition {
    pub slug: String,
    pub name: String,
    pub representative_date: chrono::NaiveDate,
    pub cues: Vec<String>,
}

const CUELESS_TEMPLATES: &[&str] = &[
    "a photo from the {era} era",
    "a photograph taken around {era}",
    "an image from the {era} period",
];

const CUE_TEMPLATES: &[&str] = &[
    "a photo from the {era} era showing {cue}",
    "a {era} photograph with {cue}",
    "an image from {era} featuring {cue}",
];

/// Generates the ~30 prompts for an era: a handful of cueless templates,
/// plus cue-templates crossed with every cue.
#[must_use]
pub fn generate_prompts(era: &EraDefinition) -> Vec<String> {
    let mut prompts = Vec::new();
    for template in CUELESS_TEMPLATES {
        prompts.push(template.replace("{era}", &era.name));
    }
    for cue in &era.cues {
        for template in CUE_TEMPLATES {
            prompts.push(template.replace("{era}", &era.name).replace("{cue}", cue));
        }
    }
    prompts
}

/// `compute-eras`: regenerates every centroid in `eras`, deleting any
/// stored era whose slug has fallen out of the list.
pub async fn compute_eras<C: ConnectionTrait>(
    db: &C,
    embedder: &EmbedderClient,
    eras: &[EraDefinition],
) -> CoreResult<Vec<String>> {
    let repo = EraRepo::new(db);
    let mut computed_slugs = Vec::with_capacity(eras.len());

    for era in eras {
        let prompts = generate_prompts(era);
        let mut embeddings = Vec::with_capacity(prompts.len());
        let mut model_name = String::new();
        let mut failed = false;
        for prompt in &prompts {
            // A single prompt failing aborts only this era; the others
            // still get to run.
            match embedder.compute_text_embedding(prompt).await {
                Ok(response) => {
                    model_name = response.model;
                    embeddings.push(response.embedding);
                }
                Err(err) => {
                    tracing::warn!(era = %era.slug, %err, "prompt embedding failed, skipping era");
                    failed = true;
                    break;
                }
            }
        }
        if failed || embeddings.is_empty() {
            continue;
        }
        let mut centroid = mean(&embeddings);
        l2_normalize(&mut centroid);

        repo.save_era(EraRecord {
            era_slug: era.slug.clone(),
            era_name: era.name.clone(),
            representative_date: era.representative_date,
            prompt_count: i32::try_from(prompts.len()).unwrap_or(i32::MAX),
            model: model_name,
            embedding: centroid,
        })
        .await?;
        computed_slugs.push(era.slug.clone());
    }

    repo.prune_stale(&computed_slugs).await?;
    Ok(computed_slugs)
}

#[derive(Debug, Clone)]
pub struct EraMatch {
    pub era_slug: String,
    pub era_name: String,
    pub similarity: f32,
}

#[derive(Debug, Clone)]
pub struct EraEstimate {
    pub ranked: Vec<EraMatch>,
    pub top_match: EraMatch,
}

/// `estimate-era(photo_uid)`: ranks every era centroid by cosine
/// similarity against the photo's image embedding.
pub async fn estimate_era<C: ConnectionTrait>(
    db: &C,
    index: &crate::ann::AnnIndex<String>,
    photo_uid: &str,
) -> CoreResult<EraEstimate> {
    let embedding_repo = EmbeddingRepo::new(db, index);
    let embedding = embedding_repo
        .get(photo_uid)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("no embedding for photo {photo_uid}")))?;

    let era_repo = EraRepo::new(db);
    let eras = era_repo.get_all_eras().await?;
    if eras.is_empty() {
        return Err(CoreError::IndexDegraded("no era centroids computed".into()));
    }

    let mut ranked: Vec<EraMatch> = eras
        .into_iter()
        .map(|era| EraMatch {
            similarity: cosine_similarity(&embedding.embedding, &era.embedding),
            era_slug: era.era_slug,
            era_name: era.era_name,
        })
        .collect();
    ranked.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
    let top_match = ranked.first().cloned().expect("checked non-empty above");

    Ok(EraEstimate { ranked, top_match })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_count_scales_with_cues() {
        let era = EraDefinition {
            slug: "disco".into(),
            name: "disco era".into(),
            representative_date: chrono::NaiveDate::from_ymd_opt(1978, 1, 1).unwrap(),
            cues: vec!["platform shoes".into(), "flared trousers".into()],
        };
        let prompts = generate_prompts(&era);
        assert_eq!(prompts.len(), CUELESS_TEMPLATES.len() + era.cues.len() * CUE_TEMPLATES.len());
    }
}
