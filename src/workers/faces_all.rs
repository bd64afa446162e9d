//! `Faces-all`: detects faces for every Host photo missing face rows,
//! storing the Embedder's bboxes and embeddings.

use loco_rs::prelude::*;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::batch::run_pool;
use crate::common::errors::CoreError;
use crate::common::settings::Settings;
use crate::models::faces::{FaceInput, FaceRepo};
use crate::state::services;

pub struct FacesAllWorker {
    pub ctx: AppContext,
}

#[derive(Deserialize, Debug, Serialize)]
pub struct WorkerArgs {}

#[async_trait]
impl BackgroundWorker<WorkerArgs> for FacesAllWorker {
    fn build(ctx: &AppContext) -> Self {
        Self { ctx: ctx.clone() }
    }

    async fn perform(&self, _args: WorkerArgs) -> Result<()> {
        info!("=================FacesAll=======================");
        let settings = Settings::from_context(&self.ctx);
        let svc = services();

        let mut candidates = Vec::new();
        let mut offset = 0u32;
        const PAGE_SIZE: u32 = 200;
        loop {
            let photos = svc.host.get_photos(PAGE_SIZE, offset, None).await?;
            let page_len = photos.len();
            for photo in photos {
                if photo.deleted_at.is_none() {
                    candidates.push(photo.uid);
                }
            }
            if (page_len as u32) < PAGE_SIZE {
                break;
            }
            offset += PAGE_SIZE;
        }

        info!("Found {} candidate photos for face detection", candidates.len());

        let db = self.ctx.db.clone();
        let outcome = run_pool(candidates, settings.batch_concurrency, CancellationToken::new(), move |photo_uid| {
            let db = db.clone();
            async move {
                let repo = FaceRepo::new(&db, &svc.ann.faces);
                if repo.has_faces(&photo_uid).await? {
                    return Ok(());
                }
                let details = svc.host.get_photo_details(&photo_uid).await?;
                let Some(file) = details.files.first() else { return Ok(()) };
                let (bytes, mime) = svc.host.get_photo_download(&photo_uid).await?;
                let response = svc.embedder.compute_face_embeddings(bytes, &mime).await?;

                let inputs = response
                    .faces
                    .into_iter()
                    .map(|f| FaceInput {
                        embedding: f.embedding,
                        model: response.model.clone(),
                        dim: f.dim,
                        bbox_x1: f.bbox[0],
                        bbox_y1: f.bbox[1],
                        bbox_x2: f.bbox[2],
                        bbox_y2: f.bbox[3],
                        det_score: f.det_score,
                        width: file.width,
                        height: file.height,
                        orientation: file.orientation,
                        file_uid: file.uid.clone(),
                    })
                    .collect();
                repo.save_faces(&photo_uid, inputs).await?;
                Ok::<(), CoreError>(())
            }
        })
        .await;

        info!(successes = outcome.successes, errors = outcome.errors, "faces-all finished");

        if let Err(err) = svc.ann.save_all() {
            tracing::warn!(%err, "failed to persist ANN snapshots after faces-all");
        }
        Ok(())
    }
}
