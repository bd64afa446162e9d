//! `Embed-all`: computes an image embedding for every Host photo missing
//! one. A `BackgroundWorker` that pages through source items and
//! dispatches processing per item.

use loco_rs::prelude::*;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::batch::run_pool;
use crate::common::errors::CoreError;
use crate::common::settings::Settings;
use crate::models::embeddings::EmbeddingRepo;
use crate::state::services;

pub struct EmbedAllWorker {
    pub ctx: AppContext,
}

#[derive(Deserialize, Debug, Serialize)]
pub struct WorkerArgs {}

#[async_trait]
impl BackgroundWorker<WorkerArgs> for EmbedAllWorker {
    fn build(ctx: &AppContext) -> Self {
        Self { ctx: ctx.clone() }
    }

    async fn perform(&self, _args: WorkerArgs) -> Result<()> {
        info!("=================EmbedAll=======================");
        let settings = Settings::from_context(&self.ctx);
        let svc = services();

        let mut photo_uids = Vec::new();
        let mut offset = 0u32;
        const PAGE_SIZE: u32 = 200;
        loop {
            let photos = svc.host.get_photos(PAGE_SIZE, offset, None).await?;
            let page_len = photos.len();
            for photo in photos {
                if photo.deleted_at.is_none() {
                    photo_uids.push(photo.uid);
                }
            }
            if (page_len as u32) < PAGE_SIZE {
                break;
            }
            offset += PAGE_SIZE;
        }

        info!("Found {} candidate photos for embedding", photo_uids.len());

        let db = self.ctx.db.clone();
        let outcome = run_pool(photo_uids, settings.batch_concurrency, CancellationToken::new(), move |photo_uid| {
            let db = db.clone();
            async move {
                let repo = EmbeddingRepo::new(&db, &svc.ann.images);
                if repo.has(&photo_uid).await? {
                    return Ok(());
                }
                let (bytes, mime) = svc.host.get_photo_download(&photo_uid).await?;
                let response = svc.embedder.compute_image_embedding(bytes, &mime).await?;
                repo.save(&photo_uid, response.embedding, &response.model, &response.pretrained, response.dim)
                    .await?;
                Ok::<(), CoreError>(())
            }
        })
        .await;

        info!(successes = outcome.successes, errors = outcome.errors, "embed-all finished");

        if let Err(err) = svc.ann.save_all() {
            tracing::warn!(%err, "failed to persist ANN snapshots after embed-all");
        }
        Ok(())
    }
}
