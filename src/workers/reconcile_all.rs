//! `Reconcile-all`: runs the per-photo reconciler against every photo
//! with cached embeddings or faces.

use loco_rs::prelude::*;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::batch::run_pool;
use crate::common::errors::CoreError;
use crate::common::settings::Settings;
use crate::models::embeddings::EmbeddingRepo;
use crate::reconcile::reconcile_photo;
use crate::state::services;

pub struct ReconcileAllWorker {
    pub ctx: AppContext,
}

#[derive(Deserialize, Debug, Serialize)]
pub struct WorkerArgs {}

#[async_trait]
impl BackgroundWorker<WorkerArgs> for ReconcileAllWorker {
    fn build(ctx: &AppContext) -> Self {
        Self { ctx: ctx.clone() }
    }

    async fn perform(&self, _args: WorkerArgs) -> Result<()> {
        info!("=================ReconcileAll=======================");
        let settings = Settings::from_context(&self.ctx);
        let svc = services();

        let embedding_repo = EmbeddingRepo::new(&self.ctx.db, &svc.ann.images);
        let photo_uids = embedding_repo.unique_photo_uids().await?;

        info!("Reconciling {} photos", photo_uids.len());

        let db = self.ctx.db.clone();
        let iou_threshold = settings.iou_threshold;
        let outcome = run_pool(photo_uids, settings.batch_concurrency, CancellationToken::new(), move |photo_uid| {
            let db = db.clone();
            async move {
                reconcile_photo(&db, &svc.host, &svc.ann.images, &svc.ann.faces, iou_threshold, &photo_uid).await?;
                Ok::<(), CoreError>(())
            }
        })
        .await;

        info!(successes = outcome.successes, errors = outcome.errors, "reconcile-all finished");

        if let Err(err) = svc.ann.save_all() {
            tracing::warn!(%err, "failed to persist ANN snapshots after reconcile-all");
        }
        Ok(())
    }
}
