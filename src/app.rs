use std::path::{Path, PathBuf};

use loco_rs::{
    app::{AppContext, Hooks, Initializer},
    bgworker::{BackgroundWorker, Queue},
    boot::{create_app, BootResult, StartMode},
    config::Config,
    controller::AppRoutes,
    db::truncate_table,
    environment::Environment,
    task::Tasks,
    Result,
};
use migration::{Migrator, FACE_EMBEDDING_DIM, IMAGE_EMBEDDING_DIM};

use crate::ann::AnnRegistry;
use crate::common::settings::Settings;
use crate::controllers;
use crate::embedder::EmbedderClient;
use crate::host::HostClient;
use crate::models::_entities::{embeddings, era_embeddings, faces};
use crate::models::{embeddings as embeddings_repo, faces as faces_repo};
use crate::state::{self, Services};
use crate::workers::embed_all::EmbedAllWorker;
use crate::workers::era_compute::EraComputeWorker;
use crate::workers::faces_all::FacesAllWorker;
use crate::workers::reconcile_all::ReconcileAllWorker;

pub struct App;

/// Upper bound on live vectors per ANN graph. The `hnsw_rs` graph
/// pre-allocates around this, so it's sized generously rather than tied
/// to the current catalogue count.
const ANN_MAX_ELEMENTS: usize = 1_000_000;

#[async_trait::async_trait]
impl Hooks for App {
    fn app_name() -> &'static str {
        env!("CARGO_CRATE_NAME")
    }

    fn app_version() -> String {
        format!(
            "{}-{}",
            env!("CARGO_PKG_VERSION"),
            option_env!("BUILD_SHA").unwrap_or("dev")
        )
    }

    async fn boot(mode: StartMode, environment: &Environment, config: Config) -> Result<BootResult> {
        let boot_result = create_app::<Self, Migrator>(mode, environment, config).await?;

        let settings = Settings::from_context(&boot_result.app_context);
        settings
            .assert_dimensions(IMAGE_EMBEDDING_DIM, FACE_EMBEDDING_DIM)
            .map_err(|e| loco_rs::Error::Message(e.to_string()))?;

        let ann = AnnRegistry::new(
            usize::from(settings.image_embedding_dim),
            usize::from(settings.face_embedding_dim),
            ANN_MAX_ELEMENTS,
            none_if_empty(&settings.ann_image_index_path),
            none_if_empty(&settings.ann_face_index_path),
        );
        let image_vectors = embeddings_repo::all_vectors(&boot_result.app_context.db)
            .await
            .map_err(|e| loco_rs::Error::Message(e.to_string()))?;
        let face_vectors = faces_repo::all_vectors(&boot_result.app_context.db)
            .await
            .map_err(|e| loco_rs::Error::Message(e.to_string()))?;
        ann.images
            .enable(image_vectors, ann.image_snapshot_path.as_deref())
            .map_err(|e| loco_rs::Error::Message(e.to_string()))?;
        ann.faces
            .enable(face_vectors, ann.face_snapshot_path.as_deref())
            .map_err(|e| loco_rs::Error::Message(e.to_string()))?;

        let host = HostClient::new(&settings.host_api_url, &settings.host_api_token);
        let embedder = EmbedderClient::new(&settings.embedder_api_url);
        state::install(Services { ann, host, embedder });

        Ok(boot_result)
    }

    async fn initializers(_ctx: &AppContext) -> Result<Vec<Box<dyn Initializer>>> {
        Ok(vec![])
    }

    fn routes(_ctx: &AppContext) -> AppRoutes {
        AppRoutes::with_default_routes()
            .add_route(controllers::search::routes())
            .add_route(controllers::person_search::routes())
            .add_route(controllers::era::routes())
    }

    async fn connect_workers(ctx: &AppContext, queue: &Queue) -> Result<()> {
        queue.register(EmbedAllWorker::build(ctx)).await?;
        queue.register(FacesAllWorker::build(ctx)).await?;
        queue.register(ReconcileAllWorker::build(ctx)).await?;
        queue.register(EraComputeWorker::build(ctx)).await?;
        Ok(())
    }

    fn register_tasks(_tasks: &mut Tasks) {}

    async fn truncate(ctx: &AppContext) -> Result<()> {
        truncate_table(&ctx.db, era_embeddings::Entity).await?;
        truncate_table(&ctx.db, faces::Entity).await?;
        truncate_table(&ctx.db, embeddings::Entity).await?;
        Ok(())
    }

    async fn seed(_ctx: &AppContext, _base: &Path) -> Result<()> {
        Ok(())
    }
}

fn none_if_empty(s: &str) -> Option<PathBuf> {
    if s.is_empty() {
        None
    } else {
        Some(PathBuf::from(s))
    }
}
