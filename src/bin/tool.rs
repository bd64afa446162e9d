use loco_rs::bgworker::BackgroundWorker;
use loco_rs::cli::playground;
use photo_augment_backend::app::App;
use photo_augment_backend::workers::embed_all::{EmbedAllWorker, WorkerArgs as EmbedAllArgs};
use photo_augment_backend::workers::era_compute::{EraComputeWorker, WorkerArgs as EraComputeArgs};
use photo_augment_backend::workers::faces_all::{FacesAllWorker, WorkerArgs as FacesAllArgs};
use photo_augment_backend::workers::reconcile_all::{ReconcileAllWorker, WorkerArgs as ReconcileAllArgs};

/// Runs one of the batch jobs (C7) to completion in the foreground,
/// against a real database connection built from the loco config — no
/// queue involved. Useful for cron-style invocation or one-off backfills
/// outside the HTTP server.
#[tokio::main]
async fn main() -> loco_rs::Result<()> {
    let ctx = playground::<App>().await?;
    let command = std::env::args().nth(1).unwrap_or_default();

    match command.as_str() {
        "embed-all" => EmbedAllWorker::build(&ctx).perform(EmbedAllArgs {}).await?,
        "faces-all" => FacesAllWorker::build(&ctx).perform(FacesAllArgs {}).await?,
        "reconcile-all" => ReconcileAllWorker::build(&ctx).perform(ReconcileAllArgs {}).await?,
        "compute-eras" => EraComputeWorker::build(&ctx).perform(EraComputeArgs {}).await?,
        other => {
            eprintln!(
                "unknown command {other:?}; expected one of: embed-all, faces-all, reconcile-all, compute-eras"
            );
        }
    }

    Ok(())
}
