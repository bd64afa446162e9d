use crate::helpers;
use loco_rs::testing::prelude::*;
use photo_augment_backend::app::App;
use photo_augment_backend::models::eras::{EraRecord, EraRepo};
use serial_test::serial;

fn record(slug: &str) -> EraRecord {
    EraRecord {
        era_slug: slug.to_string(),
        era_name: slug.to_string(),
        representative_date: chrono::NaiveDate::from_ymd_opt(1985, 1, 1).unwrap(),
        prompt_count: 12,
        model: "clip".to_string(),
        embedding: vec![1.0, 0.0],
    }
}

#[tokio::test]
#[serial]
async fn save_era_upserts_by_slug() {
    let boot = boot_test::<App>().await.unwrap();
    let repo = EraRepo::new(&boot.app_context.db);

    repo.save_era(record("1980s")).await.unwrap();
    let first_pass = repo.get_all_eras().await.unwrap();
    assert_eq!(first_pass.len(), 1);
    let created_at = first_pass[0].created_at;

    let mut updated = record("1980s");
    updated.prompt_count = 20;
    repo.save_era(updated).await.unwrap();

    let second_pass = repo.get_all_eras().await.unwrap();
    assert_eq!(second_pass.len(), 1);
    assert_eq!(second_pass[0].prompt_count, 20);
    assert_eq!(second_pass[0].created_at, created_at);

    helpers::teardown(&boot.app_context.db).await;
}

#[tokio::test]
#[serial]
async fn prune_stale_removes_eras_absent_from_the_current_catalogue() {
    let boot = boot_test::<App>().await.unwrap();
    let repo = EraRepo::new(&boot.app_context.db);

    repo.save_era(record("1980s")).await.unwrap();
    repo.save_era(record("1990s")).await.unwrap();

    repo.prune_stale(&["1990s".to_string()]).await.unwrap();

    let remaining = repo.get_all_eras().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].era_slug, "1990s");

    helpers::teardown(&boot.app_context.db).await;
}
