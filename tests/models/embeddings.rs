use crate::helpers;
use loco_rs::testing::prelude::*;
use photo_augment_backend::ann::AnnIndex;
use photo_augment_backend::app::App;
use photo_augment_backend::common::errors::CoreError;
use photo_augment_backend::models::embeddings::EmbeddingRepo;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn save_and_find_similar_ranks_by_ascending_cosine_distance() {
    let boot = boot_test::<App>().await.unwrap();
    let index = AnnIndex::new(3, 100);
    index.enable(Vec::new(), None).unwrap();
    let repo = EmbeddingRepo::new(&boot.app_context.db, &index);

    repo.save("photo-a", vec![1.0, 0.0, 0.0], "clip", "openai", 3).await.unwrap();
    repo.save("photo-b", vec![0.9, 0.1, 0.0], "clip", "openai", 3).await.unwrap();
    repo.save("photo-c", vec![0.0, 1.0, 0.0], "clip", "openai", 3).await.unwrap();

    let hits = repo.find_similar(&[1.0, 0.0, 0.0], 2, 1.0).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].0.photo_uid, "photo-a");
    assert_eq!(hits[1].0.photo_uid, "photo-b");

    assert!(repo.has("photo-a").await.unwrap());
    repo.delete("photo-a").await.unwrap();
    assert!(!repo.has("photo-a").await.unwrap());

    helpers::teardown(&boot.app_context.db).await;
}

#[tokio::test]
#[serial]
async fn save_rejects_embedding_with_wrong_dimension() {
    let boot = boot_test::<App>().await.unwrap();
    let index = AnnIndex::new(3, 100);
    index.enable(Vec::new(), None).unwrap();
    let repo = EmbeddingRepo::new(&boot.app_context.db, &index);

    let err = repo
        .save("photo-x", vec![1.0, 0.0], "clip", "openai", 3)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Invalid(_)));

    helpers::teardown(&boot.app_context.db).await;
}

#[tokio::test]
#[serial]
async fn unique_photo_uids_reflects_current_catalogue() {
    let boot = boot_test::<App>().await.unwrap();
    let index = AnnIndex::new(2, 100);
    index.enable(Vec::new(), None).unwrap();
    let repo = EmbeddingRepo::new(&boot.app_context.db, &index);

    repo.save("photo-1", vec![1.0, 0.0], "clip", "openai", 2).await.unwrap();
    repo.save("photo-2", vec![0.0, 1.0], "clip", "openai", 2).await.unwrap();

    let uids = repo.unique_photo_uids().await.unwrap();
    assert_eq!(uids, vec!["photo-1".to_string(), "photo-2".to_string()]);

    helpers::teardown(&boot.app_context.db).await;
}
