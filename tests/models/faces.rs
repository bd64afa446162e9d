use crate::helpers;
use loco_rs::testing::prelude::*;
use photo_augment_backend::ann::AnnIndex;
use photo_augment_backend::app::App;
use photo_augment_backend::models::faces::{FaceInput, FaceRepo};
use serial_test::serial;

fn sample_face(embedding: Vec<f32>) -> FaceInput {
    FaceInput {
        embedding,
        model: "arcface".to_string(),
        dim: 2,
        bbox_x1: 10.0,
        bbox_y1: 10.0,
        bbox_x2: 50.0,
        bbox_y2: 60.0,
        det_score: 0.95,
        width: 800,
        height: 600,
        orientation: 1,
        file_uid: "file-1".to_string(),
    }
}

#[tokio::test]
#[serial]
async fn save_faces_replaces_prior_rows_for_a_photo() {
    let boot = boot_test::<App>().await.unwrap();
    let index: AnnIndex<(String, i32)> = AnnIndex::new(2, 100);
    index.enable(Vec::new(), None).unwrap();
    let repo = FaceRepo::new(&boot.app_context.db, &index);

    repo.save_faces("photo-a", vec![sample_face(vec![1.0, 0.0]), sample_face(vec![0.0, 1.0])])
        .await
        .unwrap();
    assert!(repo.has_faces("photo-a").await.unwrap());
    assert_eq!(repo.get_faces("photo-a").await.unwrap().len(), 2);

    repo.save_faces("photo-a", vec![sample_face(vec![0.5, 0.5])]).await.unwrap();
    let faces = repo.get_faces("photo-a").await.unwrap();
    assert_eq!(faces.len(), 1);
    assert_eq!(faces[0].face_index, 0);

    helpers::teardown(&boot.app_context.db).await;
}

#[tokio::test]
#[serial]
async fn delete_photo_wipes_cache_entirely_unlike_empty_save() {
    let boot = boot_test::<App>().await.unwrap();
    let index: AnnIndex<(String, i32)> = AnnIndex::new(2, 100);
    index.enable(Vec::new(), None).unwrap();
    let repo = FaceRepo::new(&boot.app_context.db, &index);

    repo.save_faces("photo-b", vec![sample_face(vec![1.0, 0.0])]).await.unwrap();
    assert!(repo.has_faces("photo-b").await.unwrap());

    repo.delete_photo("photo-b").await.unwrap();
    assert!(!repo.has_faces("photo-b").await.unwrap());

    helpers::teardown(&boot.app_context.db).await;
}

#[tokio::test]
#[serial]
async fn update_face_marker_persists_resolved_identity() {
    let boot = boot_test::<App>().await.unwrap();
    let index: AnnIndex<(String, i32)> = AnnIndex::new(2, 100);
    index.enable(Vec::new(), None).unwrap();
    let repo = FaceRepo::new(&boot.app_context.db, &index);

    repo.save_faces("photo-c", vec![sample_face(vec![1.0, 0.0])]).await.unwrap();
    repo.update_face_marker(
        "photo-c",
        0,
        Some("marker-1".to_string()),
        Some("subject-1".to_string()),
        Some("Ada".to_string()),
    )
    .await
    .unwrap();

    let faces = repo.get_faces("photo-c").await.unwrap();
    assert_eq!(faces[0].marker_uid.as_deref(), Some("marker-1"));
    assert_eq!(faces[0].subject_name.as_deref(), Some("Ada"));

    helpers::teardown(&boot.app_context.db).await;
}
