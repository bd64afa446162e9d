//! Reconciler (C5): per-photo sync between the Host's markers and the
//! catalogue's cached face identities.

use sea_orm::ConnectionTrait;

use crate::ann::AnnIndex;
use crate::common::errors::{CoreError, CoreResult};
use crate::geometry::{match_face_to_markers, name_matches, original_to_display, pixels, BBox, MarkerRef};
use crate::host::HostClient;
use crate::models::embeddings::EmbeddingRepo;
use crate::models::faces::FaceRepo;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub updated_count: usize,
    pub deleted: bool,
}

/// Runs the full reconciliation state machine for a single photo.
pub async fn reconcile_photo<C: ConnectionTrait>(
    db: &C,
    host: &HostClient,
    embedding_index: &AnnIndex<String>,
    face_index: &AnnIndex<(String, i32)>,
    iou_threshold: f32,
    photo_uid: &str,
) -> CoreResult<ReconcileOutcome> {
    let details = match host.get_photo_details(photo_uid).await {
        Ok(d) => d,
        Err(CoreError::NotFound(_)) => {
            return wipe_photo(db, embedding_index, face_index, photo_uid).await;
        }
        Err(e) => return Err(e),
    };
    if details.deleted_at.is_some() {
        return wipe_photo(db, embedding_index, face_index, photo_uid).await;
    }

    let Some(file) = details.files.first() else {
        return Ok(ReconcileOutcome { updated_count: 0, deleted: false });
    };

    let face_repo = FaceRepo::new(db, face_index);
    face_repo
        .update_face_photo_info(photo_uid, file.width, file.height, file.orientation, &file.uid)
        .await?;

    let faces = face_repo.get_faces(photo_uid).await?;
    let markers = host.get_photo_markers(photo_uid).await?;
    let face_markers: Vec<MarkerRef> = markers
        .into_iter()
        .filter(|m| m.marker_type == "face")
        .map(|m| {
            let relative = BBox::from_relative(
                m.x,
                m.y,
                m.w,
                m.h,
                pixels(file.width),
                pixels(file.height),
            );
            MarkerRef {
                uid: m.uid,
                subject_uid: m.subj_uid,
                name: m.name,
                bbox: relative,
            }
        })
        .collect();

    let mut updated_count = 0usize;
    for face in &faces {
        let face_bbox = original_to_display(
            &BBox::new(face.bbox_x1, face.bbox_y1, face.bbox_x2, face.bbox_y2),
            face.orientation,
            pixels(face.width),
            pixels(face.height),
        );

        let identity = if face_markers.is_empty() {
            None
        } else {
            match_face_to_markers(&face_bbox, &face_markers, iou_threshold)
        };
        let new_marker_uid = identity.as_ref().and_then(|i| i.marker_uid.clone());

        if new_marker_uid != face.marker_uid {
            let (marker_uid, subject_uid, subject_name) = match identity {
                Some(i) => (i.marker_uid, i.subject_uid, i.subject_name),
                None => (None, None, None),
            };
            // Best-effort per row: one face's update failing doesn't stop
            // the rest of the photo's faces from being reconciled.
            match face_repo
                .update_face_marker(photo_uid, face.face_index, marker_uid, subject_uid, subject_name)
                .await
            {
                Ok(()) => updated_count += 1,
                Err(err) => {
                    tracing::warn!(photo_uid, face_index = face.face_index, %err, "face marker update failed, continuing with remaining faces");
                }
            }
        }
    }

    Ok(ReconcileOutcome { updated_count, deleted: false })
}

async fn wipe_photo<C: ConnectionTrait>(
    db: &C,
    embedding_index: &AnnIndex<String>,
    face_index: &AnnIndex<(String, i32)>,
    photo_uid: &str,
) -> CoreResult<ReconcileOutcome> {
    let embedding_repo = EmbeddingRepo::new(db, embedding_index);
    let face_repo = FaceRepo::new(db, face_index);
    embedding_repo.delete(photo_uid).await?;
    face_repo.delete_photo(photo_uid).await?;
    Ok(ReconcileOutcome { updated_count: 0, deleted: true })
}

/// Matches a query person name against a marker, used during source
/// gathering in the person-search pipeline.
#[must_use]
pub fn marker_matches_query(marker_name: Option<&str>, query: &str) -> bool {
    marker_name.is_some_and(|name| name_matches(query, name))
}
