//! Person-Search Pipeline (C6): exemplar gathering, vote search, vote
//! aggregation, and classification against the Host's existing markers.

use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use sea_orm::ConnectionTrait;

use crate::ann::AnnIndex;
use crate::common::errors::{CoreError, CoreResult};
use crate::geometry::{
    is_face_too_small, match_face_to_markers, match_marker_to_faces, original_to_display,
    pixels, BBox, MarkerRef,
};
use crate::host::{HostClient, MarkerPatch, NewMarker};
use crate::models::faces::FaceRepo;
use crate::reconcile::marker_matches_query;
use crate::search::similar_faces;

#[derive(Debug, Clone)]
pub struct Options {
    pub query_name: String,
    pub min_similarity_percent: f32,
    pub limit: usize,
    pub dry_run: bool,
    pub apply: bool,
    pub save_match_images: bool,
    /// Overrides `min_votes`; `None` falls back to the default formula.
    pub min_person_search_votes: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CreateMarker,
    AssignPerson { marker_uid: String },
    AlreadyDone { marker_uid: String },
}

#[derive(Debug, Clone)]
pub struct ClassifiedCandidate {
    pub photo_uid: String,
    pub best_distance: f32,
    pub action: Action,
    pub applied: bool,
}

#[derive(Debug, Clone)]
struct CandidateAgg {
    best_distance: f32,
    best_face_index: i32,
    best_bbox: BBox,
    best_width: i32,
    best_height: i32,
    best_orientation: i32,
    match_count: usize,
}

/// Minimum vote threshold: at least 5 votes, or at least 5% of exemplars,
/// whichever is larger.
#[must_use]
pub fn min_votes(exemplar_count: usize) -> usize {
    let proportional = exemplar_count.div_ceil(20);
    proportional.max(5)
}

/// Step 1: gather exemplar face embeddings from photos already tagged
/// with this person on the Host.
async fn gather_exemplars<C: ConnectionTrait>(
    db: &C,
    host: &HostClient,
    face_index: &AnnIndex<(String, i32)>,
    query_name: &str,
    iou_threshold: f32,
) -> CoreResult<(Vec<Vec<f32>>, HashSet<String>, Option<String>)> {
    let face_repo = FaceRepo::new(db, face_index);
    let mut exemplars = Vec::new();
    let mut source_uids = HashSet::new();
    let mut canonical_name = None;

    let query = format!("person:{query_name}");
    let mut offset = 0u32;
    const PAGE_SIZE: u32 = 100;
    loop {
        let photos = host.get_photos(PAGE_SIZE, offset, Some(&query)).await?;
        let page_len = photos.len();
        for photo in photos {
            source_uids.insert(photo.uid.clone());
            let Some(file) = photo.files.first() else { continue };
            let faces = face_repo.get_faces(&photo.uid).await?;
            if faces.is_empty() {
                continue;
            }
            let markers = host.get_photo_markers(&photo.uid).await?;
            let Some(marker) = markers
                .into_iter()
                .find(|m| m.marker_type == "face" && marker_matches_query(m.name.as_deref(), query_name))
            else {
                continue;
            };
            if canonical_name.is_none() {
                canonical_name = marker.name.clone();
            }

            let marker_bbox =
                BBox::from_relative(marker.x, marker.y, marker.w, marker.h, pixels(file.width), pixels(file.height));
            let candidates: Vec<(usize, BBox)> = faces
                .iter()
                .enumerate()
                .map(|(i, f)| {
                    let display = original_to_display(
                        &BBox::new(f.bbox_x1, f.bbox_y1, f.bbox_x2, f.bbox_y2),
                        f.orientation,
                        pixels(f.width),
                        pixels(f.height),
                    );
                    (i, display)
                })
                .collect();
            if let Some(idx) = match_marker_to_faces(&marker_bbox, &candidates, iou_threshold) {
                exemplars.push(faces[idx].embedding.clone());
            }
        }
        if (page_len as u32) < PAGE_SIZE {
            break;
        }
        offset += PAGE_SIZE;
    }

    Ok((exemplars, source_uids, canonical_name))
}

/// Steps 2-3: bounded-parallel vote search, then aggregate votes per
/// candidate photo.
async fn vote_and_aggregate<C: ConnectionTrait>(
    db: &C,
    face_index: &AnnIndex<(String, i32)>,
    exemplars: &[Vec<f32>],
    source_uids: &HashSet<String>,
    min_similarity_percent: f32,
    limit: usize,
) -> CoreResult<HashMap<String, CandidateAgg>> {
    let k_prime = (limit.saturating_mul(10)).min(1000).max(1);
    let mut aggregated: HashMap<String, CandidateAgg> = HashMap::new();

    // Bounded to the number of exemplars: one query per exemplar, all
    // polled concurrently on this task rather than spawned, since `db`
    // isn't `'static`.
    let searches = exemplars
        .iter()
        .map(|exemplar| similar_faces(db, face_index, exemplar, k_prime, min_similarity_percent, source_uids));
    for hits in join_all(searches).await {
        for hit in hits? {
            let entry = aggregated.entry(hit.record.photo_uid.clone()).or_insert_with(|| CandidateAgg {
                best_distance: f32::MAX,
                best_face_index: hit.record.face_index,
                best_bbox: BBox::new(hit.record.bbox_x1, hit.record.bbox_y1, hit.record.bbox_x2, hit.record.bbox_y2),
                best_width: hit.record.width,
                best_height: hit.record.height,
                best_orientation: hit.record.orientation,
                match_count: 0,
            });
            entry.match_count += 1;
            if hit.distance < entry.best_distance {
                entry.best_distance = hit.distance;
                entry.best_face_index = hit.record.face_index;
                entry.best_bbox =
                    BBox::new(hit.record.bbox_x1, hit.record.bbox_y1, hit.record.bbox_x2, hit.record.bbox_y2);
                entry.best_width = hit.record.width;
                entry.best_height = hit.record.height;
                entry.best_orientation = hit.record.orientation;
            }
        }
    }

    Ok(aggregated)
}

/// Step 5: re-fetches photo state and classifies the action to take.
async fn classify(
    host: &HostClient,
    photo_uid: &str,
    agg: &CandidateAgg,
    iou_threshold: f32,
) -> CoreResult<Option<(Action, BBox, String, f32, f32)>> {
    let details = host.get_photo_details(photo_uid).await?;
    let Some(file) = details.files.first() else { return Ok(None) };

    let display_bbox = original_to_display(&agg.best_bbox, agg.best_orientation, pixels(agg.best_width), pixels(agg.best_height));
    if is_face_too_small(display_bbox.width(), pixels(file.width)) {
        return Ok(None);
    }

    let markers = host.get_photo_markers(photo_uid).await?;
    let face_markers: Vec<MarkerRef> = markers
        .into_iter()
        .filter(|m| m.marker_type == "face")
        .map(|m| MarkerRef {
            uid: m.uid,
            subject_uid: m.subj_uid,
            name: m.name,
            bbox: BBox::from_relative(m.x, m.y, m.w, m.h, pixels(file.width), pixels(file.height)),
        })
        .collect();

    let matched = match_face_to_markers(&display_bbox, &face_markers, iou_threshold);
    let action = match matched {
        None => Action::CreateMarker,
        Some(identity) => {
            let marker_uid = identity.marker_uid.unwrap_or_default();
            if identity.subject_name.is_some() && identity.subject_uid.is_some() {
                Action::AlreadyDone { marker_uid }
            } else {
                Action::AssignPerson { marker_uid }
            }
        }
    };
    Ok(Some((action, display_bbox, file.uid.clone(), pixels(file.width), pixels(file.height))))
}

/// Writes a classified candidate's full photo to `dir` for manual review.
/// Best-effort: the caller logs and continues on failure.
async fn save_match_image(host: &HostClient, photo_uid: &str, dir: &str) -> CoreResult<()> {
    let (bytes, mime) = host.get_photo_download(photo_uid).await?;
    let ext = mime.split('/').nth(1).unwrap_or("jpg");
    let dir_path = std::path::Path::new(dir);
    std::fs::create_dir_all(dir_path)
        .map_err(|e| CoreError::Invalid(format!("creating match image dir failed: {e}")))?;
    std::fs::write(dir_path.join(format!("{photo_uid}.{ext}")), bytes)
        .map_err(|e| CoreError::Invalid(format!("writing match image failed: {e}")))?;
    Ok(())
}

/// Runs the full pipeline end-to-end.
pub async fn run<C: ConnectionTrait>(
    db: &C,
    host: &HostClient,
    face_index: &AnnIndex<(String, i32)>,
    iou_threshold: f32,
    match_images_dir: &str,
    opts: Options,
) -> CoreResult<Vec<ClassifiedCandidate>> {
    if opts.query_name.trim().is_empty() {
        return Err(CoreError::Invalid("person name must not be empty".into()));
    }

    let (exemplars, source_uids, canonical_name) =
        gather_exemplars(db, host, face_index, &opts.query_name, iou_threshold).await?;
    if exemplars.is_empty() {
        return Ok(Vec::new());
    }

    let aggregated = vote_and_aggregate(
        db,
        face_index,
        &exemplars,
        &source_uids,
        opts.min_similarity_percent,
        opts.limit,
    )
    .await?;

    let threshold = opts.min_person_search_votes.unwrap_or_else(|| min_votes(exemplars.len()));
    let mut survivors: Vec<(String, CandidateAgg)> = aggregated
        .into_iter()
        .filter(|(_, agg)| agg.match_count >= threshold)
        .collect();
    survivors.sort_by(|a, b| {
        a.1.best_distance
            .partial_cmp(&b.1.best_distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    survivors.truncate(opts.limit);

    let mut results = Vec::with_capacity(survivors.len());
    for (photo_uid, agg) in survivors {
        let Some((action, display_bbox, file_uid, width, height)) =
            classify(host, &photo_uid, &agg, iou_threshold).await?
        else {
            continue;
        };

        let mut applied = false;
        if opts.apply && !opts.dry_run {
            let (x, y, w, h) = display_bbox.to_relative(width, height);
            match &action {
                Action::CreateMarker => {
                    let new_marker = NewMarker {
                        file_uid: file_uid.clone(),
                        marker_type: "face".to_string(),
                        x,
                        y,
                        w,
                        h,
                        name: canonical_name.clone(),
                        src: "image".to_string(),
                        subj_src: "person-search".to_string(),
                    };
                    host.create_marker(&new_marker).await?;
                    applied = true;
                }
                Action::AssignPerson { marker_uid } => {
                    host.update_marker(
                        marker_uid,
                        &MarkerPatch {
                            name: canonical_name.clone(),
                            subj_src: Some("person-search".to_string()),
                        },
                    )
                    .await?;
                    applied = true;
                }
                Action::AlreadyDone { .. } => {}
            }
        }

        if opts.save_match_images {
            if let Err(err) = save_match_image(host, &photo_uid, match_images_dir).await {
                tracing::warn!(photo_uid = %photo_uid, %err, "failed to save match image");
            }
        }

        results.push(ClassifiedCandidate {
            photo_uid,
            best_distance: agg.best_distance,
            action,
            applied,
        });
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_votes_floor_is_five() {
        assert_eq!(min_votes(1), 5);
        assert_eq!(min_votes(10), 5);
    }

    #[test]
    fn min_votes_scales_with_exemplars_s5() {
        assert_eq!(min_votes(100), 5);
        assert_eq!(min_votes(200), 10);
    }
}
