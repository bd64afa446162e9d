//! `FaceRepo`: per-photo face rows (embedding + bbox +
//! resolved identity), kept in lockstep with the C2 face ANN index.

pub use super::_entities::faces::{ActiveModel, Column, Entity, Model};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use sea_orm::{ConnectionTrait, QueryOrder};

use crate::ann::AnnIndex;
use crate::common::errors::CoreResult;
use crate::vector;

pub type Faces = Entity;

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert && self.updated_at.is_unchanged() {
            let mut this = self;
            this.updated_at = Set(chrono::Utc::now().into());
            Ok(this)
        } else {
            Ok(self)
        }
    }
}

/// A freshly detected face, not yet assigned a row ID — before
/// reconciliation has run against it.
#[derive(Debug, Clone)]
pub struct FaceInput {
    pub embedding: Vec<f32>,
    pub model: String,
    pub dim: i32,
    pub bbox_x1: f32,
    pub bbox_y1: f32,
    pub bbox_x2: f32,
    pub bbox_y2: f32,
    pub det_score: f32,
    pub width: i32,
    pub height: i32,
    pub orientation: i32,
    pub file_uid: String,
}

pub struct FaceRepo<'a, C: ConnectionTrait> {
    pub db: &'a C,
    pub index: &'a AnnIndex<(String, i32)>,
}

impl<'a, C: ConnectionTrait> FaceRepo<'a, C> {
    #[must_use]
    pub fn new(db: &'a C, index: &'a AnnIndex<(String, i32)>) -> Self {
        Self { db, index }
    }

    /// Replace-all for a photo: delete every prior row for `photo_uid`,
    /// then insert `faces` (possibly empty, to mark "processed, no
    /// faces" without deleting the photo's row entirely).
    pub async fn save_faces(&self, photo_uid: &str, faces: Vec<FaceInput>) -> CoreResult<Vec<Model>> {
        let previous = self.get_faces(photo_uid).await?;
        Entity::delete_many()
            .filter(Column::PhotoUid.eq(photo_uid))
            .exec(self.db)
            .await?;
        for face in &previous {
            self.index.delete(&(photo_uid.to_string(), face.face_index));
        }

        let now = chrono::Utc::now();
        let mut saved = Vec::with_capacity(faces.len());
        for (face_index, face) in faces.into_iter().enumerate() {
            let face_index = i32::try_from(face_index).unwrap_or(i32::MAX);
            let active = ActiveModel {
                id: sea_orm::ActiveValue::NotSet,
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
                photo_uid: Set(photo_uid.to_string()),
                face_index: Set(face_index),
                embedding: Set(face.embedding.clone()),
                model: Set(face.model),
                dim: Set(face.dim),
                bbox_x1: Set(face.bbox_x1),
                bbox_y1: Set(face.bbox_y1),
                bbox_x2: Set(face.bbox_x2),
                bbox_y2: Set(face.bbox_y2),
                det_score: Set(face.det_score),
                width: Set(face.width),
                height: Set(face.height),
                orientation: Set(face.orientation),
                file_uid: Set(face.file_uid),
                marker_uid: Set(None),
                subject_uid: Set(None),
                subject_name: Set(None),
            };
            let row = active.insert(self.db).await?;
            self.index
                .insert((photo_uid.to_string(), face_index), &face.embedding)?;
            saved.push(row);
        }
        Ok(saved)
    }

    /// Removes every face row for a photo that no longer exists on the
    /// Host — distinct from `save_faces(photo_uid, vec![])`, which marks
    /// a still-present photo as "processed, no faces". A deleted photo's
    /// cache is wiped outright, not left as that marker.
    pub async fn delete_photo(&self, photo_uid: &str) -> CoreResult<()> {
        let previous = self.get_faces(photo_uid).await?;
        Entity::delete_many()
            .filter(Column::PhotoUid.eq(photo_uid))
            .exec(self.db)
            .await?;
        for face in &previous {
            self.index.delete(&(photo_uid.to_string(), face.face_index));
        }
        Ok(())
    }

    pub async fn get_faces(&self, photo_uid: &str) -> CoreResult<Vec<Model>> {
        Ok(Entity::find()
            .filter(Column::PhotoUid.eq(photo_uid))
            .order_by_asc(Column::FaceIndex)
            .all(self.db)
            .await?)
    }

    pub async fn has_faces(&self, photo_uid: &str) -> CoreResult<bool> {
        Ok(Entity::find()
            .filter(Column::PhotoUid.eq(photo_uid))
            .count(self.db)
            .await?
            > 0)
    }

    pub async fn update_face_marker(
        &self,
        photo_uid: &str,
        face_index: i32,
        marker_uid: Option<String>,
        subject_uid: Option<String>,
        subject_name: Option<String>,
    ) -> CoreResult<()> {
        let row = Entity::find()
            .filter(Column::PhotoUid.eq(photo_uid))
            .filter(Column::FaceIndex.eq(face_index))
            .one(self.db)
            .await?;
        if let Some(row) = row {
            let mut active: ActiveModel = row.into();
            active.marker_uid = Set(marker_uid);
            active.subject_uid = Set(subject_uid);
            active.subject_name = Set(subject_name);
            active.update(self.db).await?;
        }
        Ok(())
    }

    pub async fn update_face_photo_info(
        &self,
        photo_uid: &str,
        width: i32,
        height: i32,
        orientation: i32,
        file_uid: &str,
    ) -> CoreResult<()> {
        let rows = self.get_faces(photo_uid).await?;
        for row in rows {
            let mut active: ActiveModel = row.into();
            active.width = Set(width);
            active.height = Set(height);
            active.orientation = Set(orientation);
            active.file_uid = Set(file_uid.to_string());
            active.update(self.db).await?;
        }
        Ok(())
    }

    /// Exports cached identities for Host write-back.
    pub async fn faces_with_marker_uid(&self) -> CoreResult<Vec<Model>> {
        Ok(Entity::find()
            .filter(Column::MarkerUid.is_not_null())
            .all(self.db)
            .await?)
    }

    pub async fn find_similar(
        &self,
        query: &[f32],
        k: usize,
        max_distance: f32,
    ) -> CoreResult<Vec<(Model, f32)>> {
        if self.index.is_enabled() {
            let hits = self.index.search(query, k, max_distance)?;
            let mut out = Vec::with_capacity(hits.len());
            for ((photo_uid, face_index), distance) in hits {
                let row = Entity::find()
                    .filter(Column::PhotoUid.eq(photo_uid))
                    .filter(Column::FaceIndex.eq(face_index))
                    .one(self.db)
                    .await?;
                if let Some(row) = row {
                    out.push((row, distance));
                }
            }
            return Ok(out);
        }

        let all = Entity::find().all(self.db).await?;
        let mut scored: Vec<(Model, f32)> = all
            .into_iter()
            .map(|m| {
                let d = vector::cosine_distance(query, &m.embedding);
                (m, d)
            })
            .filter(|(_, d)| *d <= max_distance)
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

pub async fn all_vectors<C: ConnectionTrait>(db: &C) -> CoreResult<Vec<((String, i32), Vec<f32>)>> {
    let rows = Entity::find().all(db).await?;
    Ok(rows
        .into_iter()
        .map(|m| ((m.photo_uid, m.face_index), m.embedding))
        .collect())
}
