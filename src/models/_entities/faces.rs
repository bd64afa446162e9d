//! `SeaORM` Entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "faces")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub photo_uid: String,
    pub face_index: i32,
    #[sea_orm(column_type = "custom(\"vector\")", select_as = "float4[]")]
    pub embedding: Vec<f32>,
    pub model: String,
    pub dim: i32,
    #[sea_orm(column_type = "Float")]
    pub bbox_x1: f32,
    #[sea_orm(column_type = "Float")]
    pub bbox_y1: f32,
    #[sea_orm(column_type = "Float")]
    pub bbox_x2: f32,
    #[sea_orm(column_type = "Float")]
    pub bbox_y2: f32,
    #[sea_orm(column_type = "Float")]
    pub det_score: f32,
    pub width: i32,
    pub height: i32,
    pub orientation: i32,
    pub file_uid: String,
    pub marker_uid: Option<String>,
    pub subject_uid: Option<String>,
    pub subject_name: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
