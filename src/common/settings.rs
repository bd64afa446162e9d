use loco_rs::app::AppContext;
use serde::{Deserialize, Serialize};

/// Global configuration knobs for the core subsystems. Loaded from loco's
/// `settings` config block, the same pattern the rest of this codebase
/// uses for anything that isn't a first-class loco config key.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Settings {
    /// Base URL of the external photo-management Host (C9).
    pub host_api_url: String,
    /// Bearer token used to authenticate against the Host.
    pub host_api_token: String,
    /// Base URL of the external image/text Embedder microservice.
    pub embedder_api_url: String,

    /// Configured image-embedding dimension `D`. Must match the migrated
    /// schema's vector column width; checked at startup.
    pub image_embedding_dim: u16,
    /// Configured face-embedding dimension `F`.
    pub face_embedding_dim: u16,

    /// Path to the on-disk ANN snapshot for image embeddings. Empty string
    /// means "build in memory only, never persist".
    #[serde(default)]
    pub ann_image_index_path: String,
    /// Path to the on-disk ANN snapshot for face embeddings.
    #[serde(default)]
    pub ann_face_index_path: String,

    /// Global IoU threshold used by both match directions, kept as a
    /// single knob rather than one per direction.
    #[serde(default = "default_iou_threshold")]
    pub iou_threshold: f32,

    /// Override for the person-search minimum-vote formula
    /// `max(5, ceil(exemplars/20))`; `None` uses the default formula.
    #[serde(default)]
    pub min_person_search_votes: Option<usize>,

    /// Directory person-search writes matched photos into when the
    /// caller sets `save_match_images`.
    #[serde(default = "default_match_images_dir")]
    pub match_images_dir: String,

    /// Bounded concurrency for batch jobs (C7).
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
}

fn default_iou_threshold() -> f32 {
    0.3
}

fn default_match_images_dir() -> String {
    "storage/person-search-matches".to_string()
}

fn default_batch_concurrency() -> usize {
    8
}

impl Settings {
    /// Get a settings object from app context.
    ///
    /// # Panics
    ///
    /// When the settings field can't be found in config, or when it can't
    /// be deserialized to the expected format.
    #[must_use]
    pub fn from_context(ctx: &AppContext) -> Self {
        let settings_value = ctx
            .config
            .settings
            .clone()
            .expect("No settings found in config.");
        serde_json::from_value(settings_value).expect("Error deserializing settings.")
    }

    /// Refuse to start if the configured dimensions disagree with the
    /// schema's baked-in widths.
    pub fn assert_dimensions(
        &self,
        schema_image_dim: u16,
        schema_face_dim: u16,
    ) -> Result<(), crate::common::errors::CoreError> {
        if self.image_embedding_dim != schema_image_dim {
            return Err(crate::common::errors::CoreError::Conflict(format!(
                "configured image embedding dim {} does not match schema dim {}",
                self.image_embedding_dim, schema_image_dim
            )));
        }
        if self.face_embedding_dim != schema_face_dim {
            return Err(crate::common::errors::CoreError::Conflict(format!(
                "configured face embedding dim {} does not match schema dim {}",
                self.face_embedding_dim, schema_face_dim
            )));
        }
        Ok(())
    }
}
