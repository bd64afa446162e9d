//! Embedder client: typed wrapper over the external image/text embedding
//! microservice.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::common::errors::{CoreError, CoreResult};

#[derive(Debug, Clone, Deserialize)]
pub struct ImageEmbeddingResponse {
    pub embedding: Vec<f32>,
    pub model: String,
    pub pretrained: String,
    pub dim: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextEmbeddingResponse {
    pub embedding: Vec<f32>,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectedFace {
    pub face_index: i32,
    pub embedding: Vec<f32>,
    pub bbox: [f32; 4],
    pub det_score: f32,
    pub dim: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaceEmbeddingsResponse {
    pub faces: Vec<DetectedFace>,
    pub model: String,
}

#[derive(Debug, Serialize)]
struct TextEmbeddingRequest<'a> {
    text: &'a str,
}

/// Typed client over the Embedder's HTTP surface. Mirrors `HostClient`'s
/// shape: shared `reqwest::Client`, `CoreError` status mapping.
pub struct EmbedderClient {
    http: Client,
    base_url: String,
}

impl EmbedderClient {
    /// # Panics
    /// If the underlying `reqwest::Client` can't be constructed.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .timeout(Duration::from_secs(60))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn send_json<T: for<'de> Deserialize<'de>>(
        builder: reqwest::RequestBuilder,
    ) -> CoreResult<T> {
        let response = builder.send().await?;
        match response.status() {
            StatusCode::OK => Ok(response.json::<T>().await?),
            StatusCode::UNAUTHORIZED => Err(CoreError::AuthExpired),
            status if status.is_server_error() => {
                Err(CoreError::TransientRemote(format!("embedder returned {status}")))
            }
            status => Err(CoreError::Invalid(format!("unexpected embedder status {status}"))),
        }
    }

    pub async fn compute_image_embedding(
        &self,
        image_bytes: Vec<u8>,
        mime: &str,
    ) -> CoreResult<ImageEmbeddingResponse> {
        let part = reqwest::multipart::Part::bytes(image_bytes)
            .file_name("image")
            .mime_str(mime)
            .map_err(|e| CoreError::Invalid(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("image", part);
        let req = self
            .http
            .post(format!("{}/embed/image", self.base_url))
            .multipart(form);
        Self::send_json(req).await
    }

    pub async fn compute_text_embedding(&self, text: &str) -> CoreResult<TextEmbeddingResponse> {
        let req = self
            .http
            .post(format!("{}/embed/text", self.base_url))
            .json(&TextEmbeddingRequest { text });
        Self::send_json(req).await
    }

    pub async fn compute_face_embeddings(
        &self,
        image_bytes: Vec<u8>,
        mime: &str,
    ) -> CoreResult<FaceEmbeddingsResponse> {
        let part = reqwest::multipart::Part::bytes(image_bytes)
            .file_name("image")
            .mime_str(mime)
            .map_err(|e| CoreError::Invalid(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("image", part);
        let req = self
            .http
            .post(format!("{}/embed/faces", self.base_url))
            .multipart(form);
        Self::send_json(req).await
    }
}
