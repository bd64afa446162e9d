//! Host Client (C9): typed wrapper over the external photo-management
//! Host's HTTP surface. Opaque above this module.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::common::errors::{CoreError, CoreResult};

/// A photo descriptor as returned by `GetPhotos`/`GetPhotoDetails`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoDescriptor {
    #[serde(rename = "UID")]
    pub uid: String,
    #[serde(rename = "Files")]
    pub files: Vec<PhotoFile>,
    #[serde(rename = "DeletedAt")]
    pub deleted_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoFile {
    #[serde(rename = "UID")]
    pub uid: String,
    #[serde(rename = "Width")]
    pub width: i32,
    #[serde(rename = "Height")]
    pub height: i32,
    #[serde(rename = "Orientation")]
    pub orientation: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Marker {
    #[serde(rename = "UID")]
    pub uid: String,
    #[serde(rename = "Type")]
    pub marker_type: String,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "SubjUID")]
    pub subj_uid: Option<String>,
    #[serde(rename = "X")]
    pub x: f32,
    #[serde(rename = "Y")]
    pub y: f32,
    #[serde(rename = "W")]
    pub w: f32,
    #[serde(rename = "H")]
    pub h: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMarker {
    #[serde(rename = "FileUID")]
    pub file_uid: String,
    #[serde(rename = "Type")]
    pub marker_type: String,
    #[serde(rename = "X")]
    pub x: f32,
    #[serde(rename = "Y")]
    pub y: f32,
    #[serde(rename = "W")]
    pub w: f32,
    #[serde(rename = "H")]
    pub h: f32,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Src")]
    pub src: String,
    #[serde(rename = "SubjSrc")]
    pub subj_src: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkerPatch {
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "SubjSrc")]
    pub subj_src: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    #[serde(rename = "UID")]
    pub uid: String,
    #[serde(rename = "Title")]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    #[serde(rename = "Name")]
    pub name: String,
}

/// Typed client over the Host's HTTP surface. One
/// instance per process, threaded through as a plain value.
pub struct HostClient {
    http: Client,
    base_url: String,
    token: String,
}

impl HostClient {
    /// # Panics
    /// If the underlying `reqwest::Client` can't be constructed.
    #[must_use]
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            http: Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
    }

    async fn send_json<T: for<'de> Deserialize<'de>>(
        builder: reqwest::RequestBuilder,
    ) -> CoreResult<T> {
        let response = builder.send().await?;
        match response.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(response.json::<T>().await?),
            StatusCode::NOT_FOUND => Err(CoreError::NotFound(response.url().to_string())),
            StatusCode::UNAUTHORIZED => Err(CoreError::AuthExpired),
            status if status.is_server_error() => {
                Err(CoreError::TransientRemote(format!("host returned {status}")))
            }
            status => Err(CoreError::Invalid(format!("unexpected host status {status}"))),
        }
    }

    async fn send_empty(builder: reqwest::RequestBuilder) -> CoreResult<()> {
        let response = builder.send().await?;
        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            StatusCode::NOT_FOUND => Err(CoreError::NotFound(response.url().to_string())),
            StatusCode::UNAUTHORIZED => Err(CoreError::AuthExpired),
            status if status.is_server_error() => {
                Err(CoreError::TransientRemote(format!("host returned {status}")))
            }
            status => Err(CoreError::Invalid(format!("unexpected host status {status}"))),
        }
    }

    pub async fn get_photos(
        &self,
        page_size: u32,
        offset: u32,
        query: Option<&str>,
    ) -> CoreResult<Vec<PhotoDescriptor>> {
        let mut req = self
            .request(reqwest::Method::GET, "/api/v1/photos")
            .query(&[("count", page_size), ("offset", offset)]);
        if let Some(q) = query {
            req = req.query(&[("q", q)]);
        }
        Self::send_json(req).await
    }

    pub async fn get_photo_details(&self, photo_uid: &str) -> CoreResult<PhotoDescriptor> {
        Self::send_json(self.request(reqwest::Method::GET, &format!("/api/v1/photos/{photo_uid}")))
            .await
    }

    pub async fn get_photo_download(&self, photo_uid: &str) -> CoreResult<(Vec<u8>, String)> {
        let response = self
            .request(reqwest::Method::GET, &format!("/api/v1/photos/{photo_uid}/dl"))
            .send()
            .await?;
        match response.status() {
            StatusCode::OK => {
                let mime = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("application/octet-stream")
                    .to_string();
                Ok((response.bytes().await?.to_vec(), mime))
            }
            StatusCode::NOT_FOUND => Err(CoreError::NotFound(photo_uid.to_string())),
            status => Err(CoreError::TransientRemote(format!("download failed: {status}"))),
        }
    }

    pub async fn get_photo_markers(&self, photo_uid: &str) -> CoreResult<Vec<Marker>> {
        Self::send_json(self.request(
            reqwest::Method::GET,
            &format!("/api/v1/photos/{photo_uid}/markers"),
        ))
        .await
    }

    pub async fn create_marker(&self, marker: &NewMarker) -> CoreResult<Marker> {
        let req = self
            .request(reqwest::Method::POST, "/api/v1/markers")
            .json(marker);
        Self::send_json(req).await
    }

    pub async fn update_marker(&self, uid: &str, patch: &MarkerPatch) -> CoreResult<Marker> {
        let req = self
            .request(reqwest::Method::PUT, &format!("/api/v1/markers/{uid}"))
            .json(patch);
        Self::send_json(req).await
    }

    pub async fn delete_marker(&self, uid: &str) -> CoreResult<()> {
        Self::send_empty(self.request(reqwest::Method::DELETE, &format!("/api/v1/markers/{uid}")))
            .await
    }

    pub async fn get_albums(&self) -> CoreResult<Vec<Album>> {
        Self::send_json(self.request(reqwest::Method::GET, "/api/v1/albums")).await
    }

    pub async fn create_album(&self, title: &str) -> CoreResult<Album> {
        let req = self
            .request(reqwest::Method::POST, "/api/v1/albums")
            .json(&serde_json::json!({ "Title": title }));
        Self::send_json(req).await
    }

    pub async fn add_photos_to_album(&self, album_uid: &str, photo_uids: &[String]) -> CoreResult<()> {
        let req = self
            .request(
                reqwest::Method::POST,
                &format!("/api/v1/albums/{album_uid}/photos"),
            )
            .json(&serde_json::json!({ "photos": photo_uids }));
        Self::send_empty(req).await
    }

    pub async fn remove_photos_from_album(
        &self,
        album_uid: &str,
        photo_uids: &[String],
    ) -> CoreResult<()> {
        let req = self
            .request(
                reqwest::Method::DELETE,
                &format!("/api/v1/albums/{album_uid}/photos"),
            )
            .json(&serde_json::json!({ "photos": photo_uids }));
        Self::send_empty(req).await
    }

    pub async fn get_labels(&self, photo_uid: &str) -> CoreResult<Vec<Label>> {
        Self::send_json(self.request(
            reqwest::Method::GET,
            &format!("/api/v1/photos/{photo_uid}/labels"),
        ))
        .await
    }

    pub async fn add_photo_label(&self, photo_uid: &str, name: &str) -> CoreResult<()> {
        let req = self
            .request(
                reqwest::Method::POST,
                &format!("/api/v1/photos/{photo_uid}/labels"),
            )
            .json(&serde_json::json!({ "Name": name }));
        Self::send_empty(req).await
    }

    pub async fn delete_labels(&self, photo_uid: &str) -> CoreResult<()> {
        Self::send_empty(self.request(
            reqwest::Method::DELETE,
            &format!("/api/v1/photos/{photo_uid}/labels"),
        ))
        .await
    }
}
