//! HTTP client for a running gallery server.

use anyhow::Context;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use vizzy_common::storage::StorageUsage;

use crate::errors::SyncError;
use crate::gallery::models::{
    Image, ImageList, ImagePhase, OrderScope, Project, ProjectList, ReorderOutcome,
};

#[derive(Debug, Clone)]
pub struct GalleryClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct NewImage<'a> {
    filename: &'a str,
    size_bytes: i64,
    phase: Option<ImagePhase>,
}

impl GalleryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> Result<bool, SyncError> {
        let resp = self.http.get(self.url("/health")).send().await?;
        Ok(resp.status() == StatusCode::OK)
    }

    pub async fn list_projects(&self) -> Result<ProjectList, SyncError> {
        let resp = self.http.get(self.url("/api/projects")).send().await?;
        decode(resp).await
    }

    pub async fn create_project(&self, name: &str) -> Result<Project, SyncError> {
        let resp = self
            .http
            .post(self.url("/api/projects"))
            .json(&json!({ "name": name }))
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn rename_project(&self, id: i64, name: &str) -> Result<Project, SyncError> {
        let resp = self
            .http
            .patch(self.url(&format!("/api/projects/{}", id)))
            .json(&json!({ "name": name }))
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn list_images(
        &self,
        project_id: i64,
        phases: &[ImagePhase],
    ) -> Result<ImageList, SyncError> {
        let mut request = self
            .http
            .get(self.url(&format!("/api/projects/{}/images", project_id)));
        if !phases.is_empty() {
            let filter = phases
                .iter()
                .map(ImagePhase::as_str)
                .collect::<Vec<_>>()
                .join(",");
            request = request.query(&[("phase", filter)]);
        }
        decode(request.send().await?).await
    }

    pub async fn add_image(
        &self,
        project_id: i64,
        filename: &str,
        size_bytes: i64,
        phase: Option<ImagePhase>,
    ) -> Result<Image, SyncError> {
        let resp = self
            .http
            .post(self.url(&format!("/api/projects/{}/images", project_id)))
            .json(&NewImage {
                filename,
                size_bytes,
                phase,
            })
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn storage(&self) -> Result<StorageUsage, SyncError> {
        let resp = self.http.get(self.url("/api/storage")).send().await?;
        decode(resp).await
    }

    /// POST one complete ordering for `scope`.
    pub async fn reorder(
        &self,
        scope: OrderScope,
        ids: &[i64],
        version: i64,
    ) -> Result<ReorderOutcome, SyncError> {
        let (path, field) = match scope {
            OrderScope::Projects => ("/api/reorder-projects".to_string(), "projects"),
            OrderScope::Images { project_id } => (
                format!("/api/projects/{}/reorder-images", project_id),
                "images",
            ),
        };
        let items: Vec<_> = ids.iter().map(|id| json!({ "id": id })).collect();
        debug!(scope = %scope, count = ids.len(), version, "sending reorder");
        let resp = self
            .http
            .post(self.url(&path))
            .json(&json!({ field: items, "version": version }))
            .send()
            .await?;
        decode(resp).await
    }
}

/// Parse a success body, or turn an error status into `SyncError::Rejected`
/// carrying the server's `{"error": ...}` message.
async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, SyncError> {
    let status = resp.status();
    if status.is_success() {
        return resp
            .json::<T>()
            .await
            .context("Failed to decode server response")
            .map_err(SyncError::from);
    }
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or(text);
    Err(SyncError::Rejected {
        status: status.as_u16(),
        message,
    })
}
