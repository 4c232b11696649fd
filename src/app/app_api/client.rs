//! HTTP client for the deployed application

#![warn(clippy::all, rust_2018_idioms)]

use anyhow::{anyhow, bail, Context, Result};
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::time::Duration;
use url::Url;

use super::types::{ApiResponse, AppAction, ImageRecord, Subscription};

/// Multipart field the application reads uploads from
const UPLOAD_FIELD: &str = "upfile";

/// Per-request timeout; the application runs on a single small instance
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// REST client for the application's image and notification endpoints
#[derive(Clone)]
pub struct AppApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl AppApiClient {
    /// Client for an explicit base URL such as `http://127.0.0.1:8080`
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid base URL {}", base_url))?;
        if base_url.cannot_be_a_base() {
            bail!("{} cannot be used as a base URL", base_url);
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { http, base_url })
    }

    /// Client for the application instance at `public_ip` (plain HTTP, port 80)
    pub fn for_public_ip(public_ip: &str) -> Result<Self> {
        Self::new(&format!("http://{}", public_ip))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for an action
    pub fn url_for(&self, action: &AppAction) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow!("{} cannot be used as a base URL", self.base_url))?;
            segments.pop_if_empty();
            segments.extend(action.path_segments());
        }
        Ok(url)
    }

    async fn send(&self, action: &AppAction, form: Option<Form>) -> Result<ApiResponse> {
        let url = self.url_for(action)?;
        let mut request = self.http.request(action.method(), url.clone());
        if let Some(form) = form {
            request = request.multipart(form);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("{} {} failed", action.method(), url))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body of {} {}", action.method(), url))?;

        log_debug!("{} {} -> {}", action.method(), url, status);
        Ok(ApiResponse { status, body })
    }

    /// Upload an image file
    pub async fn upload_image(&self, path: &Path) -> Result<ApiResponse> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload.bin")
            .to_string();
        self.upload_image_bytes(&file_name, bytes).await
    }

    /// Upload image content under `file_name`
    pub async fn upload_image_bytes(&self, file_name: &str, bytes: Vec<u8>) -> Result<ApiResponse> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_for(file_name))
            .context("Invalid upload content type")?;
        let form = Form::new().part(UPLOAD_FIELD, part);
        self.send(&AppAction::UploadImage, Some(form)).await
    }

    pub async fn list_images(&self) -> Result<ApiResponse> {
        self.send(&AppAction::ListImages, None).await
    }

    /// Decoded image list; fails on a non-2xx status
    pub async fn images(&self) -> Result<Vec<ImageRecord>> {
        let response = self.list_images().await?;
        if !response.is_success() {
            bail!("Listing images returned status {}", response.status);
        }
        response.json()
    }

    pub async fn get_image(&self, id: &str) -> Result<ApiResponse> {
        self.send(&AppAction::GetImage(id.to_string()), None).await
    }

    pub async fn download_image(&self, id: &str) -> Result<ApiResponse> {
        self.send(&AppAction::DownloadImage(id.to_string()), None)
            .await
    }

    pub async fn delete_image(&self, id: &str) -> Result<ApiResponse> {
        self.send(&AppAction::DeleteImage(id.to_string()), None).await
    }

    /// Id of the first listed image, if any
    pub async fn first_image_id(&self) -> Result<Option<String>> {
        Ok(self.images().await?.into_iter().next().map(|image| image.id))
    }

    pub async fn subscribe(&self, email: &str) -> Result<ApiResponse> {
        self.send(&AppAction::Subscribe(email.to_string()), None).await
    }

    pub async fn list_subscriptions(&self) -> Result<ApiResponse> {
        self.send(&AppAction::ListSubscriptions, None).await
    }

    /// Decoded subscription list; fails on a non-2xx status
    pub async fn subscriptions(&self) -> Result<Vec<Subscription>> {
        let response = self.list_subscriptions().await?;
        if !response.is_success() {
            bail!("Listing subscriptions returned status {}", response.status);
        }
        response.json()
    }

    pub async fn unsubscribe(&self, email: &str) -> Result<ApiResponse> {
        self.send(&AppAction::Unsubscribe(email.to_string()), None)
            .await
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
