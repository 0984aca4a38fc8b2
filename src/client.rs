use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use tracing::{debug, info};

use crate::error::InferenceError;
use crate::models::DetectionMap;

pub const ZIP_FIELD: &str = "zip_file";
pub const ZIP_MIME: &str = "application/zip";

/// Remote detector: takes a ZIP of images and returns detections per filename.
pub trait InferenceService {
    fn predict(&self, archive: &Path) -> impl Future<Output = Result<DetectionMap, InferenceError>>;
}

/// Client for an HTTP `/predict` endpoint accepting a multipart ZIP upload.
#[derive(Debug, Clone)]
pub struct HttpInferenceClient {
    client: reqwest::Client,
    url: String,
}

impl HttpInferenceClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(InferenceError::Transport)?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl InferenceService for HttpInferenceClient {
    async fn predict(&self, archive: &Path) -> Result<DetectionMap, InferenceError> {
        let bytes = tokio::fs::read(archive)
            .await
            .map_err(|source| InferenceError::Io {
                path: archive.to_path_buf(),
                source,
            })?;
        let file_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.zip".to_string());

        debug!("Uploading {} ({} bytes) to {}", file_name, bytes.len(), self.url);
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(ZIP_MIME)
            .map_err(InferenceError::Transport)?;
        let form = Form::new().part(ZIP_FIELD, part);

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(InferenceError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(InferenceError::Transport)?;
        if status != reqwest::StatusCode::OK {
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let detections: DetectionMap = serde_json::from_str(&body)?;
        info!("API response received for {} images", detections.len());
        Ok(detections)
    }
}
