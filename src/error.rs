use std::path::PathBuf;

use thiserror::Error;

use crate::models::PixelRect;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("ZIP file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read archive {}: {source}", path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("I/O error while extracting archive: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("failed to read upload {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed detection response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum CropError {
    #[error("crop region {0:?} has no area")]
    EmptyRegion(PixelRect),
}
