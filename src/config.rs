use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::labeling::LabelStore;

pub const DEFAULT_API_URL: &str = "https://rajdeeps2003-nih-yolo-api.hf.space/predict";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Settings for uploading an archive and inspecting the returned boxes.
#[derive(Debug, Clone, Args)]
pub struct InspectConfig {
    /// ZIP of images to upload
    #[arg(value_name = "ZIP")]
    pub zip_path: PathBuf,

    /// Detection endpoint
    #[arg(long, default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Request timeout in seconds
    #[arg(long = "timeout", value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Caption font (TTF/OTF); a system font is tried when omitted
    #[arg(long, value_name = "FILE")]
    pub font_path: Option<PathBuf>,

    /// Save annotated figures to this directory
    #[arg(long = "out", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

impl InspectConfig {
    pub fn new(zip_path: impl Into<PathBuf>) -> Self {
        Self {
            zip_path: zip_path.into(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            font_path: None,
            output_dir: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Settings for cutting labelled regions out of an annotated archive.
#[derive(Debug, Clone, Args)]
pub struct CropConfig {
    /// ZIP holding images and same-named YOLO `.txt` labels
    #[arg(value_name = "ZIP")]
    pub zip_path: PathBuf,

    /// Keep a copy of every crop in this directory
    #[arg(long = "out", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Step through crops without waiting for ENTER
    #[arg(long = "no-wait", action = clap::ArgAction::SetFalse)]
    pub wait: bool,
}

impl CropConfig {
    pub fn new(zip_path: impl Into<PathBuf>) -> Self {
        Self {
            zip_path: zip_path.into(),
            output_dir: None,
            wait: true,
        }
    }
}

/// Settings for sorting a folder of images into review categories.
#[derive(Debug, Clone, Args)]
pub struct LabelConfig {
    /// Directory of images to label
    #[arg(value_name = "DIR")]
    pub image_dir: PathBuf,

    /// Session state file; defaults to a hidden file inside DIR
    #[arg(long = "state", value_name = "FILE")]
    pub state_path: Option<PathBuf>,

    /// Forget saved progress and rescan DIR
    #[arg(long)]
    pub reset: bool,

    /// Where exported label files go; defaults to DIR
    #[arg(long = "export-dir", value_name = "DIR")]
    pub export_dir: Option<PathBuf>,
}

impl LabelConfig {
    pub fn new(image_dir: impl Into<PathBuf>) -> Self {
        Self {
            image_dir: image_dir.into(),
            state_path: None,
            reset: false,
            export_dir: None,
        }
    }

    pub fn store(&self) -> LabelStore {
        match &self.state_path {
            Some(path) => LabelStore::new(path),
            None => LabelStore::in_dir(&self.image_dir),
        }
    }
}
