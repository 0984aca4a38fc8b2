pub mod archive;
pub mod client;
pub mod config;
pub mod crop;
pub mod display;
pub mod error;
pub mod labeling;
pub mod labels;
pub mod models;
pub mod overlay;
pub mod pipeline;

pub use archive::{ExtractedArchive, ImageLabelPair};
pub use client::{HttpInferenceClient, InferenceService};
pub use config::{CropConfig, InspectConfig, LabelConfig};
pub use error::{ArchiveError, CropError, InferenceError};
pub use labeling::{Category, LabelSession, LabelState, LabelStore, Labeler};
pub use labels::{LabelFile, LabelLine, SkipReason};
pub use models::{Crop, Detection, DetectionMap, PixelRect, YoloLabel};
pub use pipeline::{
    CropPipeline, CropReport, CropStepper, CropView, InspectionPipeline, InspectionReport,
};
