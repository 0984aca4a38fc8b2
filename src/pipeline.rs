use std::path::PathBuf;

use anyhow::{Context, Result};
use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::archive::ExtractedArchive;
use crate::client::InferenceService;
use crate::config::InspectConfig;
use crate::crop::crops_from_labels;
use crate::display::{Advance, DisplaySink, Operator};
use crate::labels::read_label_file;
use crate::models::DetectionMap;
use crate::overlay::{OverlayStyle, annotate, figure_title};

pub const CROP_DIR_NAME: &str = "cropped";

/// Outcome of drawing a detection response over the local images.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InspectionReport {
    /// Images that were annotated and handed to the sink, in order
    pub rendered: Vec<String>,
    /// Response keys with no matching file in the archive
    pub not_found: Vec<String>,
    pub boxes_drawn: usize,
}

/// Draws detection responses over the archive they were computed from.
pub struct InspectionPipeline {
    style: OverlayStyle,
}

impl InspectionPipeline {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    pub fn run<S: DisplaySink>(
        &self,
        detections: &DetectionMap,
        archive: &ExtractedArchive,
        sink: &mut S,
    ) -> Result<InspectionReport> {
        info!("Found {} images with detections.", detections.len());
        let mut report = InspectionReport::default();

        for (image_name, boxes) in detections {
            let Some(path) = archive.resolve(image_name) else {
                warn!("Image {} not found in ZIP", image_name);
                report.not_found.push(image_name.clone());
                continue;
            };

            let img = image::open(&path)
                .with_context(|| format!("Failed to open image {:?}", path))?;
            info!("  → {}: {} cells detected", image_name, boxes.len());

            let annotated = annotate(&img, boxes, &self.style);
            sink.show(
                &figure_title(image_name, boxes.len()),
                &DynamicImage::ImageRgb8(annotated),
            )?;

            report.boxes_drawn += boxes.len();
            report.rendered.push(image_name.clone());
        }

        if !report.not_found.is_empty() {
            warn!("{} images from the response were not found in the ZIP", report.not_found.len());
        }
        Ok(report)
    }
}

/// Upload the configured archive, then draw the returned boxes over its images.
pub async fn inspect<C, S>(config: &InspectConfig, service: &C, sink: &mut S) -> Result<InspectionReport>
where
    C: InferenceService,
    S: DisplaySink,
{
    info!("Uploading ZIP to API...");
    let detections = service.predict(&config.zip_path).await?;
    info!("API response received. Parsing bounding boxes...");

    let archive = ExtractedArchive::extract(&config.zip_path)?;
    let style = match &config.font_path {
        Some(path) => OverlayStyle::with_font_path(path)?,
        None => OverlayStyle::with_system_font(),
    };

    let report = InspectionPipeline::new(style).run(&detections, &archive, sink)?;
    info!("Done! All images processed.");
    Ok(report)
}

/// Why a crop run produced nothing to look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    NoImagesOrLabels,
    NoCrops,
}

/// Saved crops of one archive, in image-name then label-line order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CropReport {
    pub crops: Vec<PathBuf>,
    pub images_processed: usize,
    /// Images without a same-named label file
    pub images_without_labels: usize,
    /// Malformed label lines across all files
    pub skipped_lines: usize,
    pub empty: Option<EmptyReason>,
}

/// Extracts labelled regions from an unpacked archive into `<archive>/cropped`.
#[derive(Debug, Default)]
pub struct CropPipeline;

impl CropPipeline {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&self, archive: &ExtractedArchive) -> Result<CropReport> {
        info!("Extracted ZIP to: {}", archive.path().display());
        let mut report = CropReport::default();

        let images = archive.image_files()?;
        let labels = archive.label_files()?;
        if images.is_empty() || labels.is_empty() {
            info!("No images or YOLO labels found.");
            report.empty = Some(EmptyReason::NoImagesOrLabels);
            return Ok(report);
        }

        let crop_dir = archive.path().join(CROP_DIR_NAME);
        std::fs::create_dir_all(&crop_dir)
            .with_context(|| format!("Failed to create crop directory {:?}", crop_dir))?;

        let pairs = archive.pairs()?;
        report.images_without_labels = images.len() - pairs.len();

        for pair in pairs {
            let img = image::open(&pair.image)
                .with_context(|| format!("Failed to open image {:?}", pair.image))?;
            let label_file = read_label_file(&pair.label)?;
            report.skipped_lines += label_file.skipped_count();
            if label_file.skipped_count() > 0 {
                debug!("{}: skipped {} malformed label lines", pair.base, label_file.skipped_count());
            }

            for crop in crops_from_labels(&img, &pair.base, &label_file) {
                let path = crop_dir.join(crop.file_name());
                crop.image
                    .save(&path)
                    .map_err(|e| anyhow::anyhow!("Failed to save crop {:?}: {}", path, e))?;
                report.crops.push(path);
            }
            report.images_processed += 1;
        }

        if report.crops.is_empty() {
            info!("No crops generated.");
            report.empty = Some(EmptyReason::NoCrops);
        } else {
            info!("Total Crops: {}", report.crops.len());
        }
        Ok(report)
    }
}

/// One crop ready to be shown.
#[derive(Debug, Clone)]
pub struct CropView {
    pub title: String,
    pub path: PathBuf,
    pub image: DynamicImage,
    /// One-based position among all crops
    pub position: usize,
    pub total: usize,
}

/// Hands out saved crops one at a time; the caller decides when to ask for the next.
#[derive(Debug)]
pub struct CropStepper<'a> {
    crops: &'a [PathBuf],
    next: usize,
}

impl<'a> CropStepper<'a> {
    pub fn new(report: &'a CropReport) -> Self {
        Self {
            crops: &report.crops,
            next: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.crops.len() - self.next
    }

    pub fn step(&mut self) -> Result<Option<CropView>> {
        let Some(path) = self.crops.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;

        let image = image::open(path).with_context(|| format!("Failed to open crop {:?}", path))?;
        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Some(CropView {
            title,
            path: path.clone(),
            image,
            position: self.next,
            total: self.crops.len(),
        }))
    }
}

/// Show crops one by one, asking the operator before moving on. Returns how many were shown.
pub fn walk_crops<S, O>(stepper: &mut CropStepper<'_>, sink: &mut S, operator: &mut O) -> Result<usize>
where
    S: DisplaySink,
    O: Operator,
{
    let mut shown = 0;
    while let Some(view) = stepper.step()? {
        sink.show(&view.title, &view.image)?;
        shown += 1;

        if stepper.remaining() == 0 {
            break;
        }
        let prompt = format!("[{}/{}] Press ENTER for next crop (q to quit)...", view.position, view.total);
        if operator.acknowledge(&prompt)? == Advance::Stop {
            break;
        }
    }
    Ok(shown)
}
