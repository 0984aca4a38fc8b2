use image::{DynamicImage, GenericImageView, imageops};

use crate::error::CropError;
use crate::labels::LabelFile;
use crate::models::{Crop, PixelRect};

/// Cut `rect` out of `img`.
///
/// The result always has the rectangle's size and the source's color type.
/// Parts of the rectangle that fall outside the image are zero-filled: opaque
/// black for images without alpha, transparent black otherwise.
pub fn extract_crop(img: &DynamicImage, rect: PixelRect) -> Result<DynamicImage, CropError> {
    if rect.is_empty() {
        return Err(CropError::EmptyRegion(rect));
    }

    let (img_width, img_height) = img.dimensions();
    let width = rect.width() as u32;
    let height = rect.height() as u32;
    let visible = rect.clamp_to(img_width, img_height);

    if visible == rect {
        return Ok(img.crop_imm(rect.x1 as u32, rect.y1 as u32, width, height));
    }

    let mut canvas = DynamicImage::new(width, height, img.color());
    if !visible.is_empty() {
        let region = img.crop_imm(
            visible.x1 as u32,
            visible.y1 as u32,
            visible.width() as u32,
            visible.height() as u32,
        );
        imageops::replace(
            &mut canvas,
            &region,
            (visible.x1 - rect.x1) as i64,
            (visible.y1 - rect.y1) as i64,
        );
    }

    Ok(canvas)
}

/// Crops for every valid line of `labels`, in line order.
///
/// Lines whose box has no area are logged and produce no crop.
pub fn crops_from_labels(img: &DynamicImage, base: &str, labels: &LabelFile) -> Vec<Crop> {
    let (width, height) = img.dimensions();
    let mut crops = Vec::new();

    for (index, label) in labels.labels() {
        let rect = label.to_pixel_rect(width, height);
        match extract_crop(img, rect) {
            Ok(image) => crops.push(Crop {
                source_base: base.to_string(),
                index,
                rect,
                image,
            }),
            Err(e) => tracing::warn!("{} line {}: {}", base, index + 1, e),
        }
    }

    crops
}
