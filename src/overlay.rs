//! Drawing detections onto images.
//!
//! Each detection becomes a hollow rectangle at its corners plus a
//! `"{class} {conf:.2}"` caption placed 4px right of and 20px above the
//! top-left corner. Captions near the top edge are clipped, not moved.

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use anyhow::Context;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::{debug, info};

use crate::models::{Detection, PixelRect};

pub const LIME: Rgb<u8> = Rgb([0, 255, 0]);

const LABEL_OFFSET: (i32, i32) = (4, -20);

const SYSTEM_FONTS: [&str; 5] = [
    "arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/usr/share/fonts/truetype/msttcorefonts/Arial.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
];

pub struct OverlayStyle {
    /// Caption font. Captions are skipped when no font could be loaded;
    /// no fallback face is bundled.
    pub font: Option<FontVec>,
    pub font_scale: f32,
    /// Outline width in pixels, growing inward from the corners
    pub thickness: u32,
    pub color: Rgb<u8>,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            font: None,
            font_scale: 18.0,
            thickness: 3,
            color: LIME,
        }
    }
}

impl OverlayStyle {
    pub fn with_font_path(font_path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read(font_path)
            .with_context(|| format!("Failed to read font {:?}", font_path))?;
        let font = FontVec::try_from_vec(data)
            .map_err(|_| anyhow::anyhow!("Failed to parse font file: {}", font_path.display()))?;
        Ok(Self {
            font: Some(font),
            ..Self::default()
        })
    }

    /// Try a few well-known font locations, falling back to outline-only rendering.
    pub fn with_system_font() -> Self {
        for path in SYSTEM_FONTS {
            if let Ok(data) = std::fs::read(path)
                && let Ok(font) = FontVec::try_from_vec(data)
            {
                info!("Loaded font: {}", path);
                return Self {
                    font: Some(font),
                    ..Self::default()
                };
            }
        }

        debug!("No system font found, captions will be skipped");
        Self::default()
    }
}

pub fn label_text(detection: &Detection) -> String {
    format!("{} {:.2}", detection.class_name, detection.confidence)
}

pub fn label_origin(rect: &PixelRect) -> (i32, i32) {
    (rect.x1 + LABEL_OFFSET.0, rect.y1 + LABEL_OFFSET.1)
}

pub fn figure_title(image_name: &str, count: usize) -> String {
    format!("Detected Cells: {} ({} found)", image_name, count)
}

/// Outline rectangles for `rect`, outermost first. Empty when the box has no area.
pub fn outline_rects(rect: &PixelRect, thickness: u32) -> Vec<Rect> {
    let rect = rect.normalized();
    let mut rings = Vec::new();

    for inset in 0..thickness.max(1) as i32 {
        let width = rect.width() - 2 * inset + 1;
        let height = rect.height() - 2 * inset + 1;
        if width <= 0 || height <= 0 {
            break;
        }
        rings.push(Rect::at(rect.x1 + inset, rect.y1 + inset).of_size(width as u32, height as u32));
    }

    rings
}

pub fn draw_detection(canvas: &mut RgbImage, detection: &Detection, style: &OverlayStyle) {
    let rect = detection.rect();
    for ring in outline_rects(&rect, style.thickness) {
        draw_hollow_rect_mut(canvas, ring, style.color);
    }

    let Some(font) = &style.font else { return };
    let (x, y) = label_origin(&rect);
    draw_text_mut(
        canvas,
        style.color,
        x,
        y,
        PxScale::from(style.font_scale),
        font,
        &label_text(detection),
    );
}

/// RGB copy of `image` with every detection drawn on it.
pub fn annotate(image: &DynamicImage, detections: &[Detection], style: &OverlayStyle) -> RgbImage {
    let mut canvas = image.to_rgb8();
    for detection in detections {
        draw_detection(&mut canvas, detection, style);
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(bbox: [f64; 4], conf: f64) -> Detection {
        Detection {
            class_name: "cell".to_string(),
            confidence: conf,
            bbox,
        }
    }

    #[test]
    fn label_has_two_decimals() {
        assert_eq!(label_text(&cell([0.0; 4], 0.93)), "cell 0.93");
        assert_eq!(label_text(&cell([0.0; 4], 0.5)), "cell 0.50");
        assert_eq!(label_text(&cell([0.0; 4], 0.126)), "cell 0.13");
    }

    #[test]
    fn label_keeps_payload_precision() {
        let json = r#"{"class": "cell", "conf": 0.005, "bbox": [0, 0, 1, 1]}"#;
        let detection: Detection = serde_json::from_str(json).unwrap();
        assert_eq!(label_text(&detection), "cell 0.01");

        let json = r#"{"class": "cell", "conf": 0.995, "bbox": [0, 0, 1, 1]}"#;
        let detection: Detection = serde_json::from_str(json).unwrap();
        assert_eq!(label_text(&detection), "cell 0.99");
    }

    #[test]
    fn label_sits_above_top_left_corner() {
        assert_eq!(label_origin(&PixelRect::new(10, 10, 50, 50)), (14, -10));
        assert_eq!(label_origin(&PixelRect::new(100, 200, 150, 260)), (104, 180));
    }

    #[test]
    fn title_includes_count() {
        assert_eq!(figure_title("a.png", 3), "Detected Cells: a.png (3 found)");
    }

    #[test]
    fn outline_grows_inward() {
        let rings = outline_rects(&PixelRect::new(10, 10, 50, 50), 3);
        assert_eq!(rings.len(), 3);
        assert_eq!((rings[0].left(), rings[0].top()), (10, 10));
        assert_eq!((rings[0].right(), rings[0].bottom()), (50, 50));
        assert_eq!((rings[2].left(), rings[2].right()), (12, 48));
    }

    #[test]
    fn outline_of_reversed_box_is_normalized() {
        let rings = outline_rects(&PixelRect::new(50, 50, 10, 10), 1);
        assert_eq!((rings[0].left(), rings[0].top()), (10, 10));
    }

    #[test]
    fn thin_box_stops_insetting() {
        let rings = outline_rects(&PixelRect::new(10, 10, 12, 40), 3);
        assert_eq!(rings.len(), 2);
    }

    #[test]
    fn draws_outline_without_font() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(64, 64));
        let out = annotate(&image, &[cell([10.0, 10.0, 50.0, 50.0], 0.93)], &OverlayStyle::default());

        assert_eq!(*out.get_pixel(10, 10), LIME);
        assert_eq!(*out.get_pixel(50, 30), LIME);
        assert_eq!(*out.get_pixel(12, 30), LIME);
        // interior and outside untouched
        assert_eq!(*out.get_pixel(30, 30), Rgb([0, 0, 0]));
        assert_eq!(*out.get_pixel(5, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn caption_lands_above_box() {
        let style = OverlayStyle::with_system_font();
        if style.font.is_none() {
            eprintln!("no system font available, caption rendering not checked");
            return;
        }

        let image = DynamicImage::ImageRgb8(RgbImage::new(160, 120));
        let out = annotate(&image, &[cell([10.0, 40.0, 150.0, 110.0], 0.93)], &style);

        // caption band: from y1 - 20 down to just above the outline
        let caption_pixels = (20..38u32)
            .flat_map(|y| (14..150u32).map(move |x| (x, y)))
            .filter(|&(x, y)| out.get_pixel(x, y)[1] > 0)
            .count();
        assert!(caption_pixels > 0, "caption was not drawn");

        // nothing left of the caption origin above the box
        assert!((20..38u32).all(|y| (0..10u32).all(|x| out.get_pixel(x, y)[1] == 0)));
    }

    #[test]
    fn box_past_canvas_is_clipped() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(20, 20));
        let out = annotate(&image, &[cell([-5.0, -5.0, 30.0, 30.0], 0.1)], &OverlayStyle::default());
        assert_eq!(out.dimensions(), (20, 20));
        assert_eq!(*out.get_pixel(10, 10), Rgb([0, 0, 0]));
    }
}
