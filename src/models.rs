use std::collections::BTreeMap;

use image::DynamicImage;
use serde::Deserialize;

/// Detections returned by the inference service, keyed by the uploaded filename.
pub type DetectionMap = BTreeMap<String, Vec<Detection>>;

/// One inference result with an absolute pixel box `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Detection {
    #[serde(rename = "class")]
    pub class_name: String,
    #[serde(rename = "conf")]
    pub confidence: f64,
    pub bbox: [f64; 4],
}

impl Detection {
    pub fn rect(&self) -> PixelRect {
        let [x1, y1, x2, y2] = self.bbox;
        PixelRect {
            x1: x1.round() as i32,
            y1: y1.round() as i32,
            x2: x2.round() as i32,
            y2: y2.round() as i32,
        }
    }
}

/// A single line of a YOLO label file. Coordinates are fractions of the image size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoloLabel {
    pub class_id: u32,
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
}

impl YoloLabel {
    /// Convert the normalized center box into absolute pixel corners.
    ///
    /// Each corner is truncated toward zero. No clamping happens here: a box
    /// that extends past the image edge yields coordinates outside `[0, W] x [0, H]`.
    pub fn to_pixel_rect(&self, image_width: u32, image_height: u32) -> PixelRect {
        let w = image_width as f64;
        let h = image_height as f64;
        let half_w = self.width / 2.0;
        let half_h = self.height / 2.0;

        PixelRect {
            x1: ((self.center_x - half_w) * w).trunc() as i32,
            y1: ((self.center_y - half_h) * h).trunc() as i32,
            x2: ((self.center_x + half_w) * w).trunc() as i32,
            y2: ((self.center_y + half_h) * h).trunc() as i32,
        }
    }
}

/// Corner-form rectangle in image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl PixelRect {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.x1 as f64 + self.x2 as f64) / 2.0,
            (self.y1 as f64 + self.y2 as f64) / 2.0,
        )
    }

    /// Copy with corners swapped where needed so that `x1 <= x2` and `y1 <= y2`.
    pub fn normalized(&self) -> Self {
        Self {
            x1: self.x1.min(self.x2),
            y1: self.y1.min(self.y2),
            x2: self.x1.max(self.x2),
            y2: self.y1.max(self.y2),
        }
    }

    /// Intersect with the image area `[0, width] x [0, height]`.
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let w = width as i32;
        let h = height as i32;
        Self {
            x1: self.x1.clamp(0, w),
            y1: self.y1.clamp(0, h),
            x2: self.x2.clamp(0, w),
            y2: self.y2.clamp(0, h),
        }
    }

    /// Inverse of [`YoloLabel::to_pixel_rect`], exact up to the integer truncation.
    pub fn to_yolo(&self, class_id: u32, image_width: u32, image_height: u32) -> YoloLabel {
        let w = image_width as f64;
        let h = image_height as f64;
        let (cx, cy) = self.center();
        YoloLabel {
            class_id,
            center_x: cx / w,
            center_y: cy / h,
            width: self.width() as f64 / w,
            height: self.height() as f64 / h,
        }
    }
}

/// An image region cut out for one label line.
#[derive(Debug, Clone)]
pub struct Crop {
    /// Base name (no extension) of the image the crop came from
    pub source_base: String,
    /// Zero-based line index of the label that produced this crop
    pub index: usize,
    pub rect: PixelRect,
    pub image: DynamicImage,
}

impl Crop {
    pub fn file_name(&self) -> String {
        crop_file_name(&self.source_base, self.index)
    }
}

/// `{base}_crop_{index+1}.png`
pub fn crop_file_name(base: &str, index: usize) -> String {
    format!("{}_crop_{}.png", base, index + 1)
}
