//! Motion detection by adaptive background subtraction

use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::contour_area;
use imageproc::morphology::dilate;
use imageproc::point::Point;

use super::background::BackgroundModel;
use super::region::{BoundingBox, RoiMask};
use crate::config::MotionConfig;
use crate::{GameError, Result};

/// Turns frames into a deduplicated list of boxes around things that moved
pub struct MotionDetector {
    config: MotionConfig,
    background: Option<BackgroundModel>,
}

impl MotionDetector {
    pub fn new(config: MotionConfig) -> Self {
        Self {
            config,
            background: None,
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// The background model, once the first frame has been seen
    pub fn background(&self) -> Option<&BackgroundModel> {
        self.background.as_ref()
    }

    /// Whether a frame has seeded the background yet
    pub fn has_background(&self) -> bool {
        self.background.is_some()
    }

    /// Grayscale and blur a frame
    pub fn preprocess(&self, frame: &RgbImage) -> GrayImage {
        let gray = image::imageops::grayscale(frame);
        gaussian_blur_f32(&gray, self.config.blur_sigma)
    }

    /// Detect motion in `frame` within `roi`.
    ///
    /// The first frame only seeds the background and yields no boxes. Every
    /// later frame is blended into the background before differencing.
    pub fn detect(&mut self, frame: &RgbImage, roi: &RoiMask) -> Result<Vec<BoundingBox>> {
        check_size(roi.dimensions(), frame.dimensions())?;

        let gray = self.preprocess(frame);

        let Some(background) = self.background.as_mut() else {
            log::debug!(
                "Seeding background model from {}x{} frame",
                gray.width(),
                gray.height()
            );
            self.background = Some(BackgroundModel::from_frame(&gray, self.config.alpha));
            return Ok(Vec::new());
        };
        check_size(background.dimensions(), gray.dimensions())?;

        background.accumulate(&gray, roi);
        let motion = motion_mask(
            &background.quantized(),
            &gray,
            roi,
            self.config.diff_threshold,
        );
        let motion = dilate(&motion, Norm::LInf, self.config.dilate_radius);

        let raw = contour_boxes(&motion, self.config.min_area);
        let boxes = suppress_overlaps(raw, self.config.overlap_iou);
        log::trace!("Detected {} motion region(s)", boxes.len());
        Ok(boxes)
    }
}

fn check_size(expected: (u32, u32), actual: (u32, u32)) -> Result<()> {
    if expected != actual {
        return Err(GameError::FrameSize {
            expected_width: expected.0,
            expected_height: expected.1,
            actual_width: actual.0,
            actual_height: actual.1,
        });
    }
    Ok(())
}

/// Binary mask of pixels inside `roi` whose difference from the background
/// exceeds `threshold`
fn motion_mask(
    background: &GrayImage,
    gray: &GrayImage,
    roi: &RoiMask,
    threshold: u8,
) -> GrayImage {
    let mut out = GrayImage::new(gray.width(), gray.height());
    for (((o, bg), px), m) in out
        .pixels_mut()
        .zip(background.pixels())
        .zip(gray.pixels())
        .zip(roi.as_image().pixels())
    {
        if m[0] != 0 && bg[0].abs_diff(px[0]) > threshold {
            *o = Luma([255]);
        }
    }
    out
}

/// Bounding boxes of the external contours whose area exceeds `min_area`
fn contour_boxes(mask: &GrayImage, min_area: f64) -> Vec<BoundingBox> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter(|c| contour_area(&c.points).abs() > min_area)
        .filter_map(|c| bounding_rect(&c.points))
        .collect()
}

fn bounding_rect(points: &[Point<i32>]) -> Option<BoundingBox> {
    let first = points.first()?;
    let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
    for p in points {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    Some(BoundingBox::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1))
}

/// Greedy duplicate removal.
///
/// Boxes are put in canonical order (largest area first, then top-to-bottom,
/// then left-to-right) and each is accepted unless its IoU with an already
/// accepted box exceeds `threshold`.
pub fn suppress_overlaps(mut boxes: Vec<BoundingBox>, threshold: f32) -> Vec<BoundingBox> {
    boxes.sort_by(|a, b| {
        b.area()
            .cmp(&a.area())
            .then(a.y.cmp(&b.y))
            .then(a.x.cmp(&b.x))
    });

    let mut kept: Vec<BoundingBox> = Vec::with_capacity(boxes.len());
    for candidate in boxes {
        if !kept.iter().any(|k| k.iou(&candidate) > threshold) {
            kept.push(candidate);
        }
    }
    kept
}
