//! Boxes and the region-of-interest mask

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    /// Box with top-left corner `(x, y)`
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Area in square pixels; zero for degenerate boxes
    pub fn area(&self) -> i64 {
        i64::from(self.width.max(0)) * i64::from(self.height.max(0))
    }

    /// Integer center, rounded towards the top-left corner
    pub fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Whether a point lies inside the box, edges included
    pub fn contains_point(&self, (px, py): (i32, i32)) -> bool {
        self.x <= px && px <= self.x + self.width && self.y <= py && py <= self.y + self.height
    }

    /// Intersection over union; 0.0 when both boxes are empty
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let xa = self.x.max(other.x);
        let ya = self.y.max(other.y);
        let xb = (self.x + self.width).min(other.x + other.width);
        let yb = (self.y + self.height).min(other.y + other.height);

        let inter = i64::from((xb - xa).max(0)) * i64::from((yb - ya).max(0));
        let union = self.area() + other.area() - inter;
        if union <= 0 {
            return 0.0;
        }
        inter as f32 / union as f32
    }
}

/// Euclidean distance between two points
pub fn distance((ax, ay): (i32, i32), (bx, by): (i32, i32)) -> f32 {
    let dx = (ax - bx) as f32;
    let dy = (ay - by) as f32;
    dx.hypot(dy)
}

/// Static binary mask selecting the pixels where motion counts
#[derive(Debug, Clone)]
pub struct RoiMask {
    mask: GrayImage,
}

impl RoiMask {
    /// Mask covering `rect`, clipped to a `width` x `height` frame
    pub fn from_rect(width: u32, height: u32, rect: BoundingBox) -> Self {
        let x0 = rect.x.max(0) as u32;
        let y0 = rect.y.max(0) as u32;
        let x1 = (rect.x + rect.width).clamp(0, width as i32) as u32;
        let y1 = (rect.y + rect.height).clamp(0, height as i32) as u32;

        let mask = GrayImage::from_fn(width, height, |x, y| {
            if x >= x0 && x < x1 && y >= y0 && y < y1 {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        Self { mask }
    }

    /// Mask covering the whole frame
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            mask: GrayImage::from_pixel(width, height, Luma([255])),
        }
    }

    /// Any non-zero pixel of `mask` is part of the region
    pub fn from_image(mask: GrayImage) -> Self {
        Self { mask }
    }

    /// Frame width the mask was built for
    pub fn width(&self) -> u32 {
        self.mask.width()
    }

    /// Frame height the mask was built for
    pub fn height(&self) -> u32 {
        self.mask.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.mask.dimensions()
    }

    /// Whether the pixel at `(x, y)` is inside the region
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.mask.width() && y < self.mask.height() && self.mask.get_pixel(x, y)[0] != 0
    }

    /// The mask as a grayscale image (255 inside, 0 outside)
    pub fn as_image(&self) -> &GrayImage {
        &self.mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_and_area() {
        let b = BoundingBox::new(100, 100, 40, 40);
        assert_eq!(b.center(), (120, 120));
        assert_eq!(b.area(), 1600);

        let odd = BoundingBox::new(0, 0, 5, 7);
        assert_eq!(odd.center(), (2, 3));
    }

    #[test]
    fn test_degenerate_box() {
        let b = BoundingBox::new(10, 20, 0, 0);
        assert_eq!(b.area(), 0);
        assert_eq!(b.center(), (10, 20));
        assert!(b.contains_point((10, 20)));
        assert_eq!(b.iou(&b), 0.0);
    }

    #[test]
    fn test_contains_point_inclusive() {
        let b = BoundingBox::new(0, 0, 10, 10);
        assert!(b.contains_point((0, 0)));
        assert!(b.contains_point((10, 10)));
        assert!(!b.contains_point((11, 5)));
        assert!(!b.contains_point((5, -1)));
    }

    #[test]
    fn test_iou() {
        let a = BoundingBox::new(0, 0, 10, 10);
        assert_eq!(a.iou(&a), 1.0);

        let disjoint = BoundingBox::new(20, 20, 10, 10);
        assert_eq!(a.iou(&disjoint), 0.0);

        // touching edges share no area
        let touching = BoundingBox::new(10, 0, 10, 10);
        assert_eq!(a.iou(&touching), 0.0);

        // half overlap: 50 / 150
        let half = BoundingBox::new(5, 0, 10, 10);
        assert!((a.iou(&half) - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(a.iou(&half), half.iou(&a));
    }

    #[test]
    fn test_distance() {
        assert_eq!(distance((0, 0), (3, 4)), 5.0);
        assert_eq!(distance((7, 7), (7, 7)), 0.0);
    }

    #[test]
    fn test_roi_from_rect() {
        let roi = RoiMask::from_rect(20, 10, BoundingBox::new(5, 2, 10, 5));
        assert_eq!(roi.dimensions(), (20, 10));
        assert!(roi.contains(5, 2));
        assert!(roi.contains(14, 6));
        assert!(!roi.contains(15, 6));
        assert!(!roi.contains(4, 2));
        assert!(!roi.contains(100, 100));
    }

    #[test]
    fn test_roi_clipped_to_frame() {
        let roi = RoiMask::from_rect(10, 10, BoundingBox::new(-5, 5, 100, 100));
        assert!(roi.contains(0, 5));
        assert!(roi.contains(9, 9));
        assert!(!roi.contains(0, 4));
    }

    #[test]
    fn test_roi_full() {
        let roi = RoiMask::full(4, 4);
        assert!((0..4).all(|x| (0..4).all(|y| roi.contains(x, y))));
    }
}
