//! Adaptive background model
//!
//! Keeps a floating-point running average of the (blurred, grayscale) scene.
//! The average only moves inside the region of interest, so pixels outside it
//! keep the value they were seeded with.

use image::{GrayImage, ImageBuffer, Luma};

use super::region::RoiMask;

/// Per-pixel `f32` grayscale image
pub type FloatImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Slowly-adapting reference image of the empty scene
#[derive(Debug, Clone)]
pub struct BackgroundModel {
    accumulator: FloatImage,
    alpha: f32,
}

impl BackgroundModel {
    /// Seed the model from a preprocessed frame
    pub fn from_frame(gray: &GrayImage, alpha: f32) -> Self {
        let accumulator = FloatImage::from_fn(gray.width(), gray.height(), |x, y| {
            Luma([f32::from(gray.get_pixel(x, y)[0])])
        });
        Self { accumulator, alpha }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.accumulator.dimensions()
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Blend `gray` into the model: `bg = bg * (1 - alpha) + gray * alpha`,
    /// only where the mask is set.
    ///
    /// Callers must pass images of the model's dimensions.
    pub fn accumulate(&mut self, gray: &GrayImage, roi: &RoiMask) {
        debug_assert_eq!(gray.dimensions(), self.dimensions());
        debug_assert_eq!(roi.dimensions(), self.dimensions());

        let keep = 1.0 - self.alpha;
        let alpha = self.alpha;
        for ((bg, px), m) in self
            .accumulator
            .pixels_mut()
            .zip(gray.pixels())
            .zip(roi.as_image().pixels())
        {
            if m[0] != 0 {
                bg[0] = bg[0] * keep + f32::from(px[0]) * alpha;
            }
        }
    }

    /// The model rounded and saturated to 8 bits
    pub fn quantized(&self) -> GrayImage {
        GrayImage::from_fn(self.accumulator.width(), self.accumulator.height(), |x, y| {
            let v = self.accumulator.get_pixel(x, y)[0];
            Luma([v.abs().round().min(255.0) as u8])
        })
    }

    /// Raw accumulator value at a pixel
    pub fn value(&self, x: u32, y: u32) -> Option<f32> {
        if x < self.accumulator.width() && y < self.accumulator.height() {
            Some(self.accumulator.get_pixel(x, y)[0])
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::BoundingBox;

    #[test]
    fn test_seed_matches_frame() {
        let gray = GrayImage::from_fn(4, 3, |x, y| Luma([(x * 10 + y) as u8]));
        let model = BackgroundModel::from_frame(&gray, 0.05);
        assert_eq!(model.dimensions(), (4, 3));
        assert_eq!(model.value(3, 2), Some(32.0));
        assert_eq!(model.quantized(), gray);
    }

    #[test]
    fn test_exponential_smoothing() {
        let model_frame = GrayImage::from_pixel(2, 2, Luma([0]));
        let mut model = BackgroundModel::from_frame(&model_frame, 0.05);
        let roi = RoiMask::full(2, 2);

        let bright = GrayImage::from_pixel(2, 2, Luma([200]));
        model.accumulate(&bright, &roi);
        assert!((model.value(0, 0).unwrap() - 10.0).abs() < 1e-4);
        assert_eq!(model.quantized().get_pixel(0, 0)[0], 10);

        model.accumulate(&bright, &roi);
        // 10 * 0.95 + 200 * 0.05
        assert!((model.value(1, 1).unwrap() - 19.5).abs() < 1e-4);
    }

    #[test]
    fn test_unmasked_pixels_never_change() {
        let mut model = BackgroundModel::from_frame(&GrayImage::from_pixel(4, 4, Luma([50])), 0.5);
        let roi = RoiMask::from_rect(4, 4, BoundingBox::new(0, 0, 2, 4));

        let bright = GrayImage::from_pixel(4, 4, Luma([250]));
        for _ in 0..20 {
            model.accumulate(&bright, &roi);
        }

        assert!(model.value(0, 0).unwrap() > 249.0);
        assert_eq!(model.value(2, 0), Some(50.0));
        assert_eq!(model.value(3, 3), Some(50.0));
    }

    #[test]
    fn test_value_out_of_bounds() {
        let model = BackgroundModel::from_frame(&GrayImage::new(2, 2), 0.05);
        assert_eq!(model.value(2, 0), None);
    }
}
