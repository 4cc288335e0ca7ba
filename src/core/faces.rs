//! Per-player face filters
//!
//! The face-capture subsystem hands over one reference face per player and
//! then keeps reporting the current face crop and its apparent size. A player
//! whose face keeps differing from the reference is moving; a player whose
//! face has grown large enough has reached the camera and wins.

use image::imageops::FilterType;
use image::GrayImage;

use crate::config::FaceConfig;

/// Reference face and movement state for one player
#[derive(Debug, Clone)]
pub struct FaceFilter {
    reference: GrayImage,
    moving_frames: u32,
    face_size: u32,
    config: FaceConfig,
}

impl FaceFilter {
    pub fn new(reference: &GrayImage, config: FaceConfig) -> Self {
        Self {
            reference: normalize(reference, config.size),
            moving_frames: 0,
            face_size: 0,
            config,
        }
    }

    /// Mean absolute difference between `face` and the reference
    pub fn difference(&self, face: &GrayImage) -> f32 {
        let face = normalize(face, self.config.size);
        let total: u64 = face
            .pixels()
            .zip(self.reference.pixels())
            .map(|(a, b)| u64::from(a[0].abs_diff(b[0])))
            .sum();
        let count = u64::from(self.config.size) * u64::from(self.config.size);
        total as f32 / count as f32
    }

    /// Score `face` and report whether the player has been moving for enough
    /// consecutive frames
    pub fn is_moving(&mut self, face: &GrayImage) -> bool {
        let score = self.difference(face);
        if score > self.config.movement_threshold {
            self.moving_frames += 1;
        } else {
            self.moving_frames = 0;
        }
        log::trace!("Face difference {:.1}, moving for {} frame(s)", score, self.moving_frames);
        self.moving_frames >= self.config.moving_frames
    }

    /// Consecutive frames scored above the movement threshold
    pub fn moving_frames(&self) -> u32 {
        self.moving_frames
    }

    /// Forget the current movement streak
    pub fn reset_streak(&mut self) {
        self.moving_frames = 0;
    }

    /// Record the apparent face size reported by the capture subsystem
    pub fn update_face_size(&mut self, size: u32) {
        self.face_size = size;
    }

    pub fn face_size(&self) -> u32 {
        self.face_size
    }

    /// Whether the face has grown to the winning size
    pub fn is_won(&self) -> bool {
        self.face_size >= self.config.win_face_size
    }
}

fn normalize(face: &GrayImage, size: u32) -> GrayImage {
    if face.dimensions() == (size, size) {
        face.clone()
    } else {
        image::imageops::resize(face, size, size, FilterType::Triangle)
    }
}
