//! Vision pipeline
//!
//! This module turns camera frames into motion regions:
//! - `capture` - the frame source boundary and a frame-sequence replayer
//! - `region` - bounding boxes and the region-of-interest mask
//! - `background` - the adaptive background model
//! - `detector` - background subtraction, contour extraction and overlap removal
//!
//! # Example
//!
//! ```ignore
//! use redlight::vision::{MotionDetector, RoiMask, BoundingBox};
//!
//! let roi = RoiMask::from_rect(640, 480, BoundingBox::new(64, 48, 512, 384));
//! let mut detector = MotionDetector::new(config.motion.clone());
//! let boxes = detector.detect(&frame, &roi)?;
//! ```

pub mod background;
pub mod capture;
pub mod detector;
pub mod region;

// Re-export main types for convenient access
pub use background::{BackgroundModel, FloatImage};
pub use capture::{fit_frame, FrameSequenceSource, FrameSource, MemorySource};
pub use detector::{suppress_overlaps, MotionDetector};
pub use region::{distance, BoundingBox, RoiMask};
