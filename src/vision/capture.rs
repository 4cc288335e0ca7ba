//! Frame acquisition boundary
//!
//! The game only needs "give me the next frame". Cameras live outside the
//! crate; [`FrameSequenceSource`] replays a directory of still images for
//! offline runs and tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::RgbImage;

use crate::config::FrameConfig;
use crate::{GameError, Result};

/// Supplier of fixed-size RGB frames
pub trait FrameSource {
    /// Block until the next frame is available.
    ///
    /// An error means the source is finished or broken; the game loop stops.
    fn next_frame(&mut self) -> Result<RgbImage>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<RgbImage> {
        (**self).next_frame()
    }
}

/// Resize a frame to the configured size if it differs
pub fn fit_frame(frame: RgbImage, size: &FrameConfig) -> RgbImage {
    if frame.dimensions() == (size.width, size.height) {
        frame
    } else {
        image::imageops::resize(&frame, size.width, size.height, FilterType::Triangle)
    }
}

/// Frames held in memory, handed out in order
pub struct MemorySource {
    frames: VecDeque<RgbImage>,
}

impl MemorySource {
    pub fn new(frames: impl IntoIterator<Item = RgbImage>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<RgbImage> {
        self.frames
            .pop_front()
            .ok_or_else(|| GameError::FrameSource("end of stream".into()))
    }
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Replays image files from a directory in file-name order
pub struct FrameSequenceSource {
    paths: Vec<PathBuf>,
    index: usize,
    loop_playback: bool,
    size: FrameConfig,
}

impl FrameSequenceSource {
    /// Collect the images in `dir`
    pub fn from_directory(
        dir: impl AsRef<Path>,
        loop_playback: bool,
        size: &FrameConfig,
    ) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| {
            GameError::FrameSource(format!("cannot read {}: {}", dir.display(), e))
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(GameError::FrameSource(format!(
                "no frames found in {}",
                dir.display()
            )));
        }

        log::info!("Frame sequence: {} frame(s) from {}", paths.len(), dir.display());
        Ok(Self {
            paths,
            index: 0,
            loop_playback,
            size: *size,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for FrameSequenceSource {
    fn next_frame(&mut self) -> Result<RgbImage> {
        if self.index >= self.paths.len() {
            if !self.loop_playback {
                return Err(GameError::FrameSource("end of stream".into()));
            }
            self.index = 0;
        }

        let path = &self.paths[self.index];
        self.index += 1;
        let frame = image::open(path)?.to_rgb8();
        Ok(fit_frame(frame, &self.size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("redlight-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_memory_source_ends() {
        let mut source = MemorySource::new(vec![RgbImage::new(2, 2)]);
        assert_eq!(source.remaining(), 1);
        assert!(source.next_frame().is_ok());
        assert!(matches!(source.next_frame(), Err(GameError::FrameSource(_))));
    }

    #[test]
    fn test_fit_frame_resizes() {
        let size = FrameConfig {
            width: 8,
            height: 6,
        };
        let frame = fit_frame(RgbImage::from_pixel(16, 12, Rgb([10, 20, 30])), &size);
        assert_eq!(frame.dimensions(), (8, 6));
        assert_eq!(frame.get_pixel(3, 3), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_frame_sequence_in_name_order() {
        let dir = temp_dir("sequence");
        RgbImage::from_pixel(4, 4, Rgb([200, 0, 0]))
            .save(dir.join("b.png"))
            .unwrap();
        RgbImage::from_pixel(4, 4, Rgb([0, 200, 0]))
            .save(dir.join("a.png"))
            .unwrap();
        std::fs::write(dir.join("notes.txt"), "not a frame").unwrap();

        let size = FrameConfig {
            width: 4,
            height: 4,
        };
        let mut source = FrameSequenceSource::from_directory(&dir, false, &size).unwrap();
        assert_eq!(source.len(), 2);

        assert_eq!(source.next_frame().unwrap().get_pixel(0, 0), &Rgb([0, 200, 0]));
        assert_eq!(source.next_frame().unwrap().get_pixel(0, 0), &Rgb([200, 0, 0]));
        assert!(source.next_frame().is_err());

        let mut looping = FrameSequenceSource::from_directory(&dir, true, &size).unwrap();
        for _ in 0..5 {
            assert!(looping.next_frame().is_ok());
        }

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_empty_directory_rejected() {
        let dir = temp_dir("empty");
        let result = FrameSequenceSource::from_directory(&dir, false, &FrameConfig::default());
        assert!(matches!(result, Err(GameError::FrameSource(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
