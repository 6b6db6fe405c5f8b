//! Video frames and frame sources

use crate::error::{AnalysisError, AnalysisResult};
use image::{imageops, DynamicImage, GrayImage};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extensions accepted by [`ImageSequenceSource`]
const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// One decoded grayscale video frame
#[derive(Debug, Clone)]
pub struct Frame {
    index: u64,
    image: GrayImage,
}

impl Frame {
    pub fn new(index: u64, image: GrayImage) -> Self {
        Self { index, image }
    }

    /// Convert a decoded color frame to grayscale, optionally mirroring it
    pub fn from_dynamic(index: u64, image: &DynamicImage, mirror: bool) -> Self {
        let gray = image.to_luma8();
        let gray = if mirror {
            imageops::flip_horizontal(&gray)
        } else {
            gray
        };
        Self::new(index, gray)
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Sequential access to the frames of one video
pub trait FrameSource {
    /// Next frame, or `None` once the video is exhausted
    fn next_frame(&mut self) -> AnalysisResult<Option<Frame>>;
}

/// Frames held in memory
#[derive(Debug)]
pub struct VecFrameSource {
    frames: std::vec::IntoIter<Frame>,
}

impl VecFrameSource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into_iter(),
        }
    }
}

impl FrameSource for VecFrameSource {
    fn next_frame(&mut self) -> AnalysisResult<Option<Frame>> {
        Ok(self.frames.next())
    }
}

/// Frames read from a directory of still images, in file-name order
#[derive(Debug)]
pub struct ImageSequenceSource {
    paths: std::vec::IntoIter<PathBuf>,
    mirror: bool,
    next_index: u64,
}

fn media_read_error(dir: &Path, e: std::io::Error) -> AnalysisError {
    AnalysisError::MediaRead(format!("{}: {}", dir.display(), e))
}

impl ImageSequenceSource {
    /// List the image files of `dir`. Fails if the directory cannot be read.
    pub fn open(dir: &Path, mirror: bool) -> AnalysisResult<Self> {
        let read_error = |e| media_read_error(dir, e);
        let entries = std::fs::read_dir(dir).map_err(read_error)?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(read_error)?.path();
            let is_frame = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_frame {
                paths.push(path);
            }
        }
        paths.sort();

        debug!(dir = %dir.display(), frames = paths.len(), "Opened image sequence");

        Ok(Self {
            paths: paths.into_iter(),
            mirror,
            next_index: 0,
        })
    }

    /// Number of frames not yet read
    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> AnalysisResult<Option<Frame>> {
        let Some(path) = self.paths.next() else {
            return Ok(None);
        };

        let image = image::open(&path).map_err(|e| {
            AnalysisError::MediaRead(format!("{}: {}", path.display(), e))
        })?;

        let frame = Frame::from_dynamic(self.next_index, &image, self.mirror);
        self.next_index += 1;
        Ok(Some(frame))
    }
}
