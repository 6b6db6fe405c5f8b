//! Eye crop extraction
//!
//! The eye region is the landmark bounding box widened by a margin, with its
//! height derived from the gaze model's aspect ratio. The same rectangle
//! feeds both classifiers, resized to each model's input resolution.

use crate::media::Frame;
use crate::types::{EyeRect, Point};
use image::imageops::{self, FilterType};
use image::GrayImage;
use ndarray::Array2;

/// Gaze model input, width × height
pub const GAZE_PATCH_SIZE: (u32, u32) = (64, 56);

/// Blink model input, width × height
pub const BLINK_PATCH_SIZE: (u32, u32) = (64, 64);

/// Grayscale eye image normalized to `[0, 1]`, indexed `[row, col]`
#[derive(Debug, Clone, PartialEq)]
pub struct EyePatch {
    pixels: Array2<f32>,
}

impl EyePatch {
    pub fn from_gray(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        let pixels = Array2::from_shape_fn((height as usize, width as usize), |(row, col)| {
            image.get_pixel(col as u32, row as u32).0[0] as f32 / 255.0
        });
        Self { pixels }
    }

    pub fn width(&self) -> usize {
        self.pixels.ncols()
    }

    pub fn height(&self) -> usize {
        self.pixels.nrows()
    }

    pub fn pixels(&self) -> &Array2<f32> {
        &self.pixels
    }

    /// Mean intensity, handy for fixture-driven classifiers
    pub fn mean(&self) -> f32 {
        self.pixels.mean().unwrap_or(0.0)
    }
}

/// The two model inputs cut from one eye rectangle
#[derive(Debug, Clone)]
pub struct EyePatches {
    pub rect: EyeRect,
    pub gaze: EyePatch,
    pub blink: EyePatch,
}

/// Crop rectangle around a set of eye landmarks.
///
/// Width is the landmark span times `width_scale`; height keeps the gaze
/// patch aspect ratio. Coordinates truncate toward zero.
pub fn eye_rect(eye_points: &[Point], width_scale: f32) -> Option<EyeRect> {
    let first = eye_points.first()?;
    let (mut x1, mut y1, mut x2, mut y2) = (first.x, first.y, first.x, first.y);
    for p in &eye_points[1..] {
        x1 = x1.min(p.x);
        y1 = y1.min(p.y);
        x2 = x2.max(p.x);
        y2 = y2.max(p.y);
    }

    let cx = (x1 + x2) / 2.0;
    let cy = (y1 + y2) / 2.0;
    let w = (x2 - x1) * width_scale;
    let h = w * GAZE_PATCH_SIZE.1 as f32 / GAZE_PATCH_SIZE.0 as f32;
    let (margin_x, margin_y) = (w / 2.0, h / 2.0);

    Some(EyeRect {
        min_x: (cx - margin_x) as i32,
        min_y: (cy - margin_y) as i32,
        max_x: (cx + margin_x) as i32,
        max_y: (cy + margin_y) as i32,
    })
}

/// Cut `rect` out of the frame and resize it for both models.
///
/// Returns `None` when the rectangle has no overlap with the frame.
pub fn extract_patches(frame: &Frame, rect: EyeRect) -> Option<EyePatches> {
    let clipped = rect.clip(frame.width(), frame.height());
    if clipped.is_empty() {
        return None;
    }

    let crop = imageops::crop_imm(
        frame.image(),
        clipped.min_x as u32,
        clipped.min_y as u32,
        clipped.width() as u32,
        clipped.height() as u32,
    )
    .to_image();

    let gaze = imageops::resize(&crop, GAZE_PATCH_SIZE.0, GAZE_PATCH_SIZE.1, FilterType::Triangle);
    let blink = imageops::resize(
        &crop,
        BLINK_PATCH_SIZE.0,
        BLINK_PATCH_SIZE.1,
        FilterType::Triangle,
    );

    Some(EyePatches {
        rect: clipped,
        gaze: EyePatch::from_gray(&gaze),
        blink: EyePatch::from_gray(&blink),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn eye_points() -> Vec<Point> {
        vec![
            Point::new(100.0, 50.0),
            Point::new(110.0, 45.0),
            Point::new(120.0, 45.0),
            Point::new(130.0, 50.0),
            Point::new(120.0, 55.0),
            Point::new(110.0, 55.0),
        ]
    }

    #[test]
    fn test_eye_rect_geometry() {
        let rect = eye_rect(&eye_points(), 1.2).unwrap();
        // span 30 → w 36, h 31.5; center (115, 50)
        assert_eq!(rect.min_x, 97);
        assert_eq!(rect.max_x, 133);
        assert_eq!(rect.min_y, 34);
        assert_eq!(rect.max_y, 65);
    }

    #[test]
    fn test_eye_rect_empty_points() {
        assert!(eye_rect(&[], 1.2).is_none());
    }

    #[test]
    fn test_patch_shapes_and_normalization() {
        let frame = Frame::new(0, GrayImage::from_pixel(200, 100, Luma([255])));
        let rect = eye_rect(&eye_points(), 1.2).unwrap();
        let patches = extract_patches(&frame, rect).unwrap();

        assert_eq!(patches.gaze.width(), 64);
        assert_eq!(patches.gaze.height(), 56);
        assert_eq!(patches.blink.width(), 64);
        assert_eq!(patches.blink.height(), 64);
        assert!((patches.gaze.mean() - 1.0).abs() < 1e-6);
        assert!(patches.blink.pixels().iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_rect_outside_frame() {
        let frame = Frame::new(0, GrayImage::new(50, 50));
        let rect = EyeRect {
            min_x: 60,
            min_y: 60,
            max_x: 80,
            max_y: 80,
        };
        assert!(extract_patches(&frame, rect).is_none());
    }

    #[test]
    fn test_rect_partially_outside_is_clipped() {
        let frame = Frame::new(0, GrayImage::new(120, 100));
        let rect = eye_rect(&eye_points(), 1.2).unwrap();
        let patches = extract_patches(&frame, rect).unwrap();
        assert_eq!(patches.rect.max_x, 120);
        assert_eq!(patches.gaze.width(), 64);
    }
}
