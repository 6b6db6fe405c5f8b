//! Core data types
//!
//! This module defines the values that flow between the eye tracker, the audio
//! window classifier and the score aggregator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of landmark points produced per face
pub const LANDMARK_COUNT: usize = 68;

/// Landmark indices of the eye used for gaze and blink classification
pub const LEFT_EYE_POINTS: std::ops::Range<usize> = 36..42;

/// Gaze direction reported by the gaze classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GazeLabel {
    Center,
    Left,
    Right,
}

impl GazeLabel {
    /// Class order of the gaze model's output vector
    pub const CLASSES: [GazeLabel; 3] = [GazeLabel::Center, GazeLabel::Left, GazeLabel::Right];

    /// Whether this label counts towards a gaze-aversion run
    pub fn is_averted(self) -> bool {
        matches!(self, GazeLabel::Left | GazeLabel::Right)
    }

    /// Pick the label with the highest probability from a model output vector.
    ///
    /// Returns `None` when the vector is empty or contains NaN at the maximum.
    pub fn from_probabilities(probabilities: &[f32]) -> Option<Self> {
        let (idx, _) = probabilities
            .iter()
            .take(Self::CLASSES.len())
            .enumerate()
            .filter(|(_, p)| !p.is_nan())
            .fold(None, |best: Option<(usize, f32)>, (i, &p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((i, p)),
            })?;
        Some(Self::CLASSES[idx])
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GazeLabel::Center => "center",
            GazeLabel::Left => "left",
            GazeLabel::Right => "right",
        }
    }
}

impl fmt::Display for GazeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GazeLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "center" => Ok(GazeLabel::Center),
            "left" => Ok(GazeLabel::Left),
            "right" => Ok(GazeLabel::Right),
            other => Err(format!("unknown gaze label: {other}")),
        }
    }
}

/// 2-D landmark coordinate in frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Ordered 68-point landmark set for one detected face
#[derive(Debug, Clone, PartialEq)]
pub struct FaceLandmarks {
    points: Vec<Point>,
}

impl FaceLandmarks {
    /// Wrap a landmark vector. Returns `None` unless exactly 68 points are given.
    pub fn new(points: Vec<Point>) -> Option<Self> {
        (points.len() == LANDMARK_COUNT).then_some(Self { points })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Landmarks outlining the classified eye (points 36-41)
    pub fn left_eye(&self) -> &[Point] {
        &self.points[LEFT_EYE_POINTS]
    }
}

/// Half-open pixel rectangle `[min_x, max_x) × [min_y, max_y)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeRect {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl EyeRect {
    pub fn width(&self) -> i32 {
        (self.max_x - self.min_x).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.max_y - self.min_y).max(0)
    }

    /// Intersect with a `width × height` frame
    pub fn clip(&self, width: u32, height: u32) -> EyeRect {
        let w = width as i32;
        let h = height as i32;
        EyeRect {
            min_x: self.min_x.clamp(0, w),
            min_y: self.min_y.clamp(0, h),
            max_x: self.max_x.clamp(0, w),
            max_y: self.max_y.clamp(0, h),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// Event counts produced by the eye-state tracker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeCounts {
    pub gaze_count: u32,
    pub blink_count: u32,
}

/// Per-signal bucketed sub-scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubScores {
    pub disfluency: u32,
    pub blink: u32,
    pub gaze: u32,
}

/// Full result of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub disfluency_count: u32,
    pub gaze_count: u32,
    pub blink_count: u32,
    pub sub_scores: SubScores,
    pub composite_score: f64,
}
