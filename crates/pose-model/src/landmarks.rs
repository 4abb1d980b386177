//! Face landmark geometry as returned by a landmark detector.
//!
//! Coordinates are in pixels, origin top-left, y growing downward.

use std::ops::Range;

use mo_common::error::{MoError, MoResult};
use serde::{Deserialize, Serialize};

/// Number of points in the standard 68-point facial landmark layout.
pub const NUM_FACIAL_LANDMARKS: usize = 68;

/// Jaw contour, ear to ear, in the 68-point layout.
const CHIN_RANGE: Range<usize> = 0..17;

/// Bridge of the nose, top to bottom, in the 68-point layout.
const NOSE_BRIDGE_RANGE: Range<usize> = 27..31;

/// A 2D pixel coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub const fn to_array(self) -> [f64; 2] {
        [self.x, self.y]
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// Pixel dimensions of a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// The landmark subsets the pose estimator needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceLandmarks {
    /// Jaw contour, ordered from one side of the face to the other.
    pub chin: Vec<Point2D>,

    /// Nose bridge, ordered from the top (between the eyes) downward.
    pub nose_bridge: Vec<Point2D>,
}

impl FaceLandmarks {
    pub fn new(chin: Vec<Point2D>, nose_bridge: Vec<Point2D>) -> Self {
        Self { chin, nose_bridge }
    }

    /// Pick the chin and nose-bridge subsets out of a full 68-point layout.
    pub fn from_68_points(points: &[Point2D]) -> MoResult<Self> {
        if points.len() != NUM_FACIAL_LANDMARKS {
            return Err(MoError::dimension_mismatch(NUM_FACIAL_LANDMARKS, points.len()));
        }
        Ok(Self {
            chin: points[CHIN_RANGE].to_vec(),
            nose_bridge: points[NOSE_BRIDGE_RANGE].to_vec(),
        })
    }

    /// First and last chin points, if the contour is non-empty.
    pub fn chin_ends(&self) -> Option<(Point2D, Point2D)> {
        Some((*self.chin.first()?, *self.chin.last()?))
    }

    /// Top of the nose bridge.
    pub fn nose_bridge_top(&self) -> Option<Point2D> {
        self.nose_bridge.first().copied()
    }
}
