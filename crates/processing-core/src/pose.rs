//! Landmark geometry to normalized head pose.
//!
//! Positions land roughly in `[-1, 1]` per axis. Rotations are offsets
//! divided by `face_turn_max` and are deliberately left unclamped.

use mo_common::config::{AxisConvention, PoseConfig};
use mo_pose_model::landmarks::{FaceLandmarks, FrameSize};
use mo_pose_model::vector::{self, Vector3};
use mo_pose_model::Transform;

/// Face spans at or below this fraction of the frame width are degenerate.
const MIN_FACE_SPAN: f64 = 1e-9;

/// Caller-supplied per-axis multipliers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseScale {
    pub position: Vector3,
    pub rotation: Vector3,
}

impl Default for PoseScale {
    fn default() -> Self {
        Self {
            position: Vector3::ONE,
            rotation: Vector3::ONE,
        }
    }
}

impl From<&PoseConfig> for PoseScale {
    fn from(config: &PoseConfig) -> Self {
        Self {
            position: Vector3::from_array(config.pos_scale),
            rotation: Vector3::from_array(config.rot_scale),
        }
    }
}

/// Converts one frame's landmarks into a raw tracked [`Transform`].
#[derive(Debug, Clone)]
pub struct PoseEstimator {
    face_turn_max: f64,
    axis_convention: AxisConvention,
}

impl PoseEstimator {
    pub fn new(config: &PoseConfig) -> Self {
        Self {
            face_turn_max: config.face_turn_max,
            axis_convention: config.axis_convention,
        }
    }

    pub fn axis_convention(&self) -> AxisConvention {
        self.axis_convention
    }

    /// Estimate the head pose for one frame.
    ///
    /// Returns `None` when there is nothing usable to measure: missing chin
    /// or nose-bridge points, an empty frame, or a zero-width face. Callers
    /// keep their previous pose in that case.
    pub fn estimate(
        &self,
        face: &FaceLandmarks,
        frame: FrameSize,
        scale: &PoseScale,
    ) -> Option<Transform> {
        if frame.is_empty() {
            return None;
        }
        let (side_a, side_b) = face.chin_ends()?;
        let nose = face.nose_bridge_top()?;
        let width = f64::from(frame.width);
        let height = f64::from(frame.height);
        let (a, b) = (side_a.to_array(), side_b.to_array());

        let center = vector::midpoint(a, b);
        let face_turn = vector::vector_diff(center, nose.to_array(), 1.0);
        let face_span = vector::capture_size(a, b, width);
        if face_span <= MIN_FACE_SPAN {
            return None;
        }
        let roll = (b[1] / height - a[1] / height) / face_span;

        let position = Vector3::new(
            vector::normalize(center[0], width),
            self.axis_convention.forward_sign() * vector::normalized_span(a, b, height),
            -vector::normalize(center[1], height),
        )
        .scale(scale.position);

        let rotation = Vector3::new(
            face_turn[1] / self.face_turn_max,
            roll,
            face_turn[0] / self.face_turn_max,
        )
        .scale(scale.rotation);

        let pose = Transform::new(position, rotation);
        pose.is_finite().then_some(pose)
    }
}

impl Default for PoseEstimator {
    fn default() -> Self {
        Self::new(&PoseConfig::default())
    }
}
