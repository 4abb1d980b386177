//! Rigid pose samples and the per-tick update rules applied to them.

use mo_common::config::FilterConfig;
use serde::{Deserialize, Serialize};

use crate::vector::Vector3;

/// A position + rotation pair at one point in the filter chain
/// (raw, eased, zero reference, or spring-settled).
///
/// Updates return a new value rather than mutating in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vector3,
    pub rotation: Vector3,
}

/// Blend ratios for [`Transform::spring_step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringRatios {
    /// Position easing toward the target.
    pub pos_ease: f64,
    /// Rotation easing toward the target.
    pub rot_ease: f64,
    /// Position blend of the spring delta.
    pub pos_spring: f64,
    /// Rotation blend of the spring delta.
    pub rot_spring: f64,
    /// Damping applied to the eased-to-target offset.
    pub delta_spring: f64,
}

impl From<&FilterConfig> for SpringRatios {
    fn from(config: &FilterConfig) -> Self {
        Self {
            pos_ease: config.face_move_easing,
            rot_ease: config.face_turn_easing,
            pos_spring: config.face_move_spring,
            rot_spring: config.face_turn_spring,
            delta_spring: config.delta_spring,
        }
    }
}

impl Transform {
    pub const ZERO: Transform = Transform {
        position: Vector3::ZERO,
        rotation: Vector3::ZERO,
    };

    pub const fn new(position: Vector3, rotation: Vector3) -> Self {
        Self { position, rotation }
    }

    /// Lerp position by `pos_ratio` and rotation by `rot_ratio`, independently.
    ///
    /// The target is always present here. An absent pose is handled by the
    /// caller: `FilterPipeline` holds `Option<FilterState>` and the capture
    /// loop skips the advance while nothing is tracked.
    pub fn lerp_to(&self, target: &Transform, pos_ratio: f64, rot_ratio: f64) -> Transform {
        Transform {
            position: self.position.lerp(target.position, pos_ratio),
            rotation: self.rotation.lerp(target.rotation, rot_ratio),
        }
    }

    /// Two-stage update returning `(next_self, next_delta)`.
    ///
    /// The first stage eases toward `target`. The second stage chases a damped
    /// copy of the remaining offset with `delta` and adds the result to the
    /// position only; rotation is the eased rotation, untouched by the spring.
    pub fn spring_step(
        &self,
        target: &Transform,
        delta: &Transform,
        ratios: &SpringRatios,
    ) -> (Transform, Transform) {
        let eased = self.lerp_to(target, ratios.pos_ease, ratios.rot_ease);
        let delta_target = Transform {
            position: eased.position.diff_to(target.position, ratios.delta_spring),
            rotation: eased.rotation.diff_to(target.rotation, ratios.delta_spring),
        };
        let next_delta = delta.lerp_to(&delta_target, ratios.pos_spring, ratios.rot_spring);
        let next = Transform {
            position: eased.position.translate(next_delta.position),
            rotation: eased.rotation,
        };
        (next, next_delta)
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite()
    }
}
