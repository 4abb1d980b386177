//! Temporal filter chain: tracked → eased → spring-settled.
//!
//! The pipeline is either uncalibrated (no state at all) or calibrated
//! (every stage set). [`FilterPipeline::calibrate`] is the only way in and
//! the only way to reset drift; [`FilterPipeline::advance`] moves a
//! calibrated chain forward by one captured frame.

use mo_common::config::FilterConfig;
use mo_pose_model::transform::SpringRatios;
use mo_pose_model::{Transform, Vector3};

/// Per-stage state of a calibrated pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterState {
    /// Reference pose captured at calibration.
    pub zero: Transform,
    /// Low-pass filtered pose.
    pub eased: Transform,
    /// Auxiliary delta used only by the spring stage.
    pub spring_delta: Transform,
    /// Final spring-damped pose reported outward.
    pub settled: Transform,
}

/// Result of one [`FilterPipeline::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The chain moved forward one tick.
    Advanced,
    /// No calibration yet; nothing changed.
    Uncalibrated,
}

/// Owns the filter chain and its calibration.
#[derive(Debug, Clone)]
pub struct FilterPipeline {
    ratios: SpringRatios,
    state: Option<FilterState>,
}

impl FilterPipeline {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            ratios: SpringRatios::from(config),
            state: None,
        }
    }

    /// Anchor the zero pose at `raw` and reset every stage to it.
    ///
    /// Works both for the first calibration and to re-anchor a running chain.
    pub fn calibrate(&mut self, raw: &Transform) {
        let recalibration = self.state.is_some();
        self.state = Some(FilterState {
            zero: *raw,
            eased: *raw,
            spring_delta: Transform::ZERO,
            settled: *raw,
        });
        tracing::debug!(
            recalibration,
            position = %format_args!("{:.3}", raw.position),
            rotation = %format_args!("{:.3}", raw.rotation),
            "Filter pipeline calibrated"
        );
    }

    /// Move the chain one tick toward `raw`.
    ///
    /// Eases toward the raw sample, then springs the settled pose toward the
    /// eased one. A no-op while uncalibrated.
    pub fn advance(&mut self, raw: &Transform) -> AdvanceOutcome {
        let Some(state) = self.state.as_mut() else {
            tracing::trace!("Advance skipped: pipeline not calibrated");
            return AdvanceOutcome::Uncalibrated;
        };

        let r = &self.ratios;
        state.eased = state.eased.lerp_to(raw, r.pos_ease, r.rot_ease);
        let (settled, spring_delta) =
            state
                .settled
                .spring_step(&state.eased, &state.spring_delta, r);
        state.settled = settled;
        state.spring_delta = spring_delta;
        AdvanceOutcome::Advanced
    }

    pub fn is_calibrated(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&FilterState> {
        self.state.as_ref()
    }

    pub fn settled(&self) -> Option<Transform> {
        self.state.map(|s| s.settled)
    }

    /// Settled position, or its offset from the zero pose when `absolute`
    /// is false. `None` until calibrated.
    pub fn reported_pose(&self, absolute: bool) -> Option<Vector3> {
        let state = self.state.as_ref()?;
        Some(if absolute {
            state.settled.position
        } else {
            state.zero.position.diff_to(state.settled.position, 1.0)
        })
    }

    pub fn ratios(&self) -> &SpringRatios {
        &self.ratios
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::new(&FilterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pose(px: f64, py: f64, pz: f64, rx: f64, ry: f64, rz: f64) -> Transform {
        Transform::new(Vector3::new(px, py, pz), Vector3::new(rx, ry, rz))
    }

    #[test]
    fn test_advance_before_calibration_is_noop() {
        let mut pipeline = FilterPipeline::default();
        let outcome = pipeline.advance(&pose(0.5, 0.5, 0.5, 0.1, 0.1, 0.1));

        assert_eq!(outcome, AdvanceOutcome::Uncalibrated);
        assert!(!pipeline.is_calibrated());
        assert!(pipeline.state().is_none());
        assert!(pipeline.reported_pose(true).is_none());
        assert!(pipeline.reported_pose(false).is_none());
    }

    #[test]
    fn test_calibration_sets_every_stage() {
        let mut pipeline = FilterPipeline::default();
        let p = pose(0.2, -0.4, 0.1, 0.3, 0.0, -0.2);
        pipeline.calibrate(&p);

        let state = pipeline.state().unwrap();
        assert_eq!(state.zero, p);
        assert_eq!(state.eased, p);
        assert_eq!(state.settled, p);
        assert_eq!(state.spring_delta, Transform::ZERO);
    }

    #[test]
    fn test_calibration_origin() {
        let mut pipeline = FilterPipeline::default();
        let p = pose(0.2, -0.4, 0.1, 0.3, 0.0, -0.2);
        pipeline.calibrate(&p);

        assert_eq!(pipeline.reported_pose(false), Some(Vector3::ZERO));
        assert_eq!(pipeline.reported_pose(true), Some(p.position));
    }

    #[test]
    fn test_recalibration_reanchors_zero() {
        let mut pipeline = FilterPipeline::default();
        let first = pose(0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let moved = pose(0.5, 0.0, -0.5, 0.2, 0.0, 0.0);
        pipeline.calibrate(&first);
        for _ in 0..50 {
            pipeline.advance(&moved);
        }
        assert!(pipeline.reported_pose(false).unwrap().length() > 0.01);

        pipeline.calibrate(&moved);
        assert_eq!(pipeline.reported_pose(false), Some(Vector3::ZERO));
        assert_eq!(pipeline.state().unwrap().zero, moved);
    }

    #[test]
    fn test_spring_converges_to_constant_input() {
        let mut pipeline = FilterPipeline::default();
        pipeline.calibrate(&pose(0.0, 0.0, 0.0, 0.0, 0.0, 0.0));
        let target = pose(0.6, -0.3, 0.9, 0.4, -0.2, 0.1);

        for _ in 0..2000 {
            assert_eq!(pipeline.advance(&target), AdvanceOutcome::Advanced);
        }

        let settled = pipeline.settled().unwrap();
        assert!(settled.position.max_abs_diff(target.position) < 1e-6);
        assert!(settled.rotation.max_abs_diff(target.rotation) < 1e-6);
        let delta = pipeline.state().unwrap().spring_delta;
        assert!(delta.position.length() < 1e-6, "spring delta should die out");
    }

    #[test]
    fn test_no_sustained_oscillation() {
        let mut pipeline = FilterPipeline::default();
        pipeline.calibrate(&Transform::ZERO);
        let target = pose(1.0, 0.0, 0.0, 0.0, 0.0, 0.0);

        let mut errors = Vec::new();
        for _ in 0..1000 {
            pipeline.advance(&target);
            errors.push((pipeline.settled().unwrap().position.x - 1.0).abs());
        }

        // Peak error over each later window keeps shrinking.
        let window_peak = |range: std::ops::Range<usize>| {
            errors[range].iter().copied().fold(0.0f64, f64::max)
        };
        assert!(window_peak(200..400) < window_peak(0..200));
        assert!(window_peak(400..600) < window_peak(200..400));
        assert!(window_peak(800..1000) < 1e-4);
    }

    #[test]
    fn test_eased_stage_follows_raw() {
        let mut pipeline = FilterPipeline::default();
        pipeline.calibrate(&Transform::ZERO);
        pipeline.advance(&pose(1.0, 0.0, 0.0, 1.0, 0.0, 0.0));

        let state = pipeline.state().unwrap();
        assert!((state.eased.position.x - 0.04).abs() < 1e-12);
        assert!((state.eased.rotation.x - 0.08).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn calibrate_then_report_is_origin(
            x in -5.0f64..5.0, y in -5.0f64..5.0, z in -5.0f64..5.0,
            rx in -3.0f64..3.0, ry in -3.0f64..3.0, rz in -3.0f64..3.0,
        ) {
            let mut pipeline = FilterPipeline::default();
            let p = pose(x, y, z, rx, ry, rz);
            pipeline.calibrate(&p);
            prop_assert_eq!(pipeline.reported_pose(false), Some(Vector3::ZERO));
            prop_assert_eq!(pipeline.reported_pose(true), Some(p.position));
        }
    }
}
