//! Bodies of the capture, pose and emotion threads.
//!
//! Each loop checks the stop signal once per iteration. Per-iteration
//! collaborator failures are logged and counted, never propagated. A
//! collaborator panic is contained to the call that raised it, so the
//! capture thread always hands the camera back for release.

use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use mo_common::config::LoopConfig;
use mo_pose_model::Vibe;
use mo_processing_core::{AdvanceOutcome, PoseEstimator};

use crate::frame::Frame;
use crate::sources::{
    CameraSource, EmotionClassifier, FrameDisplay, LandmarkDetector, SceneSink, SceneUpdate,
};
use crate::state::{lock, FeatureSwitches, LatestFrame, SharedState, StatCounters};

/// Poll interval of the pose loop while waiting for a frame it has not seen.
const NEW_FRAME_POLL: Duration = Duration::from_millis(2);

/// What the capture thread hands back to the manager when it exits.
pub(crate) struct CaptureExit {
    pub camera: Box<dyn CameraSource>,
    /// Whether the camera was opened and so needs releasing.
    pub opened: bool,
    pub display: Option<Box<dyn FrameDisplay>>,
}

pub(crate) fn run_capture(
    shared: Arc<SharedState>,
    mut camera: Box<dyn CameraSource>,
    mut display: Option<Box<dyn FrameDisplay>>,
    scene: Arc<dyn SceneSink>,
    loops: LoopConfig,
) -> CaptureExit {
    match guarded(&shared, "capture", || camera.open()) {
        Some(Ok(())) => {}
        Some(Err(e)) => {
            tracing::error!(camera = camera.name(), error = %e, "Camera failed to open; capture loop exiting");
            return CaptureExit {
                camera,
                opened: false,
                display,
            };
        }
        // The device may be partially open; let the manager release it.
        None => {
            return CaptureExit {
                camera,
                opened: true,
                display,
            };
        }
    }

    let size = camera.dimensions();
    let _ = shared.frame_size.set(size);
    tracing::info!(
        camera = camera.name(),
        width = size.width,
        height = size.height,
        "Camera opened"
    );

    let idle = Duration::from_millis(loops.idle_interval_ms);
    let mut cursor = CaptureCursor::default();

    while shared.stop.is_running() {
        let step = guarded(&shared, "capture", || {
            capture_step(
                &shared,
                camera.as_mut(),
                &mut display,
                scene.as_ref(),
                &loops,
                &mut cursor,
            )
        });
        if step != Some(true) {
            shared.stop.sleep(idle);
        }
    }

    tracing::debug!(frames = cursor.seq, "Capture loop exited");
    CaptureExit {
        camera,
        opened: true,
        display,
    }
}

#[derive(Default)]
struct CaptureCursor {
    seq: u64,
    display_open: bool,
}

/// Read, publish and push one frame. `false` when no frame was read.
fn capture_step(
    shared: &SharedState,
    camera: &mut dyn CameraSource,
    display: &mut Option<Box<dyn FrameDisplay>>,
    scene: &dyn SceneSink,
    loops: &LoopConfig,
    cursor: &mut CaptureCursor,
) -> bool {
    let mut frame = match camera.read_frame() {
        Ok(Some(frame)) => frame,
        Ok(None) => {
            StatCounters::bump(&shared.stats.frame_read_failures);
            tracing::trace!("No frame available");
            return false;
        }
        Err(e) => {
            StatCounters::bump(&shared.stats.frame_read_failures);
            tracing::warn!(error = %e, "Frame read failed");
            return false;
        }
    };

    if loops.contrast_normalization {
        frame.normalize_contrast();
    }
    let frame = Arc::new(frame);
    cursor.seq += 1;
    *lock(&shared.frame) = Some(LatestFrame {
        seq: cursor.seq,
        frame: Arc::clone(&frame),
    });
    StatCounters::bump(&shared.stats.frames_captured);

    if let Some(update) = advance_filter(shared) {
        scene.apply(&update);
        StatCounters::bump(&shared.stats.scene_updates);
    }

    if let Some(display) = display.as_mut() {
        if FeatureSwitches::get(&shared.features.show_display) {
            render_overlay(shared, display.as_mut(), &frame);
            cursor.display_open = true;
        } else if cursor.display_open {
            display.close();
            cursor.display_open = false;
        }
    }
    true
}

/// Advance the filter toward the latest tracked pose and build the scene
/// update. `None` while nothing is tracked or before calibration. An
/// emotion with no vibe still pushes the head transform.
fn advance_filter(shared: &SharedState) -> Option<SceneUpdate> {
    let raw = shared.tracked()?;
    let absolute = FeatureSwitches::get(&shared.features.absolute_position);

    let (position, rotation) = {
        let mut pipeline = lock(&shared.pipeline);
        if pipeline.advance(&raw) == AdvanceOutcome::Uncalibrated {
            return None;
        }
        (pipeline.reported_pose(absolute)?, pipeline.settled()?.rotation)
    };

    let vibe = Vibe::from_label(&shared.emotion()).ok();
    Some(SceneUpdate::new(position, rotation, vibe))
}

/// Run one collaborator call, containing a panic so the loop keeps its
/// resources and carries on. `None` when the call panicked.
fn guarded<T>(shared: &SharedState, task: &str, call: impl FnOnce() -> T) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(value) => Some(value),
        Err(payload) => {
            StatCounters::bump(&shared.stats.collaborator_panics);
            tracing::error!(
                task,
                panic = panic_message(&*payload),
                "Collaborator panicked"
            );
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

fn render_overlay(shared: &SharedState, display: &mut dyn FrameDisplay, frame: &Frame) {
    let overlay = match shared.snapshot() {
        Ok(snapshot) => snapshot.lines(),
        Err(e) => vec![e.to_string()],
    };
    if let Err(e) = display.show(frame, &overlay) {
        tracing::warn!(error = %e, "Debug display failed");
    }
}

pub(crate) fn run_pose(
    shared: Arc<SharedState>,
    mut detector: Box<dyn LandmarkDetector>,
    estimator: PoseEstimator,
    loops: LoopConfig,
) {
    let idle = Duration::from_millis(loops.idle_interval_ms);
    let mut last_seq = 0u64;

    while shared.stop.is_running() {
        if !FeatureSwitches::get(&shared.features.track_head) {
            shared.stop.sleep(idle);
            continue;
        }
        let Some(latest) = shared.latest_frame().filter(|l| l.seq != last_seq) else {
            shared.stop.sleep(NEW_FRAME_POLL);
            continue;
        };
        last_seq = latest.seq;

        let face = match guarded(&shared, "pose", || detector.detect(&latest.frame)) {
            Some(Ok(Some(face))) => face,
            Some(Ok(None)) => {
                StatCounters::bump(&shared.stats.detection_misses);
                tracing::trace!(seq = latest.seq, "No face detected");
                continue;
            }
            Some(Err(e)) => {
                StatCounters::bump(&shared.stats.detection_misses);
                tracing::warn!(seq = latest.seq, error = %e, "Landmark detection failed");
                continue;
            }
            None => {
                StatCounters::bump(&shared.stats.detection_misses);
                continue;
            }
        };

        let size = shared
            .frame_size
            .get()
            .copied()
            .unwrap_or_else(|| latest.frame.size());
        let Some(pose) = estimator.estimate(&face, size, &shared.pose_scale()) else {
            StatCounters::bump(&shared.stats.detection_misses);
            tracing::trace!(seq = latest.seq, "Landmarks unusable for pose estimation");
            continue;
        };

        *lock(&shared.tracked) = Some(pose);
        StatCounters::bump(&shared.stats.poses_tracked);
        if shared.calibrate_if_pending(&pose) {
            tracing::info!(position = %pose.position, "Zero pose calibrated");
        }
    }

    tracing::debug!("Pose loop exited");
}

pub(crate) fn run_emotion(
    shared: Arc<SharedState>,
    mut classifier: Box<dyn EmotionClassifier>,
    loops: LoopConfig,
) {
    let interval = Duration::from_millis(loops.emotion_interval_ms);
    let idle = Duration::from_millis(loops.idle_interval_ms);
    let mut unmapped_seen = HashSet::new();

    while shared.stop.is_running() {
        if !FeatureSwitches::get(&shared.features.track_emotions) {
            shared.stop.sleep(interval);
            continue;
        }
        let Some(latest) = shared.latest_frame() else {
            shared.stop.sleep(idle);
            continue;
        };

        match guarded(&shared, "emotion", || classifier.classify(&latest.frame)) {
            Some(Ok(Some(label))) => {
                if let Err(e) = Vibe::from_label(&label) {
                    if unmapped_seen.insert(label.clone()) {
                        tracing::warn!(error = %e, "Classifier returned an unmapped emotion");
                    }
                }
                tracing::debug!(emotion = %label, "Emotion classified");
                *lock(&shared.emotion) = label;
                StatCounters::bump(&shared.stats.emotions_classified);
            }
            Some(Ok(None)) => {
                StatCounters::bump(&shared.stats.classification_misses);
                tracing::trace!("No emotion classified");
            }
            Some(Err(e)) => {
                StatCounters::bump(&shared.stats.classification_misses);
                tracing::warn!(error = %e, "Emotion classification failed");
            }
            None => StatCounters::bump(&shared.stats.classification_misses),
        }

        shared.stop.sleep(interval);
    }

    tracing::debug!("Emotion loop exited");
}
