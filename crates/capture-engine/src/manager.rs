//! Lifecycle controller for the three capture loops.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use mo_common::clock::SessionClock;
use mo_common::config::{FeatureFlags, TrackingConfig};
use mo_common::error::{MoError, MoResult};
use mo_pose_model::landmarks::FrameSize;
use mo_pose_model::Transform;
use mo_processing_core::{FilterState, PoseEstimator, PoseScale, Snapshot};

use crate::loops::{self, CaptureExit};
use crate::sources::{CameraSource, EmotionClassifier, FrameDisplay, LandmarkDetector, SceneSink};
use crate::state::{lock, FeatureSwitches, LoopStats, SharedState};

/// External services a manager drives.
pub struct Collaborators {
    pub camera: Box<dyn CameraSource>,
    pub detector: Box<dyn LandmarkDetector>,
    pub classifier: Box<dyn EmotionClassifier>,
    pub scene: Arc<dyn SceneSink>,
    /// Optional debug view; without one `show_display` has no effect.
    pub display: Option<Box<dyn FrameDisplay>>,
}

/// Manager lifecycle. A manager runs at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Idle,
    Running,
    Stopped,
}

struct Workers {
    capture: JoinHandle<CaptureExit>,
    pose: JoinHandle<()>,
    emotion: JoinHandle<()>,
}

/// Owns the capture, pose and emotion threads and the state they share.
///
/// `start()` returns immediately; `stop()` blocks until every loop has
/// exited, then releases the camera and resets the scene.
pub struct CaptureLoopManager {
    config: TrackingConfig,
    shared: Arc<SharedState>,
    scene: Arc<dyn SceneSink>,
    collaborators: Option<Collaborators>,
    workers: Option<Workers>,
    clock: Option<SessionClock>,
    state: ManagerState,
}

impl CaptureLoopManager {
    pub fn new(config: TrackingConfig, collaborators: Collaborators) -> Self {
        Self {
            shared: Arc::new(SharedState::new(&config)),
            scene: Arc::clone(&collaborators.scene),
            config,
            collaborators: Some(collaborators),
            workers: None,
            clock: None,
            state: ManagerState::Idle,
        }
    }

    /// Spawn the three loops.
    pub fn start(&mut self) -> MoResult<()> {
        if self.state != ManagerState::Idle {
            return Err(MoError::unsupported(format!(
                "capture loops cannot start from state {:?}",
                self.state
            )));
        }
        let Some(collaborators) = self.collaborators.take() else {
            return Err(MoError::unsupported("capture loops have no collaborators"));
        };
        let Collaborators {
            camera,
            detector,
            classifier,
            scene,
            display,
        } = collaborators;

        tracing::info!(camera = camera.name(), "Starting capture loops");
        self.shared.stop.start();
        self.shared.calibration_pending.store(true, Ordering::SeqCst);

        let loops_config = self.config.loops.clone();
        let shared = Arc::clone(&self.shared);
        let capture = match spawn_named("mo-capture", move || {
            loops::run_capture(shared, camera, display, scene, loops_config)
        }) {
            Ok(handle) => handle,
            Err(e) => return Err(self.abort_start(e, None, None)),
        };

        let loops_config = self.config.loops.clone();
        let shared = Arc::clone(&self.shared);
        let estimator = PoseEstimator::new(&self.config.pose);
        let pose = match spawn_named("mo-pose", move || {
            loops::run_pose(shared, detector, estimator, loops_config)
        }) {
            Ok(handle) => handle,
            Err(e) => return Err(self.abort_start(e, Some(capture), None)),
        };

        let loops_config = self.config.loops.clone();
        let shared = Arc::clone(&self.shared);
        let emotion = match spawn_named("mo-emotion", move || {
            loops::run_emotion(shared, classifier, loops_config)
        }) {
            Ok(handle) => handle,
            Err(e) => return Err(self.abort_start(e, Some(capture), Some(pose))),
        };

        self.workers = Some(Workers {
            capture,
            pose,
            emotion,
        });
        let clock = SessionClock::start();
        tracing::info!(started_at = clock.epoch_wall(), "Capture loops started");
        self.clock = Some(clock);
        self.state = ManagerState::Running;
        Ok(())
    }

    /// Unwind a partially started manager after a spawn failure.
    fn abort_start(
        &mut self,
        error: MoError,
        capture: Option<JoinHandle<CaptureExit>>,
        pose: Option<JoinHandle<()>>,
    ) -> MoError {
        tracing::error!(error = %error, "Failed to spawn capture loop thread");
        self.shared.stop.stop();
        if let Some(capture) = capture {
            self.finish_capture(capture.join());
        }
        if let Some(pose) = pose {
            join_logged("pose", pose);
        }
        self.state = ManagerState::Stopped;
        error
    }

    /// Stop all loops, wait for them, release the camera and reset the scene.
    pub fn stop(&mut self) -> MoResult<LoopStats> {
        if self.state != ManagerState::Running {
            return Err(MoError::unsupported(format!(
                "capture loops cannot stop from state {:?}",
                self.state
            )));
        }
        tracing::info!("Stopping capture loops");
        self.shared.stop.stop();

        if let Some(workers) = self.workers.take() {
            self.finish_capture(workers.capture.join());
            join_logged("pose", workers.pose);
            join_logged("emotion", workers.emotion);
        }

        self.scene.reset();
        self.state = ManagerState::Stopped;

        let stats = self.stats();
        tracing::info!(
            uptime_secs = self.uptime_secs().unwrap_or_default(),
            frames = stats.frames_captured,
            poses = stats.poses_tracked,
            emotions = stats.emotions_classified,
            "Capture loops stopped"
        );
        Ok(stats)
    }

    fn finish_capture(&self, joined: thread::Result<CaptureExit>) {
        match joined {
            Ok(mut exit) => {
                if exit.opened {
                    exit.camera.release();
                    tracing::info!(camera = exit.camera.name(), "Camera released");
                }
                if let Some(display) = exit.display.as_mut() {
                    display.close();
                }
            }
            Err(_) => tracing::error!("Capture loop panicked; camera could not be released"),
        }
    }

    /// Re-anchor the zero pose on the latest tracked pose. Returns `false`
    /// when nothing has been tracked yet.
    pub fn calibrate(&self) -> bool {
        let Some(pose) = self.shared.tracked() else {
            tracing::debug!("Calibration skipped; no tracked pose yet");
            return false;
        };
        lock(&self.shared.pipeline).calibrate(&pose);
        tracing::info!(position = %pose.position, "Zero pose calibrated");
        true
    }

    /// Re-anchor on the next successful pose read.
    pub fn request_calibration(&self) {
        self.shared.calibration_pending.store(true, Ordering::SeqCst);
    }

    /// Formatted view of the filter state and vibe; empty before calibration.
    pub fn snapshot(&self) -> MoResult<Snapshot> {
        self.shared.snapshot()
    }

    pub fn features(&self) -> FeatureFlags {
        self.shared.features.snapshot()
    }

    pub fn set_track_head(&self, enabled: bool) {
        FeatureSwitches::set(&self.shared.features.track_head, enabled);
    }

    pub fn set_track_emotions(&self, enabled: bool) {
        FeatureSwitches::set(&self.shared.features.track_emotions, enabled);
    }

    pub fn set_show_display(&self, enabled: bool) {
        FeatureSwitches::set(&self.shared.features.show_display, enabled);
    }

    pub fn set_absolute_position(&self, enabled: bool) {
        FeatureSwitches::set(&self.shared.features.absolute_position, enabled);
    }

    pub fn pose_scale(&self) -> PoseScale {
        self.shared.pose_scale()
    }

    /// Applies to poses estimated after the call.
    pub fn set_pose_scale(&self, scale: PoseScale) {
        self.shared.set_pose_scale(scale);
    }

    /// Camera frame size, known once the camera has opened.
    pub fn frame_size(&self) -> Option<FrameSize> {
        self.shared.frame_size.get().copied()
    }

    /// Latest raw (unfiltered) tracked pose.
    pub fn latest_pose(&self) -> Option<Transform> {
        self.shared.tracked()
    }

    pub fn emotion(&self) -> String {
        self.shared.emotion()
    }

    pub fn filter_state(&self) -> Option<FilterState> {
        lock(&self.shared.pipeline).state().copied()
    }

    pub fn stats(&self) -> LoopStats {
        self.shared.stats.snapshot()
    }

    pub fn uptime_secs(&self) -> Option<f64> {
        self.clock.as_ref().map(SessionClock::elapsed_secs)
    }

    pub fn is_running(&self) -> bool {
        self.state == ManagerState::Running
    }

    pub fn state(&self) -> ManagerState {
        self.state
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }
}

impl Drop for CaptureLoopManager {
    fn drop(&mut self) {
        if self.state == ManagerState::Running {
            if let Err(e) = self.stop() {
                tracing::warn!(error = %e, "Failed to stop capture loops on drop");
            }
        }
    }
}

fn spawn_named<T, F>(name: &str, body: F) -> MoResult<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    Ok(thread::Builder::new().name(name.to_string()).spawn(body)?)
}

fn join_logged(name: &str, handle: JoinHandle<()>) {
    if handle.join().is_err() {
        tracing::error!(task = name, "Capture loop thread panicked");
    }
}
