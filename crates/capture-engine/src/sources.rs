//! Collaborator interfaces the capture loops drive.
//!
//! Camera access, landmark detection and emotion classification are
//! external services; the loops only depend on these traits. The scene sink
//! is the outward push interface fed on every filter advance.

use std::path::{Path, PathBuf};

use mo_common::config::LoopConfig;
use mo_common::error::MoResult;
use mo_pose_model::landmarks::{FaceLandmarks, FrameSize};
use mo_pose_model::{Vector3, Vibe};
use serde::Serialize;

use crate::frame::Frame;

/// A frame source such as a webcam.
///
/// The source is opened once by the capture loop and released by the
/// manager after the loops have stopped.
pub trait CameraSource: Send {
    /// Open the device. Failure is [`MoError::CameraUnavailable`].
    ///
    /// [`MoError::CameraUnavailable`]: mo_common::error::MoError::CameraUnavailable
    fn open(&mut self) -> MoResult<()>;

    /// Frame dimensions; valid after a successful [`open`](Self::open).
    fn dimensions(&self) -> FrameSize;

    /// Read the next frame. `Ok(None)` means no frame is available
    /// (end of stream or a dropped read).
    fn read_frame(&mut self) -> MoResult<Option<Frame>>;

    fn release(&mut self);

    /// Source name for logging.
    fn name(&self) -> &str;
}

/// Finds the face landmarks in a frame.
pub trait LandmarkDetector: Send {
    /// `Ok(None)` when no face is visible.
    fn detect(&mut self, frame: &Frame) -> MoResult<Option<FaceLandmarks>>;
}

/// Classifies the dominant emotion of the face in a frame.
pub trait EmotionClassifier: Send {
    /// `Ok(None)` when no face could be classified.
    fn classify(&mut self, frame: &Frame) -> MoResult<Option<String>>;
}

/// A classifier that only accepts image files.
pub trait PathClassifier: Send {
    fn classify_path(&mut self, path: &Path) -> MoResult<Option<String>>;
}

/// Adapts a [`PathClassifier`] by writing each frame to a transient PNG.
pub struct FileHandoffClassifier<C> {
    inner: C,
    capture_file: PathBuf,
}

impl<C: PathClassifier> FileHandoffClassifier<C> {
    pub fn new(inner: C, capture_file: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            capture_file: capture_file.into(),
        }
    }

    /// Hand frames off through the configured `loops.capture_file`.
    pub fn from_config(inner: C, loops: &LoopConfig) -> Self {
        Self::new(inner, loops.capture_file.clone())
    }

    pub fn capture_file(&self) -> &Path {
        &self.capture_file
    }
}

impl<C: PathClassifier> EmotionClassifier for FileHandoffClassifier<C> {
    fn classify(&mut self, frame: &Frame) -> MoResult<Option<String>> {
        frame.save_png(&self.capture_file)?;
        self.inner.classify_path(&self.capture_file)
    }
}

/// One push to the scene: the filtered head transform and current vibe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SceneUpdate {
    /// Settled position, absolute or relative to the zero pose.
    pub position: Vector3,
    /// Settled rotation (pitch, roll, yaw).
    pub rotation: Vector3,
    /// `None` while the current emotion label has no vibe.
    pub vibe: Option<Vibe>,
    /// Signed vibe weight (up = 1, mid = 0, down = -1).
    pub vibe_factor: Option<i32>,
}

impl SceneUpdate {
    pub fn new(position: Vector3, rotation: Vector3, vibe: Option<Vibe>) -> Self {
        Self {
            position,
            rotation,
            vibe,
            vibe_factor: vibe.as_ref().map(Vibe::factor),
        }
    }
}

/// Consumer of filtered head transforms, called from the capture loop.
pub trait SceneSink: Send + Sync {
    fn apply(&self, update: &SceneUpdate);

    /// Return the controlled object to its neutral pose. Called once after
    /// the loops stop.
    fn reset(&self) {}
}

/// Debug view of the live frame with overlay text.
pub trait FrameDisplay: Send {
    fn show(&mut self, frame: &Frame, overlay: &[String]) -> MoResult<()>;

    /// Tear down the view; called when display is switched off or the loops stop.
    fn close(&mut self) {}
}
