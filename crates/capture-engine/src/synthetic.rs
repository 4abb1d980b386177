//! Synthetic collaborators for offline runs and tests.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::{ImageBuffer, Rgb};
use imageproc::drawing::draw_filled_ellipse_mut;
use mo_common::clock::{RateController, SessionClock};
use mo_common::error::{MoError, MoResult};
use mo_pose_model::landmarks::{FaceLandmarks, FrameSize, Point2D};

use crate::frame::Frame;
use crate::sources::{
    CameraSource, EmotionClassifier, FrameDisplay, LandmarkDetector, PathClassifier, SceneSink,
    SceneUpdate,
};
use crate::state::lock;

/// Paced camera producing a gradient background with a face-coloured blob.
pub struct SyntheticCamera {
    size: FrameSize,
    rate: RateController,
    clock: Option<SessionClock>,
    fail_open: bool,
    max_frames: Option<u64>,
    frames: u64,
    released: Arc<AtomicBool>,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            size: FrameSize::new(width, height),
            rate: RateController::new(fps),
            clock: None,
            fail_open: false,
            max_frames: None,
            frames: 0,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A camera whose `open()` always fails.
    pub fn unavailable() -> Self {
        Self {
            fail_open: true,
            ..Self::new(0, 0, 1)
        }
    }

    /// End the stream after `frames` frames.
    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    /// Flag set once the camera has been released.
    pub fn released_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.released)
    }

    fn render(&self) -> Frame {
        let FrameSize { width, height } = self.size;
        let shade = (self.frames % 64) as u8;
        let mut image = ImageBuffer::from_fn(width, height, |x, y| {
            let gx = (x * 160 / width.max(1)) as u8;
            let gy = (y * 160 / height.max(1)) as u8;
            Rgb([gx.saturating_add(shade), gy, 60])
        });
        draw_filled_ellipse_mut(
            &mut image,
            ((width / 2) as i32, (height / 2) as i32),
            (width / 6).max(1) as i32,
            (height / 4).max(1) as i32,
            Rgb([224, 172, 140]),
        );
        Frame::new(image)
    }
}

impl CameraSource for SyntheticCamera {
    fn open(&mut self) -> MoResult<()> {
        if self.fail_open {
            return Err(MoError::camera_unavailable("synthetic camera configured to fail"));
        }
        if self.size.is_empty() {
            return Err(MoError::camera_unavailable("synthetic camera has no pixels"));
        }
        self.clock = Some(SessionClock::start());
        Ok(())
    }

    fn dimensions(&self) -> FrameSize {
        self.size
    }

    fn read_frame(&mut self) -> MoResult<Option<Frame>> {
        let Some(clock) = self.clock.as_ref() else {
            return Err(MoError::camera_unavailable("synthetic camera is not open"));
        };
        if self.max_frames.is_some_and(|max| self.frames >= max) {
            return Ok(None);
        }

        let wait = self.rate.until_next_tick(clock.elapsed_ns());
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
        self.rate.should_tick(clock.elapsed_ns());

        let frame = self.render();
        self.frames += 1;
        Ok(Some(frame))
    }

    fn release(&mut self) {
        self.clock = None;
        self.released.store(true, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

/// Landmarks for a level face centred on `center`.
///
/// The chin is a 17-point arc from `center.x - half_width` to
/// `center.x + half_width` at the centre's height, and the nose bridge runs
/// down four points from above the centre.
pub fn synthetic_face(center: Point2D, half_width: f64) -> FaceLandmarks {
    let chin = (0..17)
        .map(|i| {
            let t = std::f64::consts::PI * f64::from(i) / 16.0;
            Point2D::new(
                center.x - half_width * t.cos(),
                center.y + half_width * 0.8 * t.sin(),
            )
        })
        .collect();
    let nose_bridge = (0..4)
        .map(|i| Point2D::new(center.x, center.y - half_width * (0.6 - 0.15 * f64::from(i))))
        .collect();
    FaceLandmarks::new(chin, nose_bridge)
}

/// Reports the same face on every frame.
pub struct StaticFaceDetector {
    face: Option<FaceLandmarks>,
}

impl StaticFaceDetector {
    pub fn new(face: FaceLandmarks) -> Self {
        Self { face: Some(face) }
    }

    /// A detector that never finds a face.
    pub fn absent() -> Self {
        Self { face: None }
    }
}

impl LandmarkDetector for StaticFaceDetector {
    fn detect(&mut self, _frame: &Frame) -> MoResult<Option<FaceLandmarks>> {
        Ok(self.face.clone())
    }
}

/// Moves a face on a circle around the frame centre, one step per detection.
pub struct OrbitingFaceDetector {
    radius_ratio: f64,
    step_radians: f64,
    steps: u64,
}

impl OrbitingFaceDetector {
    /// `radius_ratio` is the orbit radius as a fraction of the frame height.
    pub fn new(radius_ratio: f64, step_radians: f64) -> Self {
        Self {
            radius_ratio,
            step_radians,
            steps: 0,
        }
    }
}

impl Default for OrbitingFaceDetector {
    fn default() -> Self {
        Self::new(0.15, 0.02)
    }
}

impl LandmarkDetector for OrbitingFaceDetector {
    fn detect(&mut self, frame: &Frame) -> MoResult<Option<FaceLandmarks>> {
        if frame.is_empty() {
            return Ok(None);
        }
        let (width, height) = (f64::from(frame.width()), f64::from(frame.height()));
        let angle = self.steps as f64 * self.step_radians;
        self.steps += 1;

        let radius = height * self.radius_ratio;
        let center = Point2D::new(
            width / 2.0 + radius * angle.cos(),
            height / 2.0 + radius * angle.sin(),
        );
        // Breathe the face size so the forward axis moves too.
        let half_width = width * (0.15 + 0.03 * (angle * 0.5).sin());
        Ok(Some(synthetic_face(center, half_width)))
    }
}

/// Returns labels from a fixed script, cycling when it runs out.
pub struct ScriptedClassifier {
    labels: Vec<String>,
    next: usize,
}

impl ScriptedClassifier {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            next: 0,
        }
    }

    fn next_label(&mut self) -> Option<String> {
        if self.labels.is_empty() {
            return None;
        }
        let label = self.labels[self.next % self.labels.len()].clone();
        self.next = self.next.wrapping_add(1);
        Some(label)
    }
}

impl EmotionClassifier for ScriptedClassifier {
    fn classify(&mut self, _frame: &Frame) -> MoResult<Option<String>> {
        Ok(self.next_label())
    }
}

/// Path form for file handoff runs; the image must exist on disk.
impl PathClassifier for ScriptedClassifier {
    fn classify_path(&mut self, path: &Path) -> MoResult<Option<String>> {
        if !path.is_file() {
            return Err(MoError::classification(format!(
                "no image at {}",
                path.display()
            )));
        }
        Ok(self.next_label())
    }
}

/// Scene sink that keeps every update it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    updates: Mutex<Vec<SceneUpdate>>,
    resets: AtomicUsize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<SceneUpdate> {
        lock(&self.updates).clone()
    }

    pub fn update_count(&self) -> usize {
        lock(&self.updates).len()
    }

    pub fn last(&self) -> Option<SceneUpdate> {
        lock(&self.updates).last().copied()
    }

    pub fn reset_count(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

impl SceneSink for RecordingSink {
    fn apply(&self, update: &SceneUpdate) {
        lock(&self.updates).push(*update);
    }

    fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

/// Scene sink that drops every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl SceneSink for NullSink {
    fn apply(&self, _update: &SceneUpdate) {}
}

/// Display that writes overlays to the trace log instead of a window.
#[derive(Debug, Default)]
pub struct TracingDisplay {
    shown: Arc<AtomicU64>,
    closed: Arc<AtomicU64>,
}

impl TracingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter of frames shown.
    pub fn shown_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.shown)
    }

    /// Counter of close calls.
    pub fn closed_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.closed)
    }
}

impl FrameDisplay for TracingDisplay {
    fn show(&mut self, frame: &Frame, overlay: &[String]) -> MoResult<()> {
        self.shown.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(
            width = frame.width(),
            height = frame.height(),
            overlay = %overlay.join(" | "),
            "Debug frame"
        );
        Ok(())
    }

    fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::Relaxed);
    }
}
