use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use mo_capture_engine::synthetic::{
    synthetic_face, OrbitingFaceDetector, RecordingSink, ScriptedClassifier, StaticFaceDetector,
    SyntheticCamera, TracingDisplay,
};
use mo_capture_engine::{
    CameraSource, CaptureLoopManager, Collaborators, FileHandoffClassifier, Frame, ManagerState,
};
use mo_common::config::TrackingConfig;
use mo_common::error::{MoError, MoResult};
use mo_pose_model::landmarks::{FrameSize, Point2D};
use mo_pose_model::Vibe;
use mo_processing_core::Snapshot;

const WIDTH: u32 = 64;
const HEIGHT: u32 = 48;
const FPS: u32 = 200;
const DEADLINE: Duration = Duration::from_secs(5);

fn fast_config() -> TrackingConfig {
    mo_common::logging::init_test_logging();
    let mut config = TrackingConfig::default();
    config.loops.emotion_interval_ms = 10;
    config.loops.idle_interval_ms = 5;
    config.loops.capture_file = std::env::temp_dir()
        .join(format!("mo-lifecycle-{}", std::process::id()))
        .join("cap.png");
    config.features.show_display = false;
    config
}

fn centred_face() -> StaticFaceDetector {
    StaticFaceDetector::new(synthetic_face(
        Point2D::new(f64::from(WIDTH) / 2.0, f64::from(HEIGHT) / 2.0),
        10.0,
    ))
}

fn collaborators(camera: SyntheticCamera, emotion: &str, sink: Arc<RecordingSink>) -> Collaborators {
    Collaborators {
        camera: Box::new(camera),
        detector: Box::new(centred_face()),
        classifier: Box::new(ScriptedClassifier::new([emotion])),
        scene: sink,
        display: None,
    }
}

/// Camera whose driver panics on one read, then recovers.
struct PanickingCamera {
    inner: SyntheticCamera,
    reads: u64,
    panic_on: u64,
}

impl CameraSource for PanickingCamera {
    fn open(&mut self) -> MoResult<()> {
        self.inner.open()
    }

    fn dimensions(&self) -> FrameSize {
        self.inner.dimensions()
    }

    fn read_frame(&mut self) -> MoResult<Option<Frame>> {
        self.reads += 1;
        if self.reads == self.panic_on {
            panic!("sensor driver fault on read {}", self.reads);
        }
        self.inner.read_frame()
    }

    fn release(&mut self) {
        self.inner.release();
    }

    fn name(&self) -> &str {
        "panicking"
    }
}

fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + DEADLINE;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    done()
}

#[test]
fn start_then_stop_joins_promptly() {
    let camera = SyntheticCamera::new(WIDTH, HEIGHT, FPS);
    let released = camera.released_flag();
    let sink = Arc::new(RecordingSink::new());
    let mut config = fast_config();
    // A long emotion sleep must not hold up stop().
    config.loops.emotion_interval_ms = 60_000;
    let mut manager = CaptureLoopManager::new(config, collaborators(camera, "neutral", sink.clone()));

    manager.start().unwrap();
    assert!(manager.is_running());

    let started = Instant::now();
    manager.stop().unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(manager.state(), ManagerState::Stopped);
    assert!(released.load(Ordering::SeqCst));
    assert_eq!(sink.reset_count(), 1);
}

#[test]
fn tracks_calibrates_and_reports_vibe() {
    let sink = Arc::new(RecordingSink::new());
    let camera = SyntheticCamera::new(WIDTH, HEIGHT, FPS);
    let mut manager =
        CaptureLoopManager::new(fast_config(), collaborators(camera, "happy", sink.clone()));
    manager.start().unwrap();

    let reached = wait_until(|| {
        manager
            .snapshot()
            .map(|s| s.get(Snapshot::VIBE) == Some("up"))
            .unwrap_or(false)
    });
    assert!(reached, "snapshot never reported the happy vibe");
    assert!(wait_until(|| sink.update_count() > 0));

    let snapshot = manager.snapshot().unwrap();
    assert_eq!(snapshot.len(), 5);
    assert_eq!(snapshot.get(Snapshot::DELTA), Some("0.00, 0.00, 0.00"));
    assert_eq!(manager.frame_size(), Some(FrameSize::new(WIDTH, HEIGHT)));
    assert_eq!(manager.emotion(), "happy");
    assert!(manager.latest_pose().is_some());
    assert!(manager.filter_state().is_some());

    let last = sink.last().unwrap();
    assert_eq!(last.vibe, Some(Vibe::Up));
    assert_eq!(last.vibe_factor, Some(1));
    assert!(last.position.length() < 1e-9);

    let stats = manager.stop().unwrap();
    assert!(stats.frames_captured > 0);
    assert!(stats.poses_tracked > 0);
    assert!(stats.emotions_classified > 0);
    assert_eq!(stats.scene_updates as usize, sink.update_count());
    assert_eq!(sink.reset_count(), 1);
}

#[test]
fn absolute_position_reports_settled_pose() {
    let sink = Arc::new(RecordingSink::new());
    let camera = SyntheticCamera::new(WIDTH, HEIGHT, FPS);
    let mut config = fast_config();
    config.features.absolute_position = true;
    let mut manager = CaptureLoopManager::new(config, collaborators(camera, "neutral", sink.clone()));
    manager.start().unwrap();

    assert!(wait_until(|| sink.update_count() > 0));
    let pose = manager.latest_pose().unwrap();
    let last = sink.last().unwrap();
    assert!(last.position.max_abs_diff(pose.position) < 1e-9);
    assert_eq!(last.vibe, Some(Vibe::Mid));

    manager.stop().unwrap();
}

#[test]
fn camera_failure_ends_only_capture() {
    let camera = SyntheticCamera::unavailable();
    let released = camera.released_flag();
    let sink = Arc::new(RecordingSink::new());
    let mut manager = CaptureLoopManager::new(fast_config(), collaborators(camera, "happy", sink.clone()));

    manager.start().unwrap();
    std::thread::sleep(Duration::from_millis(50));

    assert!(manager.is_running());
    assert!(manager.snapshot().unwrap().is_empty());
    assert_eq!(manager.frame_size(), None);

    let stats = manager.stop().unwrap();
    assert_eq!(stats.frames_captured, 0);
    assert!(!released.load(Ordering::SeqCst));
    assert_eq!(sink.update_count(), 0);
}

#[test]
fn unmapped_emotion_is_surfaced() {
    let sink = Arc::new(RecordingSink::new());
    let camera = SyntheticCamera::new(WIDTH, HEIGHT, FPS);
    let mut manager =
        CaptureLoopManager::new(fast_config(), collaborators(camera, "contempt", sink.clone()));
    manager.start().unwrap();

    let surfaced = wait_until(|| {
        matches!(
            manager.snapshot(),
            Err(MoError::UnmappedEmotion { ref label }) if label == "contempt"
        )
    });
    assert!(surfaced);

    manager.stop().unwrap();
}

#[test]
fn unmapped_emotion_keeps_head_pose_flowing() {
    let sink = Arc::new(RecordingSink::new());
    let camera = SyntheticCamera::new(WIDTH, HEIGHT, FPS);
    let mut manager =
        CaptureLoopManager::new(fast_config(), collaborators(camera, "contempt", sink.clone()));
    manager.start().unwrap();

    assert!(wait_until(|| manager.emotion() == "contempt"));
    let before = sink.update_count();
    assert!(wait_until(|| sink.update_count() > before + 3));

    let last = sink.last().unwrap();
    assert_eq!(last.vibe, None);
    assert_eq!(last.vibe_factor, None);
    assert!(last.position.length() < 1e-9);

    let stats = manager.stop().unwrap();
    assert_eq!(stats.scene_updates as usize, sink.update_count());
}

#[test]
fn panicking_camera_is_contained_and_released() {
    let inner = SyntheticCamera::new(WIDTH, HEIGHT, FPS);
    let released = inner.released_flag();
    let camera = PanickingCamera {
        inner,
        reads: 0,
        panic_on: 5,
    };
    let sink = Arc::new(RecordingSink::new());
    let mut manager = CaptureLoopManager::new(
        fast_config(),
        Collaborators {
            camera: Box::new(camera),
            ..collaborators(SyntheticCamera::new(WIDTH, HEIGHT, FPS), "happy", sink.clone())
        },
    );
    manager.start().unwrap();

    assert!(wait_until(|| manager.stats().frames_captured > 10));
    assert!(manager.is_running());

    let stats = manager.stop().unwrap();
    assert_eq!(stats.collaborator_panics, 1);
    assert!(released.load(Ordering::SeqCst));
    assert_eq!(sink.reset_count(), 1);
}

#[test]
fn emotion_tracking_toggle_pauses_classification() {
    let sink = Arc::new(RecordingSink::new());
    let camera = SyntheticCamera::new(WIDTH, HEIGHT, FPS);
    let mut manager = CaptureLoopManager::new(
        fast_config(),
        Collaborators {
            classifier: Box::new(ScriptedClassifier::new(["happy", "sad"])),
            ..collaborators(camera, "happy", sink)
        },
    );
    manager.start().unwrap();
    assert!(wait_until(|| manager.stats().emotions_classified > 2));

    manager.set_track_emotions(false);
    assert!(!manager.features().track_emotions);
    // Let an in-flight classification land before taking the baseline.
    std::thread::sleep(Duration::from_millis(50));
    let paused = manager.stats().emotions_classified;
    let label = manager.emotion();

    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(manager.stats().emotions_classified, paused);
    assert_eq!(manager.emotion(), label);
    assert!(manager.stats().frames_captured > 0);

    manager.set_track_emotions(true);
    assert!(wait_until(|| manager.stats().emotions_classified > paused + 2));

    manager.stop().unwrap();
}

#[test]
fn file_handoff_classifies_through_capture_file() {
    let sink = Arc::new(RecordingSink::new());
    let config = fast_config();
    let capture_file = config.loops.capture_file.clone();
    let classifier =
        FileHandoffClassifier::from_config(ScriptedClassifier::new(["surprise"]), &config.loops);
    let mut manager = CaptureLoopManager::new(
        config,
        Collaborators {
            classifier: Box::new(classifier),
            ..collaborators(SyntheticCamera::new(WIDTH, HEIGHT, FPS), "neutral", sink)
        },
    );
    manager.start().unwrap();

    assert!(wait_until(|| manager.emotion() == "surprise"));
    assert!(capture_file.is_file());
    assert_eq!(manager.stats().classification_misses, 0);

    manager.stop().unwrap();
    if let Some(dir) = capture_file.parent() {
        std::fs::remove_dir_all(dir).ok();
    }
}

#[test]
fn disabled_head_tracking_never_calibrates() {
    let sink = Arc::new(RecordingSink::new());
    let camera = SyntheticCamera::new(WIDTH, HEIGHT, FPS);
    let mut config = fast_config();
    config.features.track_head = false;
    let mut manager = CaptureLoopManager::new(config, collaborators(camera, "happy", sink.clone()));
    manager.start().unwrap();

    assert!(wait_until(|| manager.stats().frames_captured > 5));
    assert!(manager.snapshot().unwrap().is_empty());
    assert!(!manager.calibrate());

    manager.set_track_head(true);
    assert!(wait_until(|| manager.filter_state().is_some()));

    manager.stop().unwrap();
}

#[test]
fn explicit_calibration_re_anchors_zero() {
    let sink = Arc::new(RecordingSink::new());
    let camera = SyntheticCamera::new(WIDTH, HEIGHT, FPS);
    let mut manager = CaptureLoopManager::new(
        fast_config(),
        Collaborators {
            camera: Box::new(camera),
            detector: Box::new(OrbitingFaceDetector::new(0.2, 0.1)),
            classifier: Box::new(ScriptedClassifier::new(["neutral"])),
            scene: sink.clone(),
            display: None,
        },
    );
    manager.start().unwrap();
    assert!(wait_until(|| manager.stats().poses_tracked > 20));

    // Freeze the tracked pose so the filter holds still after calibrating.
    manager.set_track_head(false);
    std::thread::sleep(Duration::from_millis(50));
    assert!(manager.calibrate());
    let state = manager.filter_state().unwrap();
    assert_eq!(state.zero, state.settled);
    assert_eq!(state.zero, state.eased);
    assert_eq!(state.zero, manager.latest_pose().unwrap());

    manager.request_calibration();
    let before = manager.stats().poses_tracked;
    manager.set_track_head(true);
    assert!(wait_until(|| manager.stats().poses_tracked > before + 2));
    let recalibrated = manager.filter_state().unwrap();
    assert_ne!(recalibrated.zero, state.zero);

    manager.stop().unwrap();
}

#[test]
fn display_receives_overlay_and_closes() {
    let sink = Arc::new(RecordingSink::new());
    let display = TracingDisplay::new();
    let shown = display.shown_counter();
    let closed = display.closed_counter();
    let mut config = fast_config();
    config.features.show_display = true;
    let mut manager = CaptureLoopManager::new(
        config,
        Collaborators {
            display: Some(Box::new(display)),
            ..collaborators(SyntheticCamera::new(WIDTH, HEIGHT, FPS), "happy", sink)
        },
    );
    manager.start().unwrap();

    assert!(wait_until(|| shown.load(Ordering::Relaxed) > 3));
    manager.set_show_display(false);
    assert!(wait_until(|| closed.load(Ordering::Relaxed) >= 1));

    manager.stop().unwrap();
    assert!(closed.load(Ordering::Relaxed) >= 2);
}

#[test]
fn end_of_stream_keeps_last_state() {
    let sink = Arc::new(RecordingSink::new());
    let camera = SyntheticCamera::new(WIDTH, HEIGHT, FPS).with_max_frames(30);
    let mut manager = CaptureLoopManager::new(fast_config(), collaborators(camera, "sad", sink.clone()));
    manager.start().unwrap();

    assert!(wait_until(|| manager.stats().frame_read_failures > 3));
    assert!(wait_until(|| {
        manager
            .snapshot()
            .map(|s| s.get(Snapshot::VIBE) == Some("down"))
            .unwrap_or(false)
    }));

    let stats = manager.stop().unwrap();
    assert_eq!(stats.frames_captured, 30);
}

#[test]
fn calibrate_before_start_is_a_no_op() {
    let sink = Arc::new(RecordingSink::new());
    let camera = SyntheticCamera::new(WIDTH, HEIGHT, FPS);
    let manager = CaptureLoopManager::new(fast_config(), collaborators(camera, "happy", sink));

    assert!(!manager.calibrate());
    assert!(manager.snapshot().unwrap().is_empty());
    assert_eq!(manager.emotion(), "neutral");
    assert_eq!(manager.state(), ManagerState::Idle);
}

#[test]
fn lifecycle_misuse_is_rejected() {
    let sink = Arc::new(RecordingSink::new());
    let camera = SyntheticCamera::new(WIDTH, HEIGHT, FPS);
    let mut manager = CaptureLoopManager::new(fast_config(), collaborators(camera, "happy", sink));

    assert!(matches!(manager.stop(), Err(MoError::Unsupported { .. })));
    manager.start().unwrap();
    assert!(matches!(manager.start(), Err(MoError::Unsupported { .. })));
    manager.stop().unwrap();
    assert!(matches!(manager.stop(), Err(MoError::Unsupported { .. })));
    assert!(matches!(manager.start(), Err(MoError::Unsupported { .. })));
}

#[test]
fn independent_managers_run_side_by_side() {
    let managers: Vec<_> = ["happy", "sad"]
        .into_iter()
        .map(|emotion| {
            let camera = SyntheticCamera::new(WIDTH, HEIGHT, FPS);
            let mut manager = CaptureLoopManager::new(
                fast_config(),
                collaborators(camera, emotion, Arc::new(RecordingSink::new())),
            );
            manager.start().unwrap();
            manager
        })
        .collect();

    assert!(wait_until(|| managers[0].emotion() == "happy"));
    assert!(wait_until(|| managers[1].emotion() == "sad"));

    for mut manager in managers {
        manager.stop().unwrap();
    }
}

#[test]
fn drop_stops_running_manager() {
    let camera = SyntheticCamera::new(WIDTH, HEIGHT, FPS);
    let released = camera.released_flag();
    let sink = Arc::new(RecordingSink::new());
    {
        let mut manager =
            CaptureLoopManager::new(fast_config(), collaborators(camera, "happy", sink.clone()));
        manager.start().unwrap();
    }
    assert!(released.load(Ordering::SeqCst));
    assert_eq!(sink.reset_count(), 1);
}
