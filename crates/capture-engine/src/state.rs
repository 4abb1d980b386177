//! State shared between the controller and the three capture loops.
//!
//! Every field is individually synchronized: atomics for flags and
//! counters, mutexes for values. No code path holds two of these locks at
//! once.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError, RwLock};
use std::time::Duration;

use mo_common::config::{FeatureFlags, TrackingConfig};
use mo_common::error::MoResult;
use mo_pose_model::emotion::INITIAL_EMOTION;
use mo_pose_model::landmarks::FrameSize;
use mo_pose_model::Transform;
use mo_processing_core::{build_snapshot, FilterPipeline, PoseScale, Snapshot};
use serde::Serialize;

use crate::frame::Frame;

/// Lock a mutex, recovering the data if a panicking thread poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cooperative run flag with an interruptible sleep.
#[derive(Debug, Default)]
pub(crate) struct StopSignal {
    running: AtomicBool,
    gate: Mutex<()>,
    wake: Condvar,
}

impl StopSignal {
    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Clear the flag and wake every sleeping loop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let _gate = lock(&self.gate);
        self.wake.notify_all();
    }

    /// Sleep for `duration` or until stopped. Returns whether still running.
    pub fn sleep(&self, duration: Duration) -> bool {
        let gate = lock(&self.gate);
        if !self.is_running() {
            return false;
        }
        drop(
            self.wake
                .wait_timeout_while(gate, duration, |_| self.is_running())
                .unwrap_or_else(PoisonError::into_inner),
        );
        self.is_running()
    }
}

/// Runtime-mutable feature switches.
#[derive(Debug)]
pub(crate) struct FeatureSwitches {
    pub track_head: AtomicBool,
    pub track_emotions: AtomicBool,
    pub show_display: AtomicBool,
    pub absolute_position: AtomicBool,
}

impl FeatureSwitches {
    fn new(flags: &FeatureFlags) -> Self {
        Self {
            track_head: AtomicBool::new(flags.track_head),
            track_emotions: AtomicBool::new(flags.track_emotions),
            show_display: AtomicBool::new(flags.show_display),
            absolute_position: AtomicBool::new(flags.absolute_position),
        }
    }

    pub fn get(flag: &AtomicBool) -> bool {
        flag.load(Ordering::Relaxed)
    }

    pub fn set(flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FeatureFlags {
        FeatureFlags {
            track_head: Self::get(&self.track_head),
            track_emotions: Self::get(&self.track_emotions),
            show_display: Self::get(&self.show_display),
            absolute_position: Self::get(&self.absolute_position),
        }
    }
}

/// Counters the loops bump as they work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoopStats {
    pub frames_captured: u64,
    pub frame_read_failures: u64,
    pub poses_tracked: u64,
    pub detection_misses: u64,
    pub emotions_classified: u64,
    pub classification_misses: u64,
    pub scene_updates: u64,
    /// Collaborator calls that panicked and were contained.
    pub collaborator_panics: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatCounters {
    pub frames_captured: AtomicU64,
    pub frame_read_failures: AtomicU64,
    pub poses_tracked: AtomicU64,
    pub detection_misses: AtomicU64,
    pub emotions_classified: AtomicU64,
    pub classification_misses: AtomicU64,
    pub scene_updates: AtomicU64,
    pub collaborator_panics: AtomicU64,
}

impl StatCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> LoopStats {
        let read = |c: &AtomicU64| c.load(Ordering::Relaxed);
        LoopStats {
            frames_captured: read(&self.frames_captured),
            frame_read_failures: read(&self.frame_read_failures),
            poses_tracked: read(&self.poses_tracked),
            detection_misses: read(&self.detection_misses),
            emotions_classified: read(&self.emotions_classified),
            classification_misses: read(&self.classification_misses),
            scene_updates: read(&self.scene_updates),
            collaborator_panics: read(&self.collaborator_panics),
        }
    }
}

/// The most recent frame and its sequence number (1-based).
#[derive(Debug, Clone)]
pub(crate) struct LatestFrame {
    pub seq: u64,
    pub frame: Arc<Frame>,
}

#[derive(Debug)]
pub(crate) struct SharedState {
    pub stop: StopSignal,
    pub features: FeatureSwitches,
    pub scale: RwLock<PoseScale>,
    /// Set once when the camera opens.
    pub frame_size: OnceLock<FrameSize>,
    pub frame: Mutex<Option<LatestFrame>>,
    /// Latest raw tracked pose. Written by the pose loop.
    pub tracked: Mutex<Option<Transform>>,
    /// Latest dominant-emotion label. Written by the emotion loop.
    pub emotion: Mutex<String>,
    pub pipeline: Mutex<FilterPipeline>,
    /// The next successful pose read re-anchors the zero pose.
    pub calibration_pending: AtomicBool,
    pub stats: StatCounters,
}

impl SharedState {
    pub fn new(config: &TrackingConfig) -> Self {
        Self {
            stop: StopSignal::default(),
            features: FeatureSwitches::new(&config.features),
            scale: RwLock::new(PoseScale::from(&config.pose)),
            frame_size: OnceLock::new(),
            frame: Mutex::new(None),
            tracked: Mutex::new(None),
            emotion: Mutex::new(INITIAL_EMOTION.to_string()),
            pipeline: Mutex::new(FilterPipeline::new(&config.filter)),
            calibration_pending: AtomicBool::new(true),
            stats: StatCounters::default(),
        }
    }

    pub fn latest_frame(&self) -> Option<LatestFrame> {
        lock(&self.frame).clone()
    }

    pub fn tracked(&self) -> Option<Transform> {
        *lock(&self.tracked)
    }

    pub fn emotion(&self) -> String {
        lock(&self.emotion).clone()
    }

    pub fn pose_scale(&self) -> PoseScale {
        *self.scale.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_pose_scale(&self, scale: PoseScale) {
        *self.scale.write().unwrap_or_else(PoisonError::into_inner) = scale;
    }

    /// Calibrate on `pose` if a calibration is pending or none happened yet.
    /// Returns whether it calibrated.
    pub fn calibrate_if_pending(&self, pose: &Transform) -> bool {
        let pending = self.calibration_pending.swap(false, Ordering::SeqCst);
        let mut pipeline = lock(&self.pipeline);
        if pending || !pipeline.is_calibrated() {
            pipeline.calibrate(pose);
            true
        } else {
            false
        }
    }

    pub fn snapshot(&self) -> MoResult<Snapshot> {
        let emotion = self.emotion();
        let pipeline = lock(&self.pipeline);
        build_snapshot(&pipeline, &emotion)
    }
}
