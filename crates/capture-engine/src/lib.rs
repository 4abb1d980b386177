//! Mo Capture Engine
//!
//! Runs the three concurrent loops of a head and emotion tracking session
//! and pushes the filtered head transform to a scene sink.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   CaptureLoopManager                     │
//! │  ┌──────────────┐  ┌──────────────┐  ┌────────────────┐  │
//! │  │ capture loop │  │  pose loop   │  │  emotion loop  │  │
//! │  │ camera, Lab  │  │  landmarks → │  │  classifier,   │  │
//! │  │ equalize,    │  │  PoseEstim.  │  │  every 3 s     │  │
//! │  │ filter step  │  │              │  │                │  │
//! │  └──────┬───────┘  └──────┬───────┘  └───────┬────────┘  │
//! │         ▼                 ▼                  ▼           │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │ SharedState: frame, tracked pose, emotion, filter  │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └─────────┬────────────────────────────────────────────────┘
//!           ▼
//!      SceneSink (position, rotation, vibe)
//! ```

pub mod frame;
mod loops;
pub mod manager;
pub mod sources;
mod state;
pub mod synthetic;

pub use frame::Frame;
pub use manager::{CaptureLoopManager, Collaborators, ManagerState};
pub use sources::{
    CameraSource, EmotionClassifier, FileHandoffClassifier, FrameDisplay, LandmarkDetector,
    PathClassifier, SceneSink, SceneUpdate,
};
pub use state::LoopStats;
