//! Mo Processing Core
//!
//! Turns noisy per-frame face landmarks into a stable head transform:
//! - **Pose estimation:** landmark geometry to a normalized [`Transform`] sample
//! - **Filtering:** eased then spring-damped chain with zero-point calibration
//! - **Snapshot:** fixed-precision report of the filtered state and vibe
//!
//! Nothing here touches a camera, a thread or the filesystem.
//! Inputs and outputs are plain values.
//!
//! [`Transform`]: mo_pose_model::Transform

pub mod filter;
pub mod pose;
pub mod snapshot;

pub use filter::{AdvanceOutcome, FilterPipeline, FilterState};
pub use pose::{PoseEstimator, PoseScale};
pub use snapshot::{build_snapshot, Snapshot};
