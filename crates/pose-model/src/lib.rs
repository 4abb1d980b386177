//! Mo Pose Model
//!
//! Defines the data that flows through the tracker:
//! - [`vector`]: fixed-size vector math and the [`Vector3`] type
//! - [`transform`]: position + rotation pairs with easing and spring updates
//! - [`landmarks`]: 2D face landmark geometry supplied by a detector
//! - [`emotion`]: dominant-emotion labels and the vibe lookup table

pub mod emotion;
pub mod landmarks;
pub mod transform;
pub mod vector;

pub use emotion::{Emotion, Vibe};
pub use landmarks::{FaceLandmarks, FrameSize, Point2D};
pub use transform::{SpringRatios, Transform};
pub use vector::Vector3;
