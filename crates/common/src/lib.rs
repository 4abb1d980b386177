//! Mo Common Utilities
//!
//! Shared infrastructure for all Mo crates:
//! - Error types and result aliases
//! - Session clock and loop pacing utilities
//! - Tracing/logging initialization
//! - Typed tracking configuration

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
