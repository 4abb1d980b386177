//! Error types shared across Mo crates.

/// Top-level error type for Mo operations.
#[derive(Debug, thiserror::Error)]
pub enum MoError {
    #[error("Camera unavailable: {message}")]
    CameraUnavailable { message: String },

    #[error("Dimension mismatch: expected {expected} components, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Emotion label {label:?} has no vibe mapping")]
    UnmappedEmotion { label: String },

    #[error("Landmark detection error: {message}")]
    Detection { message: String },

    #[error("Emotion classification error: {message}")]
    Classification { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using MoError.
pub type MoResult<T> = Result<T, MoError>;

impl MoError {
    pub fn camera_unavailable(msg: impl Into<String>) -> Self {
        Self::CameraUnavailable {
            message: msg.into(),
        }
    }

    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    pub fn unmapped_emotion(label: impl Into<String>) -> Self {
        Self::UnmappedEmotion {
            label: label.into(),
        }
    }

    pub fn detection(msg: impl Into<String>) -> Self {
        Self::Detection {
            message: msg.into(),
        }
    }

    pub fn classification(msg: impl Into<String>) -> Self {
        Self::Classification {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }
}
