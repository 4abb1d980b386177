//! Dominant-emotion labels and the coarse vibe they map to.

use std::fmt;
use std::str::FromStr;

use mo_common::error::{MoError, MoResult};
use serde::{Deserialize, Serialize};

/// Label the tracker reports before the first classification.
pub const INITIAL_EMOTION: &str = "neutral";

/// Emotions the classifier is expected to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Neutral,
    Sad,
    Surprise,
}

/// Coarse three-valued mood signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vibe {
    Up,
    Mid,
    Down,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Self::Angry,
        Self::Disgust,
        Self::Fear,
        Self::Happy,
        Self::Neutral,
        Self::Sad,
        Self::Surprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Angry => "angry",
            Self::Disgust => "disgust",
            Self::Fear => "fear",
            Self::Happy => "happy",
            Self::Neutral => "neutral",
            Self::Sad => "sad",
            Self::Surprise => "surprise",
        }
    }

    pub fn vibe(&self) -> Vibe {
        match self {
            Self::Happy | Self::Surprise => Vibe::Up,
            Self::Angry | Self::Neutral => Vibe::Mid,
            Self::Disgust | Self::Fear | Self::Sad => Vibe::Down,
        }
    }
}

/// Case-insensitive; anything outside the table is
/// [`MoError::UnmappedEmotion`].
impl FromStr for Emotion {
    type Err = MoError;

    fn from_str(label: &str) -> MoResult<Self> {
        let normalized = label.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|emotion| emotion.as_str() == normalized)
            .ok_or_else(|| MoError::unmapped_emotion(label))
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Vibe {
    /// Look up the vibe for a raw classifier label.
    pub fn from_label(label: &str) -> MoResult<Vibe> {
        Ok(label.parse::<Emotion>()?.vibe())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Mid => "mid",
            Self::Down => "down",
        }
    }

    /// Signed weight: up = 1, mid = 0, down = -1.
    pub fn factor(&self) -> i32 {
        match self {
            Self::Up => 1,
            Self::Mid => 0,
            Self::Down => -1,
        }
    }
}

impl fmt::Display for Vibe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
