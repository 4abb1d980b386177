//! Application configuration.
//!
//! Every tunable the tracker uses lives here as a named, typed field with a
//! defined default. Partial JSON files are accepted; missing fields take
//! their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Tracking pipeline settings.
    pub tracking: TrackingConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Everything a capture session needs to know.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub filter: FilterConfig,
    pub pose: PoseConfig,
    pub loops: LoopConfig,
    pub features: FeatureFlags,
}

/// Easing and spring ratios applied once per captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Position easing ratio (lerp `r` per tick).
    pub face_move_easing: f64,

    /// Rotation easing ratio.
    pub face_turn_easing: f64,

    /// Position ratio of the spring-delta stage.
    pub face_move_spring: f64,

    /// Rotation ratio of the spring-delta stage.
    pub face_turn_spring: f64,

    /// Damping coefficient applied to the eased-to-target offset before it
    /// feeds the spring delta.
    pub delta_spring: f64,
}

/// Which way the consuming scene treats as "forward".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisConvention {
    /// Face size grows toward the camera along -Y.
    #[default]
    NegativeYForward,
    /// Face size grows toward the camera along +Y.
    PositiveYForward,
}

impl AxisConvention {
    /// Sign applied to the forward (Y) position component.
    pub fn forward_sign(self) -> f64 {
        match self {
            Self::NegativeYForward => -1.0,
            Self::PositiveYForward => 1.0,
        }
    }
}

/// Landmark-to-pose mapping settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    /// Expected maximum nose-bridge offset (pixels) for a full turn.
    /// Outputs are not clamped to this.
    pub face_turn_max: f64,

    /// Per-axis position scale.
    pub pos_scale: [f64; 3],

    /// Per-axis rotation scale.
    pub rot_scale: [f64; 3],

    pub axis_convention: AxisConvention,
}

/// Scheduling of the three capture loops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Sleep between emotion classifications (ms).
    pub emotion_interval_ms: u64,

    /// Idle sleep (ms) for a loop that has nothing to do this iteration.
    pub idle_interval_ms: u64,

    /// Equalize the lightness channel of every captured frame.
    pub contrast_normalization: bool,

    /// Transient file used to hand frames to path-based classifiers
    /// (`mo run --handoff`).
    pub capture_file: PathBuf,
}

/// Per-feature switches, mutable while the loops run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub track_head: bool,
    pub track_emotions: bool,
    pub show_display: bool,

    /// Report the settled pose as-is instead of relative to the zero pose.
    pub absolute_position: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "mo_capture_engine=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            face_move_easing: 0.04,
            face_turn_easing: 0.08,
            face_move_spring: 0.05,
            face_turn_spring: 0.05,
            delta_spring: 0.5,
        }
    }
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            face_turn_max: 40.0,
            pos_scale: [1.0; 3],
            rot_scale: [1.0; 3],
            axis_convention: AxisConvention::default(),
        }
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            emotion_interval_ms: 3000,
            idle_interval_ms: 30,
            contrast_normalization: true,
            capture_file: std::env::temp_dir().join("mo").join("cap.png"),
        }
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            track_head: true,
            track_emotions: true,
            show_display: true,
            absolute_position: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &std::path::Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<PathBuf, std::io::Error> {
        let config_path = config_file_path();
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("mo").join("config.json")
}
