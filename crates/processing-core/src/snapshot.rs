//! Human-readable report of the filtered state.

use mo_common::error::MoResult;
use mo_pose_model::Vibe;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::filter::FilterPipeline;

/// Ordered string-to-string mapping for display by an external UI.
///
/// Empty until the pipeline has been calibrated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: Vec<(String, String)>,
}

impl Snapshot {
    pub const POSITION: &'static str = "pos";
    pub const ZERO: &'static str = "zero";
    pub const DELTA: &'static str = "delta";
    pub const ROTATION: &'static str = "rot";
    pub const VIBE: &'static str = "vibe";

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `"key: value"` lines, in report order.
    pub fn lines(&self) -> Vec<String> {
        self.iter().map(|(k, v)| format!("{k}: {v}")).collect()
    }

    fn push(&mut self, key: &str, value: String) {
        self.entries.push((key.to_string(), value));
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Format the pipeline's settled/zero/delta/rotation state plus the vibe
/// of `emotion` with two decimals.
///
/// An uncalibrated pipeline yields an empty snapshot. A label outside the
/// vibe table is an error rather than a silent default.
pub fn build_snapshot(pipeline: &FilterPipeline, emotion: &str) -> MoResult<Snapshot> {
    let Some(state) = pipeline.state() else {
        return Ok(Snapshot::default());
    };
    let vibe = Vibe::from_label(emotion)?;
    let delta = state.zero.position.diff_to(state.settled.position, 1.0);

    let mut snapshot = Snapshot::default();
    snapshot.push(Snapshot::POSITION, format!("{:.2}", state.settled.position));
    snapshot.push(Snapshot::ZERO, format!("{:.2}", state.zero.position));
    snapshot.push(Snapshot::DELTA, format!("{delta:.2}"));
    snapshot.push(Snapshot::ROTATION, format!("{:.2}", state.settled.rotation));
    snapshot.push(Snapshot::VIBE, vibe.to_string());
    Ok(snapshot)
}
