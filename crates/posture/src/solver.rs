use serde::{Deserialize, Serialize};

use crate::topology::Topology;

/// Heuristic gains for the posture solver. Empirical, not derived from a
/// body model.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostureTuning {
    /// Protrusion (meters) above which the figure bends around the wall.
    pub protrusion_threshold: f64,
    pub hip_gain: f64,
    pub knee_gain: f64,
    pub spine_gain: f64,
    /// Chord/height ratio below which the figure is treated as compressed.
    pub compression_ratio: f64,
    pub compression_knee_gain: f64,
    pub compression_hip_gain: f64,
}

impl Default for PostureTuning {
    fn default() -> Self {
        Self {
            protrusion_threshold: 0.02,
            hip_gain: 1.8,
            knee_gain: -2.2,
            spine_gain: -0.8,
            compression_ratio: 0.9,
            compression_knee_gain: -1.2,
            compression_hip_gain: 0.6,
        }
    }
}

/// Joint flexion in radians.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Flexion {
    pub hip: f64,
    pub spine: f64,
    pub knee: f64,
}

impl Flexion {
    pub const NEUTRAL: Self = Self {
        hip: 0.0,
        spine: 0.0,
        knee: 0.0,
    };

    pub fn to_degrees(self) -> Self {
        Self {
            hip: self.hip.to_degrees(),
            spine: self.spine.to_degrees(),
            knee: self.knee.to_degrees(),
        }
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }
}

/// Joint flexion for a figure of `figure_height` spanning `topology`.
///
/// - Protrusion above the threshold bends hips out and knees/spine back.
/// - A flat or concave span shorter than the compression ratio gets a
///   small knee lift and hip flex.
/// - Anything else, a missing topology, or a degenerate span is neutral.
pub fn solve(topology: Option<&Topology>, figure_height: f64, tuning: &PostureTuning) -> Flexion {
    let Some(t) = topology else {
        return Flexion::NEUTRAL;
    };
    let measurable = t.chord_length > f64::EPSILON && figure_height > 0.0;
    if !measurable {
        return Flexion::NEUTRAL;
    }

    if t.max_protrusion > tuning.protrusion_threshold {
        let bend = t.max_protrusion.atan2(t.chord_length / 2.0);
        return Flexion {
            hip: bend * tuning.hip_gain,
            spine: bend * tuning.spine_gain,
            knee: bend * tuning.knee_gain,
        };
    }

    if t.chord_length < tuning.compression_ratio * figure_height {
        let compression = 1.0 - t.chord_length / figure_height;
        return Flexion {
            hip: compression * tuning.compression_hip_gain,
            spine: 0.0,
            knee: compression * tuning.compression_knee_gain,
        };
    }

    Flexion::NEUTRAL
}
