use std::env;
use std::fs;
use std::path::Path;

use interaction::{DragSettings, PickSettings};
use posture::PostureTuning;
use serde::{Deserialize, Serialize};
use tracing::warn;
use wall::MeshParams;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV_VAR: &str = "WALL_ENGINE_CONFIG";

/// Every tunable the engine exposes. Missing fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub mesh: MeshParams,
    pub drag: DragSettings,
    pub posture: PostureTuning,
    pub picking: PickSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Invalid { field: &'static str, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "config io error: {msg}"),
            ConfigError::Parse(msg) => write!(f, "config parse error: {msg}"),
            ConfigError::Invalid { field, reason } => {
                write!(f, "invalid config value `{field}`: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Loads the file named by `WALL_ENGINE_CONFIG`, or defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::load(Path::new(path.trim())),
            _ => Ok(Self::default()),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for check in self.checks() {
            if let Some(err) = check.error() {
                return Err(err);
            }
        }
        Ok(())
    }

    /// Replaces every invalid value with its default, logging each one.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        for check in self.checks() {
            if let Some(err) = check.error() {
                warn!(%err, "using default");
            }
        }
        if !is_positive(self.mesh.thickness) {
            self.mesh.thickness = defaults.mesh.thickness;
        }
        if !is_positive(self.mesh.uv_tile_size) {
            self.mesh.uv_tile_size = defaults.mesh.uv_tile_size;
        }
        if !is_non_negative(self.drag.click_threshold_px) {
            self.drag.click_threshold_px = defaults.drag.click_threshold_px;
        }
        if !is_positive(self.picking.max_distance) {
            self.picking.max_distance = defaults.picking.max_distance;
        }
        if !is_positive(self.picking.hold_pick_radius) {
            self.picking.hold_pick_radius = defaults.picking.hold_pick_radius;
        }
        if !is_non_negative(self.posture.protrusion_threshold) {
            self.posture.protrusion_threshold = defaults.posture.protrusion_threshold;
        }
        if !is_unit_ratio(self.posture.compression_ratio) {
            self.posture.compression_ratio = defaults.posture.compression_ratio;
        }
        let gains = [
            (&mut self.posture.hip_gain, defaults.posture.hip_gain),
            (&mut self.posture.knee_gain, defaults.posture.knee_gain),
            (&mut self.posture.spine_gain, defaults.posture.spine_gain),
            (
                &mut self.posture.compression_knee_gain,
                defaults.posture.compression_knee_gain,
            ),
            (
                &mut self.posture.compression_hip_gain,
                defaults.posture.compression_hip_gain,
            ),
        ];
        for (gain, default) in gains {
            if !gain.is_finite() {
                *gain = default;
            }
        }
        self
    }

    fn checks(&self) -> Vec<Check> {
        let p = &self.posture;
        vec![
            Check::positive("mesh.thickness", self.mesh.thickness),
            Check::positive("mesh.uv_tile_size", self.mesh.uv_tile_size),
            Check::non_negative("drag.click_threshold_px", self.drag.click_threshold_px),
            Check::positive("picking.max_distance", self.picking.max_distance),
            Check::positive("picking.hold_pick_radius", self.picking.hold_pick_radius),
            Check::non_negative("posture.protrusion_threshold", p.protrusion_threshold),
            Check::unit_ratio("posture.compression_ratio", p.compression_ratio),
            Check::finite("posture.hip_gain", p.hip_gain),
            Check::finite("posture.knee_gain", p.knee_gain),
            Check::finite("posture.spine_gain", p.spine_gain),
            Check::finite("posture.compression_knee_gain", p.compression_knee_gain),
            Check::finite("posture.compression_hip_gain", p.compression_hip_gain),
        ]
    }
}

#[derive(Debug, Copy, Clone)]
enum Rule {
    Positive,
    NonNegative,
    UnitRatio,
    Finite,
}

#[derive(Debug, Copy, Clone)]
struct Check {
    field: &'static str,
    value: f64,
    rule: Rule,
}

impl Check {
    fn positive(field: &'static str, value: f64) -> Self {
        Self {
            field,
            value,
            rule: Rule::Positive,
        }
    }

    fn non_negative(field: &'static str, value: f64) -> Self {
        Self {
            field,
            value,
            rule: Rule::NonNegative,
        }
    }

    fn unit_ratio(field: &'static str, value: f64) -> Self {
        Self {
            field,
            value,
            rule: Rule::UnitRatio,
        }
    }

    fn finite(field: &'static str, value: f64) -> Self {
        Self {
            field,
            value,
            rule: Rule::Finite,
        }
    }

    fn error(&self) -> Option<ConfigError> {
        let (ok, expected) = match self.rule {
            Rule::Positive => (is_positive(self.value), "a finite value > 0"),
            Rule::NonNegative => (is_non_negative(self.value), "a finite value >= 0"),
            Rule::UnitRatio => (is_unit_ratio(self.value), "a value in (0, 1]"),
            Rule::Finite => (self.value.is_finite(), "a finite value"),
        };
        (!ok).then(|| ConfigError::Invalid {
            field: self.field,
            reason: format!("expected {expected}, got {}", self.value),
        })
    }
}

fn is_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

fn is_non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

fn is_unit_ratio(v: f64) -> bool {
    v.is_finite() && v > 0.0 && v <= 1.0
}
