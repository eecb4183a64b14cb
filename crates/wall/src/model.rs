use std::fmt;

use foundation::ids::{HoldId, SegmentId};
use foundation::math::{Vec3, canonical_bits, clamp_finite};
use serde::{Deserialize, Serialize};

/// Angle domain accepted by `WallConfig::validate` (degrees).
pub const MIN_ANGLE_DEG: f64 = -15.0;
pub const MAX_ANGLE_DEG: f64 = 85.0;

/// One straight stretch of wall.
///
/// `height` is the length measured along the segment's own slope, not its
/// vertical extent. `angle` is in degrees: 0 is vertical, positive overhangs
/// toward the viewer, negative is slab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallSegment {
    pub id: SegmentId,
    pub height: f64,
    pub angle: f64,
}

impl WallSegment {
    pub fn new(id: SegmentId, height: f64, angle: f64) -> Self {
        Self { id, height, angle }
    }

    pub fn angle_rad(&self) -> f64 {
        self.angle.to_radians()
    }

    /// Unit vector pointing up the slope.
    pub fn direction(&self) -> Vec3 {
        let a = self.angle_rad();
        Vec3::new(0.0, a.cos(), a.sin())
    }

    /// Outward surface normal: the flat wall's +Z tilted by `angle` about +X.
    pub fn normal(&self) -> Vec3 {
        let a = self.angle_rad();
        Vec3::new(0.0, -a.sin(), a.cos())
    }
}

/// The whole wall: a width symmetric about x = 0 and a bottom-to-top segment list.
///
/// Segment order is the stacking order and is never sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallConfig {
    pub width: f64,
    pub segments: Vec<WallSegment>,
}

/// 32-byte blake3 digest used as a memoization key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ContentKey(pub [u8; 32]);

impl ContentKey {
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl From<blake3::Hasher> for ContentKey {
    fn from(hasher: blake3::Hasher) -> Self {
        ContentKey(*hasher.finalize().as_bytes())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WallError {
    NonPositiveWidth { width: f64 },
    NonPositiveHeight { id: SegmentId, height: f64 },
    AngleOutOfRange { id: SegmentId, angle: f64 },
    DuplicateSegmentId { id: SegmentId },
    NonFinite { field: &'static str },
}

impl fmt::Display for WallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WallError::NonPositiveWidth { width } => write!(f, "wall width must be > 0 (got {width})"),
            WallError::NonPositiveHeight { id, height } => {
                write!(f, "{id}: height must be > 0 (got {height})")
            }
            WallError::AngleOutOfRange { id, angle } => write!(
                f,
                "{id}: angle {angle} outside [{MIN_ANGLE_DEG}, {MAX_ANGLE_DEG}] degrees"
            ),
            WallError::DuplicateSegmentId { id } => write!(f, "duplicate segment id {id}"),
            WallError::NonFinite { field } => write!(f, "non-finite value in {field}"),
        }
    }
}

impl std::error::Error for WallError {}

impl WallConfig {
    pub fn new(width: f64, segments: Vec<WallSegment>) -> Self {
        Self { width, segments }
    }

    pub fn half_width(&self) -> f64 {
        self.width * 0.5
    }

    pub fn segment(&self, id: SegmentId) -> Option<&WallSegment> {
        self.segments.iter().find(|s| s.id == id)
    }

    pub fn segment_index(&self, id: SegmentId) -> Option<usize> {
        self.segments.iter().position(|s| s.id == id)
    }

    /// Sum of all segment heights (the odometer value at the top of the wall).
    pub fn total_length(&self) -> f64 {
        self.segments.iter().map(|s| s.height).sum()
    }

    /// Removes a segment, returning it. Holds that referenced it become
    /// orphans; see `orphaned_holds`.
    pub fn remove_segment(&mut self, id: SegmentId) -> Option<WallSegment> {
        let idx = self.segment_index(id)?;
        Some(self.segments.remove(idx))
    }

    /// Holds whose `segment_id` no longer exists in this wall.
    ///
    /// The engine never repairs these; the host removes or reassigns them.
    pub fn orphaned_holds<'a>(&self, holds: &'a [PlacedHold]) -> Vec<&'a PlacedHold> {
        holds
            .iter()
            .filter(|h| self.segment(h.segment_id).is_none())
            .collect()
    }

    pub fn validate(&self) -> Result<(), WallError> {
        if !self.width.is_finite() {
            return Err(WallError::NonFinite { field: "width" });
        }
        if self.width <= 0.0 {
            return Err(WallError::NonPositiveWidth { width: self.width });
        }

        let mut seen: Vec<SegmentId> = Vec::with_capacity(self.segments.len());
        for s in &self.segments {
            if !s.height.is_finite() {
                return Err(WallError::NonFinite { field: "segment.height" });
            }
            if !s.angle.is_finite() {
                return Err(WallError::NonFinite { field: "segment.angle" });
            }
            if s.height <= 0.0 {
                return Err(WallError::NonPositiveHeight {
                    id: s.id,
                    height: s.height,
                });
            }
            if !(MIN_ANGLE_DEG..=MAX_ANGLE_DEG).contains(&s.angle) {
                return Err(WallError::AngleOutOfRange {
                    id: s.id,
                    angle: s.angle,
                });
            }
            if seen.contains(&s.id) {
                return Err(WallError::DuplicateSegmentId { id: s.id });
            }
            seen.push(s.id);
        }
        Ok(())
    }

    /// Content hash of everything that affects geometry.
    pub fn content_key(&self) -> ContentKey {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"wall/v1");
        hasher.update(&canonical_bits(self.width));
        hasher.update(&(self.segments.len() as u64).to_le_bytes());
        for s in &self.segments {
            hasher.update(&s.id.0.to_le_bytes());
            hasher.update(&canonical_bits(s.height));
            hasher.update(&canonical_bits(s.angle));
        }
        hasher.into()
    }
}

/// Per-segment placement coordinate: lateral offset `x` and distance `y`
/// measured up the segment from its base.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LocalCoord {
    pub x: f64,
    pub y: f64,
}

impl LocalCoord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Clamp into `[-width/2, width/2] x [0, segment_height]`. Idempotent.
    pub fn clamped(self, width: f64, segment_height: f64) -> Self {
        let half = (width * 0.5).max(0.0);
        Self {
            x: clamp_finite(self.x, -half, half),
            y: clamp_finite(self.y, 0.0, segment_height.max(0.0)),
        }
    }
}

/// An object placed on the wall, stored in local coordinates only.
///
/// `color` and `asset` are opaque to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedHold {
    pub id: HoldId,
    pub segment_id: SegmentId,
    pub x: f64,
    pub y: f64,
    /// Degrees about the surface normal.
    #[serde(default)]
    pub spin: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub asset: String,
}

fn default_scale() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoldError {
    UnknownSegment { hold: HoldId, segment: SegmentId },
}

impl fmt::Display for HoldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HoldError::UnknownSegment { hold, segment } => {
                write!(f, "{hold} references missing {segment}")
            }
        }
    }
}

impl std::error::Error for HoldError {}

impl PlacedHold {
    pub fn new(id: HoldId, segment_id: SegmentId, x: f64, y: f64) -> Self {
        Self {
            id,
            segment_id,
            x,
            y,
            spin: 0.0,
            scale: 1.0,
            color: String::new(),
            asset: String::new(),
        }
    }

    pub fn with_spin(mut self, spin_deg: f64) -> Self {
        self.spin = spin_deg;
        self
    }

    pub fn local(&self) -> LocalCoord {
        LocalCoord::new(self.x, self.y)
    }

    /// Writes back a (clamped) drag result.
    pub fn set_local(&mut self, segment_id: SegmentId, coord: LocalCoord) {
        self.segment_id = segment_id;
        self.x = coord.x;
        self.y = coord.y;
    }

    pub fn validate_against(&self, wall: &WallConfig) -> Result<(), HoldError> {
        match wall.segment(self.segment_id) {
            Some(_) => Ok(()),
            None => Err(HoldError::UnknownSegment {
                hold: self.id,
                segment: self.segment_id,
            }),
        }
    }

    /// Hash of the fields that determine the hold's world transform.
    pub fn placement_key(&self) -> ContentKey {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"hold/v1");
        hasher.update(&self.segment_id.0.to_le_bytes());
        hasher.update(&canonical_bits(self.x));
        hasher.update(&canonical_bits(self.y));
        hasher.update(&canonical_bits(self.spin));
        hasher.into()
    }
}
