use foundation::ids::SegmentId;
use foundation::math::{Quat, Vec3};

use crate::model::{LocalCoord, WallConfig, WallSegment};
use crate::spine::{Spine, SpineNode};

/// Axis the flat (angle = 0) wall uses as its outward normal, and the axis a
/// placed object's model space treats as "forward".
pub const CANONICAL_FORWARD: Vec3 = Vec3::Z;

/// World pose derived from local coordinates. Never persisted.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WorldTransform {
    pub position: Vec3,
    pub orientation: Quat,
}

impl WorldTransform {
    /// The object's forward axis in world space (the surface normal).
    pub fn forward(&self) -> Vec3 {
        self.orientation.rotate(CANONICAL_FORWARD)
    }

    pub fn euler_xyz(&self) -> Vec3 {
        self.orientation.to_euler_xyz()
    }
}

/// A resolved point on the wall surface.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SurfacePoint {
    pub segment_id: SegmentId,
    pub local: LocalCoord,
    pub position: Vec3,
    pub normal: Vec3,
}

/// Bidirectional mapping between per-segment local coordinates and world
/// space, for one wall and its spine.
///
/// Lookups of unknown segments return `None`; nothing here panics.
#[derive(Debug, Copy, Clone)]
pub struct WallMapper<'a> {
    config: &'a WallConfig,
    spine: &'a Spine,
}

impl<'a> WallMapper<'a> {
    pub fn new(config: &'a WallConfig, spine: &'a Spine) -> Self {
        Self { config, spine }
    }

    pub fn config(&self) -> &'a WallConfig {
        self.config
    }

    pub fn spine(&self) -> &'a Spine {
        self.spine
    }

    fn frame(&self, id: SegmentId) -> Option<(&'a WallSegment, &'a SpineNode)> {
        let idx = self.spine.index_of(id)?;
        let seg = self.config.segments.get(idx)?;
        // A spine built from another config would disagree here.
        if seg.id != id {
            return None;
        }
        Some((seg, self.spine.nodes().get(idx)?))
    }

    /// Local coordinates of `point`, which must already lie on the segment's
    /// plane (the caller hit-tested against this segment). Not a projection;
    /// see `project_to_local` for off-plane points.
    pub fn world_to_local(&self, point: Vec3, id: SegmentId) -> Option<LocalCoord> {
        let (_, node) = self.frame(id)?;
        let dy = point.y - node.base.y;
        let dz = point.z - node.base.z;
        Some(LocalCoord::new(point.x, (dy * dy + dz * dz).sqrt()))
    }

    /// Orthogonal projection of `point` onto the segment plane's axes.
    ///
    /// Agrees with `world_to_local` for on-plane points at or above the
    /// base; off-plane points lose their normal component and points below
    /// the base get a negative `y` (clamp afterwards).
    pub fn project_to_local(&self, point: Vec3, id: SegmentId) -> Option<LocalCoord> {
        let (seg, node) = self.frame(id)?;
        let rel = point - node.base;
        Some(LocalCoord::new(point.x, rel.dot(seg.direction())))
    }

    /// World pose for local `(x, y)` on segment `id`, spun `spin_deg`
    /// about the surface normal in the object's own tangent plane.
    pub fn local_to_world(
        &self,
        id: SegmentId,
        x: f64,
        y: f64,
        spin_deg: f64,
    ) -> Option<WorldTransform> {
        let (seg, node) = self.frame(id)?;
        let position = Vec3::new(x, node.base.y, node.base.z) + seg.direction() * y;

        let base = Quat::from_unit_vectors(CANONICAL_FORWARD, seg.normal());
        let spin = Quat::from_axis_angle(CANONICAL_FORWARD, spin_deg.to_radians());
        let orientation = (base * spin).normalize();

        Some(WorldTransform {
            position,
            orientation,
        })
    }

    pub fn surface_normal(&self, id: SegmentId) -> Option<Vec3> {
        self.frame(id).map(|(seg, _)| seg.normal())
    }

    /// Clamp `coord` to the wall width and the segment's height.
    pub fn clamp_local(&self, id: SegmentId, coord: LocalCoord) -> Option<LocalCoord> {
        let (seg, _) = self.frame(id)?;
        Some(coord.clamped(self.config.width, seg.height))
    }

    /// Cumulative odometer of local `y` on segment `id`.
    pub fn odometer_of(&self, id: SegmentId, y: f64) -> Option<f64> {
        let (_, node) = self.frame(id)?;
        Some(node.odometer + y)
    }

    /// Surface point at `odometer` with lateral offset `lateral`; `None`
    /// outside `[0, total_length]` or on an empty wall.
    pub fn odometer_to_world(&self, odometer: f64, lateral: f64) -> Option<SurfacePoint> {
        let (idx, along) = self.spine.locate(odometer)?;
        let seg = self.config.segments.get(idx)?;
        let transform = self.local_to_world(seg.id, lateral, along, 0.0)?;
        Some(SurfacePoint {
            segment_id: seg.id,
            local: LocalCoord::new(lateral, along),
            position: transform.position,
            normal: seg.normal(),
        })
    }
}
