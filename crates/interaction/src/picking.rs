use foundation::ids::{HoldId, SegmentId};
use foundation::math::{Vec2, Vec3, stable_total_cmp_f64};
use serde::{Deserialize, Serialize};
use wall::{LocalCoord, PlacedHold, WallMapper, resolve_with};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickSettings {
    pub max_distance: f64,
    /// Radius of a hold's hover/press hit region (meters).
    pub hold_pick_radius: f64,
}

impl Default for PickSettings {
    fn default() -> Self {
        Self {
            max_distance: 1.0e6,
            hold_pick_radius: 0.12,
        }
    }
}

/// A ray hit on a wall segment's climbing surface.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SurfaceHit {
    pub segment_id: SegmentId,
    pub point: Vec3,
    pub distance: f64,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HoldHit {
    pub hold_id: HoldId,
    pub distance: f64,
    pub point: Vec3,
}

/// Tolerance for hits landing exactly on a segment's edge.
const EDGE_EPS: f64 = 1e-9;

/// Casts `ray` against the front faces of every segment. Holds are not
/// part of this test, so a dragged hold never occludes the wall under it.
///
/// Ordering contract:
/// - The closest hit along the (normalized) ray wins.
/// - Equal distances (a shared boundary edge) resolve to the lower segment.
pub fn raycast_wall(ray: Ray, mapper: &WallMapper<'_>, opts: PickSettings) -> Option<SurfaceHit> {
    let dir = ray.dir.normalize()?;
    let config = mapper.config();
    let half = config.half_width();

    let mut best: Option<(f64, usize, SurfaceHit)> = None;
    for (idx, (seg, node)) in config
        .segments
        .iter()
        .zip(mapper.spine().nodes())
        .enumerate()
    {
        let n = seg.normal();
        let denom = dir.dot(n);
        // Parallel or approaching from behind the slab.
        if denom > -1e-12 {
            continue;
        }
        let t = (node.base - ray.origin).dot(n) / denom;
        if !(0.0..=opts.max_distance).contains(&t) {
            continue;
        }
        let point = ray.origin + dir * t;
        let along = (point - node.base).dot(seg.direction());
        if point.x.abs() > half + EDGE_EPS || along < -EDGE_EPS || along > seg.height + EDGE_EPS {
            continue;
        }

        let hit = SurfaceHit {
            segment_id: seg.id,
            point,
            distance: t,
        };
        best = match best {
            None => Some((t, idx, hit)),
            Some((bt, bi, bh)) => {
                let ord = stable_total_cmp_f64(t, bt).then_with(|| idx.cmp(&bi));
                if ord.is_lt() {
                    Some((t, idx, hit))
                } else {
                    Some((bt, bi, bh))
                }
            }
        };
    }

    best.map(|(_, _, hit)| hit)
}

/// Screen picking wrapper.
///
/// The caller supplies a deterministic screen->ray mapping via `make_ray`.
pub fn pick_wall_screen<F>(
    pos_px: Vec2,
    mut make_ray: F,
    mapper: &WallMapper<'_>,
    opts: PickSettings,
) -> Option<SurfaceHit>
where
    F: FnMut(Vec2) -> Option<Ray>,
{
    let ray = make_ray(pos_px)?;
    raycast_wall(ray, mapper, opts)
}

/// Nearest hold whose hit sphere the ray passes through. Orphaned holds have
/// no hit region. Ties resolve to the earlier hold in `holds`.
pub fn pick_hold(
    ray: Ray,
    holds: &[PlacedHold],
    mapper: &WallMapper<'_>,
    opts: PickSettings,
) -> Option<HoldHit> {
    let dir = ray.dir.normalize()?;
    let mut best: Option<HoldHit> = None;

    for hold in holds {
        let Some(t) = resolve_with(hold, mapper) else {
            continue;
        };
        let radius = opts.hold_pick_radius * hold.scale.abs().max(1e-6);
        let Some(dist) = ray_sphere_entry(ray.origin, dir, t.position, radius) else {
            continue;
        };
        if dist > opts.max_distance {
            continue;
        }
        if best.is_none_or(|b| stable_total_cmp_f64(dist, b.distance).is_lt()) {
            best = Some(HoldHit {
                hold_id: hold.id,
                distance: dist,
                point: ray.origin + dir * dist,
            });
        }
    }

    best
}

/// Local coordinates of a surface hit, clamped to the segment.
pub fn hit_to_local(hit: &SurfaceHit, mapper: &WallMapper<'_>) -> Option<LocalCoord> {
    let local = mapper.world_to_local(hit.point, hit.segment_id)?;
    mapper.clamp_local(hit.segment_id, local)
}

fn ray_sphere_entry(origin: Vec3, dir: Vec3, center: Vec3, radius: f64) -> Option<f64> {
    let oc = origin - center;
    let b = oc.dot(dir);
    let c = oc.length_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let sqrt_d = disc.sqrt();
    let t0 = -b - sqrt_d;
    let t1 = -b + sqrt_d;
    if t1 < 0.0 {
        return None;
    }
    // Origin inside the sphere counts as an immediate hit.
    Some(t0.max(0.0))
}
