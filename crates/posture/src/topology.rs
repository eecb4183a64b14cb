use foundation::math::{Vec3, clamp_finite};
use wall::{Spine, WallConfig, WallMapper};

/// Shape of the wall between a figure's feet and head.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Topology {
    /// Straight-line distance feet -> head.
    pub chord_length: f64,
    /// Largest boundary offset toward the climber.
    pub max_protrusion: f64,
    /// Largest boundary offset away from the climber.
    pub max_depression: f64,
    /// Unit average of the feet and head surface normals.
    pub avg_normal: Vec3,
}

/// Scans the wall span `[feet_odometer, head_odometer]` at `lateral`.
///
/// Both odometers are clamped into `[0, total_length]`. Returns `None` for
/// walls with no length. A span that crosses no segment boundary reports zero
/// protrusion and depression.
pub fn scan(
    feet_odometer: f64,
    head_odometer: f64,
    lateral: f64,
    mapper: &WallMapper<'_>,
) -> Option<Topology> {
    let spine = mapper.spine();
    let total = spine.total_length();
    if spine.is_empty() || total <= 0.0 {
        return None;
    }
    let feet_odo = clamp_finite(feet_odometer, 0.0, total);
    let head_odo = clamp_finite(head_odometer, 0.0, total);

    let feet = mapper.odometer_to_world(feet_odo, lateral)?;
    let head = mapper.odometer_to_world(head_odo, lateral)?;
    let avg_normal = (feet.normal + head.normal)
        .normalize()
        .unwrap_or(feet.normal);

    let chord = head.position - feet.position;
    let chord_len_sq = chord.length_squared();
    let mut topology = Topology {
        chord_length: chord_len_sq.sqrt(),
        max_protrusion: 0.0,
        max_depression: 0.0,
        avg_normal,
    };
    if chord_len_sq <= f64::EPSILON {
        return Some(topology);
    }

    let (lo, hi) = if feet_odo <= head_odo {
        (feet_odo, head_odo)
    } else {
        (head_odo, feet_odo)
    };

    // Interior boundaries are the bases of every segment after the first.
    for node in spine.nodes().iter().skip(1) {
        if node.odometer <= lo || node.odometer >= hi {
            continue;
        }
        let boundary = Vec3::new(lateral, node.base.y, node.base.z);
        let t = ((boundary - feet.position).dot(chord) / chord_len_sq).clamp(0.0, 1.0);
        let diff = boundary - (feet.position + chord * t);
        let dist = diff.length();
        let side = diff.dot(avg_normal);
        if side > 0.0 {
            topology.max_protrusion = topology.max_protrusion.max(dist);
        } else if side < 0.0 {
            topology.max_depression = topology.max_depression.max(dist);
        }
    }

    Some(topology)
}

/// `scan` for callers holding only a config. Builds a throwaway spine.
pub fn scan_wall(
    feet_odometer: f64,
    head_odometer: f64,
    lateral: f64,
    config: &WallConfig,
) -> Option<Topology> {
    let spine = Spine::build(config);
    scan(
        feet_odometer,
        head_odometer,
        lateral,
        &WallMapper::new(config, &spine),
    )
}
