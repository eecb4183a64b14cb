use foundation::math::{Vec3, clamp_finite};
use serde::{Deserialize, Serialize};
use tracing::debug;
use wall::{WallMapper, WorldTransform};

use crate::solver::{Flexion, PostureTuning, solve};
use crate::topology::{Topology, scan};

/// Where the figure stands: its feet odometer and lateral offset. The head
/// sits `figure_height` further along the surface.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostureAnchor {
    pub feet_odometer: f64,
    pub lateral: f64,
    pub figure_height: f64,
}

impl Default for PostureAnchor {
    fn default() -> Self {
        Self {
            feet_odometer: 0.0,
            lateral: 0.0,
            figure_height: 1.75,
        }
    }
}

impl PostureAnchor {
    pub fn head_odometer(&self) -> f64 {
        self.feet_odometer + self.figure_height
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FigurePose {
    /// Feet position, oriented so the figure's forward axis is the surface
    /// normal at the feet.
    pub feet: WorldTransform,
    pub head: Vec3,
    /// Unit vector feet -> head.
    pub body_axis: Vec3,
    /// Direction the figure's front faces (away from the wall).
    pub facing: Vec3,
    pub topology: Topology,
    pub flexion: Flexion,
}

/// Poses the figure against the wall. `None` when the wall has no length.
pub fn pose_figure(
    anchor: &PostureAnchor,
    mapper: &WallMapper<'_>,
    tuning: &PostureTuning,
) -> Option<FigurePose> {
    let total = mapper.spine().total_length();
    let feet_odo = clamp_finite(anchor.feet_odometer, 0.0, total);
    let head_odo = clamp_finite(anchor.head_odometer(), 0.0, total);

    let Some(topology) = scan(feet_odo, head_odo, anchor.lateral, mapper) else {
        debug!(feet_odometer = anchor.feet_odometer, "figure anchor has no wall to stand on");
        return None;
    };
    let feet_pt = mapper.odometer_to_world(feet_odo, anchor.lateral)?;
    let head_pt = mapper.odometer_to_world(head_odo, anchor.lateral)?;
    let feet = mapper.local_to_world(feet_pt.segment_id, feet_pt.local.x, feet_pt.local.y, 0.0)?;

    let body_axis = (head_pt.position - feet_pt.position)
        .normalize()
        .unwrap_or(Vec3::Y);
    let flexion = solve(Some(&topology), anchor.figure_height, tuning);

    Some(FigurePose {
        feet,
        head: head_pt.position,
        body_axis,
        facing: topology.avg_normal,
        topology,
        flexion,
    })
}
