use std::collections::HashMap;

use foundation::ids::SegmentId;
use foundation::math::Vec3;

use crate::model::WallConfig;

/// Base of one segment on the spine.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SpineNode {
    pub segment_id: SegmentId,
    /// Base point on the centerline; `x` is always 0.
    pub base: Vec3,
    /// Cumulative surface distance from the bottom of the wall to this base.
    pub odometer: f64,
    pub height: f64,
}

/// Cumulative centerline through all segment boundaries.
///
/// Derived from a `WallConfig` and treated as a read-only cache; rebuild it
/// whenever the config changes (see `WallCache`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spine {
    nodes: Vec<SpineNode>,
    top: Vec3,
    total_length: f64,
    by_id: HashMap<SegmentId, usize>,
}

impl Spine {
    /// Single left-to-right fold over the segments.
    pub fn build(config: &WallConfig) -> Self {
        let mut nodes = Vec::with_capacity(config.segments.len());
        let mut by_id = HashMap::with_capacity(config.segments.len());
        let mut vertical_y = 0.0;
        let mut depth_z = 0.0;
        let mut odometer = 0.0;

        for (idx, seg) in config.segments.iter().enumerate() {
            nodes.push(SpineNode {
                segment_id: seg.id,
                base: Vec3::new(0.0, vertical_y, depth_z),
                odometer,
                height: seg.height,
            });
            // First occurrence wins if the host let a duplicate id through.
            by_id.entry(seg.id).or_insert(idx);

            let a = seg.angle_rad();
            vertical_y += seg.height * a.cos();
            depth_z += seg.height * a.sin();
            odometer += seg.height;
        }

        Self {
            nodes,
            top: Vec3::new(0.0, vertical_y, depth_z),
            total_length: odometer,
            by_id,
        }
    }

    pub fn nodes(&self) -> &[SpineNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn index_of(&self, id: SegmentId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    pub fn node(&self, id: SegmentId) -> Option<&SpineNode> {
        self.nodes.get(self.index_of(id)?)
    }

    /// Centerline point at the top of the last segment.
    pub fn top(&self) -> Vec3 {
        self.top
    }

    pub fn total_length(&self) -> f64 {
        self.total_length
    }

    /// Finds the segment containing `odometer` and the distance along it.
    ///
    /// A value exactly on a boundary belongs to the upper segment, except the
    /// very top which belongs to the last segment. Values outside
    /// `[0, total_length]` return `None`.
    pub fn locate(&self, odometer: f64) -> Option<(usize, f64)> {
        if self.nodes.is_empty() || !(0.0..=self.total_length).contains(&odometer) {
            return None;
        }
        let upper = self.nodes.partition_point(|n| n.odometer <= odometer);
        let idx = upper.saturating_sub(1);
        let node = &self.nodes[idx];
        Some((idx, (odometer - node.odometer).min(node.height)))
    }
}
