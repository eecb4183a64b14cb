use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use foundation::bounds::Aabb3;
use foundation::ids::SegmentId;
use foundation::math::Vec3;
use serde::{Deserialize, Serialize};

use crate::model::{WallConfig, WallSegment};
use crate::spine::{Spine, SpineNode};

/// Slab parameters shared by every segment.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshParams {
    /// Slab depth behind the climbing surface (meters).
    pub thickness: f64,
    /// World size of one texture repeat (meters).
    pub uv_tile_size: f64,
}

impl Default for MeshParams {
    fn default() -> Self {
        Self {
            thickness: 0.2,
            uv_tile_size: 1.0,
        }
    }
}

/// Interleaved vertex for GPU upload.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct WallVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// Corner order within each ring.
pub const FRONT_LEFT: u32 = 0;
pub const FRONT_RIGHT: u32 = 1;
pub const BACK_RIGHT: u32 = 2;
pub const BACK_LEFT: u32 = 3;
/// Offset from a base-ring corner to the same corner on the top ring.
pub const TOP_RING: u32 = 4;

/// Local-space slab for one segment, relative to its spine base.
///
/// Eight vertices: the base ring then the top ring, each ordered
/// front-left, front-right, back-right, back-left.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentGeometry {
    pub positions: Vec<Vec3>,
    pub uvs: Vec<[f64; 2]>,
    /// Counter-clockwise triangles seen from outside the slab.
    pub indices: Vec<u32>,
    pub bounds: Aabb3,
}

impl SegmentGeometry {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_buffer(&self) -> Vec<WallVertex> {
        self.positions
            .iter()
            .zip(&self.uvs)
            .map(|(p, uv)| WallVertex {
                position: p.to_f32(),
                uv: [uv[0] as f32, uv[1] as f32],
            })
            .collect()
    }
}

/// A segment's slab placed in the scene by translating it to its spine base.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentMesh {
    pub segment_id: SegmentId,
    pub translation: Vec3,
    pub geometry: Arc<SegmentGeometry>,
}

impl SegmentMesh {
    pub fn world_positions(&self) -> Vec<Vec3> {
        self.geometry
            .positions
            .iter()
            .map(|p| *p + self.translation)
            .collect()
    }

    pub fn world_bounds(&self) -> Aabb3 {
        self.geometry.bounds.translated(self.translation)
    }
}

/// Builds the local slab for `segment`.
///
/// `base_odometer` only feeds the V texture coordinate so the surface pattern
/// runs continuously from segment to segment.
pub fn build_segment_geometry(
    segment: &WallSegment,
    width: f64,
    base_odometer: f64,
    is_bottom: bool,
    params: &MeshParams,
) -> SegmentGeometry {
    let half = width * 0.5;
    let up = segment.direction() * segment.height;
    let back = -segment.normal() * params.thickness;
    let tile = if params.uv_tile_size > 0.0 {
        params.uv_tile_size
    } else {
        1.0
    };

    let ring = |offset: Vec3| {
        [
            Vec3::new(-half, 0.0, 0.0) + offset,
            Vec3::new(half, 0.0, 0.0) + offset,
            Vec3::new(half, 0.0, 0.0) + offset + back,
            Vec3::new(-half, 0.0, 0.0) + offset + back,
        ]
    };
    let mut positions = Vec::with_capacity(8);
    positions.extend(ring(Vec3::ZERO));
    positions.extend(ring(up));

    let v_base = base_odometer / tile;
    let v_top = (base_odometer + segment.height) / tile;
    let mut uvs = Vec::with_capacity(8);
    for v in [v_base, v_top] {
        for x in [-half, half, half, -half] {
            uvs.push([x / tile, v]);
        }
    }

    let (fl, fr, br, bl) = (FRONT_LEFT, FRONT_RIGHT, BACK_RIGHT, BACK_LEFT);
    let t = TOP_RING;
    let mut indices = Vec::with_capacity(36);
    // Front, back, left, right, top.
    push_quad(&mut indices, [fl, fr, fr + t, fl + t]);
    push_quad(&mut indices, [br, bl, bl + t, br + t]);
    push_quad(&mut indices, [bl, fl, fl + t, bl + t]);
    push_quad(&mut indices, [fr, br, br + t, fr + t]);
    push_quad(&mut indices, [fl + t, fr + t, br + t, bl + t]);
    if is_bottom {
        push_quad(&mut indices, [fl, bl, br, fr]);
    }

    let bounds = Aabb3::from_points(&positions).unwrap_or(Aabb3::new(Vec3::ZERO, Vec3::ZERO));

    SegmentGeometry {
        positions,
        uvs,
        indices,
        bounds,
    }
}

fn push_quad(indices: &mut Vec<u32>, quad: [u32; 4]) {
    indices.extend_from_slice(&[quad[0], quad[1], quad[2], quad[0], quad[2], quad[3]]);
}

/// Places one segment's geometry at its spine base.
pub fn segment_mesh(
    segment: &WallSegment,
    node: &SpineNode,
    width: f64,
    is_bottom: bool,
    params: &MeshParams,
) -> SegmentMesh {
    SegmentMesh {
        segment_id: segment.id,
        translation: node.base,
        geometry: Arc::new(build_segment_geometry(
            segment,
            width,
            node.odometer,
            is_bottom,
            params,
        )),
    }
}

/// Uncached mesh generation for the whole wall. Empty walls yield no meshes.
pub fn generate_wall_mesh(config: &WallConfig, spine: &Spine, params: &MeshParams) -> Vec<SegmentMesh> {
    config
        .segments
        .iter()
        .zip(spine.nodes())
        .enumerate()
        .map(|(idx, (seg, node))| segment_mesh(seg, node, config.width, idx == 0, params))
        .collect()
}
