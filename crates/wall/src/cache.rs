use std::collections::HashMap;
use std::sync::Arc;

use foundation::math::canonical_bits;
use tracing::debug;

use crate::model::{ContentKey, WallConfig, WallSegment};
use crate::mesh::{MeshParams, SegmentGeometry, SegmentMesh, build_segment_geometry};
use crate::spine::Spine;

/// Hit/miss counters for the memoization tables.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub spine_builds: u64,
    pub spine_hits: u64,
    pub geometry_builds: u64,
    pub geometry_hits: u64,
}

/// Memoized spine and segment meshes, keyed by content hash.
///
/// The spine is rebuilt only when `WallConfig::content_key` changes. Segment
/// geometry is keyed per segment (its height, angle, base odometer, the wall
/// width and the mesh params), so editing one segment regenerates only the
/// slabs whose inputs actually changed; the rest are re-translated.
#[derive(Debug, Default)]
pub struct WallCache {
    params: MeshParams,
    wall_key: Option<ContentKey>,
    spine: Arc<Spine>,
    geometry: HashMap<ContentKey, Arc<SegmentGeometry>>,
    meshes: Vec<SegmentMesh>,
    meshes_key: Option<ContentKey>,
    stats: CacheStats,
}

impl WallCache {
    pub fn new(params: MeshParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn params(&self) -> &MeshParams {
        &self.params
    }

    /// Changing params drops all cached geometry.
    pub fn set_params(&mut self, params: MeshParams) {
        if params != self.params {
            self.params = params;
            self.geometry.clear();
            self.meshes.clear();
            self.meshes_key = None;
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Content key of the wall currently cached, if any.
    pub fn wall_key(&self) -> Option<ContentKey> {
        self.wall_key
    }

    pub fn spine(&mut self, config: &WallConfig) -> Arc<Spine> {
        let key = config.content_key();
        if self.wall_key == Some(key) {
            self.stats.spine_hits += 1;
            return Arc::clone(&self.spine);
        }

        self.spine = Arc::new(Spine::build(config));
        self.wall_key = Some(key);
        self.stats.spine_builds += 1;
        debug!(
            segments = config.segments.len(),
            total_length = self.spine.total_length(),
            key = %key.to_hex(),
            "rebuilt wall spine"
        );
        Arc::clone(&self.spine)
    }

    /// Meshes for every segment, in wall order.
    pub fn meshes(&mut self, config: &WallConfig) -> &[SegmentMesh] {
        let spine = self.spine(config);
        if self.meshes_key == self.wall_key && self.meshes_key.is_some() {
            return &self.meshes;
        }

        let mut live: HashMap<ContentKey, Arc<SegmentGeometry>> = HashMap::new();
        let mut meshes = Vec::with_capacity(config.segments.len());
        let mut rebuilt = 0usize;

        for (idx, (seg, node)) in config.segments.iter().zip(spine.nodes()).enumerate() {
            let is_bottom = idx == 0;
            let key = geometry_key(seg, config.width, node.odometer, is_bottom, &self.params);
            let geometry = match self.geometry.get(&key) {
                Some(g) => {
                    self.stats.geometry_hits += 1;
                    Arc::clone(g)
                }
                None => {
                    self.stats.geometry_builds += 1;
                    rebuilt += 1;
                    Arc::new(build_segment_geometry(
                        seg,
                        config.width,
                        node.odometer,
                        is_bottom,
                        &self.params,
                    ))
                }
            };
            live.insert(key, Arc::clone(&geometry));
            meshes.push(SegmentMesh {
                segment_id: seg.id,
                translation: node.base,
                geometry,
            });
        }

        debug!(segments = meshes.len(), rebuilt, "regenerated wall meshes");
        // Geometry no longer referenced by the wall is pruned.
        self.geometry = live;
        self.meshes = meshes;
        self.meshes_key = self.wall_key;
        &self.meshes
    }
}

fn geometry_key(
    seg: &WallSegment,
    width: f64,
    base_odometer: f64,
    is_bottom: bool,
    params: &MeshParams,
) -> ContentKey {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"segment-geometry/v1");
    hasher.update(&canonical_bits(seg.height));
    hasher.update(&canonical_bits(seg.angle));
    hasher.update(&canonical_bits(width));
    hasher.update(&canonical_bits(base_odometer));
    hasher.update(&[is_bottom as u8]);
    hasher.update(&canonical_bits(params.thickness));
    hasher.update(&canonical_bits(params.uv_tile_size));
    hasher.into()
}
