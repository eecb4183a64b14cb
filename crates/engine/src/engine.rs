use std::sync::Arc;

use foundation::ids::HoldId;
use foundation::math::Vec2;
use interaction::{
    DragEngine, DragHost, DragOutcome, DragTarget, DragUpdate, HoldHit, Ray, SurfaceHit,
    pick_hold, raycast_wall,
};
use posture::{FigurePose, Flexion, PostureAnchor, pose_figure};
use tracing::{debug, warn};
use wall::{
    CacheStats, ContentKey, PlacedHold, PlacementCache, SegmentMesh, Spine, WallCache, WallConfig,
    WallMapper, WorldTransform,
};

use crate::config::EngineConfig;

/// Host-facing facade: memoized geometry and placement, picking, the drag
/// state machine and figure posing behind one handle.
///
/// The engine never owns the wall or the holds. Every call takes the host's
/// current data, and caches key on its content.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    walls: WallCache,
    placements: PlacementCache,
    drag: DragEngine,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let config = config.sanitized();
        Self {
            walls: WallCache::new(config.mesh),
            placements: PlacementCache::new(),
            drag: DragEngine::new(config.drag),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EngineConfig) {
        let config = config.sanitized();
        self.walls.set_params(config.mesh);
        self.drag.set_settings(config.drag);
        self.config = config;
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.walls.stats()
    }

    /// `(hits, misses)` of the placement memo.
    pub fn placement_counters(&self) -> (u64, u64) {
        self.placements.counters()
    }

    fn spine(&mut self, wall: &WallConfig) -> (Arc<Spine>, ContentKey) {
        let spine = self.walls.spine(wall);
        let key = self
            .walls
            .wall_key()
            .unwrap_or_else(|| wall.content_key());
        (spine, key)
    }

    pub fn meshes(&mut self, wall: &WallConfig) -> &[SegmentMesh] {
        self.walls.meshes(wall)
    }

    pub fn resolve_hold(&mut self, wall: &WallConfig, hold: &PlacedHold) -> Option<WorldTransform> {
        let (spine, key) = self.spine(wall);
        let mapper = WallMapper::new(wall, &spine);
        self.placements.resolve(hold, key, &mapper)
    }

    /// Draw transforms for every resolvable hold, in input order. Orphans
    /// are skipped. Cache entries for holds no longer present are dropped.
    pub fn renderable_holds(
        &mut self,
        wall: &WallConfig,
        holds: &[PlacedHold],
    ) -> Vec<(HoldId, WorldTransform)> {
        let (spine, key) = self.spine(wall);
        let mapper = WallMapper::new(wall, &spine);
        self.placements.retain_holds(holds);

        let mut out = Vec::with_capacity(holds.len());
        for hold in holds {
            match self.placements.resolve(hold, key, &mapper) {
                Some(t) => out.push((hold.id, t)),
                None => warn!(hold = %hold.id, segment = %hold.segment_id, "skipping orphaned hold"),
            }
        }
        out
    }

    pub fn pose_figure(&mut self, wall: &WallConfig, anchor: &PostureAnchor) -> Option<FigurePose> {
        let (spine, _) = self.spine(wall);
        pose_figure(anchor, &WallMapper::new(wall, &spine), &self.config.posture)
    }

    /// Flexion for `anchor`, neutral when the wall cannot support a pose.
    pub fn flexion(&mut self, wall: &WallConfig, anchor: &PostureAnchor) -> Flexion {
        self.pose_figure(wall, anchor)
            .map(|pose| pose.flexion)
            .unwrap_or(Flexion::NEUTRAL)
    }

    pub fn pick_wall(&mut self, wall: &WallConfig, ray: Ray) -> Option<SurfaceHit> {
        let (spine, _) = self.spine(wall);
        raycast_wall(ray, &WallMapper::new(wall, &spine), self.config.picking)
    }

    pub fn pick_hold(
        &mut self,
        wall: &WallConfig,
        holds: &[PlacedHold],
        ray: Ray,
    ) -> Option<HoldHit> {
        let (spine, _) = self.spine(wall);
        pick_hold(ray, holds, &WallMapper::new(wall, &spine), self.config.picking)
    }

    pub fn drag(&self) -> &DragEngine {
        &self.drag
    }

    pub fn drag_mut(&mut self) -> &mut DragEngine {
        &mut self.drag
    }

    pub fn pointer_down(
        &mut self,
        pos_px: Vec2,
        target: Option<DragTarget>,
        host: &mut impl DragHost,
    ) {
        self.drag.on_pointer_down(pos_px, target, host);
    }

    pub fn pointer_move(
        &mut self,
        wall: &WallConfig,
        pos_px: Vec2,
        host: &mut impl DragHost,
    ) -> Option<DragOutcome> {
        if !self.drag.captures_pointer() {
            return None;
        }
        let (spine, _) = self.spine(wall);
        self.drag
            .on_pointer_move(pos_px, &WallMapper::new(wall, &spine), host)
    }

    pub fn pointer_up(&mut self, pos_px: Vec2, host: &mut impl DragHost) -> Option<DragOutcome> {
        self.drag.on_pointer_up(pos_px, host)
    }

    pub fn pointer_cancel(&mut self, host: &mut impl DragHost) -> Option<DragOutcome> {
        self.drag.on_pointer_cancel(host)
    }
}

/// Writes a drag update into the host's data. Returns `false` when the
/// target no longer exists.
pub fn apply_drag_update(
    update: DragUpdate,
    holds: &mut [PlacedHold],
    anchor: &mut PostureAnchor,
) -> bool {
    match update {
        DragUpdate::Hold {
            id,
            segment_id,
            local,
        } => {
            let Some(hold) = holds.iter_mut().find(|h| h.id == id) else {
                debug!(hold = %id, "drag update for a hold that no longer exists");
                return false;
            };
            hold.set_local(segment_id, local);
            true
        }
        DragUpdate::Figure {
            feet_odometer,
            lateral,
        } => {
            anchor.feet_odometer = feet_odometer;
            anchor.lateral = lateral;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Engine, apply_drag_update};
    use crate::config::EngineConfig;
    use foundation::ids::{HoldId, SegmentId};
    use foundation::math::{Vec2, Vec3};
    use interaction::{
        DragHost, DragOutcome, DragTarget, PickSettings, Ray, SurfaceHit, raycast_wall,
    };
    use posture::PostureAnchor;
    use pretty_assertions::assert_eq;
    use wall::{LocalCoord, PlacedHold, Spine, WallConfig, WallMapper, WallSegment};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn assert_vec_close(a: Vec3, b: Vec3, eps: f64) {
        assert!(a.distance(b) <= eps, "expected {a:?} ~= {b:?}");
    }

    /// Orthographic camera looking down -Z, 100 px per meter.
    fn camera_ray(pos_px: Vec2) -> Ray {
        Ray::new(Vec3::new(pos_px.x / 100.0, pos_px.y / 100.0, 10.0), -Vec3::Z)
    }

    struct SceneHost {
        wall: WallConfig,
        orbit_enabled: bool,
        checkpoints: Vec<Vec<PlacedHold>>,
        holds_snapshot: Vec<PlacedHold>,
    }

    impl SceneHost {
        fn new(wall: WallConfig, holds: &[PlacedHold]) -> Self {
            Self {
                wall,
                orbit_enabled: true,
                checkpoints: Vec::new(),
                holds_snapshot: holds.to_vec(),
            }
        }
    }

    impl DragHost for SceneHost {
        fn raycast_wall(&mut self, pos_px: Vec2) -> Option<SurfaceHit> {
            let spine = Spine::build(&self.wall);
            let mapper = WallMapper::new(&self.wall, &spine);
            raycast_wall(camera_ray(pos_px), &mapper, PickSettings::default())
        }

        fn set_orbit_enabled(&mut self, enabled: bool) {
            self.orbit_enabled = enabled;
        }

        fn checkpoint(&mut self) {
            self.checkpoints.push(self.holds_snapshot.clone());
        }
    }

    fn single(h: f64) -> WallConfig {
        WallConfig::new(2.0, vec![WallSegment::new(SegmentId(1), h, 0.0)])
    }

    fn roofed() -> WallConfig {
        WallConfig::new(
            2.0,
            vec![
                WallSegment::new(SegmentId(1), 2.0, 0.0),
                WallSegment::new(SegmentId(2), 2.0, 90.0),
            ],
        )
    }

    fn kinked() -> WallConfig {
        WallConfig::new(
            2.0,
            vec![
                WallSegment::new(SegmentId(1), 2.0, 0.0),
                WallSegment::new(SegmentId(2), 0.5, 40.0),
                WallSegment::new(SegmentId(3), 2.0, 0.0),
            ],
        )
    }

    #[test]
    fn hold_on_single_vertical_segment() {
        let mut engine = Engine::default();
        let wall = single(2.0);
        let hold = PlacedHold::new(HoldId(1), SegmentId(1), 0.5, 1.0);
        let t = engine.resolve_hold(&wall, &hold).expect("resolves");
        assert_vec_close(t.position, Vec3::new(0.5, 1.0, 0.0), 1e-9);
    }

    #[test]
    fn hold_on_horizontal_roof() {
        let mut engine = Engine::default();
        let wall = roofed();
        let hold = PlacedHold::new(HoldId(1), SegmentId(2), 0.0, 1.0);
        let t = engine.resolve_hold(&wall, &hold).expect("resolves");
        assert_vec_close(t.position, Vec3::new(0.0, 2.0, 1.0), 1e-9);
        assert_vec_close(t.forward(), Vec3::new(0.0, -1.0, 0.0), 1e-9);
    }

    #[test]
    fn kinked_span_flexes_the_figure() {
        let mut engine = Engine::default();
        let anchor = PostureAnchor {
            feet_odometer: 2.0,
            lateral: 0.0,
            figure_height: 2.0,
        };
        let pose = engine.pose_figure(&kinked(), &anchor).expect("pose");
        assert!(pose.topology.max_protrusion > 0.0);
        assert!(pose.flexion.hip > 0.0);
        assert!(pose.flexion.knee < 0.0);

        let empty = WallConfig::new(2.0, Vec::new());
        assert!(engine.flexion(&empty, &anchor).is_neutral());
    }

    #[test]
    fn removed_segment_orphans_hold_without_failing() {
        let mut engine = Engine::default();
        let mut wall = roofed();
        let holds = vec![
            PlacedHold::new(HoldId(1), SegmentId(1), 0.0, 1.0),
            PlacedHold::new(HoldId(2), SegmentId(2), 0.0, 1.0),
        ];
        assert_eq!(engine.renderable_holds(&wall, &holds).len(), 2);

        wall.remove_segment(SegmentId(2));
        let live = engine.renderable_holds(&wall, &holds);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].0, HoldId(1));
        assert!(engine.resolve_hold(&wall, &holds[1]).is_none());
        assert_eq!(
            wall.orphaned_holds(&holds)
                .iter()
                .map(|h| h.id)
                .collect::<Vec<_>>(),
            vec![HoldId(2)]
        );
    }

    #[test]
    fn repeated_frames_hit_the_caches() {
        let mut engine = Engine::default();
        let wall = kinked();
        let holds = vec![
            PlacedHold::new(HoldId(1), SegmentId(1), 0.0, 1.0),
            PlacedHold::new(HoldId(2), SegmentId(3), 0.5, 0.5),
        ];
        for _ in 0..3 {
            assert_eq!(engine.meshes(&wall).len(), 3);
            engine.renderable_holds(&wall, &holds);
        }
        let stats = engine.cache_stats();
        assert_eq!(stats.spine_builds, 1);
        assert_eq!(stats.geometry_builds, 3);
        assert_eq!(engine.placement_counters(), (4, 2));
    }

    #[test]
    fn drag_gesture_moves_hold_with_one_checkpoint() {
        let mut engine = Engine::default();
        let wall = roofed();
        let mut holds = vec![PlacedHold::new(HoldId(1), SegmentId(1), 0.0, 0.5)];
        let mut anchor = PostureAnchor::default();
        let mut host = SceneHost::new(wall.clone(), &holds);

        let press = Vec2::new(0.0, 50.0);
        let ray = camera_ray(press);
        let picked = engine.pick_hold(&wall, &holds, ray).expect("hold under pointer");
        assert_eq!(picked.hold_id, HoldId(1));

        engine.pointer_down(press, Some(DragTarget::Hold(picked.hold_id)), &mut host);
        assert!(!host.orbit_enabled);
        for step in 1..=10 {
            let pos = Vec2::new(10.0 * step as f64, 50.0 + 10.0 * step as f64);
            if let Some(DragOutcome::Moved(update)) = engine.pointer_move(&wall, pos, &mut host) {
                assert!(apply_drag_update(update, &mut holds, &mut anchor));
            }
        }
        // Off the top of the wall: the last position stands.
        assert_eq!(engine.pointer_move(&wall, Vec2::new(0.0, 900.0), &mut host), None);
        let out = engine.pointer_up(Vec2::new(0.0, 900.0), &mut host);

        assert_eq!(out, Some(DragOutcome::Finished(DragTarget::Hold(HoldId(1)))));
        assert!(host.orbit_enabled);
        assert_eq!(host.checkpoints.len(), 1);
        assert_eq!(host.checkpoints[0][0].local(), LocalCoord::new(0.0, 0.5));
        assert_eq!(holds[0].segment_id, SegmentId(1));
        assert_close(holds[0].x, 1.0, 1e-9);
        assert_close(holds[0].y, 1.5, 1e-9);
    }

    #[test]
    fn click_selects_without_mutating() {
        let mut engine = Engine::default();
        let wall = single(3.0);
        let holds = vec![PlacedHold::new(HoldId(5), SegmentId(1), 0.2, 1.0)];
        let mut host = SceneHost::new(wall.clone(), &holds);
        let target = DragTarget::Hold(HoldId(5));

        engine.pointer_down(Vec2::new(20.0, 100.0), Some(target), &mut host);
        assert_eq!(engine.pointer_move(&wall, Vec2::new(22.0, 101.0), &mut host), None);
        let out = engine.pointer_up(Vec2::new(22.0, 101.0), &mut host);
        assert_eq!(out, Some(DragOutcome::Selected(Some(target))));
        assert_eq!(engine.drag().selected(), Some(target));
        assert!(host.checkpoints.is_empty());
    }

    #[test]
    fn figure_drag_moves_anchor() {
        let mut engine = Engine::default();
        let wall = roofed();
        let mut holds = Vec::new();
        let mut anchor = PostureAnchor::default();
        let mut host = SceneHost::new(wall.clone(), &holds);

        engine.pointer_down(Vec2::new(0.0, 0.0), Some(DragTarget::Figure), &mut host);
        let out = engine.pointer_move(&wall, Vec2::new(-30.0, 120.0), &mut host);
        let Some(DragOutcome::Moved(update)) = out else {
            panic!("expected a move, got {out:?}");
        };
        assert!(apply_drag_update(update, &mut holds, &mut anchor));
        assert_close(anchor.feet_odometer, 1.2, 1e-9);
        assert_close(anchor.lateral, -0.3, 1e-9);
        assert_eq!(engine.pointer_cancel(&mut host), Some(DragOutcome::Finished(DragTarget::Figure)));
        assert!(host.orbit_enabled);
    }

    #[test]
    fn config_changes_reach_mesh_and_drag() {
        let mut engine = Engine::default();
        let wall = single(2.0);
        let thin = engine.meshes(&wall)[0].geometry.bounds;

        let mut config = EngineConfig::default();
        config.mesh.thickness = 0.5;
        config.drag.click_threshold_px = 50.0;
        engine.set_config(config);

        let thick = engine.meshes(&wall)[0].geometry.bounds;
        assert_close(thin.min.z, -0.2, 1e-9);
        assert_close(thick.min.z, -0.5, 1e-9);
        assert_eq!(engine.drag().settings().click_threshold_px, 50.0);
    }

    #[test]
    fn invalid_config_falls_back_to_defaults() {
        let mut config = EngineConfig::default();
        config.picking.hold_pick_radius = -1.0;
        let engine = Engine::new(config);
        assert_eq!(engine.config().picking.hold_pick_radius, 0.12);
    }

    #[test]
    fn update_for_deleted_hold_is_ignored() {
        let mut holds = vec![PlacedHold::new(HoldId(1), SegmentId(1), 0.0, 0.0)];
        let mut anchor = PostureAnchor::default();
        let update = interaction::DragUpdate::Hold {
            id: HoldId(9),
            segment_id: SegmentId(1),
            local: LocalCoord::new(1.0, 1.0),
        };
        assert!(!apply_drag_update(update, &mut holds, &mut anchor));
        assert_eq!(holds[0].local(), LocalCoord::new(0.0, 0.0));
    }
}
