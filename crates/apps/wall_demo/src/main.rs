use std::env;
use std::fs;

use engine::{Engine, EngineConfig, apply_drag_update};
use foundation::ids::{HoldId, SegmentId};
use foundation::math::{Vec2, Vec3};
use interaction::{DragHost, DragOutcome, DragTarget, PickSettings, Ray, SurfaceHit, raycast_wall};
use posture::PostureAnchor;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use wall::{PlacedHold, Spine, WallConfig, WallMapper, WallSegment};

/// Pixels per meter of the demo's orthographic camera.
const PX_PER_M: f64 = 100.0;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = real_main() {
        error!("{e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    let config = EngineConfig::from_env().unwrap_or_else(|e| {
        warn!(%e, "falling back to default engine config");
        EngineConfig::default()
    });
    let wall = load_wall()?;
    wall.validate().map_err(|e| e.to_string())?;

    let mut holds = vec![
        PlacedHold::new(HoldId(1), wall_segment(&wall, 0)?, -0.4, 1.0),
        PlacedHold::new(HoldId(2), wall_segment(&wall, 0)?, 0.3, 1.6).with_spin(30.0),
        PlacedHold::new(HoldId(3), wall_segment(&wall, wall.segments.len() - 1)?, 0.0, 0.5),
    ];
    for orphan in wall.orphaned_holds(&holds) {
        warn!(hold = %orphan.id, "hold references a missing segment");
    }
    let mut anchor = PostureAnchor::default();
    let mut engine = Engine::new(config);

    let meshes = engine.meshes(&wall);
    let triangles: usize = meshes.iter().map(|m| m.geometry.triangle_count()).sum();
    info!(
        segments = meshes.len(),
        triangles,
        total_length = wall.total_length(),
        "generated wall mesh"
    );

    for (id, t) in engine.renderable_holds(&wall, &holds) {
        let p = t.position;
        let e = t.euler_xyz();
        info!(hold = %id, x = p.x, y = p.y, z = p.z, rx = e.x, ry = e.y, rz = e.z, "hold placed");
    }

    // Drag the first hold up and to the right.
    let mut host = DemoHost::new(&wall);
    let start = project(Vec3::new(-0.4, 1.0, 0.0));
    let target = engine
        .pick_hold(&wall, &holds, camera_ray(start))
        .map(|hit| DragTarget::Hold(hit.hold_id));
    engine.pointer_down(start, target, &mut host);
    for step in 1..=8 {
        let pos = start + Vec2::new(8.0 * step as f64, 6.0 * step as f64);
        if let Some(DragOutcome::Moved(update)) = engine.pointer_move(&wall, pos, &mut host) {
            apply_drag_update(update, &mut holds, &mut anchor);
        }
    }
    let outcome = engine.pointer_up(start + Vec2::new(64.0, 48.0), &mut host);
    info!(?outcome, checkpoints = host.checkpoints, orbit = host.orbit_enabled, "drag finished");
    if let Some(hold) = holds.first() {
        info!(hold = %hold.id, segment = %hold.segment_id, x = hold.x, y = hold.y, "hold moved");
    }

    // Stand the figure across the first boundary.
    anchor.feet_odometer = wall
        .segments
        .first()
        .map(|s| (s.height - 0.5).max(0.0))
        .unwrap_or(0.0);
    match engine.pose_figure(&wall, &anchor) {
        Some(pose) => {
            let deg = pose.flexion.to_degrees();
            info!(
                chord = pose.topology.chord_length,
                protrusion = pose.topology.max_protrusion,
                depression = pose.topology.max_depression,
                hip = deg.hip,
                knee = deg.knee,
                spine = deg.spine,
                "figure posed"
            );
        }
        None => warn!("wall too short to pose the figure"),
    }

    let stats = engine.cache_stats();
    let (hits, misses) = engine.placement_counters();
    info!(
        spine_builds = stats.spine_builds,
        geometry_builds = stats.geometry_builds,
        placement_hits = hits,
        placement_misses = misses,
        "cache stats"
    );
    Ok(())
}

/// Wall from `WALL_DEMO_WALL` (a JSON `WallConfig`), or a built-in kicker wall.
fn load_wall() -> Result<WallConfig, String> {
    match env::var("WALL_DEMO_WALL") {
        Ok(path) if !path.trim().is_empty() => {
            let json = fs::read_to_string(path.trim()).map_err(|e| format!("{path}: {e}"))?;
            serde_json::from_str(&json).map_err(|e| format!("{path}: {e}"))
        }
        _ => Ok(WallConfig::new(
            3.0,
            vec![
                WallSegment::new(SegmentId(1), 2.0, 0.0),
                WallSegment::new(SegmentId(2), 0.5, 40.0),
                WallSegment::new(SegmentId(3), 2.5, 10.0),
            ],
        )),
    }
}

fn wall_segment(wall: &WallConfig, idx: usize) -> Result<SegmentId, String> {
    wall.segments
        .get(idx)
        .map(|s| s.id)
        .ok_or_else(|| "wall has no segments".to_string())
}

fn camera_ray(pos_px: Vec2) -> Ray {
    Ray::new(
        Vec3::new(pos_px.x / PX_PER_M, pos_px.y / PX_PER_M, 20.0),
        -Vec3::Z,
    )
}

fn project(p: Vec3) -> Vec2 {
    Vec2::new(p.x * PX_PER_M, p.y * PX_PER_M)
}

struct DemoHost {
    wall: WallConfig,
    spine: Spine,
    orbit_enabled: bool,
    checkpoints: usize,
}

impl DemoHost {
    fn new(wall: &WallConfig) -> Self {
        Self {
            wall: wall.clone(),
            spine: Spine::build(wall),
            orbit_enabled: true,
            checkpoints: 0,
        }
    }
}

impl DragHost for DemoHost {
    fn raycast_wall(&mut self, pos_px: Vec2) -> Option<SurfaceHit> {
        let mapper = WallMapper::new(&self.wall, &self.spine);
        raycast_wall(camera_ray(pos_px), &mapper, PickSettings::default())
    }

    fn set_orbit_enabled(&mut self, enabled: bool) {
        self.orbit_enabled = enabled;
    }

    fn checkpoint(&mut self) {
        self.checkpoints += 1;
    }
}
