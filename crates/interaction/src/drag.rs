//! Pointer-driven repositioning of holds and the figure.
//!
//! Gesture lifecycle:
//! - Pointer-down over a draggable target enters `Dragging` and disables orbit.
//! - The first move past `click_threshold_px` takes exactly one history
//!   checkpoint, before the first update is emitted.
//! - Up (or cancel) always returns to `Idle` and re-enables orbit.
//! - Up without crossing the threshold is a click: it selects the target.

use foundation::ids::{HoldId, SegmentId};
use foundation::math::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;
use wall::{LocalCoord, WallMapper};

use crate::picking::{SurfaceHit, hit_to_local};

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragSettings {
    /// Pointer travel (pixels) below which a press/release pair is a click.
    pub click_threshold_px: f64,
    /// Disable orbit while hovering the currently selected target.
    pub lock_orbit_on_selected_hover: bool,
}

impl Default for DragSettings {
    fn default() -> Self {
        Self {
            click_threshold_px: 5.0,
            lock_orbit_on_selected_hover: true,
        }
    }
}

/// Something that can be picked up.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DragTarget {
    Hold(HoldId),
    Figure,
}

/// The side of a drag that lives outside this crate: the renderer's
/// raycaster, the camera controller, and the undo history.
pub trait DragHost {
    /// Cast from the pointer against wall surfaces only (never holds).
    fn raycast_wall(&mut self, pos_px: Vec2) -> Option<SurfaceHit>;

    fn set_orbit_enabled(&mut self, enabled: bool);

    /// Snapshot the editable state before it is first mutated.
    fn checkpoint(&mut self);
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ActiveDrag {
    pub target: DragTarget,
    pub press_px: Vec2,
    /// Whether travel has crossed the click threshold.
    pub moved: bool,
    pub last_update: Option<DragUpdate>,
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Hovering(DragTarget),
    Dragging(ActiveDrag),
}

/// A new position for the dragged target.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DragUpdate {
    Hold {
        id: HoldId,
        segment_id: SegmentId,
        local: LocalCoord,
    },
    Figure {
        feet_odometer: f64,
        lateral: f64,
    },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DragOutcome {
    /// Apply this position to the target.
    Moved(DragUpdate),
    /// A gesture that moved ended; the last emitted update stands.
    Finished(DragTarget),
    /// A click changed the selection (`None` clears it).
    Selected(Option<DragTarget>),
}

#[derive(Debug, Clone, Default)]
pub struct DragEngine {
    settings: DragSettings,
    state: DragState,
    selected: Option<DragTarget>,
    /// Press on empty space, tracked only to recognize a deselecting click.
    empty_press_px: Option<Vec2>,
    hover_orbit_locked: bool,
}

impl DragEngine {
    pub fn new(settings: DragSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> DragSettings {
        self.settings
    }

    /// Takes effect from the next event; an active gesture keeps its state.
    pub fn set_settings(&mut self, settings: DragSettings) {
        self.settings = settings;
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn selected(&self) -> Option<DragTarget> {
        self.selected
    }

    /// Host-driven selection change. Re-evaluates the hover orbit lock.
    pub fn set_selected(&mut self, target: Option<DragTarget>, host: &mut impl DragHost) {
        self.selected = target;
        self.refresh_hover_lock(host);
    }

    /// True exactly while a drag is active; hosts route moves and releases
    /// from anywhere on the page here while this holds.
    pub fn captures_pointer(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    pub fn on_pointer_enter(&mut self, target: DragTarget, host: &mut impl DragHost) {
        if self.captures_pointer() {
            return;
        }
        self.state = DragState::Hovering(target);
        self.refresh_hover_lock(host);
    }

    pub fn on_pointer_leave(&mut self, host: &mut impl DragHost) {
        if self.captures_pointer() {
            return;
        }
        self.state = DragState::Idle;
        self.refresh_hover_lock(host);
    }

    /// `target` is what the pointer is over, if anything; falls back to the
    /// hovered target.
    pub fn on_pointer_down(
        &mut self,
        pos_px: Vec2,
        target: Option<DragTarget>,
        host: &mut impl DragHost,
    ) {
        if self.captures_pointer() {
            return;
        }
        let hovered = match self.state {
            DragState::Hovering(t) => Some(t),
            _ => None,
        };
        let Some(target) = target.or(hovered) else {
            self.empty_press_px = Some(pos_px);
            return;
        };

        self.empty_press_px = None;
        self.state = DragState::Dragging(ActiveDrag {
            target,
            press_px: pos_px,
            moved: false,
            last_update: None,
        });
        host.set_orbit_enabled(false);
        debug!(?target, "drag started");
    }

    pub fn on_pointer_move(
        &mut self,
        pos_px: Vec2,
        mapper: &WallMapper<'_>,
        host: &mut impl DragHost,
    ) -> Option<DragOutcome> {
        let DragState::Dragging(active) = &mut self.state else {
            return None;
        };

        if !active.moved {
            if pos_px.distance(active.press_px) < self.settings.click_threshold_px {
                return None;
            }
            active.moved = true;
            host.checkpoint();
        }

        let Some(hit) = host.raycast_wall(pos_px) else {
            debug!(x = pos_px.x, y = pos_px.y, "drag ray missed the wall");
            return None;
        };
        let update = update_for(active.target, &hit, mapper)?;
        active.last_update = Some(update);
        Some(DragOutcome::Moved(update))
    }

    pub fn on_pointer_up(&mut self, pos_px: Vec2, host: &mut impl DragHost) -> Option<DragOutcome> {
        if let Some(press) = self.empty_press_px.take() {
            if pos_px.distance(press) < self.settings.click_threshold_px
                && self.selected.is_some()
            {
                self.selected = None;
                return Some(DragOutcome::Selected(None));
            }
            return None;
        }

        let active = self.finish(host)?;
        if active.moved {
            return Some(DragOutcome::Finished(active.target));
        }
        if pos_px.distance(active.press_px) >= self.settings.click_threshold_px {
            // Released far away without any move events: neither a click
            // nor a placement.
            return None;
        }
        self.selected = Some(active.target);
        Some(DragOutcome::Selected(Some(active.target)))
    }

    /// Pointer-cancel and lost capture. Terminates like a release but never
    /// counts as a click.
    pub fn on_pointer_cancel(&mut self, host: &mut impl DragHost) -> Option<DragOutcome> {
        self.empty_press_px = None;
        let active = self.finish(host)?;
        active.moved.then_some(DragOutcome::Finished(active.target))
    }

    /// Abnormal termination (target deleted, wall replaced). Emits nothing.
    pub fn abort(&mut self, host: &mut impl DragHost) {
        self.empty_press_px = None;
        if self.finish(host).is_none() {
            self.release_hover_lock(host);
        }
    }

    fn finish(&mut self, host: &mut impl DragHost) -> Option<ActiveDrag> {
        let DragState::Dragging(active) = std::mem::take(&mut self.state) else {
            return None;
        };
        host.set_orbit_enabled(true);
        self.hover_orbit_locked = false;
        debug!(target = ?active.target, moved = active.moved, "drag ended");
        Some(active)
    }

    fn release_hover_lock(&mut self, host: &mut impl DragHost) {
        if self.hover_orbit_locked {
            host.set_orbit_enabled(true);
            self.hover_orbit_locked = false;
        }
    }

    /// Orbit is locked outside a drag only while hovering the selected target.
    fn refresh_hover_lock(&mut self, host: &mut impl DragHost) {
        if self.captures_pointer() {
            return;
        }
        let want = self.settings.lock_orbit_on_selected_hover
            && matches!(self.state, DragState::Hovering(t) if self.selected == Some(t));
        if want && !self.hover_orbit_locked {
            host.set_orbit_enabled(false);
            self.hover_orbit_locked = true;
        } else if !want {
            self.release_hover_lock(host);
        }
    }
}

fn update_for(target: DragTarget, hit: &SurfaceHit, mapper: &WallMapper<'_>) -> Option<DragUpdate> {
    let local = hit_to_local(hit, mapper)?;
    Some(match target {
        DragTarget::Hold(id) => DragUpdate::Hold {
            id,
            segment_id: hit.segment_id,
            local,
        },
        DragTarget::Figure => DragUpdate::Figure {
            feet_odometer: mapper.odometer_of(hit.segment_id, local.y)?,
            lateral: local.x,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::{DragEngine, DragHost, DragOutcome, DragSettings, DragState, DragTarget, DragUpdate};
    use crate::picking::SurfaceHit;
    use foundation::ids::{HoldId, SegmentId};
    use foundation::math::{Vec2, Vec3};
    use pretty_assertions::assert_eq;
    use wall::{LocalCoord, Spine, WallConfig, WallMapper, WallSegment};

    /// Vertical two-segment wall; 100 px per meter, y up, hits above 4 m miss.
    #[derive(Default)]
    struct MockHost {
        orbit_enabled: bool,
        orbit_toggles: Vec<bool>,
        checkpoints: usize,
    }

    impl DragHost for MockHost {
        fn raycast_wall(&mut self, pos_px: Vec2) -> Option<SurfaceHit> {
            let (x, y) = (pos_px.x / 100.0, pos_px.y / 100.0);
            if y > 4.0 {
                return None;
            }
            let segment_id = if y < 2.0 { SegmentId(1) } else { SegmentId(2) };
            Some(SurfaceHit {
                segment_id,
                point: Vec3::new(x, y, 0.0),
                distance: 10.0,
            })
        }

        fn set_orbit_enabled(&mut self, enabled: bool) {
            self.orbit_enabled = enabled;
            self.orbit_toggles.push(enabled);
        }

        fn checkpoint(&mut self) {
            self.checkpoints += 1;
        }
    }

    fn wall() -> WallConfig {
        WallConfig::new(
            4.0,
            vec![
                WallSegment::new(SegmentId(1), 2.0, 0.0),
                WallSegment::new(SegmentId(2), 2.0, 0.0),
            ],
        )
    }

    fn px(x: f64, y: f64) -> Vec2 {
        Vec2::new(x, y)
    }

    #[test]
    fn one_checkpoint_per_gesture_regardless_of_moves() {
        let w = wall();
        let spine = Spine::build(&w);
        let mapper = WallMapper::new(&w, &spine);
        let mut host = MockHost::default();
        let mut engine = DragEngine::new(DragSettings::default());
        let hold = DragTarget::Hold(HoldId(7));

        engine.on_pointer_down(px(50.0, 50.0), Some(hold), &mut host);
        assert!(engine.captures_pointer());
        assert!(!host.orbit_enabled);

        let mut updates = 0;
        for i in 1..=20 {
            let p = px(50.0 + 10.0 * i as f64, 50.0);
            if let Some(DragOutcome::Moved(_)) = engine.on_pointer_move(p, &mapper, &mut host) {
                updates += 1;
            }
        }
        assert_eq!(updates, 20);
        assert_eq!(host.checkpoints, 1);

        let out = engine.on_pointer_up(px(250.0, 50.0), &mut host);
        assert_eq!(out, Some(DragOutcome::Finished(hold)));
        assert_eq!(engine.state(), DragState::Idle);
        assert!(host.orbit_enabled);
        assert_eq!(engine.selected(), None);
    }

    #[test]
    fn click_selects_without_checkpoint_or_update() {
        let w = wall();
        let spine = Spine::build(&w);
        let mapper = WallMapper::new(&w, &spine);
        let mut host = MockHost::default();
        let mut engine = DragEngine::new(DragSettings::default());
        let hold = DragTarget::Hold(HoldId(3));

        engine.on_pointer_down(px(10.0, 10.0), Some(hold), &mut host);
        assert_eq!(engine.on_pointer_move(px(12.0, 11.0), &mapper, &mut host), None);
        let out = engine.on_pointer_up(px(12.0, 11.0), &mut host);

        assert_eq!(out, Some(DragOutcome::Selected(Some(hold))));
        assert_eq!(engine.selected(), Some(hold));
        assert_eq!(host.checkpoints, 0);
        assert!(host.orbit_enabled);
    }

    #[test]
    fn click_on_empty_wall_clears_selection() {
        let mut host = MockHost::default();
        let mut engine = DragEngine::new(DragSettings::default());
        engine.set_selected(Some(DragTarget::Figure), &mut host);

        engine.on_pointer_down(px(10.0, 10.0), None, &mut host);
        assert!(!engine.captures_pointer());
        let out = engine.on_pointer_up(px(11.0, 10.0), &mut host);
        assert_eq!(out, Some(DragOutcome::Selected(None)));
        assert_eq!(engine.selected(), None);

        // An orbit drag on empty space keeps the selection.
        engine.set_selected(Some(DragTarget::Figure), &mut host);
        engine.on_pointer_down(px(10.0, 10.0), None, &mut host);
        assert_eq!(engine.on_pointer_up(px(200.0, 10.0), &mut host), None);
        assert_eq!(engine.selected(), Some(DragTarget::Figure));
    }

    #[test]
    fn miss_keeps_last_position() {
        let w = wall();
        let spine = Spine::build(&w);
        let mapper = WallMapper::new(&w, &spine);
        let mut host = MockHost::default();
        let mut engine = DragEngine::new(DragSettings::default());
        let hold = DragTarget::Hold(HoldId(1));

        engine.on_pointer_down(px(100.0, 100.0), Some(hold), &mut host);
        let first = engine.on_pointer_move(px(100.0, 150.0), &mapper, &mut host);
        assert_eq!(
            first,
            Some(DragOutcome::Moved(DragUpdate::Hold {
                id: HoldId(1),
                segment_id: SegmentId(1),
                local: LocalCoord::new(1.0, 1.5),
            }))
        );
        assert_eq!(engine.on_pointer_move(px(100.0, 900.0), &mapper, &mut host), None);
        let (DragState::Dragging(active), Some(DragOutcome::Moved(update))) =
            (engine.state(), first)
        else {
            panic!("expected an active drag with one update");
        };
        assert_eq!(active.last_update, Some(update));
        assert_eq!(host.checkpoints, 1);
    }

    #[test]
    fn update_is_clamped_into_segment() {
        let w = wall();
        let spine = Spine::build(&w);
        let mapper = WallMapper::new(&w, &spine);
        let mut host = MockHost::default();
        let mut engine = DragEngine::new(DragSettings::default());

        engine.on_pointer_down(px(0.0, 0.0), Some(DragTarget::Hold(HoldId(1))), &mut host);
        let out = engine.on_pointer_move(px(900.0, 250.0), &mapper, &mut host);
        let Some(DragOutcome::Moved(DragUpdate::Hold { segment_id, local, .. })) = out else {
            panic!("expected hold update, got {out:?}");
        };
        assert_eq!(segment_id, SegmentId(2));
        assert!((local.x - 2.0).abs() < 1e-9);
        assert!((local.y - 0.5).abs() < 1e-9);
    }

    #[test]
    fn figure_drag_reports_odometer() {
        let w = wall();
        let spine = Spine::build(&w);
        let mapper = WallMapper::new(&w, &spine);
        let mut host = MockHost::default();
        let mut engine = DragEngine::new(DragSettings::default());

        engine.on_pointer_down(px(0.0, 0.0), Some(DragTarget::Figure), &mut host);
        let out = engine.on_pointer_move(px(-50.0, 300.0), &mapper, &mut host);
        let Some(DragOutcome::Moved(DragUpdate::Figure { feet_odometer, lateral })) = out else {
            panic!("expected figure update, got {out:?}");
        };
        assert!((feet_odometer - 3.0).abs() < 1e-9);
        assert!((lateral + 0.5).abs() < 1e-9);
    }

    #[test]
    fn cancel_and_abort_reenable_orbit() {
        let w = wall();
        let spine = Spine::build(&w);
        let mapper = WallMapper::new(&w, &spine);
        let mut host = MockHost::default();
        let mut engine = DragEngine::new(DragSettings::default());
        let hold = DragTarget::Hold(HoldId(2));

        engine.on_pointer_down(px(0.0, 0.0), Some(hold), &mut host);
        engine.on_pointer_move(px(0.0, 100.0), &mapper, &mut host);
        assert_eq!(engine.on_pointer_cancel(&mut host), Some(DragOutcome::Finished(hold)));
        assert!(host.orbit_enabled);
        assert!(!engine.captures_pointer());

        // Cancel before the threshold emits nothing and selects nothing.
        engine.on_pointer_down(px(0.0, 0.0), Some(hold), &mut host);
        assert_eq!(engine.on_pointer_cancel(&mut host), None);
        assert_eq!(engine.selected(), None);

        // Target deleted mid-drag.
        engine.on_pointer_down(px(0.0, 0.0), Some(hold), &mut host);
        assert!(!host.orbit_enabled);
        engine.abort(&mut host);
        assert!(host.orbit_enabled);
        assert_eq!(engine.state(), DragState::Idle);
        assert_eq!(engine.on_pointer_up(px(0.0, 0.0), &mut host), None);
    }

    #[test]
    fn hovering_selected_target_locks_orbit() {
        let mut host = MockHost::default();
        host.orbit_enabled = true;
        let mut engine = DragEngine::new(DragSettings::default());
        let hold = DragTarget::Hold(HoldId(4));

        engine.on_pointer_enter(hold, &mut host);
        assert!(host.orbit_enabled);
        engine.on_pointer_leave(&mut host);

        engine.set_selected(Some(hold), &mut host);
        engine.on_pointer_enter(hold, &mut host);
        assert!(!host.orbit_enabled);
        engine.on_pointer_leave(&mut host);
        assert!(host.orbit_enabled);

        let mut relaxed = DragEngine::new(DragSettings {
            lock_orbit_on_selected_hover: false,
            ..DragSettings::default()
        });
        relaxed.set_selected(Some(hold), &mut host);
        relaxed.on_pointer_enter(hold, &mut host);
        assert!(host.orbit_enabled);
    }

    #[test]
    fn hover_lock_follows_the_hovered_target() {
        let mut host = MockHost::default();
        host.orbit_enabled = true;
        let mut engine = DragEngine::new(DragSettings::default());
        let a = DragTarget::Hold(HoldId(1));
        let b = DragTarget::Hold(HoldId(2));

        engine.set_selected(Some(a), &mut host);
        engine.on_pointer_enter(a, &mut host);
        assert!(!host.orbit_enabled);
        // Straight onto a neighbour without a leave in between.
        engine.on_pointer_enter(b, &mut host);
        assert_eq!(engine.state(), DragState::Hovering(b));
        assert!(host.orbit_enabled);

        engine.on_pointer_enter(a, &mut host);
        assert!(!host.orbit_enabled);
        engine.set_selected(None, &mut host);
        assert!(host.orbit_enabled);
        engine.set_selected(Some(a), &mut host);
        assert!(!host.orbit_enabled);
        assert_eq!(host.orbit_toggles, vec![false, true, false, true, false]);
    }

    #[test]
    fn distant_release_without_moves_is_not_a_click() {
        let mut host = MockHost::default();
        let mut engine = DragEngine::new(DragSettings::default());
        let hold = DragTarget::Hold(HoldId(1));

        engine.on_pointer_down(px(0.0, 0.0), Some(hold), &mut host);
        assert_eq!(engine.on_pointer_up(px(300.0, 0.0), &mut host), None);
        assert_eq!(engine.selected(), None);
        assert_eq!(engine.state(), DragState::Idle);
        assert!(host.orbit_enabled);
        assert_eq!(host.checkpoints, 0);
    }

    #[test]
    fn down_uses_hovered_target_and_ignores_second_press() {
        let mut host = MockHost::default();
        let mut engine = DragEngine::new(DragSettings::default());
        engine.on_pointer_enter(DragTarget::Figure, &mut host);
        engine.on_pointer_down(px(0.0, 0.0), None, &mut host);
        assert!(matches!(
            engine.state(),
            DragState::Dragging(a) if a.target == DragTarget::Figure
        ));
        engine.on_pointer_down(px(5.0, 5.0), Some(DragTarget::Hold(HoldId(1))), &mut host);
        assert!(matches!(
            engine.state(),
            DragState::Dragging(a) if a.target == DragTarget::Figure
        ));
        engine.on_pointer_enter(DragTarget::Hold(HoldId(1)), &mut host);
        assert!(engine.captures_pointer());
    }
}
