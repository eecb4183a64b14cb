use std::collections::{HashMap, HashSet};

use foundation::ids::HoldId;
use tracing::warn;

use crate::mapper::{WallMapper, WorldTransform};
use crate::model::{ContentKey, PlacedHold, WallConfig};
use crate::spine::Spine;

/// Resolves a hold against `config`, building a throwaway spine.
///
/// Prefer `resolve_with` (or `PlacementCache`) when resolving many holds.
pub fn resolve(hold: &PlacedHold, config: &WallConfig) -> Option<WorldTransform> {
    let spine = Spine::build(config);
    resolve_with(hold, &WallMapper::new(config, &spine))
}

/// World transform of `hold`, or `None` if its segment no longer exists.
pub fn resolve_with(hold: &PlacedHold, mapper: &WallMapper<'_>) -> Option<WorldTransform> {
    mapper.local_to_world(hold.segment_id, hold.x, hold.y, hold.spin)
}

/// Draw transforms for every resolvable hold, in input order. Orphans are
/// skipped (and logged) rather than failing the frame.
pub fn renderable_holds(
    holds: &[PlacedHold],
    mapper: &WallMapper<'_>,
) -> Vec<(HoldId, WorldTransform)> {
    let mut out = Vec::with_capacity(holds.len());
    for hold in holds {
        match resolve_with(hold, mapper) {
            Some(t) => out.push((hold.id, t)),
            None => warn!(hold = %hold.id, segment = %hold.segment_id, "skipping orphaned hold"),
        }
    }
    out
}

#[derive(Debug, Clone)]
struct PlacementEntry {
    hold_key: ContentKey,
    wall_key: ContentKey,
    transform: Option<WorldTransform>,
}

/// Per-hold memo of `resolve_with`, keyed by (hold placement key, wall key).
#[derive(Debug, Default)]
pub struct PlacementCache {
    entries: HashMap<HoldId, PlacementEntry>,
    hits: u64,
    misses: u64,
}

impl PlacementCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(
        &mut self,
        hold: &PlacedHold,
        wall_key: ContentKey,
        mapper: &WallMapper<'_>,
    ) -> Option<WorldTransform> {
        let hold_key = hold.placement_key();
        if let Some(entry) = self.entries.get(&hold.id)
            && entry.hold_key == hold_key
            && entry.wall_key == wall_key
        {
            self.hits += 1;
            return entry.transform;
        }

        self.misses += 1;
        let transform = resolve_with(hold, mapper);
        self.entries.insert(
            hold.id,
            PlacementEntry {
                hold_key,
                wall_key,
                transform,
            },
        );
        transform
    }

    /// Drops entries for holds the host no longer has.
    pub fn retain_holds(&mut self, holds: &[PlacedHold]) {
        let live: HashSet<HoldId> = holds.iter().map(|h| h.id).collect();
        self.entries.retain(|id, _| live.contains(id));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(hits, misses)` since construction.
    pub fn counters(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
