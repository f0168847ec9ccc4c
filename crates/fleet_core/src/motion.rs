//! Motionlessness detection.
//!
//! A unit is motionless on tick `t` when its last recorded move happened
//! strictly more than `cooldown` ticks ago. The per-type table is computed
//! once at the start of every tick and read by every planner afterwards;
//! it is stale as soon as the tracker changes.

use crate::tracker::{PositionSample, UnitStateTracker};
use crate::unit::{ByType, PlayerId, Tick, UnitType};

/// Per-type "all units motionless" table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MotionlessnessTracker {
    cooldown: Tick,
    table: ByType<bool>,
}

impl MotionlessnessTracker {
    /// Create a tracker with the given cooldown. Every type starts motionless.
    #[must_use]
    pub fn new(cooldown: Tick) -> Self {
        Self {
            cooldown,
            table: ByType::splat(true),
        }
    }

    /// Cooldown window in ticks.
    #[must_use]
    pub const fn cooldown(&self) -> Tick {
        self.cooldown
    }

    /// Recompute the table for the units of `owner`.
    ///
    /// Types without any unit count as motionless.
    pub fn refresh(&mut self, tracker: &UnitStateTracker, owner: PlayerId, tick: Tick) {
        self.table = ByType::splat(true);
        for tracked in tracker.owned_by(owner) {
            if !self.is_unit_motionless(&tracked.sample, tick) {
                self.table[tracked.unit.unit_type] = false;
            }
        }
    }

    /// Whether a single unit has been static for longer than the cooldown.
    #[must_use]
    pub fn is_unit_motionless(&self, sample: &PositionSample, tick: Tick) -> bool {
        sample.moved_tick.saturating_add(self.cooldown) < tick
    }

    /// Whether every unit of `unit_type` was motionless at the last refresh.
    #[must_use]
    pub fn is_type_motionless(&self, unit_type: UnitType) -> bool {
        self.table[unit_type]
    }

    /// Whether every unit of every listed type was motionless at the last refresh.
    #[must_use]
    pub fn are_types_motionless(&self, types: &[UnitType]) -> bool {
        types.iter().all(|&t| self.is_type_motionless(t))
    }

    /// The cached table.
    #[must_use]
    pub const fn table(&self) -> &ByType<bool> {
        &self.table
    }
}
