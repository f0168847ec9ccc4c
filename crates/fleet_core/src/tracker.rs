//! Incremental unit-state tracking.
//!
//! The environment only reports what changed: a full record the first time
//! a unit is seen, then a delta every tick it is reported. The tracker folds
//! those into the authoritative picture of every visible unit.
//!
//! Each unit carries two clocks:
//! - `last_changed_tick`: the last tick anything was reported for it
//! - `sample.moved_tick`: the last tick its position actually changed by
//!   more than the positional epsilon
//!
//! Only the second one feeds motionlessness detection.
//!
//! # Determinism
//!
//! Units live in a `BTreeMap` keyed by id, so every iteration the planners
//! perform visits units in ascending id order regardless of the order in
//! which they were reported.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::MotionConfig;
use crate::math::{Fixed, Vec2Fixed};
use crate::unit::{PlayerId, Tick, Unit, UnitDelta, UnitId, UnitType};

/// Last recorded position of a unit and when it got there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionSample {
    /// Recorded position.
    pub position: Vec2Fixed,
    /// Tick the unit was last seen moving.
    pub moved_tick: Tick,
}

/// Tracker entry for one visible unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackedUnit {
    /// Latest merged unit record.
    pub unit: Unit,
    /// Last tick any update was received.
    pub last_changed_tick: Tick,
    /// Tick the unit was first sighted.
    pub first_seen_tick: Tick,
    /// Motion sample.
    pub sample: PositionSample,
}

impl TrackedUnit {
    /// Whether the unit has never moved since it was first sighted.
    #[must_use]
    pub const fn never_moved(&self) -> bool {
        self.sample.moved_tick == self.first_seen_tick
    }
}

/// What a delta did to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOutcome {
    /// The unit was destroyed and dropped.
    Removed,
    /// The unit moved beyond the epsilon; its motion sample advanced.
    Moved,
    /// The unit was reported but stayed put.
    Refreshed,
    /// The delta referred to an id the tracker does not know.
    Ignored,
}

/// Authoritative map of every visible unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnitStateTracker {
    units: BTreeMap<UnitId, TrackedUnit>,
    epsilon_squared: Fixed,
}

impl Default for UnitStateTracker {
    fn default() -> Self {
        Self::new(&MotionConfig::default())
    }
}

impl UnitStateTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new(config: &MotionConfig) -> Self {
        Self {
            units: BTreeMap::new(),
            epsilon_squared: config.epsilon_squared(),
        }
    }

    /// Record a newly visible unit, overwriting any previous record.
    pub fn observe_new(&mut self, unit: Unit, tick: Tick) {
        self.units.insert(
            unit.id,
            TrackedUnit {
                unit,
                last_changed_tick: tick,
                first_seen_tick: tick,
                sample: PositionSample {
                    position: unit.position,
                    moved_tick: tick,
                },
            },
        );
    }

    /// Merge a per-tick delta.
    ///
    /// A zero-durability delta removes the unit outright; removing an
    /// unknown id is a no-op. Deltas for unknown live ids are dropped.
    pub fn apply_update(&mut self, delta: &UnitDelta, tick: Tick) -> DeltaOutcome {
        if delta.is_destroyed() {
            return match self.units.remove(&delta.id) {
                Some(_) => DeltaOutcome::Removed,
                None => DeltaOutcome::Ignored,
            };
        }

        let Some(tracked) = self.units.get_mut(&delta.id) else {
            tracing::trace!(unit = delta.id, tick, "Ignoring delta for unknown unit");
            return DeltaOutcome::Ignored;
        };

        tracked.unit.apply(delta);
        tracked.last_changed_tick = tracked.last_changed_tick.max(tick);

        if tracked.unit.position.distance_squared(tracked.sample.position) > self.epsilon_squared {
            tracked.sample = PositionSample {
                position: tracked.unit.position,
                moved_tick: tracked.sample.moved_tick.max(tick),
            };
            DeltaOutcome::Moved
        } else {
            DeltaOutcome::Refreshed
        }
    }

    /// Pretend every unit of `owner` with one of `types` moved on `tick`.
    ///
    /// Used when a maneuver has been queued but not yet executed, so the
    /// group is not judged to have finished it instantly.
    pub fn mark_moved(&mut self, owner: PlayerId, types: &[UnitType], tick: Tick) {
        for tracked in self.units.values_mut() {
            if tracked.unit.owner == owner && types.contains(&tracked.unit.unit_type) {
                tracked.last_changed_tick = tracked.last_changed_tick.max(tick);
                tracked.sample.moved_tick = tracked.sample.moved_tick.max(tick);
            }
        }
    }

    /// Look up a tracked unit.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&TrackedUnit> {
        self.units.get(&id)
    }

    /// Look up a unit record.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id).map(|t| &t.unit)
    }

    /// Whether a unit is tracked.
    #[must_use]
    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    /// All tracked units in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &TrackedUnit> {
        self.units.values()
    }

    /// All unit records in ascending id order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values().map(|t| &t.unit)
    }

    /// Tracked units belonging to `owner`.
    pub fn owned_by(&self, owner: PlayerId) -> impl Iterator<Item = &TrackedUnit> {
        self.units.values().filter(move |t| t.unit.owner == owner)
    }

    /// Number of tracked units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
