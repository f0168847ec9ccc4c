//! The owned world-state context handed to every planner.
//!
//! Bundles the unit tracker, the motionlessness table and the runtime
//! constants, and answers the spatial questions several planners share.
//! Every query with no meaningful answer falls back to a harmless default
//! (the world centre) or returns `None`.

use crate::config::{EngineConfig, ValueWeights};
use crate::environment::RuntimeConstants;
use crate::grid::{FragmentGrid, GridGeometry};
use crate::math::{Fixed, Vec2Fixed};
use crate::motion::MotionlessnessTracker;
use crate::tracker::UnitStateTracker;
use crate::unit::{PlayerId, Tick, UnitType};

/// Units closer than this along an axis count as level for corner queries.
const LEVEL_TOLERANCE: Fixed = Fixed::from_bits(1 << 31);

/// Everything the planners know about the world.
#[derive(Debug, Clone)]
pub struct WorldState {
    /// Visible units.
    pub units: UnitStateTracker,
    /// Per-type motionlessness, refreshed once per tick.
    pub motion: MotionlessnessTracker,
    /// Constants derived from the game rules.
    pub constants: RuntimeConstants,
}

impl WorldState {
    /// Empty world.
    #[must_use]
    pub fn new(constants: RuntimeConstants, config: &EngineConfig) -> Self {
        Self {
            units: UnitStateTracker::new(&config.motion),
            motion: MotionlessnessTracker::new(config.motion.cooldown_ticks),
            constants,
        }
    }

    /// Recompute the motionlessness table for `owner`.
    pub fn refresh_motion(&mut self, owner: PlayerId, tick: Tick) {
        self.motion.refresh(&self.units, owner, tick);
    }

    /// Mean position of the units of `owner` with one of `types`.
    ///
    /// An empty group is centred on the world centre.
    #[must_use]
    pub fn mass_center(&self, owner: PlayerId, types: &[UnitType]) -> Vec2Fixed {
        let mut sum = Vec2Fixed::ZERO;
        let mut count = 0u32;
        for tracked in self.units.owned_by(owner) {
            if types.contains(&tracked.unit.unit_type) {
                sum += tracked.unit.position;
                count += 1;
            }
        }
        if count == 0 {
            return self.constants.world_center;
        }
        sum / Fixed::from_num(count)
    }

    /// Position of the enemy unit closest to `anchor`.
    #[must_use]
    pub fn closest_enemy(&self, owner: PlayerId, anchor: Vec2Fixed) -> Option<Vec2Fixed> {
        let mut best: Option<(Fixed, Vec2Fixed)> = None;
        for unit in self.units.units().filter(|u| !u.is_owned_by(owner)) {
            let distance = unit.position.distance_squared(anchor);
            let closer = match best {
                None => true,
                Some((d, _)) => distance < d,
            };
            if closer {
                best = Some((distance, unit.position));
            }
        }
        best.map(|(_, position)| position)
    }

    /// Position of the rightmost unit of a type, preferring the lowest one
    /// among units roughly level with it.
    ///
    /// Falls back to the world centre when `owner` has no unit of the type.
    #[must_use]
    pub fn bottom_right(&self, owner: PlayerId, unit_type: UnitType) -> Vec2Fixed {
        let mut best: Option<Vec2Fixed> = None;
        for tracked in self.units.owned_by(owner) {
            if tracked.unit.unit_type != unit_type {
                continue;
            }
            let p = tracked.unit.position;
            best = Some(match best {
                None => p,
                Some(b)
                    if b.x + LEVEL_TOLERANCE < p.x
                        || (b.x < p.x + LEVEL_TOLERANCE && b.y + LEVEL_TOLERANCE < p.y) =>
                {
                    p
                }
                Some(b) => b,
            });
        }
        best.unwrap_or(self.constants.world_center)
    }

    /// Mark a group as moving now, ahead of its queued maneuver.
    pub fn touch_group(&mut self, owner: PlayerId, types: &[UnitType], tick: Tick) {
        self.units.mark_moved(owner, types, tick);
    }

    /// Aggregate every visible unit into a value grid as seen by `viewer`.
    #[must_use]
    pub fn fragment_grid(
        &self,
        viewer: PlayerId,
        weights: &ValueWeights,
        geometry: GridGeometry,
    ) -> FragmentGrid {
        FragmentGrid::build(self.units.units(), viewer, weights, geometry)
    }

    /// Relative length scaled to the world.
    #[must_use]
    pub fn rel(&self, value: f64) -> Fixed {
        crate::config::OpenFieldConfig::rel(value, self.constants.world_side)
    }

    /// Relative point scaled to the world.
    #[must_use]
    pub fn rel_point(&self, value: (f64, f64)) -> Vec2Fixed {
        crate::config::OpenFieldConfig::rel_point(value, self.constants.world_side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::GameRules;
    use crate::unit::Unit;

    fn world() -> WorldState {
        let constants = RuntimeConstants::new(&GameRules::default()).expect("valid rules");
        WorldState::new(constants, &EngineConfig::default())
    }

    fn add(world: &mut WorldState, id: i64, owner: PlayerId, unit_type: UnitType, x: f64, y: f64) {
        world.units.observe_new(
            Unit {
                id,
                owner,
                unit_type,
                position: Vec2Fixed::from_f64(x, y),
                durability: 100,
                max_durability: 100,
                vision_range: Fixed::from_num(80),
            },
            0,
        );
    }

    #[test]
    fn test_mass_center_defaults_to_world_center() {
        let mut world = world();
        assert_eq!(world.mass_center(1, &UnitType::ALL), world.constants.world_center);

        add(&mut world, 1, 1, UnitType::Tank, 10.0, 20.0);
        add(&mut world, 2, 1, UnitType::Ifv, 30.0, 40.0);
        add(&mut world, 3, 2, UnitType::Tank, 900.0, 900.0);
        assert_eq!(
            world.mass_center(1, &UnitType::GROUND),
            Vec2Fixed::from_f64(20.0, 30.0)
        );
        assert_eq!(
            world.mass_center(1, &[UnitType::Tank]),
            Vec2Fixed::from_f64(10.0, 20.0)
        );
    }

    #[test]
    fn test_closest_enemy() {
        let mut world = world();
        assert_eq!(world.closest_enemy(1, Vec2Fixed::ZERO), None);

        add(&mut world, 1, 2, UnitType::Tank, 100.0, 100.0);
        add(&mut world, 2, 2, UnitType::Tank, 50.0, 50.0);
        add(&mut world, 3, 1, UnitType::Tank, 1.0, 1.0);
        assert_eq!(
            world.closest_enemy(1, Vec2Fixed::ZERO),
            Some(Vec2Fixed::from_f64(50.0, 50.0))
        );
    }

    #[test]
    fn test_bottom_right_prefers_lower_among_level_units() {
        let mut world = world();
        add(&mut world, 1, 1, UnitType::Fighter, 100.0, 10.0);
        add(&mut world, 2, 1, UnitType::Fighter, 100.2, 50.0);
        add(&mut world, 3, 1, UnitType::Fighter, 90.0, 90.0);
        assert_eq!(
            world.bottom_right(1, UnitType::Fighter),
            Vec2Fixed::from_f64(100.2, 50.0)
        );
        assert_eq!(
            world.bottom_right(1, UnitType::Helicopter),
            world.constants.world_center
        );
    }

    #[test]
    fn test_touch_group_delays_motionlessness() {
        let mut world = world();
        add(&mut world, 1, 1, UnitType::Tank, 10.0, 10.0);

        world.refresh_motion(1, 100);
        assert!(world.motion.is_type_motionless(UnitType::Tank));

        world.touch_group(1, &UnitType::GROUND, 100);
        world.refresh_motion(1, 101);
        assert!(!world.motion.is_type_motionless(UnitType::Tank));
    }
}
