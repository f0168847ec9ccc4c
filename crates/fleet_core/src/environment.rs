//! What the environment tells the engine.
//!
//! [`GameRules`] arrives once, [`TickInput`] every tick. Rules are plain
//! floats and counters exactly as reported; [`RuntimeConstants`] derives
//! the fixed-point quantities the planners actually use.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::grid::GridGeometry;
use crate::math::{fixed_from_f64, Fixed, Vec2Fixed};
use crate::unit::{PlayerId, Tick, Unit, UnitDelta};

/// Identifier of a facility.
pub type FacilityId = i64;

/// Fixed game rules, reported once at the start of a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRules {
    /// World width.
    pub world_width: f64,
    /// World height.
    pub world_height: f64,
    /// Game length in ticks.
    pub tick_count: u64,
    /// Window over which the action budget is counted.
    pub action_detection_interval: u64,
    /// Actions allowed per window without bonuses.
    pub base_action_count: u64,
    /// Fighter air-to-air attack range.
    pub fighter_aerial_attack_range: f64,
    /// Fighter vision range.
    pub fighter_vision_range: f64,
    /// Helicopter speed, used to cap the speed of the mixed air wing.
    pub helicopter_speed: f64,
    /// Facility width.
    pub facility_width: f64,
    /// Facility height.
    pub facility_height: f64,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            world_width: 1024.0,
            world_height: 1024.0,
            tick_count: 20_000,
            action_detection_interval: 60,
            base_action_count: 12,
            fighter_aerial_attack_range: 20.0,
            fighter_vision_range: 120.0,
            helicopter_speed: 0.9,
            facility_width: 64.0,
            facility_height: 64.0,
        }
    }
}

/// Kind of capturable facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityKind {
    /// Grants extra actions to its owner.
    ControlCenter,
    /// Produces units for its owner.
    VehicleFactory,
}

/// A capturable facility on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Facility {
    /// Facility identifier.
    pub id: FacilityId,
    /// Facility kind.
    pub kind: FacilityKind,
    /// Current owner, `None` while neutral.
    pub owner: Option<PlayerId>,
    /// Top-left corner.
    pub top_left: Vec2Fixed,
}

impl Facility {
    /// Whether `position` lies strictly inside the facility footprint.
    #[must_use]
    pub fn contains(&self, position: Vec2Fixed, size: Vec2Fixed) -> bool {
        let bottom_right = self.top_left + size;
        self.top_left.x < position.x
            && position.x < bottom_right.x
            && self.top_left.y < position.y
            && position.y < bottom_right.y
    }

    /// Centre of the facility footprint.
    #[must_use]
    pub fn center(&self, size: Vec2Fixed) -> Vec2Fixed {
        self.top_left + size / Fixed::from_num(2)
    }
}

/// Per-tick state of one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PlayerState {
    /// Player identifier.
    pub id: PlayerId,
    /// Current score.
    pub score: i64,
    /// Ticks until the area strike can be fired again.
    pub strike_cooldown_ticks: u64,
}

/// Everything the environment reports for one tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TickInput {
    /// Tick index.
    pub tick: Tick,
    /// The player this engine controls.
    pub me: PlayerState,
    /// The opposing player.
    pub opponent: PlayerState,
    /// Units seen for the first time.
    pub new_units: Vec<Unit>,
    /// Changes to units seen before.
    pub updates: Vec<UnitDelta>,
    /// Facilities on the map (empty on open-field maps).
    pub facilities: Vec<Facility>,
}

/// Quantities derived once from [`GameRules`].
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConstants {
    /// World side length.
    pub world_side: Fixed,
    /// Fine fragment grid.
    pub grid: GridGeometry,
    /// Coarse fragment grid (double cell side, half the cells per side).
    pub coarse_grid: GridGeometry,
    /// World centre, the default answer for empty-group queries.
    pub world_center: Vec2Fixed,
    /// Ticks between actions when the budget is spent evenly.
    pub base_action_interval: u64,
    /// Fighter air-to-air attack range.
    pub fighter_attack_range: Fixed,
    /// Fighter vision range.
    pub fighter_vision_range: Fixed,
    /// Helicopter speed.
    pub helicopter_speed: Fixed,
    /// Facility footprint.
    pub facility_size: Vec2Fixed,
    /// Game length in ticks.
    pub tick_count: u64,
}

/// Largest supported world side; squared distances across the diagonal
/// must still fit in [`Fixed`].
pub const MAX_WORLD_SIDE: f64 = 16_384.0;

impl RuntimeConstants {
    /// Derive runtime constants from the game rules.
    pub fn new(rules: &GameRules) -> Result<Self> {
        if rules.world_width.is_nan() || rules.world_width < 1.0 {
            return Err(EngineError::InvalidRules(format!(
                "world width must be at least 1, got {}",
                rules.world_width
            )));
        }
        if rules.base_action_count == 0 {
            return Err(EngineError::InvalidRules(
                "base action count must be positive".to_string(),
            ));
        }

        if rules.world_width > MAX_WORLD_SIDE {
            return Err(EngineError::InvalidRules(format!(
                "world width must be at most {MAX_WORLD_SIDE}, got {}",
                rules.world_width
            )));
        }

        let side = rules.world_width as u32;
        let world_side = Fixed::checked_from_num(side).ok_or_else(|| {
            EngineError::InvalidRules(format!("world width {side} is out of range"))
        })?;
        let root = integer_sqrt(side).max(1);
        let grid = GridGeometry::new(root, root as usize);
        let coarse_grid = GridGeometry::new(root * 2, (root as usize / 2).max(1));

        Ok(Self {
            world_side,
            grid,
            coarse_grid,
            world_center: Vec2Fixed::splat(world_side / Fixed::from_num(2)),
            base_action_interval: (rules.action_detection_interval / rules.base_action_count)
                .max(1),
            fighter_attack_range: fixed_from_f64(rules.fighter_aerial_attack_range),
            fighter_vision_range: fixed_from_f64(rules.fighter_vision_range),
            helicopter_speed: fixed_from_f64(rules.helicopter_speed),
            facility_size: Vec2Fixed::from_f64(rules.facility_width, rules.facility_height),
            tick_count: rules.tick_count,
        })
    }

    /// Whether a command may be issued on `tick`.
    #[must_use]
    pub const fn is_action_tick(&self, tick: Tick) -> bool {
        tick % self.base_action_interval == 0
    }
}

fn integer_sqrt(n: u32) -> u32 {
    let mut root = 0u32;
    while u64::from(root + 1) * u64::from(root + 1) <= u64::from(n) {
        root += 1;
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_world_geometry() {
        let constants = RuntimeConstants::new(&GameRules::default()).expect("valid rules");
        assert_eq!(constants.grid.cell_side, 32);
        assert_eq!(constants.grid.cells_per_side, 32);
        assert_eq!(constants.coarse_grid.cell_side, 64);
        assert_eq!(constants.coarse_grid.cells_per_side, 16);
        assert_eq!(constants.base_action_interval, 5);
        assert_eq!(
            constants.world_center,
            Vec2Fixed::splat(Fixed::from_num(512))
        );
    }

    #[test]
    fn test_action_tick_gating() {
        let rules = GameRules {
            action_detection_interval: 60,
            base_action_count: 2,
            ..GameRules::default()
        };
        let constants = RuntimeConstants::new(&rules).expect("valid rules");
        assert_eq!(constants.base_action_interval, 30);
        let allowed: Vec<Tick> = (0..100).filter(|&t| constants.is_action_tick(t)).collect();
        assert_eq!(allowed, vec![0, 30, 60, 90]);
    }

    #[test]
    fn test_invalid_rules_rejected() {
        let zero_world = GameRules {
            world_width: 0.0,
            ..GameRules::default()
        };
        assert!(matches!(
            RuntimeConstants::new(&zero_world),
            Err(EngineError::InvalidRules(_))
        ));

        for world_width in [16_385.0, 3.0e9, f64::INFINITY] {
            let huge_world = GameRules {
                world_width,
                ..GameRules::default()
            };
            assert!(matches!(
                RuntimeConstants::new(&huge_world),
                Err(EngineError::InvalidRules(_))
            ));
        }
        let largest = GameRules {
            world_width: MAX_WORLD_SIDE,
            ..GameRules::default()
        };
        let constants = RuntimeConstants::new(&largest).expect("largest world is valid");
        assert_eq!(constants.grid.cells_per_side, 128);

        let no_actions = GameRules {
            base_action_count: 0,
            ..GameRules::default()
        };
        assert!(RuntimeConstants::new(&no_actions).is_err());
    }

    #[test]
    fn test_facility_footprint() {
        let facility = Facility {
            id: 1,
            kind: FacilityKind::VehicleFactory,
            owner: None,
            top_left: Vec2Fixed::splat(Fixed::from_num(100)),
        };
        let size = Vec2Fixed::splat(Fixed::from_num(64));
        assert!(facility.contains(Vec2Fixed::splat(Fixed::from_num(130)), size));
        // Boundary is outside
        assert!(!facility.contains(Vec2Fixed::splat(Fixed::from_num(100)), size));
        assert_eq!(facility.center(size), Vec2Fixed::splat(Fixed::from_num(132)));
    }

    #[test]
    fn test_integer_sqrt() {
        assert_eq!(integer_sqrt(1024), 32);
        assert_eq!(integer_sqrt(1023), 31);
        assert_eq!(integer_sqrt(16), 4);
        assert_eq!(integer_sqrt(1), 1);
    }
}
