//! Test fixtures and helpers.
//!
//! Pre-built armies and tick streams for consistent testing.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

use fleet_core::environment::{Facility, FacilityKind, GameRules, PlayerState, TickInput};
use fleet_core::math::{Fixed, Vec2Fixed};
use fleet_core::unit::{PlayerId, Tick, Unit, UnitDelta, UnitId, UnitType};

/// Player controlled by the engine in fixtures.
pub const ME: PlayerId = 1;

/// Opposing player in fixtures.
pub const ENEMY: PlayerId = 2;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// A healthy unit at `(x, y)`.
#[must_use]
pub fn unit(id: UnitId, owner: PlayerId, unit_type: UnitType, x: f64, y: f64) -> Unit {
    Unit {
        id,
        owner,
        unit_type,
        position: Vec2Fixed::from_f64(x, y),
        durability: 100,
        max_durability: 100,
        vision_range: Fixed::from_num(120),
    }
}

/// A square block of `side * side` units with ids starting at `first_id`.
#[must_use]
pub fn block(
    first_id: UnitId,
    owner: PlayerId,
    unit_type: UnitType,
    origin: (f64, f64),
    side: u32,
    spacing: f64,
) -> Vec<Unit> {
    let mut units = Vec::with_capacity((side * side) as usize);
    let mut id = first_id;
    for column in 0..side {
        for row in 0..side {
            let x = origin.0 + f64::from(column) * spacing;
            let y = origin.1 + f64::from(row) * spacing;
            units.push(unit(id, owner, unit_type, x, y));
            id += 1;
        }
    }
    units
}

/// Empty tick report for the fixture players.
#[must_use]
pub fn tick_input(tick: Tick) -> TickInput {
    TickInput {
        tick,
        me: PlayerState {
            id: ME,
            ..PlayerState::default()
        },
        opponent: PlayerState {
            id: ENEMY,
            ..PlayerState::default()
        },
        ..TickInput::default()
    }
}

/// A whole game setup: rules, starting armies and facilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Game rules.
    pub rules: GameRules,
    /// Every unit visible on the first tick.
    pub units: Vec<Unit>,
    /// Facilities on the map.
    pub facilities: Vec<Facility>,
}

impl Scenario {
    /// Both armies in the usual opening layout: one block per type in the
    /// corner, the enemy mirrored in the opposite corner.
    #[must_use]
    pub fn open_field(block_side: u32) -> Self {
        let world = GameRules::default().world_width;
        let mut units = Vec::new();
        let per_block = i64::from(block_side * block_side);
        for (i, unit_type) in UnitType::ALL.into_iter().enumerate() {
            let origin = (20.0 + 74.0 * (i % 3) as f64, 20.0 + 74.0 * (i / 3) as f64);
            let first = 1 + per_block * i as i64;
            let own = block(first, ME, unit_type, origin, block_side, 6.0);
            let mirrored = own.iter().map(|u| {
                let (x, y) = u.position.to_f64();
                unit(u.id + 10_000, ENEMY, unit_type, world - x, world - y)
            });
            let mirrored: Vec<Unit> = mirrored.collect();
            units.extend(own);
            units.extend(mirrored);
        }
        Self {
            rules: GameRules::default(),
            units,
            facilities: Vec::new(),
        }
    }

    /// The opening layout plus a ring of neutral facilities.
    #[must_use]
    pub fn territory(block_side: u32) -> Self {
        let mut scenario = Self::open_field(block_side);
        let spots = [
            (FacilityKind::VehicleFactory, 300.0, 100.0),
            (FacilityKind::ControlCenter, 100.0, 300.0),
            (FacilityKind::ControlCenter, 480.0, 480.0),
            (FacilityKind::VehicleFactory, 660.0, 860.0),
            (FacilityKind::ControlCenter, 860.0, 660.0),
        ];
        scenario.facilities = spots
            .iter()
            .zip(1..)
            .map(|(&(kind, x, y), id)| Facility {
                id,
                kind,
                owner: None,
                top_left: Vec2Fixed::from_f64(x, y),
            })
            .collect();
        scenario
    }

    /// Tick reports for the first `ticks` ticks.
    ///
    /// Tick 0 reports every unit; afterwards the enemy army creeps toward
    /// the centre one unit every ten ticks.
    #[must_use]
    pub fn inputs(&self, ticks: Tick) -> Vec<TickInput> {
        (0..ticks).map(|tick| self.input(tick)).collect()
    }

    /// Tick report for one tick.
    #[must_use]
    pub fn input(&self, tick: Tick) -> TickInput {
        let mut input = tick_input(tick);
        input.facilities = self.facilities.clone();
        if tick == 0 {
            input.new_units = self.units.clone();
        } else if tick % 10 == 0 {
            let step = Fixed::from_num(tick / 10);
            input.updates = self
                .units
                .iter()
                .filter(|u| u.owner == ENEMY)
                .map(|u| UnitDelta {
                    id: u.id,
                    position: u.position - Vec2Fixed::splat(step),
                    durability: u.durability,
                })
                .collect();
        }
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_layout() {
        let units = block(10, ME, UnitType::Tank, (100.0, 200.0), 3, 5.0);
        assert_eq!(units.len(), 9);
        assert_eq!(units[0].id, 10);
        assert_eq!(units[8].id, 18);
        assert_eq!(units[8].position, Vec2Fixed::from_f64(110.0, 210.0));
    }

    #[test]
    fn test_open_field_ids_are_unique() {
        let scenario = Scenario::open_field(4);
        let mut ids: Vec<UnitId> = scenario.units.iter().map(|u| u.id).collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
        assert_eq!(total, 2 * 5 * 16);
    }

    #[test]
    fn test_enemy_creeps_every_ten_ticks() {
        let scenario = Scenario::open_field(2);
        assert!(scenario.input(5).updates.is_empty());
        let updates = scenario.input(20).updates;
        assert_eq!(updates.len(), 20);
        let original = scenario
            .units
            .iter()
            .find(|u| u.id == updates[0].id)
            .map(|u| u.position);
        assert_eq!(
            original.map(|p| p - updates[0].position),
            Some(Vec2Fixed::splat(fixed(2)))
        );
    }
}
