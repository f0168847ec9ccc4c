//! Strategy for maps with facilities.
//!
//! The game opens with brigade launches: small groups of still-untouched
//! ground units are sent, one type at a time, to facilities chosen at
//! random. Captured factories are set to produce. After the launch phase,
//! idle troops are periodically picked up (from crowded open ground or
//! from facilities holding enough units) and sent to the nearest facility
//! not yet owned, or at the enemy once every facility is taken. Helicopters
//! patrol between facilities in the late game.
//!
//! Facility choice uses a seeded `ChaCha8Rng` so a game replays exactly.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::command::Command;
use crate::config::TerritoryConfig;
use crate::environment::{Facility, FacilityId, FacilityKind, TickInput};
use crate::grid::CellCounts;
use crate::math::{fixed_from_f64, Fixed, Vec2Fixed};
use crate::unit::{PlayerId, UnitType};
use crate::world::WorldState;

use super::{PlanContext, Strategy};

/// Troops picked up for relocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pickup {
    top_left: Vec2Fixed,
    size: Vec2Fixed,
    troops: u32,
    outside_facilities: bool,
}

impl Pickup {
    fn center(&self) -> Vec2Fixed {
        self.top_left + self.size / Fixed::from_num(2)
    }
}

/// Capture facilities, produce, keep idle troops busy.
#[derive(Debug, Clone)]
pub struct TerritoryStrategy {
    config: TerritoryConfig,
    rng: ChaCha8Rng,
    launch_order: Vec<UnitType>,
    owned: BTreeMap<FacilityId, bool>,
}

impl TerritoryStrategy {
    /// Create the strategy.
    #[must_use]
    pub fn new(config: TerritoryConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            launch_order: Vec::new(),
            owned: BTreeMap::new(),
        }
    }

    /// Order in which ground types are launched; empty before the first tick.
    #[must_use]
    pub fn launch_order(&self) -> &[UnitType] {
        &self.launch_order
    }

    fn decide_launch_order(&mut self, world: &WorldState, me: PlayerId) {
        // Bottom-right blocks go first so departing brigades do not cross the others
        let mut order: Vec<((Fixed, Fixed), UnitType)> = UnitType::GROUND
            .iter()
            .map(|&t| {
                let p = world.bottom_right(me, t);
                ((p.x, p.y), t)
            })
            .collect();
        order.sort_by(|a, b| b.cmp(a));
        self.launch_order = order.into_iter().map(|(_, t)| t).collect();
    }

    fn pick_facility<'f>(&mut self, facilities: &'f [Facility]) -> Option<&'f Facility> {
        if facilities.is_empty() {
            return None;
        }
        facilities.get(self.rng.gen_range(0..facilities.len()))
    }

    /// Corners of the bounding box of up to `size` never-moved units of a
    /// type closest to `anchor`.
    fn brigade_bounds(
        world: &WorldState,
        me: PlayerId,
        unit_type: UnitType,
        anchor: Vec2Fixed,
        size: usize,
    ) -> Option<(Vec2Fixed, Vec2Fixed)> {
        let mut candidates: Vec<(Fixed, Vec2Fixed)> = world
            .units
            .owned_by(me)
            .filter(|t| t.unit.unit_type == unit_type && t.never_moved())
            .map(|t| (t.unit.position.distance_squared(anchor), t.unit.position))
            .collect();
        candidates.sort_by_key(|&(distance, _)| distance);
        candidates.truncate(size);

        let (_, first) = *candidates.first()?;
        let mut min = first;
        let mut max = first;
        for &(_, p) in &candidates {
            min = Vec2Fixed::new(min.x.min(p.x), min.y.min(p.y));
            max = Vec2Fixed::new(max.x.max(p.x), max.y.max(p.y));
        }
        Some((min, max))
    }

    fn launch_brigade(&mut self, world: &WorldState, input: &TickInput) -> Vec<Command> {
        let duration = self.config.launch_iteration_duration.max(1);
        let launch_interval = self.config.launch_interval.max(1);
        if input.tick >= self.config.launch_iterations * duration || input.tick % launch_interval != 0
        {
            return Vec::new();
        }
        if self.launch_order.is_empty() {
            return Vec::new();
        }

        let per_type = (duration / self.launch_order.len() as u64).max(1);
        let slot = ((input.tick % duration) / per_type) as usize;
        let unit_type = self.launch_order[slot.min(self.launch_order.len() - 1)];

        let Some(facility) = self.pick_facility(&input.facilities) else {
            return Vec::new();
        };
        let destination = facility.center(world.constants.facility_size);

        let me = input.me.id;
        let Some((min, max)) =
            Self::brigade_bounds(world, me, unit_type, destination, self.config.brigade_size)
        else {
            return Vec::new();
        };

        tracing::debug!(
            tick = input.tick,
            unit_type = ?unit_type,
            facility = facility.id,
            "Brigade launched"
        );
        let brigade_center = (min + max) / Fixed::from_num(2);
        vec![
            Command::SelectRect {
                top_left: min,
                size: max - min,
            },
            Command::MoveBy {
                offset: destination - brigade_center,
            },
        ]
    }

    fn track_ownership(&mut self, input: &TickInput) -> Vec<Command> {
        let mut commands = Vec::new();
        for facility in &input.facilities {
            let mine = facility.owner == Some(input.me.id);
            let was_mine = self.owned.insert(facility.id, mine).unwrap_or(false);
            if mine && !was_mine && facility.kind == FacilityKind::VehicleFactory {
                tracing::debug!(
                    tick = input.tick,
                    facility = facility.id,
                    "Factory captured, starting production"
                );
                commands.push(Command::StartProduction {
                    facility: facility.id,
                    unit_type: self.config.production_unit,
                });
            }
        }
        commands
    }

    fn idle_troops_outside(&self, world: &WorldState, input: &TickInput) -> Option<Pickup> {
        if input.tick % self.config.relocation_interval.max(1) != 0 {
            return None;
        }
        let size = world.constants.facility_size;
        let grid = world.constants.grid;
        let idle = world
            .units
            .owned_by(input.me.id)
            .filter(|t| !t.unit.unit_type.is_air())
            .filter(|t| world.motion.is_unit_motionless(&t.sample, input.tick))
            .filter(|t| !input.facilities.iter().any(|f| f.contains(t.unit.position, size)))
            .map(|t| t.unit.position);

        let (cell, troops) = CellCounts::from_positions(grid, idle).densest()?;
        (troops > self.config.min_idle_troops_outside).then(|| Pickup {
            top_left: grid.top_left(cell),
            size: grid.cell_size(),
            troops,
            outside_facilities: true,
        })
    }

    fn troops_in_facilities(&self, world: &WorldState, input: &TickInput) -> Option<Pickup> {
        let facilities = &input.facilities;
        if facilities.is_empty() {
            return None;
        }
        let size = world.constants.facility_size;
        let me = input.me.id;

        // Rotate the starting facility so every facility gets emptied in turn
        let count = facilities.len();
        let end = ((input.tick / world.constants.base_action_interval) % count as u64) as usize;
        let start = (end + 1) % count;

        for offset in 0..count {
            let facility = &facilities[(start + offset) % count];
            if facility.owner != Some(me) {
                continue;
            }
            let troops = world
                .units
                .owned_by(me)
                .filter(|t| facility.contains(t.unit.position, size))
                .count() as u32;
            let leave = match facility.kind {
                FacilityKind::ControlCenter => troops > 0,
                FacilityKind::VehicleFactory => troops > self.config.min_troops_to_leave_factory,
            };
            if leave {
                return Some(Pickup {
                    top_left: facility.top_left,
                    size,
                    troops,
                    outside_facilities: false,
                });
            }
        }
        None
    }

    fn relocation_target(
        &self,
        world: &WorldState,
        input: &TickInput,
        pickup: &Pickup,
    ) -> Option<Vec2Fixed> {
        let size = world.constants.facility_size;
        let from = pickup.center();
        let nearest = |owner_matches: &dyn Fn(Option<PlayerId>) -> bool| {
            let mut best: Option<(Fixed, Vec2Fixed)> = None;
            for facility in input.facilities.iter().filter(|f| owner_matches(f.owner)) {
                let center = facility.center(size);
                let distance = center.distance_squared(from);
                let closer = match best {
                    None => true,
                    Some((d, _)) => distance < d,
                };
                if closer {
                    best = Some((distance, center));
                }
            }
            best.map(|(_, center)| center)
        };

        let me = input.me.id;
        let opponent = input.opponent.id;
        nearest(&|owner| owner != Some(me) && owner != Some(opponent))
            .or_else(|| nearest(&|owner| owner == Some(opponent)))
            .or_else(|| {
                (pickup.troops > self.config.min_troops_to_attack)
                    .then(|| world.closest_enemy(me, from))
                    .flatten()
            })
    }

    fn relocate(&self, world: &WorldState, input: &TickInput, queued: usize) -> Vec<Command> {
        let launch_end = self.config.launch_iterations * self.config.launch_iteration_duration;
        if input.tick < launch_end || queued >= self.config.max_queue_for_relocation {
            return Vec::new();
        }

        let Some(pickup) = self
            .idle_troops_outside(world, input)
            .or_else(|| self.troops_in_facilities(world, input))
        else {
            return Vec::new();
        };
        let Some(destination) = self.relocation_target(world, input, &pickup) else {
            return Vec::new();
        };

        let from = pickup.center();
        let mut commands = vec![Command::SelectRect {
            top_left: pickup.top_left,
            size: pickup.size,
        }];
        if pickup.outside_facilities {
            // Crowded troops on open ground block each other; spread them first
            commands.push(Command::Scale {
                factor: fixed_from_f64(self.config.relocation_scale),
                center: from,
            });
        }
        commands.push(Command::MoveBy {
            offset: destination - from,
        });
        tracing::debug!(
            tick = input.tick,
            troops = pickup.troops,
            outside = pickup.outside_facilities,
            "Relocating troops"
        );
        commands
    }

    fn patrol(&mut self, world: &WorldState, input: &TickInput) -> Vec<Command> {
        if input.tick <= self.config.patrol_start_tick
            || input.tick % self.config.patrol_interval.max(1) != 0
        {
            return Vec::new();
        }
        let Some(facility) = self.pick_facility(&input.facilities) else {
            return Vec::new();
        };
        let me = input.me.id;
        let target = facility.center(world.constants.facility_size);
        tracing::debug!(tick = input.tick, facility = facility.id, "Helicopter patrol");
        vec![
            Command::select_type(UnitType::Helicopter, world.constants.world_side),
            Command::MoveBy {
                offset: target - world.mass_center(me, &[UnitType::Helicopter]),
            },
        ]
    }
}

impl Strategy for TerritoryStrategy {
    fn name(&self) -> &'static str {
        "territory"
    }

    fn plan(&mut self, ctx: &mut PlanContext<'_>) {
        let world = &*ctx.world;
        let input = ctx.input;

        if self.launch_order.is_empty() {
            self.decide_launch_order(world, input.me.id);
        }

        let commands = self.launch_brigade(world, input);
        ctx.queue.extend(commands);

        let commands = self.track_ownership(input);
        ctx.queue.extend(commands);

        let commands = self.relocate(world, input, ctx.queue.len());
        ctx.queue.extend(commands);

        let commands = self.patrol(world, input);
        ctx.queue.extend(commands);
    }
}
