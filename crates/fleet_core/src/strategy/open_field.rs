//! Strategy for maps without facilities.
//!
//! Ground and air groups each walk the regrouping cycle into one dense
//! block. Once the air block is formed it oscillates: approach the most
//! valuable enemy cluster, retreat as soon as it comes within attack range,
//! approach again once the enemy is out of sight. Late in the game, when
//! not ahead on score, the ground block marches on the nearest enemy.

use std::collections::BTreeSet;

use crate::command::Command;
use crate::config::OpenFieldConfig;
use crate::grid::CellCounts;
use crate::math::{fixed_from_f64, Fixed, Vec2Fixed};
use crate::regroup::{EngagementState, Maneuver, RegroupMachine, StageTransition, UnitGroup};
use crate::unit::{PlayerId, Tick, UnitType};
use crate::world::WorldState;

use super::{PlanContext, Strategy};

/// Regroup, oscillate the air wing, push the ground block late.
#[derive(Debug, Clone)]
pub struct OpenFieldStrategy {
    config: OpenFieldConfig,
    regroup: RegroupMachine,
    engagement: EngagementState,
    deployed: bool,
    helicopters_above: bool,
}

impl OpenFieldStrategy {
    /// Create the strategy.
    #[must_use]
    pub fn new(config: OpenFieldConfig) -> Self {
        Self {
            config,
            regroup: RegroupMachine::new(),
            engagement: EngagementState::Initial,
            deployed: false,
            helicopters_above: false,
        }
    }

    /// Regrouping progress.
    #[must_use]
    pub const fn regroup(&self) -> &RegroupMachine {
        &self.regroup
    }

    /// Mutable regrouping progress.
    pub fn regroup_mut(&mut self) -> &mut RegroupMachine {
        &mut self.regroup
    }

    /// Air wing state.
    #[must_use]
    pub const fn engagement(&self) -> EngagementState {
        self.engagement
    }

    /// Whether the helicopters were sent to the upper air destination.
    #[must_use]
    pub const fn helicopters_above(&self) -> bool {
        self.helicopters_above
    }

    fn initial_deployment(&mut self, world: &WorldState, me: PlayerId) -> Vec<Command> {
        let side = world.constants.world_side;
        let fighter_center = world.mass_center(me, &[UnitType::Fighter]);
        let helicopter_center = world.mass_center(me, &[UnitType::Helicopter]);
        let mut helicopter_destination = world.rel_point(self.config.helicopter_destination);
        let mut fighter_destination = world.rel_point(self.config.fighter_destination);

        // The block starting lower takes the lower slot so they never cross
        self.helicopters_above = fighter_center.y > helicopter_center.y;
        if self.helicopters_above {
            std::mem::swap(&mut helicopter_destination, &mut fighter_destination);
        }

        let mut commands = vec![
            Command::select_type(UnitType::Fighter, side),
            Command::MoveBy {
                offset: fighter_destination - fighter_center,
            },
            Command::select_type(UnitType::Helicopter, side),
            Command::MoveBy {
                offset: helicopter_destination - helicopter_center,
            },
        ];

        let mut order: Vec<(Fixed, UnitType)> = UnitType::GROUND
            .iter()
            .map(|&t| (world.mass_center(me, &[t]).y, t))
            .collect();
        order.sort_by(|a, b| b.cmp(a));

        for (i, (y, unit_type)) in order.into_iter().enumerate() {
            let level = self.config.lowest_ground_level - self.config.ground_level_step * i as f64;
            commands.push(Command::select_type(unit_type, side));
            commands.push(Command::MoveBy {
                offset: Vec2Fixed::new(Fixed::ZERO, world.rel(level) - y),
            });
        }
        commands
    }

    fn ground_maneuver(&self, maneuver: Maneuver, world: &WorldState, me: PlayerId) -> Vec<Command> {
        let side = world.constants.world_side;
        let block_center = world.rel_point((self.config.ground_x, self.config.ground_y));
        let block_select = Command::select_square(block_center, world.rel(self.config.scaled_group_side));
        let angle = fixed_from_f64(self.config.rotation_angle);

        let mut commands = Vec::new();
        match maneuver {
            Maneuver::ShiftX => {
                for unit_type in UnitType::GROUND {
                    let center = world.mass_center(me, &[unit_type]);
                    commands.push(Command::select_type(unit_type, side));
                    commands.push(Command::MoveBy {
                        offset: Vec2Fixed::new(world.rel(self.config.ground_x) - center.x, Fixed::ZERO),
                    });
                }
            }
            Maneuver::Scale => {
                let factor = Fixed::from_num(UnitType::GROUND.len());
                for unit_type in UnitType::GROUND {
                    commands.push(Command::select_type(unit_type, side));
                    commands.push(Command::Scale {
                        factor,
                        center: world.mass_center(me, &[unit_type]),
                    });
                }
            }
            Maneuver::AdjustX => {
                let step = world.rel(self.config.group_adjustment);
                for (i, unit_type) in UnitType::GROUND.into_iter().enumerate() {
                    commands.push(Command::select_type(unit_type, side));
                    commands.push(Command::MoveBy {
                        offset: Vec2Fixed::new(step * Fixed::from_num(i), Fixed::ZERO),
                    });
                }
            }
            Maneuver::Collapse => {
                for unit_type in UnitType::GROUND {
                    let center = world.mass_center(me, &[unit_type]);
                    commands.push(Command::select_type(unit_type, side));
                    commands.push(Command::MoveBy {
                        offset: Vec2Fixed::new(Fixed::ZERO, world.rel(self.config.ground_y) - center.y),
                    });
                }
            }
            Maneuver::Rotate => {
                commands.push(block_select);
                commands.push(Command::Rotate {
                    angle,
                    center: block_center,
                });
            }
            Maneuver::Descale => {
                commands.push(block_select);
                commands.push(Command::Scale {
                    factor: fixed_from_f64(self.config.descaling_ratio),
                    center: block_center,
                });
            }
            Maneuver::FaceEnemy => {
                commands.push(block_select);
                commands.push(Command::Rotate {
                    angle: angle * Fixed::from_num(2),
                    center: block_center,
                });
            }
        }
        commands
    }

    fn air_maneuver(&self, maneuver: Maneuver, world: &WorldState) -> Vec<Command> {
        let side = world.constants.world_side;
        let block_side = world.rel(self.config.group_side);
        let helicopter_slot = world.rel_point(self.config.helicopter_destination);
        let fighter_slot = world.rel_point(self.config.fighter_destination);
        // The fighters hold position; the helicopters fly onto them
        let merged_center = if self.helicopters_above {
            helicopter_slot
        } else {
            fighter_slot
        };

        match maneuver {
            // Air blocks already share a column
            Maneuver::ShiftX | Maneuver::FaceEnemy => Vec::new(),
            Maneuver::Scale => {
                let factor = fixed_from_f64(self.config.air_scale_factor);
                let mut commands = Vec::new();
                for center in [helicopter_slot, fighter_slot] {
                    commands.push(Command::select_square(center, block_side));
                    commands.push(Command::Scale { factor, center });
                }
                commands
            }
            Maneuver::AdjustX => vec![
                Command::select_type(UnitType::Helicopter, side),
                Command::MoveBy {
                    offset: Vec2Fixed::new(world.rel(self.config.group_adjustment), Fixed::ZERO),
                },
            ],
            Maneuver::Collapse => {
                let mut offset = helicopter_slot - fighter_slot;
                if !self.helicopters_above {
                    offset = -offset;
                }
                vec![
                    Command::select_type(UnitType::Helicopter, side),
                    Command::MoveBy { offset },
                ]
            }
            Maneuver::Rotate => vec![
                Command::select_square(merged_center, block_side),
                Command::Rotate {
                    angle: fixed_from_f64(self.config.rotation_angle),
                    center: merged_center,
                },
            ],
            Maneuver::Descale => vec![
                Command::select_square(merged_center, block_side),
                Command::Scale {
                    factor: fixed_from_f64(self.config.descaling_ratio),
                    center: merged_center,
                },
            ],
        }
    }

    /// Distance from the main air cluster to the nearest enemy.
    ///
    /// Only fine-grid cells holding enough own air units count, so stray
    /// units do not trigger a retreat. `None` means no qualifying cell or no
    /// enemy in sight.
    #[must_use]
    pub fn main_cluster_distance(&self, world: &WorldState, me: PlayerId) -> Option<Fixed> {
        let grid = world.constants.grid;
        let air_positions = || {
            world
                .units
                .owned_by(me)
                .filter(|t| t.unit.unit_type.is_air())
                .map(|t| t.unit.position)
        };
        let counts = CellCounts::from_positions(grid, air_positions());

        let mut tried = BTreeSet::new();
        let mut nearest: Option<Fixed> = None;
        for position in air_positions() {
            if counts.at(position) < self.config.main_air_cluster_min_units {
                continue;
            }
            if !tried.insert(grid.cell_of(position)) {
                continue;
            }
            if let Some(enemy) = world.closest_enemy(me, position) {
                let distance = position.distance(enemy);
                nearest = Some(nearest.map_or(distance, |d| d.min(distance)));
            }
        }
        nearest
    }

    fn regroup_air(&mut self, world: &mut WorldState, me: PlayerId, tick: Tick) -> Vec<Command> {
        if self.engagement != EngagementState::Initial {
            return Vec::new();
        }
        let Some(maneuver) = self.regroup.pending_maneuver(UnitGroup::Air, &world.motion) else {
            return Vec::new();
        };

        let commands = self.air_maneuver(maneuver, world);
        if let Some(transition) = self.regroup.complete_maneuver(UnitGroup::Air) {
            log_transition(tick, &transition);
        }
        if !commands.is_empty() {
            world.touch_group(me, UnitGroup::Air.types(), tick);
        }
        if maneuver == Maneuver::FaceEnemy {
            self.engagement = EngagementState::Retreating;
            tracing::debug!(tick, "Air wing formed, switching to engagement");
        }
        commands
    }

    fn engage(&mut self, ctx: &PlanContext<'_>) -> Vec<Command> {
        let world = &*ctx.world;
        let me = ctx.input.me.id;
        let side = world.constants.world_side;
        let speed = world.constants.helicopter_speed;
        let select_wing = [
            Command::select_type(UnitType::Helicopter, side),
            Command::add_type(UnitType::Fighter, side),
        ];

        let distance = self.main_cluster_distance(world, me);
        let mut commands = Vec::new();

        if self.engagement == EngagementState::Approaching
            && distance.is_some_and(|d| d < world.constants.fighter_attack_range)
        {
            commands.extend(select_wing);
            commands.push(Command::MoveByCapped {
                offset: Vec2Fixed::splat(world.rel(self.config.retreat)),
                max_speed: speed,
            });
            self.engagement = EngagementState::Retreating;
            tracing::debug!(tick = ctx.input.tick, "Air wing retreating");
        }
        if self.engagement == EngagementState::Retreating
            && distance.map_or(true, |d| d > world.constants.fighter_vision_range)
        {
            let target = ctx.strike.find_strike_target(world, &ctx.input.me);
            commands.extend(select_wing);
            commands.push(Command::MoveByCapped {
                offset: target - world.mass_center(me, &UnitType::AIR),
                max_speed: speed,
            });
            self.engagement = EngagementState::Approaching;
            tracing::debug!(tick = ctx.input.tick, "Air wing approaching");
        }
        commands
    }

    fn regroup_ground(&mut self, world: &mut WorldState, me: PlayerId, tick: Tick) -> Vec<Command> {
        let Some(maneuver) = self.regroup.pending_maneuver(UnitGroup::Ground, &world.motion) else {
            return Vec::new();
        };

        world.touch_group(me, UnitGroup::Ground.types(), tick);
        let commands = self.ground_maneuver(maneuver, world, me);
        if let Some(transition) = self.regroup.complete_maneuver(UnitGroup::Ground) {
            log_transition(tick, &transition);
        }
        commands
    }

    fn assault(&self, ctx: &PlanContext<'_>) -> Vec<Command> {
        let world = &*ctx.world;
        let input = ctx.input;
        let interval = self.config.assault_interval.max(1);
        let start = world.constants.tick_count / self.config.assault_start_divisor.max(1);

        if !self.regroup.stage(UnitGroup::Ground).is_terminal()
            || input.tick <= start
            || input.tick % interval != 0
            || input.me.score > input.opponent.score
        {
            return Vec::new();
        }

        let me = input.me.id;
        let source = world.mass_center(me, &UnitType::GROUND);
        let Some(enemy) = world.closest_enemy(me, source) else {
            return Vec::new();
        };

        let side = world.constants.world_side;
        let direction = (enemy - source).normalize() * world.rel(self.config.assault_step);
        tracing::debug!(tick = input.tick, "Ground block advancing");
        vec![
            Command::select_type(UnitType::Arrv, side),
            Command::add_type(UnitType::Tank, side),
            Command::add_type(UnitType::Ifv, side),
            Command::MoveByCapped {
                offset: direction,
                max_speed: fixed_from_f64(self.config.assault_speed_cap),
            },
        ]
    }
}

fn log_transition(tick: Tick, transition: &StageTransition) {
    tracing::debug!(
        tick,
        group = ?transition.group,
        from = ?transition.from,
        to = ?transition.to,
        "Regroup stage advanced"
    );
}

impl Strategy for OpenFieldStrategy {
    fn name(&self) -> &'static str {
        "open_field"
    }

    fn plan(&mut self, ctx: &mut PlanContext<'_>) {
        let tick = ctx.input.tick;
        let me = ctx.input.me.id;

        for transition in self.regroup.settle(&ctx.world.motion) {
            log_transition(tick, &transition);
        }

        if !self.deployed {
            self.deployed = true;
            let commands = self.initial_deployment(ctx.world, me);
            ctx.queue.extend(commands);
        }

        let commands = self.regroup_air(ctx.world, me, tick);
        ctx.queue.extend(commands);

        let commands = self.engage(ctx);
        ctx.queue.extend(commands);

        let commands = self.regroup_ground(ctx.world, me, tick);
        ctx.queue.extend(commands);

        let commands = self.assault(ctx);
        ctx.queue.extend(commands);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandKind, CommandQueue};
    use crate::config::{EngineConfig, StrikeConfig, ValueWeights};
    use crate::environment::{GameRules, PlayerState, RuntimeConstants, TickInput};
    use crate::regroup::RegroupStage;
    use crate::strike::AreaStrikePlanner;
    use crate::unit::{Unit, UnitId};

    const ME: PlayerId = 1;
    const ENEMY: PlayerId = 2;

    fn world() -> WorldState {
        let constants = RuntimeConstants::new(&GameRules::default()).expect("valid rules");
        WorldState::new(constants, &EngineConfig::default())
    }

    fn add(world: &mut WorldState, id: UnitId, owner: PlayerId, unit_type: UnitType, x: f64, y: f64) {
        world.units.observe_new(
            Unit {
                id,
                owner,
                unit_type,
                position: Vec2Fixed::from_f64(x, y),
                durability: 100,
                max_durability: 100,
                vision_range: Fixed::from_num(120),
            },
            0,
        );
    }

    fn input(tick: Tick) -> TickInput {
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

    fn plan(strategy: &mut OpenFieldStrategy, world: &mut WorldState, input: &TickInput) -> CommandQueue {
        let strike = AreaStrikePlanner::new(StrikeConfig::default(), ValueWeights::default());
        let mut queue = CommandQueue::new();
        world.refresh_motion(input.me.id, input.tick);
        let mut ctx = PlanContext {
            world,
            input,
            strike: &strike,
            queue: &mut queue,
        };
        strategy.plan(&mut ctx);
        queue
    }

    #[test]
    fn test_initial_deployment_orders_blocks() {
        let mut world = world();
        add(&mut world, 1, ME, UnitType::Fighter, 100.0, 200.0);
        add(&mut world, 2, ME, UnitType::Helicopter, 100.0, 50.0);
        add(&mut world, 3, ME, UnitType::Tank, 50.0, 300.0);
        add(&mut world, 4, ME, UnitType::Ifv, 50.0, 100.0);
        add(&mut world, 5, ME, UnitType::Arrv, 50.0, 200.0);

        let mut strategy = OpenFieldStrategy::new(OpenFieldConfig::default());
        let queue = plan(&mut strategy, &mut world, &input(0));
        let commands: Vec<Command> = queue.iter().copied().collect();

        // Fighters start lower, so the slots swap
        assert!(strategy.helicopters_above());
        assert_eq!(commands.len(), 10);
        let side = Fixed::from_num(1024);
        assert_eq!(commands[0], Command::select_type(UnitType::Fighter, side));
        // Lowest ground block first
        assert_eq!(commands[4], Command::select_type(UnitType::Tank, side));
        assert_eq!(commands[6], Command::select_type(UnitType::Arrv, side));
        assert_eq!(commands[8], Command::select_type(UnitType::Ifv, side));

        // Deployment happens only once
        let queue = plan(&mut strategy, &mut world, &input(1));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_dense_formation_turns_ground_block() {
        let mut world = world();
        add(&mut world, 1, ME, UnitType::Tank, 128.0, 307.0);
        let mut strategy = OpenFieldStrategy::new(OpenFieldConfig::default());
        strategy.deployed = true;
        strategy.engagement = EngagementState::Approaching;
        strategy
            .regroup_mut()
            .force_stage(UnitGroup::Ground, RegroupStage::DenseFormation);

        let queue = plan(&mut strategy, &mut world, &input(1000));
        let kinds: Vec<CommandKind> = queue.iter().map(Command::kind).collect();
        assert_eq!(kinds, vec![CommandKind::SelectRect, CommandKind::Rotate]);
        for unit_type in UnitType::GROUND {
            assert_eq!(strategy.regroup().stage_of(unit_type), RegroupStage::ReadyForAttack);
        }
        // Write-ahead: the block counts as moving again
        world.refresh_motion(ME, 1001);
        assert!(!world.motion.is_type_motionless(UnitType::Tank));
    }

    #[test]
    fn test_air_wing_finishes_regroup_into_retreat() {
        let mut world = world();
        let mut strategy = OpenFieldStrategy::new(OpenFieldConfig::default());
        strategy.deployed = true;

        let mut tick = 100;
        let mut stages = vec![strategy.regroup().stage(UnitGroup::Air)];
        while strategy.engagement() == EngagementState::Initial && tick < 2000 {
            plan(&mut strategy, &mut world, &input(tick));
            stages.push(strategy.regroup().stage(UnitGroup::Air));
            tick += 40;
        }

        assert_eq!(strategy.regroup().stage(UnitGroup::Air), RegroupStage::ReadyForAttack);
        // No air units and no enemy: the wing immediately heads for the target
        assert_eq!(strategy.engagement(), EngagementState::Approaching);
        for pair in stages.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
    }

    #[test]
    fn test_main_cluster_ignores_strays() {
        let mut world = world();
        // 19 fighters in one cell: below the cluster threshold
        for i in 0..19 {
            add(&mut world, i, ME, UnitType::Fighter, 100.0 + (i % 5) as f64, 100.0);
        }
        add(&mut world, 100, ENEMY, UnitType::Tank, 110.0, 100.0);
        let strategy = OpenFieldStrategy::new(OpenFieldConfig::default());
        assert_eq!(strategy.main_cluster_distance(&world, ME), None);

        add(&mut world, 19, ME, UnitType::Helicopter, 101.0, 101.0);
        let distance = strategy
            .main_cluster_distance(&world, ME)
            .expect("cluster now qualifies");
        assert!(distance < Fixed::from_num(11));
    }

    #[test]
    fn test_approaching_wing_retreats_on_contact() {
        let mut world = world();
        for i in 0..20 {
            add(&mut world, i, ME, UnitType::Fighter, 100.0 + (i % 5) as f64, 100.0);
        }
        add(&mut world, 100, ENEMY, UnitType::Tank, 110.0, 100.0);

        let mut strategy = OpenFieldStrategy::new(OpenFieldConfig::default());
        strategy.deployed = true;
        strategy.engagement = EngagementState::Approaching;

        let queue = plan(&mut strategy, &mut world, &input(500));
        assert_eq!(strategy.engagement(), EngagementState::Retreating);
        let kinds: Vec<CommandKind> = queue.iter().map(Command::kind).collect();
        assert!(kinds.starts_with(&[
            CommandKind::SelectByType,
            CommandKind::AddToSelectionByType,
            CommandKind::MoveByCapped
        ]));
    }

    #[test]
    fn test_retreated_wing_approaches_once_enemy_out_of_sight() {
        let mut world = world();
        for i in 0..20 {
            add(&mut world, i, ME, UnitType::Fighter, 100.0 + (i % 5) as f64, 100.0);
        }
        // Far beyond the 120 vision range of the cluster
        add(&mut world, 100, ENEMY, UnitType::Tank, 600.0, 600.0);

        let mut strategy = OpenFieldStrategy::new(OpenFieldConfig::default());
        strategy.deployed = true;
        strategy.engagement = EngagementState::Retreating;

        let queue = plan(&mut strategy, &mut world, &input(500));
        assert_eq!(strategy.engagement(), EngagementState::Approaching);

        let strike = AreaStrikePlanner::new(StrikeConfig::default(), ValueWeights::default());
        let target = strike.find_strike_target(&world, &input(500).me);
        let offset = target - world.mass_center(ME, &UnitType::AIR);
        let side = world.constants.world_side;
        let commands: Vec<Command> = queue.iter().copied().collect();
        assert_eq!(
            commands[..3],
            [
                Command::select_type(UnitType::Helicopter, side),
                Command::add_type(UnitType::Fighter, side),
                Command::MoveByCapped {
                    offset,
                    max_speed: world.constants.helicopter_speed,
                },
            ]
        );
        assert!(offset.x > Fixed::from_num(400));
    }

    #[test]
    fn test_assault_requires_formed_block_and_losing_score() {
        let mut world = world();
        add(&mut world, 1, ME, UnitType::Tank, 100.0, 100.0);
        add(&mut world, 2, ENEMY, UnitType::Tank, 900.0, 100.0);

        let mut strategy = OpenFieldStrategy::new(OpenFieldConfig::default());
        strategy.deployed = true;
        strategy.engagement = EngagementState::Approaching;

        // Still regrouping
        let late = 20_000 / 4 + 100 - (20_000 / 4 + 100) % 100;
        assert!(plan(&mut strategy, &mut world, &input(late))
            .iter()
            .all(|c| c.kind() != CommandKind::MoveByCapped));

        let mut strategy = OpenFieldStrategy::new(OpenFieldConfig::default());
        strategy.deployed = true;
        strategy.engagement = EngagementState::Approaching;
        for group in UnitGroup::ALL {
            strategy
                .regroup_mut()
                .force_stage(group, RegroupStage::ReadyForAttack);
        }
        let queue = plan(&mut strategy, &mut world, &input(late));
        let commands: Vec<Command> = queue.iter().copied().collect();
        assert_eq!(commands.len(), 4);
        match commands[3] {
            Command::MoveByCapped { offset, .. } => {
                assert!(offset.x > Fixed::ZERO);
                assert_eq!(offset.y, Fixed::ZERO);
            }
            other => panic!("unexpected command {other:?}"),
        }

        // Ahead on score: hold
        let mut winning = input(late);
        winning.me.score = 10;
        let queue = plan(&mut strategy, &mut world, &winning);
        assert!(queue.is_empty());
    }
}
