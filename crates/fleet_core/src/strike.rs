//! Area strike planning.
//!
//! Three decisions share the fragment grid:
//! - where the strike would do the most good ([`AreaStrikePlanner::find_strike_target`])
//! - whether to send a small delivery crew toward that point ahead of time
//! - whether to fire right now, and from which own unit
//!
//! The strike is the one command allowed to jump the queue: its cooldown is
//! a hard real-time window that should not wait behind routine orders.

use crate::command::{Command, CommandQueue};
use crate::config::{StrikeConfig, ValueWeights};
use crate::environment::PlayerState;
use crate::math::{Fixed, Vec2Fixed};
use crate::unit::{Tick, Unit, UnitId};
use crate::value::unit_value;
use crate::world::WorldState;

/// What a strike centred on one launcher would hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlastEstimate {
    /// Signed value balance of every unit in the blast.
    pub balance: i32,
    /// Enemy units in the blast.
    pub enemy_count: u32,
    /// Sum of enemy positions in the blast.
    pub enemy_position_sum: Vec2Fixed,
}

impl BlastEstimate {
    /// Mean position of the enemies caught, if any.
    #[must_use]
    pub fn enemy_mean(&self) -> Option<Vec2Fixed> {
        (self.enemy_count > 0)
            .then(|| self.enemy_position_sum / Fixed::from_num(self.enemy_count))
    }
}

/// Area strike planner.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaStrikePlanner {
    config: StrikeConfig,
    weights: ValueWeights,
}

impl AreaStrikePlanner {
    /// Create a planner.
    #[must_use]
    pub fn new(config: StrikeConfig, weights: ValueWeights) -> Self {
        Self { config, weights }
    }

    /// Point with the largest strike potential on the fine grid.
    #[must_use]
    pub fn find_strike_target(&self, world: &WorldState, me: &PlayerState) -> Vec2Fixed {
        world
            .fragment_grid(me.id, &self.weights, world.constants.grid)
            .best_target()
    }

    /// Stage a small crew of delivery units toward the strike target.
    ///
    /// Only runs once the cooldown will have expired by the time the crew
    /// arrives, after the warm-up tick, with an empty queue, and while every
    /// delivery unit stands still. Returns whether the crew was sent.
    pub fn try_send_delivery_crew(
        &self,
        world: &WorldState,
        me: &PlayerState,
        tick: Tick,
        anchor: Vec2Fixed,
        queue: &mut CommandQueue,
    ) -> bool {
        if me.strike_cooldown_ticks > self.config.delivery_budget_ticks || !queue.is_empty() {
            return false;
        }
        if tick < self.config.earliest_crew_tick
            || !world.motion.is_type_motionless(self.config.delivery_unit)
        {
            return false;
        }

        let side = crate::math::fixed_from_f64(self.config.crew_selection_size);
        let target = self.find_strike_target(world, me);
        queue.push_back(Command::select_square(anchor, side));
        queue.push_back(Command::MoveBy {
            offset: target - anchor,
        });

        tracing::debug!(
            tick,
            anchor_x = anchor.x.to_num::<f64>(),
            anchor_y = anchor.y.to_num::<f64>(),
            target_x = target.x.to_num::<f64>(),
            target_y = target.y.to_num::<f64>(),
            "Delivery crew dispatched"
        );
        true
    }

    /// Fire the strike if it is ready and worth it.
    ///
    /// Tries one own unit per coarse cell as the launcher and keeps the one
    /// whose blast has the strictly greatest positive balance. The strike
    /// goes to the front of the queue only if it would catch enough enemies.
    pub fn try_strike(
        &self,
        world: &WorldState,
        me: &PlayerState,
        tick: Tick,
        queue: &mut CommandQueue,
    ) -> Option<Command> {
        if me.strike_cooldown_ticks != 0 || !queue.front_allows_interrupt() {
            return None;
        }

        let coarse = world.constants.coarse_grid;
        let mut tried = vec![false; coarse.cell_count()];
        let mut best: Option<(UnitId, BlastEstimate)> = None;
        let mut best_balance = 0;

        for launcher in world.units.units().filter(|u| u.is_owned_by(me.id)) {
            let cell = coarse.cell_of(launcher.position);
            let slot = cell.x * coarse.cells_per_side + cell.y;
            if tried[slot] {
                continue;
            }
            tried[slot] = true;

            let estimate = self.estimate_blast(world, me, launcher);
            if estimate.balance > best_balance {
                best_balance = estimate.balance;
                best = Some((launcher.id, estimate));
            }
        }

        let (launcher, estimate) = best?;
        if estimate.enemy_count < self.config.min_enemies {
            return None;
        }
        let target = estimate.enemy_mean()?;

        let command = Command::AreaStrike { target, launcher };
        queue.push_front_urgent(command);
        tracing::debug!(
            tick,
            launcher,
            enemies = estimate.enemy_count,
            balance = estimate.balance,
            "Area strike queued"
        );
        Some(command)
    }

    /// Value caught by a blast of radius half the launcher's vision range.
    #[must_use]
    pub fn estimate_blast(
        &self,
        world: &WorldState,
        me: &PlayerState,
        launcher: &Unit,
    ) -> BlastEstimate {
        let radius = launcher.vision_range / Fixed::from_num(2);
        let radius_squared = radius * radius;

        let mut estimate = BlastEstimate::default();
        for target in world.units.units() {
            if launcher.position.distance_squared(target.position) >= radius_squared {
                continue;
            }
            estimate.balance += unit_value(target, me.id, &self.weights);
            if !target.is_owned_by(me.id) {
                estimate.enemy_count += 1;
                estimate.enemy_position_sum += target.position;
            }
        }
        estimate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandKind;
    use crate::config::EngineConfig;
    use crate::environment::{GameRules, RuntimeConstants};
    use crate::unit::{PlayerId, UnitType};

    const ME: PlayerId = 1;
    const ENEMY: PlayerId = 2;

    fn world() -> WorldState {
        let constants = RuntimeConstants::new(&GameRules::default()).expect("valid rules");
        WorldState::new(constants, &EngineConfig::default())
    }

    fn add(world: &mut WorldState, id: UnitId, owner: PlayerId, x: f64, y: f64) {
        world.units.observe_new(
            Unit {
                id,
                owner,
                unit_type: UnitType::Fighter,
                position: Vec2Fixed::from_f64(x, y),
                durability: 100,
                max_durability: 100,
                vision_range: Fixed::from_num(120),
            },
            0,
        );
    }

    fn planner() -> AreaStrikePlanner {
        AreaStrikePlanner::new(StrikeConfig::default(), ValueWeights::default())
    }

    fn me(cooldown: u64) -> PlayerState {
        PlayerState {
            id: ME,
            score: 0,
            strike_cooldown_ticks: cooldown,
        }
    }

    /// One launcher at (500, 500) and `enemies` enemies packed next to it.
    fn strike_world(enemies: i64) -> WorldState {
        let mut world = world();
        add(&mut world, 1, ME, 500.0, 500.0);
        for i in 0..enemies {
            add(&mut world, 100 + i, ENEMY, 520.0 + i as f64, 510.0);
        }
        world
    }

    #[test]
    fn test_strike_fires_with_enough_enemies() {
        let world = strike_world(12);
        let mut queue = CommandQueue::new();

        let command = planner()
            .try_strike(&world, &me(0), 200, &mut queue)
            .expect("strike should fire");

        match command {
            Command::AreaStrike { target, launcher } => {
                assert_eq!(launcher, 1);
                assert_eq!(target, Vec2Fixed::from_f64(525.5, 510.0));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(queue.front().map(Command::kind), Some(CommandKind::AreaStrike));
    }

    #[test]
    fn test_strike_needs_minimum_enemy_count() {
        let world = strike_world(9);
        let mut queue = CommandQueue::new();
        assert!(planner().try_strike(&world, &me(0), 200, &mut queue).is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_strike_waits_for_cooldown() {
        let world = strike_world(12);
        let mut queue = CommandQueue::new();
        assert!(planner().try_strike(&world, &me(1), 200, &mut queue).is_none());
    }

    #[test]
    fn test_strike_never_splits_pending_transform() {
        let world = strike_world(12);
        let mut queue = CommandQueue::new();
        let pending = Command::MoveBy {
            offset: Vec2Fixed::from_f64(5.0, 0.0),
        };
        queue.push_back(pending);

        assert!(planner().try_strike(&world, &me(0), 200, &mut queue).is_none());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.front(), Some(&pending));
    }

    #[test]
    fn test_strike_may_preempt_selection() {
        let world = strike_world(12);
        let mut queue = CommandQueue::new();
        queue.push_back(Command::select_type(UnitType::Tank, Fixed::from_num(1024)));

        assert!(planner().try_strike(&world, &me(0), 200, &mut queue).is_some());
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.front().map(Command::kind), Some(CommandKind::AreaStrike));
    }

    #[test]
    fn test_blast_radius_is_strict() {
        let mut world = world();
        add(&mut world, 1, ME, 100.0, 100.0);
        // Vision 120, radius 60: exactly on the edge is outside
        add(&mut world, 2, ENEMY, 160.0, 100.0);
        add(&mut world, 3, ENEMY, 159.0, 100.0);

        let launcher = *world.units.unit(1).expect("launcher tracked");
        let estimate = planner().estimate_blast(&world, &me(0), &launcher);
        assert_eq!(estimate.enemy_count, 1);
        // Enemy +3, launcher itself -3
        assert_eq!(estimate.balance, 0);
    }

    #[test]
    fn test_delivery_crew_preconditions() {
        let world = strike_world(3);
        let anchor = Vec2Fixed::from_f64(500.0, 500.0);

        let mut queue = CommandQueue::new();
        // Too early
        assert!(!planner().try_send_delivery_crew(&world, &me(0), 50, anchor, &mut queue));
        // Cooldown too long
        assert!(!planner().try_send_delivery_crew(&world, &me(51), 150, anchor, &mut queue));
        // Queue busy
        queue.push_back(Command::MoveBy {
            offset: Vec2Fixed::ZERO,
        });
        assert!(!planner().try_send_delivery_crew(&world, &me(0), 150, anchor, &mut queue));
    }

    #[test]
    fn test_delivery_crew_enqueues_select_and_move() {
        let mut world = strike_world(3);
        world.refresh_motion(ME, 150);
        let anchor = Vec2Fixed::from_f64(500.0, 500.0);
        let mut queue = CommandQueue::new();

        assert!(planner().try_send_delivery_crew(&world, &me(50), 150, anchor, &mut queue));

        let target = planner().find_strike_target(&world, &me(50));
        let commands: Vec<Command> = queue.iter().copied().collect();
        assert_eq!(
            commands,
            vec![
                Command::select_square(anchor, Fixed::from_num(30)),
                Command::MoveBy {
                    offset: target - anchor
                },
            ]
        );
    }

    #[test]
    fn test_delivery_crew_waits_for_motionless_fighters() {
        let mut world = strike_world(3);
        // Units were sighted at tick 0; at tick 20 they are still settling
        world.refresh_motion(ME, 20);
        let mut queue = CommandQueue::new();
        let planner = AreaStrikePlanner::new(
            StrikeConfig {
                earliest_crew_tick: 0,
                ..StrikeConfig::default()
            },
            ValueWeights::default(),
        );
        assert!(!planner.try_send_delivery_crew(
            &world,
            &me(0),
            20,
            Vec2Fixed::ZERO,
            &mut queue
        ));
    }
}
