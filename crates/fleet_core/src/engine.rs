//! The per-tick decision engine.
//!
//! # Tick order
//!
//! 1. Ingest new sightings and deltas into the tracker
//!
//! On action ticks only:
//!
//! 2. Refresh the motionlessness table for the controlled player
//! 3. Stage a strike delivery crew, then try to fire the strike
//! 4. Let the strategy append its routine commands
//! 5. Pop one command
//!
//! Every other tick emits a no-op, and so does an action tick with an
//! empty queue.
//!
//! The order is fixed: every planner reads the motionlessness table computed
//! in step 2, and the strike planner sees the queue before routine orders
//! are appended.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::command::{Command, CommandQueue, MoveDescription};
use crate::config::EngineConfig;
use crate::environment::{GameRules, RuntimeConstants, TickInput};
use crate::error::Result;
use crate::replay::DecisionLog;
use crate::strategy::{ActiveStrategy, PlanContext, Strategy};
use crate::strike::AreaStrikePlanner;
use crate::tracker::DeltaOutcome;
use crate::unit::Tick;
use crate::world::WorldState;

/// Decision engine for one game.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    config: EngineConfig,
    world: WorldState,
    strike: AreaStrikePlanner,
    queue: CommandQueue,
    strategy: Option<ActiveStrategy>,
    log: DecisionLog,
    last_tick: Option<Tick>,
}

impl DecisionEngine {
    /// Create an engine for a game with the given rules.
    ///
    /// # Errors
    /// Returns an error if the rules describe an impossible world.
    pub fn new(rules: &GameRules, config: EngineConfig) -> Result<Self> {
        let constants = RuntimeConstants::new(rules)?;
        tracing::debug!(
            world_side = constants.world_side.to_num::<f64>(),
            base_action_interval = constants.base_action_interval,
            "Decision engine created"
        );
        Ok(Self {
            world: WorldState::new(constants, &config),
            strike: AreaStrikePlanner::new(config.strike.clone(), config.value),
            queue: CommandQueue::new(),
            strategy: None,
            log: DecisionLog::new(config.territory.seed),
            last_tick: None,
            config,
        })
    }

    /// Run one tick and return the command to send, or a no-op.
    pub fn tick(&mut self, input: &TickInput) -> MoveDescription {
        let tick = input.tick;
        if self.last_tick.is_some_and(|last| tick <= last) {
            tracing::warn!(tick, last = ?self.last_tick, "Tick index did not advance");
        }
        self.last_tick = Some(tick);

        self.ingest(input);
        let me = input.me;

        let strategy = self.strategy.get_or_insert_with(|| {
            let chosen = ActiveStrategy::for_first_tick(input, &self.config);
            tracing::info!(
                tick,
                strategy = chosen.name(),
                facilities = input.facilities.len(),
                "Strategy selected"
            );
            chosen
        });
        if self.log.strategy.is_empty() {
            self.log.strategy = strategy.name().to_string();
        }

        // Everything past ingestion runs on action ticks only
        let issued = if self.world.constants.is_action_tick(tick) {
            self.world.refresh_motion(me.id, tick);

            let anchor = self
                .world
                .bottom_right(me.id, self.config.strike.delivery_unit);
            self.strike
                .try_send_delivery_crew(&self.world, &me, tick, anchor, &mut self.queue);
            self.strike
                .try_strike(&self.world, &me, tick, &mut self.queue);

            let mut ctx = PlanContext {
                world: &mut self.world,
                input,
                strike: &self.strike,
                queue: &mut self.queue,
            };
            strategy.plan(&mut ctx);

            self.queue.pop_front()
        } else {
            None
        };
        if let Some(command) = &issued {
            tracing::debug!(tick, kind = ?command.kind(), pending = self.queue.len(), "Command issued");
        }

        let state_hash = self.state_hash(tick);
        self.log.record(tick, issued, state_hash);
        issued
            .as_ref()
            .map_or_else(MoveDescription::noop, Command::to_wire)
    }

    fn ingest(&mut self, input: &TickInput) {
        for unit in &input.new_units {
            self.world.units.observe_new(*unit, input.tick);
        }
        let mut removed = 0usize;
        for delta in &input.updates {
            if self.world.units.apply_update(delta, input.tick) == DeltaOutcome::Removed {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::trace!(tick = input.tick, removed, "Units destroyed");
        }
    }

    /// Hash of the engine state that determines future decisions.
    #[must_use]
    pub fn state_hash(&self, tick: Tick) -> u64 {
        let mut hasher = DefaultHasher::new();
        tick.hash(&mut hasher);
        self.world.units.hash(&mut hasher);
        self.world.motion.hash(&mut hasher);
        self.queue.hash(&mut hasher);
        if let Some(ActiveStrategy::OpenField(strategy)) = &self.strategy {
            strategy.regroup().stages().hash(&mut hasher);
            strategy.engagement().hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Current world state.
    #[must_use]
    pub const fn world(&self) -> &WorldState {
        &self.world
    }

    /// Commands waiting to be issued.
    #[must_use]
    pub const fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Pending commands, front first.
    #[must_use]
    pub fn pending(&self) -> Vec<Command> {
        self.queue.iter().copied().collect()
    }

    /// Strategy chosen on the first tick.
    #[must_use]
    pub const fn strategy(&self) -> Option<&ActiveStrategy> {
        self.strategy.as_ref()
    }

    /// Engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Decisions recorded so far.
    #[must_use]
    pub const fn log(&self) -> &DecisionLog {
        &self.log
    }

    /// Consume the engine, keeping its decision log.
    #[must_use]
    pub fn into_log(self) -> DecisionLog {
        self.log
    }
}
