//! Map-specific strategies.
//!
//! The orchestrator owns the tracker, the strike planner and the queue; a
//! strategy only decides which routine commands to append each tick.
//!
//! - [`OpenFieldStrategy`]: no facilities on the map; regroup into dense
//!   formations, oscillate the air wing, push the ground block late
//! - [`TerritoryStrategy`]: facilities on the map; capture them with small
//!   brigades, set up production, keep idle troops moving

mod open_field;
mod territory;

pub use open_field::OpenFieldStrategy;
pub use territory::TerritoryStrategy;

use crate::command::CommandQueue;
use crate::config::EngineConfig;
use crate::environment::TickInput;
use crate::strike::AreaStrikePlanner;
use crate::world::WorldState;

/// Everything a strategy may read or change during one tick.
#[derive(Debug)]
pub struct PlanContext<'a> {
    /// World state, already updated and refreshed for this tick.
    pub world: &'a mut WorldState,
    /// This tick's environment report.
    pub input: &'a TickInput,
    /// Strike planner, for target queries.
    pub strike: &'a AreaStrikePlanner,
    /// Pending commands.
    pub queue: &'a mut CommandQueue,
}

/// Per-tick planning policy.
pub trait Strategy {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Append this tick's routine commands.
    fn plan(&mut self, ctx: &mut PlanContext<'_>);
}

/// The strategy chosen for a game.
#[derive(Debug, Clone)]
pub enum ActiveStrategy {
    /// Map without facilities.
    OpenField(OpenFieldStrategy),
    /// Map with facilities.
    Territory(TerritoryStrategy),
}

impl ActiveStrategy {
    /// Pick the strategy for the first tick of a game.
    #[must_use]
    pub fn for_first_tick(input: &TickInput, config: &EngineConfig) -> Self {
        if input.facilities.is_empty() {
            Self::OpenField(OpenFieldStrategy::new(config.open_field.clone()))
        } else {
            Self::Territory(TerritoryStrategy::new(config.territory.clone()))
        }
    }
}

impl Strategy for ActiveStrategy {
    fn name(&self) -> &'static str {
        match self {
            Self::OpenField(s) => s.name(),
            Self::Territory(s) => s.name(),
        }
    }

    fn plan(&mut self, ctx: &mut PlanContext<'_>) {
        match self {
            Self::OpenField(s) => s.plan(ctx),
            Self::Territory(s) => s.plan(ctx),
        }
    }
}
