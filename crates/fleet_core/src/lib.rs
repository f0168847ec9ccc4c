//! # Fleet Core
//!
//! Per-tick decision engine for a fleet of ground and air units.
//!
//! Each tick the environment reports new sightings and per-unit deltas; the
//! engine updates its picture of the world and emits at most one unit-group
//! command. This crate contains **only** deterministic logic:
//! - No IO inside a tick
//! - No system randomness (seeded `ChaCha8Rng` only)
//! - No floating-point math in planning (uses fixed-point)
//!
//! The same tick stream always produces the same commands, which is what
//! makes decision logs replayable.
//!
//! ## Crate Structure
//!
//! - [`tracker`] - Incremental unit state and motion samples
//! - [`motion`] - Per-type motionlessness table
//! - [`grid`] - Fragment grids and cell counts
//! - [`strike`] - Area strike planning
//! - [`regroup`] - Regrouping and engagement state machines
//! - [`strategy`] - Open-field and territory strategies
//! - [`engine`] - The per-tick orchestrator
//! - [`command`] - Commands, the pending queue and the wire format
//! - [`replay`] - Decision logs
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod command;
pub mod config;
pub mod engine;
pub mod environment;
pub mod error;
pub mod grid;
pub mod math;
pub mod motion;
pub mod regroup;
pub mod replay;
pub mod strategy;
pub mod strike;
pub mod tracker;
pub mod unit;
pub mod value;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::command::{Command, CommandKind, CommandQueue, MoveDescription, WireAction};
    pub use crate::config::{
        EngineConfig, MotionConfig, OpenFieldConfig, StrikeConfig, TerritoryConfig, ValueWeights,
    };
    pub use crate::engine::DecisionEngine;
    pub use crate::environment::{
        Facility, FacilityId, FacilityKind, GameRules, PlayerState, RuntimeConstants, TickInput,
    };
    pub use crate::error::{EngineError, Result};
    pub use crate::grid::{CellCounts, CellIndex, FragmentGrid, GridGeometry};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::motion::MotionlessnessTracker;
    pub use crate::regroup::{EngagementState, RegroupMachine, RegroupStage, UnitGroup};
    pub use crate::replay::{DecisionLog, DecisionRecord};
    pub use crate::strategy::{ActiveStrategy, OpenFieldStrategy, Strategy, TerritoryStrategy};
    pub use crate::strike::AreaStrikePlanner;
    pub use crate::tracker::{DeltaOutcome, UnitStateTracker};
    pub use crate::unit::{ByType, PlayerId, Tick, Unit, UnitDelta, UnitId, UnitType};
    pub use crate::world::WorldState;
}
