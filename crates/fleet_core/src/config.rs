//! Engine tuning configuration.
//!
//! Every numeric constant that shapes behaviour lives here rather than in
//! the planners. Defaults reproduce the stock heuristic; a RON file can
//! override any subset of fields.
//!
//! Distances in [`OpenFieldConfig`] are fractions of the world side and
//! are scaled by the runtime world size when used.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::math::{fixed_from_f64, Fixed, Vec2Fixed};
use crate::unit::UnitType;

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Motion detection.
    pub motion: MotionConfig,
    /// Unit value heuristic.
    pub value: ValueWeights,
    /// Area strike planning.
    pub strike: StrikeConfig,
    /// Strategy used when the map has no facilities.
    pub open_field: OpenFieldConfig,
    /// Strategy used when the map has facilities.
    pub territory: TerritoryConfig,
}

impl EngineConfig {
    /// Load a configuration from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EngineError::ConfigNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: EngineConfig = ron::from_str(ron)?;
        Ok(config)
    }

    /// Serialize to pretty RON.
    ///
    /// Only fails if a field cannot be represented, which the derived
    /// impls never produce; the fallback keeps the signature infallible.
    #[must_use]
    pub fn to_ron_string(&self) -> String {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).unwrap_or_default()
    }
}

/// Motion detection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Ticks a unit must stay put before it counts as motionless.
    pub cooldown_ticks: u64,
    /// Displacement below which a reported position is not a move.
    pub position_epsilon: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            cooldown_ticks: 31,
            position_epsilon: 1e-3,
        }
    }
}

impl MotionConfig {
    /// Squared epsilon in fixed point, for comparison with squared distances.
    #[must_use]
    pub fn epsilon_squared(&self) -> Fixed {
        let eps = fixed_from_f64(self.position_epsilon);
        eps * eps
    }
}

/// Weights of the unit value heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueWeights {
    /// Value of a healthy unit.
    pub base: i32,
    /// Added when the unit is below half durability.
    pub quick_kill_bonus: i32,
    /// Subtracted for self-healing units.
    pub self_healing_discount: i32,
}

impl Default for ValueWeights {
    fn default() -> Self {
        Self {
            base: 3,
            quick_kill_bonus: 2,
            self_healing_discount: 2,
        }
    }
}

/// Area strike settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrikeConfig {
    /// No delivery crew is staged before this tick.
    pub earliest_crew_tick: u64,
    /// Ticks a crew needs to reach its target; staging starts once the
    /// remaining cooldown fits in this budget.
    pub delivery_budget_ticks: u64,
    /// Minimum enemies inside the blast for a strike to be worth firing.
    pub min_enemies: u32,
    /// Side of the square used to select the delivery crew.
    pub crew_selection_size: f64,
    /// Unit type that carries the strike designator.
    pub delivery_unit: UnitType,
}

impl Default for StrikeConfig {
    fn default() -> Self {
        Self {
            earliest_crew_tick: 100,
            delivery_budget_ticks: 50,
            min_enemies: 10,
            crew_selection_size: 30.0,
            delivery_unit: UnitType::Fighter,
        }
    }
}

/// Open-field strategy settings (regrouping, air engagement, assault).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenFieldConfig {
    /// A fine-grid cell needs this many own air units to count as part of
    /// the main air cluster.
    pub main_air_cluster_min_units: u32,
    /// Rotation applied at the rotate stage, in radians.
    pub rotation_angle: f64,
    /// Scale factor applied at the descale stage.
    pub descaling_ratio: f64,
    /// Scale factor applied to each air block at the scale stage.
    pub air_scale_factor: f64,
    /// Side of each initial block.
    pub group_side: f64,
    /// Side of the merged ground block after scaling.
    pub scaled_group_side: f64,
    /// Horizontal shift per ground type index at the adjust stage.
    pub group_adjustment: f64,
    /// Helicopter destination of the initial deployment.
    pub helicopter_destination: (f64, f64),
    /// Fighter destination of the initial deployment.
    pub fighter_destination: (f64, f64),
    /// Level of the lowest ground block after the initial deployment.
    pub lowest_ground_level: f64,
    /// Vertical distance between ground blocks after the initial deployment.
    pub ground_level_step: f64,
    /// Column the ground blocks line up on.
    pub ground_x: f64,
    /// Row the ground blocks collapse onto.
    pub ground_y: f64,
    /// Diagonal retreat offset of the air wing.
    pub retreat: f64,
    /// Length of one ground assault step.
    pub assault_step: f64,
    /// Ticks between ground assault orders.
    pub assault_interval: u64,
    /// Speed cap of the ground assault.
    pub assault_speed_cap: f64,
    /// Ground assault starts after `tick_count / assault_start_divisor`.
    pub assault_start_divisor: u64,
}

impl Default for OpenFieldConfig {
    fn default() -> Self {
        Self {
            main_air_cluster_min_units: 20,
            rotation_angle: 0.785,
            descaling_ratio: 0.1,
            air_scale_factor: 2.0,
            group_side: 0.15,
            scaled_group_side: 0.25,
            group_adjustment: 0.005,
            helicopter_destination: (0.35, 0.4),
            fighter_destination: (0.35, 0.2),
            lowest_ground_level: 0.45,
            ground_level_step: 0.17,
            ground_x: 0.125,
            ground_y: 0.3,
            retreat: -0.1,
            assault_step: 0.05,
            assault_interval: 100,
            assault_speed_cap: 0.15,
            assault_start_divisor: 4,
        }
    }
}

impl OpenFieldConfig {
    /// Scale a relative length by the world side.
    #[must_use]
    pub fn rel(value: f64, world_side: Fixed) -> Fixed {
        fixed_from_f64(value) * world_side
    }

    /// Scale a relative point by the world side.
    #[must_use]
    pub fn rel_point(value: (f64, f64), world_side: Fixed) -> Vec2Fixed {
        Vec2Fixed::new(Self::rel(value.0, world_side), Self::rel(value.1, world_side))
    }
}

/// Territory strategy settings (facility capture and production).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerritoryConfig {
    /// Number of brigade launch rounds.
    pub launch_iterations: u64,
    /// Duration of one launch round in ticks.
    pub launch_iteration_duration: u64,
    /// Ticks between two brigade launches.
    pub launch_interval: u64,
    /// Units per brigade.
    pub brigade_size: usize,
    /// Relocation is only planned while the queue is shorter than this.
    pub max_queue_for_relocation: usize,
    /// Ticks between scans for idle troops outside facilities.
    pub relocation_interval: u64,
    /// Idle troops outside facilities must exceed this count to be moved.
    pub min_idle_troops_outside: u32,
    /// Troops in a factory must exceed this count to be moved out.
    pub min_troops_to_leave_factory: u32,
    /// Troops must exceed this count to be sent at the enemy.
    pub min_troops_to_attack: u32,
    /// Scale factor applied to crowded troops before moving them.
    pub relocation_scale: f64,
    /// Helicopter patrols start after this tick.
    pub patrol_start_tick: u64,
    /// Ticks between patrol orders.
    pub patrol_interval: u64,
    /// Unit type ordered from newly captured factories.
    pub production_unit: UnitType,
    /// Seed for facility choice.
    pub seed: u64,
}

impl Default for TerritoryConfig {
    fn default() -> Self {
        Self {
            launch_iterations: 3,
            launch_iteration_duration: 600,
            launch_interval: 40,
            brigade_size: 10,
            max_queue_for_relocation: 5,
            relocation_interval: 100,
            min_idle_troops_outside: 5,
            min_troops_to_leave_factory: 50,
            min_troops_to_attack: 20,
            relocation_scale: 2.0,
            patrol_start_tick: 1500,
            patrol_interval: 500,
            production_unit: UnitType::Tank,
            seed: 0,
        }
    }
}
