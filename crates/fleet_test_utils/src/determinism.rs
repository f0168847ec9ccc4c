//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the decision engine produces
//! identical decisions given identical tick streams.
//!
//! # Sources of non-determinism
//!
//! - **Floating-point math**: planning uses [`fleet_core::math::Fixed`]
//!   throughout; floats only appear at the boundary.
//! - **HashMap iteration order**: the tracker is a `BTreeMap` and every grid
//!   scan runs x-major over cells.
//! - **System randomness**: facility choice uses a seeded `ChaCha8Rng`.

use fleet_core::config::EngineConfig;
use fleet_core::engine::DecisionEngine;
use fleet_core::replay::DecisionLog;
use fleet_core::unit::Tick;

use crate::fixtures::Scenario;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks run.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic engine).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Engine is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a stateful process multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of runs
/// * `ticks` - Number of steps per run
/// * `setup` - Creates the initial state
/// * `step` - Advances the state by one tick
/// * `hash` - Computes the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, Tick),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for tick in 0..ticks {
            step(&mut state, tick);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run the engine over a scenario and return its decision log.
///
/// # Panics
///
/// Panics if the scenario rules are rejected by the engine.
#[must_use]
pub fn run_scenario(scenario: &Scenario, config: &EngineConfig, ticks: Tick) -> DecisionLog {
    let mut engine =
        DecisionEngine::new(&scenario.rules, config.clone()).expect("scenario rules are valid");
    for tick in 0..ticks {
        let _ = engine.tick(&scenario.input(tick));
    }
    engine.into_log()
}

/// Run the engine over a scenario `runs` times and compare decision logs.
///
/// # Panics
///
/// Panics if the scenario rules are rejected by the engine.
#[must_use]
pub fn verify_engine_determinism(
    scenario: &Scenario,
    config: &EngineConfig,
    runs: usize,
    ticks: Tick,
) -> DeterminismResult {
    verify_determinism(
        runs,
        ticks,
        || DecisionEngine::new(&scenario.rules, config.clone()).expect("scenario rules are valid"),
        |engine, tick| {
            let _ = engine.tick(&scenario.input(tick));
        },
        |engine| engine.log().final_hash(),
    )
}

/// Compare two logs record by record, finding the first divergent tick.
///
/// Returns `None` when the logs are identical.
#[must_use]
pub fn find_first_divergence(a: &DecisionLog, b: &DecisionLog) -> Option<Tick> {
    for (left, right) in a.records.iter().zip(&b.records) {
        if left != right {
            return Some(left.tick);
        }
    }
    match a.records.len().cmp(&b.records.len()) {
        std::cmp::Ordering::Equal => None,
        std::cmp::Ordering::Less => b.records.get(a.records.len()).map(|r| r.tick),
        std::cmp::Ordering::Greater => a.records.get(b.records.len()).map(|r| r.tick),
    }
}

/// Proptest strategies for engine inputs.
pub mod strategies {
    use proptest::prelude::*;

    use fleet_core::command::Command;
    use fleet_core::math::{Fixed, Vec2Fixed};
    use fleet_core::unit::{PlayerId, Unit, UnitType};

    use crate::fixtures::{ENEMY, ME};

    /// Generate a world coordinate in `[0, 1024)` with millesimal precision.
    pub fn arb_coordinate() -> impl Strategy<Value = Fixed> {
        (0i32..1_024_000).prop_map(|v| Fixed::from_num(v) / Fixed::from_num(1000))
    }

    /// Generate a position inside the default world.
    pub fn arb_position() -> impl Strategy<Value = Vec2Fixed> {
        (arb_coordinate(), arb_coordinate()).prop_map(|(x, y)| Vec2Fixed::new(x, y))
    }

    /// Generate a small displacement.
    pub fn arb_offset() -> impl Strategy<Value = Vec2Fixed> {
        (-50i32..50, -50i32..50)
            .prop_map(|(x, y)| Vec2Fixed::new(Fixed::from_num(x), Fixed::from_num(y)))
    }

    /// Generate any unit type.
    pub fn arb_unit_type() -> impl Strategy<Value = UnitType> {
        prop_oneof![
            Just(UnitType::Arrv),
            Just(UnitType::Fighter),
            Just(UnitType::Helicopter),
            Just(UnitType::Ifv),
            Just(UnitType::Tank),
        ]
    }

    /// Generate either fixture player.
    pub fn arb_owner() -> impl Strategy<Value = PlayerId> {
        prop_oneof![Just(ME), Just(ENEMY)]
    }

    /// Generate up to `max_units` units with distinct ids.
    pub fn arb_units(max_units: usize) -> impl Strategy<Value = Vec<Unit>> {
        proptest::collection::vec(
            (arb_owner(), arb_unit_type(), arb_position(), 1u32..=100),
            0..max_units,
        )
        .prop_map(|specs| {
            specs
                .into_iter()
                .zip(1..)
                .map(|((owner, unit_type, position, durability), id)| Unit {
                    id,
                    owner,
                    unit_type,
                    position,
                    durability,
                    max_durability: 100,
                    vision_range: Fixed::from_num(120),
                })
                .collect()
        })
    }

    /// Generate a routine (non-strike) command.
    pub fn arb_command() -> impl Strategy<Value = Command> {
        prop_oneof![
            (arb_position(), arb_offset()).prop_map(|(top_left, size)| Command::SelectRect {
                top_left,
                size
            }),
            arb_unit_type().prop_map(|t| Command::select_type(t, Fixed::from_num(1024))),
            arb_unit_type().prop_map(|t| Command::add_type(t, Fixed::from_num(1024))),
            arb_offset().prop_map(|offset| Command::MoveBy { offset }),
            (arb_position(), 1i32..4).prop_map(|(center, f)| Command::Scale {
                factor: Fixed::from_num(f),
                center
            }),
        ]
    }

    /// Generate a sequence of routine commands.
    pub fn arb_command_sequence(max_len: usize) -> impl Strategy<Value = Vec<Command>> {
        proptest::collection::vec(arb_command(), 0..max_len)
    }
}
