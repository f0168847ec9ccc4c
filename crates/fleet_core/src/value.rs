//! Unit value heuristic.
//!
//! A unit is worth `base`, plus a bonus when it is badly damaged (an area
//! blast is likely to finish it), minus a discount for self-healing units.
//! The viewer's own units count negatively: hitting them is collateral cost.

use crate::config::ValueWeights;
use crate::unit::{PlayerId, Unit};

/// Signed value of `unit` from the point of view of `viewer`.
#[must_use]
pub fn unit_value(unit: &Unit, viewer: PlayerId, weights: &ValueWeights) -> i32 {
    let mut value = weights.base;
    if unit.is_badly_damaged() {
        value += weights.quick_kill_bonus;
    }
    if unit.unit_type.is_self_healing() {
        value -= weights.self_healing_discount;
    }

    if unit.is_owned_by(viewer) {
        -value
    } else {
        value
    }
}
