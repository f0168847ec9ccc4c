//! Unit identity and per-type bookkeeping.
//!
//! - [`UnitType`]: the closed set of unit types the environment knows
//! - [`ByType`]: an explicit mapping keyed by [`UnitType`], used wherever the
//!   engine keeps one value per type (motionlessness flags, regroup stages)
//! - [`Unit`] / [`UnitDelta`]: full sightings and per-tick changes

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Stable identifier assigned to a unit by the environment.
pub type UnitId = i64;

/// Identifier of a player.
pub type PlayerId = i64;

/// Simulation step index.
pub type Tick = u64;

/// Unit types reported by the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    /// Armored repair vehicle. Ground, heals itself and its neighbours.
    Arrv,
    /// Air superiority unit; also carries the area-strike designator.
    Fighter,
    /// Attack helicopter.
    Helicopter,
    /// Infantry fighting vehicle. Ground.
    Ifv,
    /// Main battle tank. Ground.
    Tank,
}

impl UnitType {
    /// Every unit type, in canonical order.
    pub const ALL: [UnitType; 5] = [
        UnitType::Arrv,
        UnitType::Fighter,
        UnitType::Helicopter,
        UnitType::Ifv,
        UnitType::Tank,
    ];

    /// Ground unit types.
    pub const GROUND: [UnitType; 3] = [UnitType::Arrv, UnitType::Ifv, UnitType::Tank];

    /// Air unit types.
    pub const AIR: [UnitType; 2] = [UnitType::Fighter, UnitType::Helicopter];

    /// Whether this type flies.
    #[must_use]
    pub const fn is_air(self) -> bool {
        matches!(self, UnitType::Fighter | UnitType::Helicopter)
    }

    /// Whether this type repairs itself between strikes.
    #[must_use]
    pub const fn is_self_healing(self) -> bool {
        matches!(self, UnitType::Arrv)
    }
}

/// One value per [`UnitType`].
///
/// Replaces indexing a vector by enum ordinal: adding a type is a compile
/// error here instead of a silent out-of-bounds read somewhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ByType<T> {
    /// Value for [`UnitType::Arrv`].
    pub arrv: T,
    /// Value for [`UnitType::Fighter`].
    pub fighter: T,
    /// Value for [`UnitType::Helicopter`].
    pub helicopter: T,
    /// Value for [`UnitType::Ifv`].
    pub ifv: T,
    /// Value for [`UnitType::Tank`].
    pub tank: T,
}

impl<T> ByType<T> {
    /// Build the mapping by calling `f` once per type.
    pub fn from_fn(mut f: impl FnMut(UnitType) -> T) -> Self {
        Self {
            arrv: f(UnitType::Arrv),
            fighter: f(UnitType::Fighter),
            helicopter: f(UnitType::Helicopter),
            ifv: f(UnitType::Ifv),
            tank: f(UnitType::Tank),
        }
    }

    /// Value for a type.
    #[must_use]
    pub fn get(&self, unit_type: UnitType) -> &T {
        match unit_type {
            UnitType::Arrv => &self.arrv,
            UnitType::Fighter => &self.fighter,
            UnitType::Helicopter => &self.helicopter,
            UnitType::Ifv => &self.ifv,
            UnitType::Tank => &self.tank,
        }
    }

    /// Mutable value for a type.
    pub fn get_mut(&mut self, unit_type: UnitType) -> &mut T {
        match unit_type {
            UnitType::Arrv => &mut self.arrv,
            UnitType::Fighter => &mut self.fighter,
            UnitType::Helicopter => &mut self.helicopter,
            UnitType::Ifv => &mut self.ifv,
            UnitType::Tank => &mut self.tank,
        }
    }

    /// Iterate `(type, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (UnitType, &T)> {
        UnitType::ALL.into_iter().map(move |t| (t, self.get(t)))
    }
}

impl<T: Clone> ByType<T> {
    /// Mapping with the same value for every type.
    pub fn splat(value: T) -> Self {
        Self::from_fn(|_| value.clone())
    }
}

impl<T> std::ops::Index<UnitType> for ByType<T> {
    type Output = T;

    fn index(&self, index: UnitType) -> &Self::Output {
        self.get(index)
    }
}

impl<T> std::ops::IndexMut<UnitType> for ByType<T> {
    fn index_mut(&mut self, index: UnitType) -> &mut Self::Output {
        self.get_mut(index)
    }
}

/// Full record of a visible unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    /// Environment-assigned identifier.
    pub id: UnitId,
    /// Owning player.
    pub owner: PlayerId,
    /// Unit type.
    pub unit_type: UnitType,
    /// Current position.
    pub position: Vec2Fixed,
    /// Current durability. Zero means destroyed.
    pub durability: u32,
    /// Durability at full health.
    pub max_durability: u32,
    /// Current vision range.
    #[serde(with = "fixed_serde")]
    pub vision_range: Fixed,
}

impl Unit {
    /// Whether the unit has lost more than half its durability.
    #[must_use]
    pub const fn is_badly_damaged(&self) -> bool {
        (self.durability as u64) * 2 < self.max_durability as u64
    }

    /// Whether the unit belongs to `player`.
    #[must_use]
    pub const fn is_owned_by(&self, player: PlayerId) -> bool {
        self.owner == player
    }

    /// Merge a delta into this record.
    pub fn apply(&mut self, delta: &UnitDelta) {
        self.position = delta.position;
        self.durability = delta.durability;
    }
}

/// Per-tick change report for a unit seen on a previous tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitDelta {
    /// Unit this delta refers to.
    pub id: UnitId,
    /// Reported position.
    pub position: Vec2Fixed,
    /// Reported durability. Zero signals destruction.
    pub durability: u32,
}

impl UnitDelta {
    /// Whether this delta reports the unit destroyed.
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.durability == 0
    }
}
