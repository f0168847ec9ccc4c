//! Regrouping progress and air engagement state.
//!
//! Each unit group (ground, air) walks a fixed 15-stage cycle that turns
//! the scattered starting blocks into one dense formation. Stages come in
//! pairs: an *active* stage while a maneuver is being executed, and a
//! *ready* stage once the group has settled and the next maneuver may be
//! issued.
//!
//! Two explicit tables drive the machine:
//! - [`SETTLE_TRANSITIONS`]: active stage to ready stage, taken once the
//!   whole group is motionless
//! - [`MANEUVER_TRANSITIONS`]: ready stage to the maneuver to issue and the
//!   active stage that follows; the last entry turns the dense formation
//!   toward the enemy and ends the cycle
//!
//! Stages are stored per unit type but always mutated for a whole group at
//! once, so every type in a group shares its stage.

use serde::{Deserialize, Serialize};

use crate::motion::MotionlessnessTracker;
use crate::unit::{ByType, UnitType};

/// One step of the regrouping cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum RegroupStage {
    /// Initial vertical deployment in progress.
    #[default]
    ShiftY,
    /// Ready for the horizontal shift.
    ReadyShiftX,
    /// Horizontal shift in progress.
    ShiftX,
    /// Ready to spread out.
    ReadyScale,
    /// Spreading out.
    Scale,
    /// Ready for the interleaving nudge.
    ReadyAdjustX,
    /// Interleaving nudge in progress.
    AdjustX,
    /// Ready to merge blocks.
    ReadyCollapse,
    /// Merging blocks.
    Collapse,
    /// Ready to rotate the merged block.
    ReadyRotate,
    /// Rotating.
    Rotate,
    /// Ready to compress.
    ReadyDescale,
    /// Compressing.
    Descale,
    /// Dense formation reached; the final turn is pending.
    DenseFormation,
    /// Cycle complete.
    ReadyForAttack,
}

/// Active stages and the ready stage each settles into.
pub const SETTLE_TRANSITIONS: [(RegroupStage, RegroupStage); 7] = [
    (RegroupStage::ShiftY, RegroupStage::ReadyShiftX),
    (RegroupStage::ShiftX, RegroupStage::ReadyScale),
    (RegroupStage::Scale, RegroupStage::ReadyAdjustX),
    (RegroupStage::AdjustX, RegroupStage::ReadyCollapse),
    (RegroupStage::Collapse, RegroupStage::ReadyRotate),
    (RegroupStage::Rotate, RegroupStage::ReadyDescale),
    (RegroupStage::Descale, RegroupStage::DenseFormation),
];

/// Ready stages, the maneuver they issue, and the stage that follows.
pub const MANEUVER_TRANSITIONS: [(RegroupStage, Maneuver, RegroupStage); 7] = [
    (RegroupStage::ReadyShiftX, Maneuver::ShiftX, RegroupStage::ShiftX),
    (RegroupStage::ReadyScale, Maneuver::Scale, RegroupStage::Scale),
    (RegroupStage::ReadyAdjustX, Maneuver::AdjustX, RegroupStage::AdjustX),
    (RegroupStage::ReadyCollapse, Maneuver::Collapse, RegroupStage::Collapse),
    (RegroupStage::ReadyRotate, Maneuver::Rotate, RegroupStage::Rotate),
    (RegroupStage::ReadyDescale, Maneuver::Descale, RegroupStage::Descale),
    (RegroupStage::DenseFormation, Maneuver::FaceEnemy, RegroupStage::ReadyForAttack),
];

impl RegroupStage {
    /// The full cycle in order.
    pub const CYCLE: [RegroupStage; 15] = [
        RegroupStage::ShiftY,
        RegroupStage::ReadyShiftX,
        RegroupStage::ShiftX,
        RegroupStage::ReadyScale,
        RegroupStage::Scale,
        RegroupStage::ReadyAdjustX,
        RegroupStage::AdjustX,
        RegroupStage::ReadyCollapse,
        RegroupStage::Collapse,
        RegroupStage::ReadyRotate,
        RegroupStage::Rotate,
        RegroupStage::ReadyDescale,
        RegroupStage::Descale,
        RegroupStage::DenseFormation,
        RegroupStage::ReadyForAttack,
    ];

    /// Position in [`Self::CYCLE`].
    #[must_use]
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    /// Following stage, `None` at the end of the cycle.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::CYCLE.get(self.ordinal() + 1).copied()
    }

    /// Stage reached once the group stops moving, if this is an active stage.
    #[must_use]
    pub fn on_motion_settled(self) -> Option<Self> {
        SETTLE_TRANSITIONS
            .iter()
            .find(|(from, _)| *from == self)
            .map(|&(_, to)| to)
    }

    /// Maneuver to issue and the stage after it, if this is a ready stage.
    #[must_use]
    pub fn on_ready(self) -> Option<(Maneuver, Self)> {
        MANEUVER_TRANSITIONS
            .iter()
            .find(|(from, _, _)| *from == self)
            .map(|&(_, maneuver, to)| (maneuver, to))
    }

    /// Whether a maneuver is waiting to be issued.
    #[must_use]
    pub fn is_ready(self) -> bool {
        self.on_ready().is_some()
    }

    /// Whether the cycle is finished.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::ReadyForAttack)
    }
}

/// Maneuver issued when a group leaves a ready stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Maneuver {
    /// Line blocks up on one column.
    ShiftX,
    /// Spread blocks so they can interpenetrate.
    Scale,
    /// Offset blocks so they slot into each other's gaps.
    AdjustX,
    /// Merge blocks.
    Collapse,
    /// Rotate the merged block.
    Rotate,
    /// Compress the merged block.
    Descale,
    /// Turn the densest side toward the enemy.
    FaceEnemy,
}

/// Unit groups that regroup together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitGroup {
    /// Arrv, Ifv and Tank.
    Ground,
    /// Fighter and Helicopter.
    Air,
}

impl UnitGroup {
    /// Both groups.
    pub const ALL: [UnitGroup; 2] = [UnitGroup::Ground, UnitGroup::Air];

    /// Unit types in the group.
    #[must_use]
    pub const fn types(self) -> &'static [UnitType] {
        match self {
            Self::Ground => &UnitType::GROUND,
            Self::Air => &UnitType::AIR,
        }
    }
}

/// A stage change reported by the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageTransition {
    /// Group that changed.
    pub group: UnitGroup,
    /// Stage before.
    pub from: RegroupStage,
    /// Stage after.
    pub to: RegroupStage,
}

/// Regrouping progress of every group.
///
/// Each table moves a group one stage. Both can fire in the same planning
/// tick (settle into a ready stage, then emit its maneuver), so a group may
/// advance two stages in one tick but never skips one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RegroupMachine {
    stages: ByType<RegroupStage>,
}

impl RegroupMachine {
    /// Every group at the start of the cycle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage of a unit type.
    #[must_use]
    pub fn stage_of(&self, unit_type: UnitType) -> RegroupStage {
        self.stages[unit_type]
    }

    /// Stage of a group.
    #[must_use]
    pub fn stage(&self, group: UnitGroup) -> RegroupStage {
        // Groups are always mutated as a whole; the first type is representative.
        self.stages[group.types()[0]]
    }

    /// Per-type stages.
    #[must_use]
    pub const fn stages(&self) -> &ByType<RegroupStage> {
        &self.stages
    }

    fn set(&mut self, group: UnitGroup, stage: RegroupStage) -> StageTransition {
        let from = self.stage(group);
        for &unit_type in group.types() {
            self.stages[unit_type] = stage;
        }
        StageTransition {
            group,
            from,
            to: stage,
        }
    }

    #[cfg(test)]
    pub(crate) fn force_stage(&mut self, group: UnitGroup, stage: RegroupStage) {
        self.set(group, stage);
    }

    /// Move every fully settled group from its active stage to the ready one.
    pub fn settle(&mut self, motion: &MotionlessnessTracker) -> Vec<StageTransition> {
        let mut transitions = Vec::new();
        for group in UnitGroup::ALL {
            if !motion.are_types_motionless(group.types()) {
                continue;
            }
            if let Some(to) = self.stage(group).on_motion_settled() {
                transitions.push(self.set(group, to));
            }
        }
        transitions
    }

    /// Maneuver a group may issue now, if it is ready and standing still.
    #[must_use]
    pub fn pending_maneuver(
        &self,
        group: UnitGroup,
        motion: &MotionlessnessTracker,
    ) -> Option<Maneuver> {
        if !motion.are_types_motionless(group.types()) {
            return None;
        }
        self.stage(group).on_ready().map(|(maneuver, _)| maneuver)
    }

    /// Record that the group's pending maneuver was issued.
    ///
    /// Returns `None` when the group was not on a ready stage.
    pub fn complete_maneuver(&mut self, group: UnitGroup) -> Option<StageTransition> {
        let (_, to) = self.stage(group).on_ready()?;
        Some(self.set(group, to))
    }
}

/// Approach/retreat state of the air wing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EngagementState {
    /// Still regrouping.
    #[default]
    Initial,
    /// Flying toward the enemy.
    Approaching,
    /// Pulling back after contact.
    Retreating,
}
