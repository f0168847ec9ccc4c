//! Unit-group commands and the pending-command queue.
//!
//! [`Command`] is what planners produce; [`MoveDescription`] is what the
//! environment receives, one per tick. The translation is mechanical.
//!
//! The queue is drained one command per allowed tick. Routine orders are
//! appended; an area strike may jump to the front, but only when the
//! front is a selection (or nothing), so an in-flight selection+move pair
//! is never split.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::environment::FacilityId;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::unit::{UnitId, UnitType};

/// A single order to the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Replace the selection with every own unit inside a rectangle.
    SelectRect {
        /// Top-left corner.
        top_left: Vec2Fixed,
        /// Rectangle extent.
        size: Vec2Fixed,
    },
    /// Replace the selection with every own unit of a type.
    SelectByType {
        /// Type to select.
        unit_type: UnitType,
        /// World side; the selection rectangle spans the whole world.
        #[serde(with = "fixed_serde")]
        world_side: Fixed,
    },
    /// Add every own unit of a type to the selection.
    AddToSelectionByType {
        /// Type to add.
        unit_type: UnitType,
        /// World side; the selection rectangle spans the whole world.
        #[serde(with = "fixed_serde")]
        world_side: Fixed,
    },
    /// Move the selection by an offset.
    MoveBy {
        /// Displacement.
        offset: Vec2Fixed,
    },
    /// Move the selection by an offset, capping its speed.
    MoveByCapped {
        /// Displacement.
        offset: Vec2Fixed,
        /// Maximum speed.
        #[serde(with = "fixed_serde")]
        max_speed: Fixed,
    },
    /// Scale the selection about a point.
    Scale {
        /// Scale factor.
        #[serde(with = "fixed_serde")]
        factor: Fixed,
        /// Fixed point of the transform.
        center: Vec2Fixed,
    },
    /// Rotate the selection about a point.
    Rotate {
        /// Angle in radians.
        #[serde(with = "fixed_serde")]
        angle: Fixed,
        /// Fixed point of the transform.
        center: Vec2Fixed,
    },
    /// Fire the area strike.
    AreaStrike {
        /// Aim point.
        target: Vec2Fixed,
        /// Own unit designating the target.
        launcher: UnitId,
    },
    /// Set what a factory produces.
    StartProduction {
        /// Factory.
        facility: FacilityId,
        /// Type to produce.
        unit_type: UnitType,
    },
}

/// Discriminator of a [`Command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// [`Command::SelectRect`].
    SelectRect,
    /// [`Command::SelectByType`].
    SelectByType,
    /// [`Command::AddToSelectionByType`].
    AddToSelectionByType,
    /// [`Command::MoveBy`].
    MoveBy,
    /// [`Command::MoveByCapped`].
    MoveByCapped,
    /// [`Command::Scale`].
    Scale,
    /// [`Command::Rotate`].
    Rotate,
    /// [`Command::AreaStrike`].
    AreaStrike,
    /// [`Command::StartProduction`].
    StartProduction,
}

impl Command {
    /// Select every own unit of `unit_type`.
    #[must_use]
    pub const fn select_type(unit_type: UnitType, world_side: Fixed) -> Self {
        Self::SelectByType {
            unit_type,
            world_side,
        }
    }

    /// Add every own unit of `unit_type` to the selection.
    #[must_use]
    pub const fn add_type(unit_type: UnitType, world_side: Fixed) -> Self {
        Self::AddToSelectionByType {
            unit_type,
            world_side,
        }
    }

    /// Select a square of side `side` centred on `center`.
    #[must_use]
    pub fn select_square(center: Vec2Fixed, side: Fixed) -> Self {
        let size = Vec2Fixed::splat(side);
        Self::SelectRect {
            top_left: center - size / Fixed::from_num(2),
            size,
        }
    }

    /// The command's kind tag.
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::SelectRect { .. } => CommandKind::SelectRect,
            Self::SelectByType { .. } => CommandKind::SelectByType,
            Self::AddToSelectionByType { .. } => CommandKind::AddToSelectionByType,
            Self::MoveBy { .. } => CommandKind::MoveBy,
            Self::MoveByCapped { .. } => CommandKind::MoveByCapped,
            Self::Scale { .. } => CommandKind::Scale,
            Self::Rotate { .. } => CommandKind::Rotate,
            Self::AreaStrike { .. } => CommandKind::AreaStrike,
            Self::StartProduction { .. } => CommandKind::StartProduction,
        }
    }

    /// Whether this command only changes the selection.
    #[must_use]
    pub const fn is_selection(&self) -> bool {
        matches!(
            self,
            Self::SelectRect { .. } | Self::SelectByType { .. } | Self::AddToSelectionByType { .. }
        )
    }

    /// Translate into the environment's move format.
    #[must_use]
    pub fn to_wire(&self) -> MoveDescription {
        let mut wire = MoveDescription::noop();
        match *self {
            Self::SelectRect { top_left, size } => {
                wire.action = WireAction::ClearAndSelect;
                wire.set_rect(top_left, top_left + size);
            }
            Self::SelectByType {
                unit_type,
                world_side,
            } => {
                wire.action = WireAction::ClearAndSelect;
                wire.set_rect(Vec2Fixed::ZERO, Vec2Fixed::splat(world_side));
                wire.unit_type = Some(unit_type);
            }
            Self::AddToSelectionByType {
                unit_type,
                world_side,
            } => {
                wire.action = WireAction::AddToSelection;
                wire.set_rect(Vec2Fixed::ZERO, Vec2Fixed::splat(world_side));
                wire.unit_type = Some(unit_type);
            }
            Self::MoveBy { offset } => {
                wire.action = WireAction::Move;
                wire.set_point(offset);
            }
            Self::MoveByCapped { offset, max_speed } => {
                wire.action = WireAction::Move;
                wire.set_point(offset);
                wire.max_speed = Some(max_speed.to_num());
            }
            Self::Scale { factor, center } => {
                wire.action = WireAction::Scale;
                wire.set_point(center);
                wire.factor = Some(factor.to_num());
            }
            Self::Rotate { angle, center } => {
                wire.action = WireAction::Rotate;
                wire.set_point(center);
                wire.angle = Some(angle.to_num());
            }
            Self::AreaStrike { target, launcher } => {
                wire.action = WireAction::AreaStrike;
                wire.set_point(target);
                wire.unit_id = Some(launcher);
            }
            Self::StartProduction {
                facility,
                unit_type,
            } => {
                wire.action = WireAction::StartProduction;
                wire.facility_id = Some(facility);
                wire.unit_type = Some(unit_type);
            }
        }
        wire
    }
}

/// Action tag of the environment's move format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireAction {
    /// Do nothing this tick.
    #[default]
    None,
    /// Replace the selection.
    ClearAndSelect,
    /// Extend the selection.
    AddToSelection,
    /// Move the selection.
    Move,
    /// Rotate the selection.
    Rotate,
    /// Scale the selection.
    Scale,
    /// Fire the area strike.
    AreaStrike,
    /// Configure a factory.
    StartProduction,
}

/// The environment's move format: an action tag plus the parameters it uses.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MoveDescription {
    /// Action tag.
    pub action: WireAction,
    /// Selection rectangle left edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<f64>,
    /// Selection rectangle top edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<f64>,
    /// Selection rectangle right edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<f64>,
    /// Selection rectangle bottom edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<f64>,
    /// Offset, transform centre or strike target, x.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    /// Offset, transform centre or strike target, y.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// Rotation angle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    /// Scale factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factor: Option<f64>,
    /// Speed cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_speed: Option<f64>,
    /// Unit type filter or production type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_type: Option<UnitType>,
    /// Strike launcher.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<UnitId>,
    /// Factory to configure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility_id: Option<FacilityId>,
}

impl MoveDescription {
    /// The explicit do-nothing move.
    #[must_use]
    pub fn noop() -> Self {
        Self::default()
    }

    /// Whether this is the do-nothing move.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.action == WireAction::None
    }

    fn set_rect(&mut self, top_left: Vec2Fixed, bottom_right: Vec2Fixed) {
        let (left, top) = top_left.to_f64();
        let (right, bottom) = bottom_right.to_f64();
        self.left = Some(left);
        self.top = Some(top);
        self.right = Some(right);
        self.bottom = Some(bottom);
    }

    fn set_point(&mut self, point: Vec2Fixed) {
        let (x, y) = point.to_f64();
        self.x = Some(x);
        self.y = Some(y);
    }
}

/// Ordered buffer of commands waiting for an action tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CommandQueue {
    pending: VecDeque<Command>,
}

impl CommandQueue {
    /// Empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a routine command.
    pub fn push_back(&mut self, command: Command) {
        self.pending.push_back(command);
    }

    /// Append several routine commands in order.
    pub fn extend(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.pending.extend(commands);
    }

    /// Insert an urgent command ahead of everything else.
    pub fn push_front_urgent(&mut self, command: Command) {
        self.pending.push_front(command);
    }

    /// Remove and return the front command.
    pub fn pop_front(&mut self) -> Option<Command> {
        self.pending.pop_front()
    }

    /// The front command.
    #[must_use]
    pub fn front(&self) -> Option<&Command> {
        self.pending.front()
    }

    /// Whether an urgent command may be inserted at the front without
    /// splitting a selection from the transform that follows it.
    #[must_use]
    pub fn front_allows_interrupt(&self) -> bool {
        self.front().map_or(true, Command::is_selection)
    }

    /// Number of pending commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending commands, front first.
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.pending.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn move_by(x: i32, y: i32) -> Command {
        Command::MoveBy {
            offset: Vec2Fixed::new(Fixed::from_num(x), Fixed::from_num(y)),
        }
    }

    #[test]
    fn test_selection_kinds() {
        let side = Fixed::from_num(1024);
        assert!(Command::select_type(UnitType::Tank, side).is_selection());
        assert!(Command::add_type(UnitType::Tank, side).is_selection());
        assert!(Command::select_square(Vec2Fixed::ZERO, side).is_selection());
        assert!(!move_by(1, 1).is_selection());
        assert_eq!(move_by(1, 1).kind(), CommandKind::MoveBy);
    }

    #[test]
    fn test_select_square_is_centred() {
        let command =
            Command::select_square(Vec2Fixed::from_f64(100.0, 100.0), Fixed::from_num(30));
        assert_eq!(
            command,
            Command::SelectRect {
                top_left: Vec2Fixed::from_f64(85.0, 85.0),
                size: Vec2Fixed::from_f64(30.0, 30.0),
            }
        );
        let wire = command.to_wire();
        assert_eq!(wire.action, WireAction::ClearAndSelect);
        assert_eq!(wire.right, Some(115.0));
        assert_eq!(wire.bottom, Some(115.0));
    }

    #[test]
    fn test_wire_translation() {
        let strike = Command::AreaStrike {
            target: Vec2Fixed::from_f64(10.5, 20.0),
            launcher: 42,
        }
        .to_wire();
        assert_eq!(strike.action, WireAction::AreaStrike);
        assert_eq!(strike.x, Some(10.5));
        assert_eq!(strike.unit_id, Some(42));
        assert_eq!(strike.left, None);

        let by_type = Command::add_type(UnitType::Fighter, Fixed::from_num(1024)).to_wire();
        assert_eq!(by_type.action, WireAction::AddToSelection);
        assert_eq!(by_type.unit_type, Some(UnitType::Fighter));
        assert_eq!(by_type.right, Some(1024.0));

        let production = Command::StartProduction {
            facility: 3,
            unit_type: UnitType::Tank,
        }
        .to_wire();
        assert_eq!(production.facility_id, Some(3));
        assert!(!production.is_noop());
        assert!(MoveDescription::noop().is_noop());
    }

    #[test]
    fn test_queue_urgent_insert() {
        let mut queue = CommandQueue::new();
        assert!(queue.front_allows_interrupt());

        queue.push_back(move_by(1, 0));
        assert!(!queue.front_allows_interrupt());

        queue.push_front_urgent(Command::select_type(UnitType::Tank, Fixed::from_num(10)));
        assert!(queue.front_allows_interrupt());
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop_front().map(|c| c.kind()), Some(CommandKind::SelectByType));
        assert_eq!(queue.pop_front(), Some(move_by(1, 0)));
        assert!(queue.is_empty());
    }
}
