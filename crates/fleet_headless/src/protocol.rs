//! JSON-lines protocol between the environment and the engine.
//!
//! **Input (stdin):** one message per line
//! **Output (stdout):** one response per tick
//!
//! # Protocol Flow
//!
//! 1. The environment sends `{"msg":"init","rules":{...}}` once
//! 2. Then one `{"msg":"tick",...}` per tick; the runner answers each with
//!    a `{"type":"move",...}` line (possibly the no-op move)
//! 3. `{"msg":"quit"}` or end of input ends the session with a `bye` line
//!
//! # Example Session
//!
//! ```text
//! -> {"msg":"init","rules":{"world_width":1024.0,...}}
//! -> {"msg":"tick","tick":0,"me":{"id":1,"score":0,"strike_cooldown_ticks":0},...}
//! <- {"type":"move","action":"clear_and_select","left":0.0,"top":0.0,...}
//! -> {"msg":"quit"}
//! <- {"type":"bye","ticks":1,"final_hash":1234567890}
//! ```
//!
//! Positions travel as plain floats and are converted to fixed point here,
//! at the boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use fleet_core::command::MoveDescription;
use fleet_core::environment::{Facility, FacilityId, FacilityKind, GameRules, PlayerState, TickInput};
use fleet_core::error::EngineError;
use fleet_core::math::{fixed_from_f64, Vec2Fixed};
use fleet_core::unit::{PlayerId, Tick, Unit, UnitDelta, UnitId, UnitType};

/// Errors raised while speaking the protocol.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A line was not valid JSON or not a known message.
    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading input or writing output failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The engine rejected the game rules.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// A tick arrived before the init message.
    #[error("Tick {0} received before init")]
    NotInitialized(Tick),

    /// A second init message arrived.
    #[error("Session already initialized")]
    AlreadyInitialized,
}

// ============================================================================
// Input Messages (Environment -> Engine)
// ============================================================================

/// Messages the environment sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg", rename_all = "snake_case")]
pub enum Message {
    /// Game rules, once per session.
    Init {
        /// Game rules.
        rules: GameRules,
    },

    /// One tick report.
    Tick(TickReport),

    /// End the session.
    Quit,
}

/// A newly visible unit as reported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitReport {
    /// Unit identifier.
    pub id: UnitId,
    /// Owning player.
    pub owner: PlayerId,
    /// Unit type.
    pub unit_type: UnitType,
    /// Position x.
    pub x: f64,
    /// Position y.
    pub y: f64,
    /// Current durability.
    pub durability: u32,
    /// Durability at full health.
    pub max_durability: u32,
    /// Vision range.
    pub vision_range: f64,
}

impl From<UnitReport> for Unit {
    fn from(report: UnitReport) -> Self {
        Self {
            id: report.id,
            owner: report.owner,
            unit_type: report.unit_type,
            position: Vec2Fixed::from_f64(report.x, report.y),
            durability: report.durability,
            max_durability: report.max_durability,
            vision_range: fixed_from_f64(report.vision_range),
        }
    }
}

impl From<&Unit> for UnitReport {
    fn from(unit: &Unit) -> Self {
        let (x, y) = unit.position.to_f64();
        Self {
            id: unit.id,
            owner: unit.owner,
            unit_type: unit.unit_type,
            x,
            y,
            durability: unit.durability,
            max_durability: unit.max_durability,
            vision_range: unit.vision_range.to_num(),
        }
    }
}

/// A change to a known unit as reported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaReport {
    /// Unit identifier.
    pub id: UnitId,
    /// Position x.
    pub x: f64,
    /// Position y.
    pub y: f64,
    /// Durability; zero means destroyed.
    pub durability: u32,
}

impl From<DeltaReport> for UnitDelta {
    fn from(report: DeltaReport) -> Self {
        Self {
            id: report.id,
            position: Vec2Fixed::from_f64(report.x, report.y),
            durability: report.durability,
        }
    }
}

impl From<&UnitDelta> for DeltaReport {
    fn from(delta: &UnitDelta) -> Self {
        let (x, y) = delta.position.to_f64();
        Self {
            id: delta.id,
            x,
            y,
            durability: delta.durability,
        }
    }
}

/// A facility as reported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FacilityReport {
    /// Facility identifier.
    pub id: FacilityId,
    /// Facility kind.
    pub kind: FacilityKind,
    /// Owner, absent while neutral.
    #[serde(default)]
    pub owner: Option<PlayerId>,
    /// Left edge.
    pub left: f64,
    /// Top edge.
    pub top: f64,
}

impl From<FacilityReport> for Facility {
    fn from(report: FacilityReport) -> Self {
        Self {
            id: report.id,
            kind: report.kind,
            owner: report.owner,
            top_left: Vec2Fixed::from_f64(report.left, report.top),
        }
    }
}

impl From<&Facility> for FacilityReport {
    fn from(facility: &Facility) -> Self {
        let (left, top) = facility.top_left.to_f64();
        Self {
            id: facility.id,
            kind: facility.kind,
            owner: facility.owner,
            left,
            top,
        }
    }
}

/// Everything the environment reports for one tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TickReport {
    /// Tick index.
    pub tick: Tick,
    /// The controlled player.
    pub me: PlayerState,
    /// The opposing player.
    pub opponent: PlayerState,
    /// Units seen for the first time.
    #[serde(default)]
    pub new_units: Vec<UnitReport>,
    /// Changes to known units.
    #[serde(default)]
    pub updates: Vec<DeltaReport>,
    /// Facilities on the map.
    #[serde(default)]
    pub facilities: Vec<FacilityReport>,
}

impl From<TickReport> for TickInput {
    fn from(report: TickReport) -> Self {
        Self {
            tick: report.tick,
            me: report.me,
            opponent: report.opponent,
            new_units: report.new_units.into_iter().map(Unit::from).collect(),
            updates: report.updates.into_iter().map(UnitDelta::from).collect(),
            facilities: report.facilities.into_iter().map(Facility::from).collect(),
        }
    }
}

impl From<&TickInput> for TickReport {
    fn from(input: &TickInput) -> Self {
        Self {
            tick: input.tick,
            me: input.me,
            opponent: input.opponent,
            new_units: input.new_units.iter().map(UnitReport::from).collect(),
            updates: input.updates.iter().map(DeltaReport::from).collect(),
            facilities: input.facilities.iter().map(FacilityReport::from).collect(),
        }
    }
}

// ============================================================================
// Output Responses (Engine -> Environment)
// ============================================================================

/// Lines the runner writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// This tick's move, possibly the no-op move.
    Move(MoveDescription),

    /// A message could not be handled; the session continues.
    Error {
        /// Human-readable cause.
        message: String,
    },

    /// Session finished.
    Bye {
        /// Ticks processed.
        ticks: u64,
        /// Hash of the decision log.
        final_hash: u64,
    },
}

/// Parse one input line.
pub fn parse_message(line: &str) -> Result<Message, ProtocolError> {
    Ok(serde_json::from_str(line.trim())?)
}

/// Encode one message as a line, without the trailing newline.
pub fn encode_message(message: &Message) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}

/// Encode one response as a line, without the trailing newline.
pub fn encode_response(response: &Response) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(response)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::command::WireAction;

    #[test]
    fn test_parse_init_with_partial_rules() {
        let line = r#"{"msg":"init","rules":{"world_width":1024.0,"world_height":1024.0,
            "tick_count":20000,"action_detection_interval":60,"base_action_count":12,
            "fighter_aerial_attack_range":20.0,"fighter_vision_range":120.0,
            "helicopter_speed":0.9,"facility_width":64.0,"facility_height":64.0}}"#
            .replace('\n', "");
        match parse_message(&line).expect("valid init") {
            Message::Init { rules } => assert_eq!(rules, GameRules::default()),
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn test_parse_tick_converts_positions() {
        let line = r#"{"msg":"tick","tick":7,"me":{"id":1,"score":3,"strike_cooldown_ticks":0},"opponent":{"id":2,"score":1,"strike_cooldown_ticks":40},"new_units":[{"id":5,"owner":1,"unit_type":"tank","x":10.5,"y":20.25,"durability":100,"max_durability":100,"vision_range":80.0}],"updates":[{"id":9,"x":1.0,"y":2.0,"durability":0}]}"#;
        let Message::Tick(report) = parse_message(line).expect("valid tick") else {
            panic!("expected a tick");
        };
        let input = TickInput::from(report);
        assert_eq!(input.tick, 7);
        assert_eq!(input.opponent.strike_cooldown_ticks, 40);
        assert_eq!(input.new_units[0].position, Vec2Fixed::from_f64(10.5, 20.25));
        assert_eq!(input.new_units[0].unit_type, UnitType::Tank);
        assert!(input.updates[0].is_destroyed());
        assert!(input.facilities.is_empty());
    }

    #[test]
    fn test_quit_and_garbage() {
        assert_eq!(parse_message(r#"{"msg":"quit"}"#).expect("quit"), Message::Quit);
        assert!(matches!(
            parse_message(r#"{"msg":"dance"}"#),
            Err(ProtocolError::Json(_))
        ));
        assert!(parse_message("not json").is_err());
    }

    #[test]
    fn test_move_response_shape() {
        let line = encode_response(&Response::Move(MoveDescription::noop())).expect("encode");
        assert_eq!(line, r#"{"type":"move","action":"none"}"#);

        let mut strike = MoveDescription::noop();
        strike.action = WireAction::AreaStrike;
        strike.x = Some(1.5);
        strike.y = Some(2.0);
        strike.unit_id = Some(4);
        let line = encode_response(&Response::Move(strike)).expect("encode");
        assert_eq!(
            line,
            r#"{"type":"move","action":"area_strike","x":1.5,"y":2.0,"unit_id":4}"#
        );
    }

    #[test]
    fn test_tick_report_roundtrip_through_text() {
        let input = TickInput {
            tick: 3,
            facilities: vec![Facility {
                id: 2,
                kind: FacilityKind::VehicleFactory,
                owner: Some(1),
                top_left: Vec2Fixed::from_f64(64.0, 128.0),
            }],
            ..TickInput::default()
        };
        let line = encode_message(&Message::Tick(TickReport::from(&input))).expect("encode");
        let Message::Tick(report) = parse_message(&line).expect("decode") else {
            panic!("expected a tick");
        };
        assert_eq!(TickInput::from(report), input);
    }
}
