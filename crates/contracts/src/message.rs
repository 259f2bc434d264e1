//! Message - the single wire envelope
//!
//! Every frame on the race channel is one JSON `Message`. `type` is required,
//! every other field is optional and only meaningful for some types. Unknown
//! fields are ignored on decode; absent fields are omitted on encode.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::RaceError;

/// Robot serial, assigned by the robot firmware
pub type Serial = u32;

/// Checkpoint gate identifier
pub type FrameId = u32;

/// Race time in milliseconds since the start of the race
pub type RaceTime = u64;

/// Envelope type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Command,
    State,
    RobotInit,
    RobotEdit,
    RobotRemove,
    Time,
    Laps,
    Lap,
    LapMinus,
    LapMan,
    PitStop,
    PitStopFinish,
    Frame,
    Error,
    WrongFrame,
    WrongRotation,
    DuplicateFrame,
}

impl MessageType {
    /// Wire name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command => "COMMAND",
            Self::State => "STATE",
            Self::RobotInit => "ROBOT_INIT",
            Self::RobotEdit => "ROBOT_EDIT",
            Self::RobotRemove => "ROBOT_REMOVE",
            Self::Time => "TIME",
            Self::Laps => "LAPS",
            Self::Lap => "LAP",
            Self::LapMinus => "LAP_MINUS",
            Self::LapMan => "LAP_MAN",
            Self::PitStop => "PIT_STOP",
            Self::PitStopFinish => "PIT_STOP_FINISH",
            Self::Frame => "FRAME",
            Self::Error => "ERROR",
            Self::WrongFrame => "WRONG_FRAME",
            Self::WrongRotation => "WRONG_ROTATION",
            Self::DuplicateFrame => "DUPLICATE_FRAME",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Race state machine
///
/// Totally ordered by declaration. A race only moves to the next state, or
/// wraps from `Finish` back to `Ready`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RaceState {
    #[default]
    Ready,
    Steady,
    Running,
    Finish,
}

impl RaceState {
    /// All states in declaration order
    pub const ALL: [RaceState; 4] = [Self::Ready, Self::Steady, Self::Running, Self::Finish];

    /// The only state this one may transition to
    pub fn successor(self) -> RaceState {
        match self {
            Self::Ready => Self::Steady,
            Self::Steady => Self::Running,
            Self::Running => Self::Finish,
            Self::Finish => Self::Ready,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Steady => "STEADY",
            Self::Running => "RUNNING",
            Self::Finish => "FINISH",
        }
    }
}

impl fmt::Display for RaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<RaceState>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<Serial>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<FrameId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub laps: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<RaceTime>,

    /// Race time limit in seconds (0 = unlimited)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub race_time_limit: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_lap_time: Option<RaceTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_lap_time: Option<RaceTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pit_stop_finish_time: Option<RaceTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Message {
    /// Create an envelope with only the type set
    pub fn new(kind: MessageType) -> Self {
        Self {
            kind,
            state: None,
            serial: None,
            frame: None,
            name: None,
            num: None,
            laps: None,
            time: None,
            race_time_limit: None,
            last_lap_time: None,
            best_lap_time: None,
            pit_stop_finish_time: None,
            place: None,
            message: None,
        }
    }

    /// `STATE` envelope
    pub fn state(state: RaceState) -> Self {
        Self {
            state: Some(state),
            ..Self::new(MessageType::State)
        }
    }

    /// `COMMAND` envelope requesting a state
    pub fn command(state: RaceState) -> Self {
        Self {
            state: Some(state),
            ..Self::new(MessageType::Command)
        }
    }

    /// `TIME` snapshot envelope
    pub fn time(time: RaceTime, race_time_limit: u64) -> Self {
        Self {
            time: Some(time),
            race_time_limit: Some(race_time_limit),
            ..Self::new(MessageType::Time)
        }
    }

    /// `ERROR` envelope with a human-readable reason
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(MessageType::Error)
        }
    }

    /// Envelope of `kind` addressed to one robot
    pub fn for_robot(kind: MessageType, serial: Serial) -> Self {
        Self {
            serial: Some(serial),
            ..Self::new(kind)
        }
    }

    /// Decode an envelope from JSON text
    pub fn from_json(text: &str) -> Result<Self, RaceError> {
        serde_json::from_str(text).map_err(|e| RaceError::decode(e.to_string()))
    }

    /// Encode the envelope as JSON text
    pub fn to_json(&self) -> Result<String, RaceError> {
        serde_json::to_string(self).map_err(|e| RaceError::decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successor_wraps_after_finish() {
        assert_eq!(RaceState::Ready.successor(), RaceState::Steady);
        assert_eq!(RaceState::Running.successor(), RaceState::Finish);
        assert_eq!(RaceState::Finish.successor(), RaceState::Ready);
    }

    #[test]
    fn test_states_ordered_by_declaration() {
        assert!(RaceState::Ready < RaceState::Steady);
        assert!(RaceState::Steady < RaceState::Running);
        assert!(RaceState::Running < RaceState::Finish);
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let msg = Message::from_json(
            r#"{"type":"FRAME","serial":101,"frame":2,"firmware":"1.4","rssi":-60}"#,
        )
        .unwrap();
        assert_eq!(msg.kind, MessageType::Frame);
        assert_eq!(msg.serial, Some(101));
        assert_eq!(msg.frame, Some(2));
    }

    #[test]
    fn test_decode_camel_case_fields() {
        let msg = Message::from_json(r#"{"type":"TIME","raceTimeLimit":30}"#).unwrap();
        assert_eq!(msg.race_time_limit, Some(30));
    }

    #[test]
    fn test_decode_requires_type() {
        assert!(Message::from_json(r#"{"serial":1}"#).is_err());
        assert!(Message::from_json(r#"{"type":"TELEPORT"}"#).is_err());
    }

    #[test]
    fn test_encode_omits_absent_fields() {
        let json = Message::state(RaceState::Steady).to_json().unwrap();
        assert_eq!(json, r#"{"type":"STATE","state":"STEADY"}"#);
    }

    #[test]
    fn test_encode_time_snapshot() {
        let json = Message::time(3000, 3).to_json().unwrap();
        assert_eq!(json, r#"{"type":"TIME","time":3000,"raceTimeLimit":3}"#);
    }
}
