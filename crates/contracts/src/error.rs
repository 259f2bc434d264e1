//! Layered error definitions
//!
//! Categorized by source: protocol / state / config / io

use thiserror::Error;

use crate::{MessageType, RaceState, Serial};

/// Unified error type
///
/// The `Display` text of protocol and state errors is what the originating
/// session receives in the `message` field of an `ERROR` envelope.
#[derive(Debug, Error)]
pub enum RaceError {
    // ===== Protocol Errors =====
    /// Inbound text is not a valid envelope
    #[error("cannot decode message: {message}")]
    Decode { message: String },

    /// A field the message type requires is absent
    #[error("{field} is not defined")]
    MissingField { field: &'static str },

    /// Message type is valid on the wire but not accepted inbound
    #[error("method not supported: [{kind}]")]
    Unsupported { kind: MessageType },

    /// No robot registered under this serial
    #[error("cannot find robot by serial {serial}")]
    UnknownRobot { serial: Serial },

    /// Race time limit does not fit the millisecond race clock
    #[error("race time limit {limit} s is out of range")]
    InvalidTimeLimit { limit: u64 },

    // ===== State Errors =====
    /// Requested state is not the successor of the current one
    #[error("wrong current state to apply command: [{from}]->[{to}]")]
    WrongTransition { from: RaceState, to: RaceState },

    /// Requested state equals the current one
    #[error("state already set up: [{state}]")]
    StateAlreadySet { state: RaceState },

    /// Operation only allowed while the race is running
    #[error("{operation} ignored: state is not running")]
    NotRunning { operation: &'static str },

    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Transport Errors =====
    /// Outbound delivery to a session failed
    #[error("delivery to session '{session}' failed: {message}")]
    Delivery { session: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RaceError {
    /// Create decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create session delivery error
    pub fn delivery(session: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Delivery {
            session: session.into(),
            message: message.into(),
        }
    }

    /// Whether the error was caused by the inbound message rather than the process
    pub fn is_protocol(&self) -> bool {
        !matches!(
            self,
            Self::ConfigParse { .. }
                | Self::ConfigValidation { .. }
                | Self::Delivery { .. }
                | Self::Io(_)
        )
    }
}
