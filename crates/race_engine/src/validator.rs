//! Frame validator.
//!
//! Turns raw gate crossings into lap outcomes. Each registered robot owns a
//! [`CrossingBuffer`]; a crossing of the start/finish gate completes a lap when
//! the buffer holds the whole circuit in order (forward lap) or in reverse
//! order (lap rolled back).

use std::collections::HashMap;

use contracts::{FrameId, LapsConfig, MessageType, RaceTime, Serial};
use tracing::{debug, warn};

use crate::buffer::CrossingBuffer;

/// Classification of one gate crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Normal forward progress
    Frame,
    /// Forward lap completed
    Lap,
    /// Reverse lap completed
    LapMinus,
    /// Same gate as the previous crossing
    DuplicateFrame,
    /// Previous gate of the circuit
    WrongRotation,
    /// Skipped ahead or unrelated gate
    WrongFrame,
    /// Unknown gate, unregistered robot or debounced crossing
    Error,
}

impl FrameOutcome {
    pub fn as_str(&self) -> &'static str {
        self.message_type().as_str()
    }

    /// Wire type carrying this outcome
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Frame => MessageType::Frame,
            Self::Lap => MessageType::Lap,
            Self::LapMinus => MessageType::LapMinus,
            Self::DuplicateFrame => MessageType::DuplicateFrame,
            Self::WrongRotation => MessageType::WrongRotation,
            Self::WrongFrame => MessageType::WrongFrame,
            Self::Error => MessageType::Error,
        }
    }
}

/// Per-robot gate-crossing sequence matcher
#[derive(Debug)]
pub struct FrameValidator {
    circuit: Vec<FrameId>,
    reversed: Vec<FrameId>,
    safe_interval: RaceTime,
    buffers: HashMap<Serial, CrossingBuffer>,
}

impl FrameValidator {
    /// Create a validator for `circuit`; `circuit[0]` is the start/finish gate
    ///
    /// `circuit` must be non-empty. Configuration validation guarantees this
    /// for loaded configs.
    pub fn new(circuit: Vec<FrameId>, safe_interval: RaceTime) -> Self {
        let reversed = circuit.iter().rev().copied().collect();
        Self {
            circuit,
            reversed,
            safe_interval,
            buffers: HashMap::new(),
        }
    }

    pub fn from_config(config: &LapsConfig) -> Self {
        Self::new(config.circuit.clone(), config.safe_interval_ms)
    }

    pub fn circuit(&self) -> &[FrameId] {
        &self.circuit
    }

    /// Give `serial` a fresh buffer, replacing any existing one
    pub fn register(&mut self, serial: Serial) {
        self.buffers.insert(serial, CrossingBuffer::new());
    }

    pub fn unregister(&mut self, serial: Serial) {
        self.buffers.remove(&serial);
    }

    pub fn is_registered(&self, serial: Serial) -> bool {
        self.buffers.contains_key(&serial)
    }

    /// Clear every buffer, keeping registrations
    pub fn reset_all(&mut self) {
        self.buffers.values_mut().for_each(CrossingBuffer::reset);
    }

    pub fn is_start_frame(&self, frame: FrameId) -> bool {
        self.circuit.first() == Some(&frame)
    }

    /// Classify a crossing of `frame` by `serial` at `race_time`
    pub fn check(&mut self, serial: Serial, frame: FrameId, race_time: RaceTime) -> FrameOutcome {
        let outcome = self.classify(serial, frame, race_time);
        debug!(serial, frame, race_time, outcome = outcome.as_str(), "Frame result");
        outcome
    }

    fn classify(&mut self, serial: Serial, frame: FrameId, race_time: RaceTime) -> FrameOutcome {
        if !self.circuit.contains(&frame) {
            warn!(serial, frame, "Frame not found in circuit");
            return FrameOutcome::Error;
        }

        let is_finish = self.is_start_frame(frame);
        let Some(buffer) = self.buffers.get_mut(&serial) else {
            warn!(serial, "Robot is not registered");
            return FrameOutcome::Error;
        };

        let debounce_until = buffer.last_frame_time().saturating_add(self.safe_interval);
        if !buffer.is_empty() && race_time < debounce_until {
            warn!(serial, frame, race_time, "Frame is not counted (too quick)");
            return FrameOutcome::Error;
        }

        let previous = buffer.last_frame();
        buffer.place(frame, race_time, is_finish);

        if is_finish {
            let forward = buffer.contains_in_order(&self.circuit);
            let backward = buffer.contains_in_order(&self.reversed);
            buffer.restart_lap(frame, race_time);

            if forward {
                return FrameOutcome::Lap;
            }
            if backward {
                return FrameOutcome::LapMinus;
            }
        }

        if frame == self.expected_next(previous) {
            FrameOutcome::Frame
        } else if Some(frame) == previous {
            FrameOutcome::DuplicateFrame
        } else if frame == self.expected_previous(previous) {
            FrameOutcome::WrongRotation
        } else {
            FrameOutcome::WrongFrame
        }
    }

    fn position(&self, frame: FrameId) -> Option<usize> {
        self.circuit.iter().position(|&f| f == frame)
    }

    fn expected_next(&self, previous: Option<FrameId>) -> FrameId {
        let len = self.circuit.len();
        match previous.and_then(|p| self.position(p)) {
            Some(index) => self.circuit[(index + 1) % len],
            None => self.circuit[0],
        }
    }

    fn expected_previous(&self, previous: Option<FrameId>) -> FrameId {
        let len = self.circuit.len();
        match previous.and_then(|p| self.position(p)) {
            Some(index) => self.circuit[(index + len - 1) % len],
            None => self.circuit[len - 1],
        }
    }
}
