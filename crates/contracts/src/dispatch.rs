//! DispatchResult - Race controller output
//!
//! Ordered outbound envelopes plus the routing mode the gateway applies.

use crate::Message;

/// Routing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Reply only to the originating session
    Single,
    /// Fan out to every open session
    Broadcast,
}

/// Result of handling one inbound envelope
///
/// Envelopes are delivered in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    pub mode: ResponseMode,
    pub messages: Vec<Message>,
}

impl DispatchResult {
    /// Empty single reply (nothing is sent)
    pub fn empty() -> Self {
        Self {
            mode: ResponseMode::Single,
            messages: Vec::new(),
        }
    }

    pub fn single(message: Message) -> Self {
        Self {
            mode: ResponseMode::Single,
            messages: vec![message],
        }
    }

    pub fn single_all(messages: Vec<Message>) -> Self {
        Self {
            mode: ResponseMode::Single,
            messages,
        }
    }

    pub fn broadcast(message: Message) -> Self {
        Self {
            mode: ResponseMode::Broadcast,
            messages: vec![message],
        }
    }

    pub fn broadcast_all(messages: Vec<Message>) -> Self {
        Self {
            mode: ResponseMode::Broadcast,
            messages,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_broadcast(&self) -> bool {
        self.mode == ResponseMode::Broadcast
    }
}
